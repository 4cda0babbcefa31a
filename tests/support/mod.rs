//! Shared mock capabilities for integration tests.
//!
//! Every mock records what it was asked through an `Arc<Mutex<..>>` so tests
//! can assert on calls after the pipeline has consumed the capability.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use prospect_core::{
    Budget, BusinessIdentity, BusinessRecord, DetailEnricher, EnrichedDetails, SearchRequest,
    SourceAdapter, SourceError, SourceFuture, SourceId, Verdict, VerificationSubject, Verifier,
};

pub fn source_id(id: &str) -> SourceId {
    SourceId::parse(id).expect("valid source id")
}

pub fn budget(target_records: usize, max_external_calls: u64, cost_ceiling: f64) -> Budget {
    Budget::new(target_records, max_external_calls, cost_ceiling).expect("valid budget")
}

/// Discovery source that returns a scripted result and records every request.
#[derive(Clone)]
pub struct MockSource {
    id: SourceId,
    result: Result<Vec<BusinessRecord>, SourceError>,
    delay: Duration,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl MockSource {
    pub fn returning(id: SourceId, records: Vec<BusinessRecord>) -> Self {
        Self {
            id,
            result: Ok(records),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(id: SourceId, error: SourceError) -> Self {
        Self {
            id,
            result: Err(error),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests mutex").len()
    }
}

impl SourceAdapter for MockSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, Vec<BusinessRecord>> {
        self.requests.lock().expect("requests mutex").push(req);
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        })
    }
}

type VerdictFn = dyn Fn(&VerificationSubject) -> Result<Verdict, SourceError> + Send + Sync;

/// Verifier whose verdicts come from a closure; records every subject.
#[derive(Clone)]
pub struct MockVerifier {
    id: SourceId,
    respond: Arc<VerdictFn>,
    subjects: Arc<Mutex<Vec<VerificationSubject>>>,
    called_at: Arc<Mutex<Vec<Instant>>>,
}

impl MockVerifier {
    pub fn new<F>(id: &str, respond: F) -> Self
    where
        F: Fn(&VerificationSubject) -> Result<Verdict, SourceError> + Send + Sync + 'static,
    {
        Self {
            id: source_id(id),
            respond: Arc::new(respond),
            subjects: Arc::new(Mutex::new(Vec::new())),
            called_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn accepting(id: &str) -> Self {
        Self::new(id, |subject| Ok(Verdict::valid(format!("{} ok", subject.value()))))
    }

    pub fn rejecting(id: &str) -> Self {
        Self::new(id, |subject| {
            Ok(Verdict::invalid(format!("{} rejected", subject.value())))
        })
    }

    /// Email verifier that resolves `owner@<domain>` for domain lookups.
    pub fn resolving_owner(id: &str) -> Self {
        Self::new(id, |subject| match subject {
            VerificationSubject::EmailDomain(domain) => {
                Ok(Verdict::valid("mailbox found").with_resolved(format!("owner@{domain}")))
            }
            other => Ok(Verdict::valid(format!("{} deliverable", other.value()))),
        })
    }

    pub fn subjects(&self) -> Vec<VerificationSubject> {
        self.subjects.lock().expect("subjects mutex").clone()
    }

    pub fn call_count(&self) -> usize {
        self.subjects.lock().expect("subjects mutex").len()
    }

    /// When each call reached the verifier, in call order.
    pub fn call_instants(&self) -> Vec<Instant> {
        self.called_at.lock().expect("instants mutex").clone()
    }
}

impl Verifier for MockVerifier {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn verify<'a>(&'a self, subject: VerificationSubject) -> SourceFuture<'a, Verdict> {
        self.called_at.lock().expect("instants mutex").push(Instant::now());
        let verdict = (self.respond)(&subject);
        self.subjects.lock().expect("subjects mutex").push(subject);
        Box::pin(async move { verdict })
    }
}

/// Enricher returning fixed details; records the identities it was asked for.
#[derive(Clone)]
pub struct MockEnricher {
    id: SourceId,
    details: EnrichedDetails,
    identities: Arc<Mutex<Vec<BusinessIdentity>>>,
}

impl MockEnricher {
    pub fn new(id: &str, details: EnrichedDetails) -> Self {
        Self {
            id: source_id(id),
            details,
            identities: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.identities.lock().expect("identities mutex").len()
    }
}

impl DetailEnricher for MockEnricher {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn enrich<'a>(&'a self, identity: &'a BusinessIdentity) -> SourceFuture<'a, EnrichedDetails> {
        self.identities
            .lock()
            .expect("identities mutex")
            .push(identity.clone());
        let details = self.details.clone();
        Box::pin(async move { Ok(details) })
    }
}

/// A complete, plausible small business.
pub fn acme_plumbing(source: &SourceId) -> BusinessRecord {
    BusinessRecord::new(
        source.clone(),
        "Acme Plumbing Co",
        "412 Birch Ave, Austin, TX 78745",
    )
    .expect("valid record")
    .with_phone("(512) 555-1234")
    .with_website("https://acmeplumbing.com")
}

/// Plausible business number `index`, unique by name, phone and domain.
pub fn business(source: &SourceId, index: usize) -> BusinessRecord {
    BusinessRecord::new(
        source.clone(),
        format!("Riverside Service Company {index}"),
        format!("{} Oak Ave, Austin, TX 78701", 200 + index),
    )
    .expect("valid record")
    .with_phone(format!("(512) 640-{:04}", 1000 + index))
    .with_website(format!("https://riverside{index}.com"))
}
