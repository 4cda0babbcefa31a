//! Contract every bundled capability must honor.
//!
//! Sources stamp their id on every record, answer an empty market with
//! `Ok(vec![])`, respect the request limit and never report an outage as an
//! empty result. Verifiers have stable ids and answer each subject with a
//! verdict or a structured `SourceError`.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use prospect_core::http_client::HttpFuture;
use prospect_core::{
    CheckKind, HttpClient, HttpRequest, HttpResponse, HttpWebsiteVerifier, RecordedVerdict,
    RecordedVerifier, SearchRequest, Snapshot, SnapshotBatch, SnapshotEntry, SnapshotSource,
    SourceAdapter, SourceError, SourceErrorKind, SourceId, VerificationSubject, Verifier,
};

use support::{acme_plumbing, business, source_id, MockSource, MockVerifier};

struct SourceCase {
    name: &'static str,
    /// Adapter with at least three records for Austin, TX.
    populated: Arc<dyn SourceAdapter>,
    /// Adapter whose market is empty.
    empty: Arc<dyn SourceAdapter>,
    /// Adapter that is down.
    down: Arc<dyn SourceAdapter>,
}

fn entry(name: &str, address: &str) -> SnapshotEntry {
    SnapshotEntry {
        name: name.to_owned(),
        address: address.to_owned(),
        phone: None,
        website: None,
        email: None,
        rating: None,
        price_tier: None,
        category: None,
    }
}

fn snapshot_batch(records: Vec<SnapshotEntry>, unavailable: Option<&str>) -> SnapshotBatch {
    SnapshotBatch {
        source: SourceId::google_places(),
        query: None,
        location: Some(String::from("Austin, TX")),
        unavailable: unavailable.map(str::to_owned),
        records,
    }
}

fn source_cases() -> Vec<SourceCase> {
    let mock = source_id("directory");
    vec![
        SourceCase {
            name: "snapshot",
            populated: Arc::new(SnapshotSource::new(snapshot_batch(
                vec![
                    entry("Acme Plumbing Co", "412 Birch Ave, Austin, TX 78745"),
                    entry("Birch Street Electric", "18 Birch St, Austin, TX 78702"),
                    entry("Cedar Park Roofing", "903 Cedar Ln, Austin, TX 78613"),
                ],
                None,
            ))),
            empty: Arc::new(SnapshotSource::new(snapshot_batch(Vec::new(), None))),
            down: Arc::new(SnapshotSource::new(snapshot_batch(
                Vec::new(),
                Some("connection refused"),
            ))),
        },
        SourceCase {
            name: "mock",
            populated: Arc::new(MockSource::returning(
                mock.clone(),
                vec![acme_plumbing(&mock), business(&mock, 1), business(&mock, 2)],
            )),
            empty: Arc::new(MockSource::returning(mock.clone(), Vec::new())),
            down: Arc::new(MockSource::failing(
                mock,
                SourceError::unavailable("connection refused"),
            )),
        },
    ]
}

fn austin(limit: usize) -> SearchRequest {
    SearchRequest::new("plumbers", "Austin, TX", limit).expect("valid request")
}

#[tokio::test]
async fn sources_stamp_their_id_on_every_record() {
    for case in source_cases() {
        let id = case.populated.id();

        let records = case
            .populated
            .search(austin(20))
            .await
            .unwrap_or_else(|error| panic!("source '{}' failed: {error}", case.name));

        assert!(!records.is_empty(), "source '{}': records", case.name);
        for record in &records {
            assert_eq!(
                record.sources().first(),
                Some(&id),
                "source '{}': provenance of '{}'",
                case.name,
                record.name()
            );
        }
    }
}

#[tokio::test]
async fn sources_answer_an_empty_market_with_ok() {
    for case in source_cases() {
        let records = case
            .empty
            .search(austin(20))
            .await
            .unwrap_or_else(|error| panic!("source '{}' failed: {error}", case.name));

        assert!(records.is_empty(), "source '{}': zero matches", case.name);
    }
}

#[tokio::test]
async fn sources_report_outages_as_errors() {
    for case in source_cases() {
        let error = case
            .down
            .search(austin(20))
            .await
            .expect_err("an outage is never an empty result");

        assert_eq!(
            error.kind(),
            SourceErrorKind::Unavailable,
            "source '{}': kind",
            case.name
        );
        assert!(error.retryable(), "source '{}': retryable", case.name);
    }
}

#[tokio::test]
async fn snapshot_source_respects_limit() {
    let case = &source_cases()[0];

    let records = case.populated.search(austin(2)).await.expect("search succeeds");

    assert_eq!(records.len(), 2);
}

struct StatusHttpClient(u16);

impl HttpClient for StatusHttpClient {
    fn execute<'a>(&'a self, _request: HttpRequest) -> HttpFuture<'a> {
        let status = self.0;
        Box::pin(async move { Ok(HttpResponse::with_status(status)) })
    }
}

fn verifier_cases() -> Vec<(&'static str, Arc<dyn Verifier>, VerificationSubject)> {
    let website = String::from("https://acmeplumbing.com");
    vec![
        (
            "website_probe",
            Arc::new(HttpWebsiteVerifier::with_http_client(Arc::new(
                StatusHttpClient(200),
            ))),
            VerificationSubject::Website(website.clone()),
        ),
        (
            "recorded",
            Arc::new(RecordedVerifier::new(vec![RecordedVerdict {
                check: CheckKind::Website,
                subject: website.clone(),
                valid: true,
                detail: String::from("reachable (HTTP 200)"),
                resolved: None,
            }])),
            VerificationSubject::Website(website.clone()),
        ),
        (
            "mock",
            Arc::new(MockVerifier::accepting("mock_verifier")),
            VerificationSubject::Website(website),
        ),
    ]
}

#[tokio::test]
async fn verifiers_have_valid_ids_and_return_verdicts() {
    for (name, verifier, subject) in verifier_cases() {
        let id = verifier.id();
        assert_eq!(
            SourceId::parse(id.as_str()).as_ref(),
            Ok(&id),
            "verifier '{name}': id is canonical"
        );

        let verdict = verifier
            .verify(subject)
            .await
            .unwrap_or_else(|error| panic!("verifier '{name}' failed: {error}"));

        assert!(verdict.valid, "verifier '{name}': verdict");
        assert!(!verdict.detail.is_empty(), "verifier '{name}': detail");
    }
}

#[tokio::test]
async fn website_probe_refuses_other_subjects() {
    let verifier = HttpWebsiteVerifier::with_http_client(Arc::new(StatusHttpClient(200)));

    let error = verifier
        .verify(VerificationSubject::Phone(String::from("5125551234")))
        .await
        .expect_err("phone is not a website");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
}

#[tokio::test]
async fn website_probe_marks_client_errors_unreachable() {
    let verifier = HttpWebsiteVerifier::with_http_client(Arc::new(StatusHttpClient(404)));

    let verdict = verifier
        .verify(VerificationSubject::Website(String::from(
            "https://acmeplumbing.com/gone",
        )))
        .await
        .expect("a status is a verdict");

    assert!(!verdict.valid);
    assert!(verdict.detail.contains("404"));
}

#[test]
fn snapshot_document_builds_one_adapter_per_batch() {
    let snapshot = Snapshot {
        sources: vec![
            snapshot_batch(Vec::new(), None),
            SnapshotBatch {
                source: SourceId::foursquare(),
                ..snapshot_batch(Vec::new(), None)
            },
        ],
        verdicts: Vec::new(),
    };

    let ids = snapshot
        .adapters()
        .iter()
        .map(SourceAdapter::id)
        .collect::<Vec<_>>();

    assert_eq!(ids, vec![SourceId::google_places(), SourceId::foursquare()]);
    assert!(snapshot.recorded_checks().is_empty());
}
