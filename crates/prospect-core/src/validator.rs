//! Authoritative per-field validation and the confidence gate.
//!
//! Each check runs a free local precheck first; only candidates that pass it
//! spend budget on an external verifier. A check that cannot be completed is
//! `Inconclusive` and counts as failing, unless the policy lists it as
//! skippable, in which case it is `Skipped` and leaves the confidence
//! denominator.
//!
//! ```text
//! check_score = round(100 * passed_weight / non_skipped_weight)
//! confidence  = round(check_score * (100 - carry) / 100 + pre_score * carry / 100)
//! qualified   = confidence >= threshold && every required check passed
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::cost::CostTracker;
use crate::data_source::{
    BusinessIdentity, CheckKind, DetailEnricher, VerificationSubject, Verifier,
};
use crate::rules::{RuleTable, RuleTarget};
use crate::scoring::{built_in, phone_digits, website_host, ScoreResult};
use crate::source_policy::Metered;
use crate::{BusinessRecord, ContactField, SourceId, ValidationError};

static EMAIL_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$"));
static ADDRESS_NUMBER: LazyLock<Regex> = LazyLock::new(|| built_in(r"^\s*\d+\s"));
static ADDRESS_STREET_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    built_in(
        r"(?i)\b(st|street|ave|avenue|rd|road|blvd|boulevard|dr|drive|ln|lane|way|ct|court|pl|place|pkwy|parkway|hwy|highway|cir|circle|trl|trail|ter|terrace|sq|square)\b",
    )
});
static ADDRESS_CITY: LazyLock<Regex> = LazyLock::new(|| built_in(r",\s*[A-Za-z][A-Za-z .'-]+,"));
static ADDRESS_STATE: LazyLock<Regex> = LazyLock::new(|| built_in(r",\s*[A-Z]{2}\b"));
static ADDRESS_POSTAL: LazyLock<Regex> = LazyLock::new(|| built_in(r"\b\d{5}(-\d{4})?\s*$"));

const ADDRESS_COMPONENTS_REQUIRED: usize = 4;

/// Per-check weights in percent. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckWeights {
    pub phone: u32,
    pub website: u32,
    pub email: u32,
    pub address: u32,
}

impl Default for CheckWeights {
    fn default() -> Self {
        Self {
            phone: 25,
            website: 25,
            email: 30,
            address: 20,
        }
    }
}

impl CheckWeights {
    pub const fn weight(&self, check: CheckKind) -> u32 {
        match check {
            CheckKind::Phone => self.phone,
            CheckKind::Website => self.website,
            CheckKind::Email => self.email,
            CheckKind::Address => self.address,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let sum = self.phone + self.website + self.email + self.address;
        if sum != 100 {
            return Err(ValidationError::WeightsNotNormalized {
                field: "validation.weights",
                sum,
            });
        }
        Ok(())
    }
}

/// Validation section of the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Inclusive confidence threshold for qualification.
    pub threshold: u32,
    pub required_checks: Vec<CheckKind>,
    pub skippable_checks: Vec<CheckKind>,
    /// Share of the pre-validation score carried into confidence, in percent.
    pub carry_forward_percent: u32,
    pub max_concurrency: usize,
    pub weights: CheckWeights,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threshold: 80,
            required_checks: vec![CheckKind::Website, CheckKind::Email],
            skippable_checks: Vec::new(),
            carry_forward_percent: 15,
            max_concurrency: 4,
            weights: CheckWeights::default(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.threshold > 100 {
            return Err(ValidationError::ThresholdOutOfRange {
                field: "validation.threshold",
                value: self.threshold,
            });
        }
        if self.carry_forward_percent > 100 {
            return Err(ValidationError::ThresholdOutOfRange {
                field: "validation.carry_forward_percent",
                value: self.carry_forward_percent,
            });
        }
        if self.max_concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        for mandatory in [CheckKind::Website, CheckKind::Email] {
            if !self.required_checks.contains(&mandatory) {
                return Err(ValidationError::MandatoryCheckMissing {
                    check: mandatory.as_str(),
                });
            }
        }
        if let Some(check) = self
            .required_checks
            .iter()
            .find(|check| self.skippable_checks.contains(check))
        {
            return Err(ValidationError::RequiredCheckSkippable {
                check: check.as_str(),
            });
        }
        self.weights.validate()
    }

    pub fn is_required(&self, check: CheckKind) -> bool {
        self.required_checks.contains(&check)
    }

    pub fn is_skippable(&self, check: CheckKind) -> bool {
        self.skippable_checks.contains(&check)
    }
}

/// Outcome of one field check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// The check could not be completed; counts as failing.
    Inconclusive,
    /// The check could not be completed and policy allows skipping it.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub check: CheckKind,
    pub status: CheckStatus,
    pub valid: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<SourceId>,
}

impl FieldCheck {
    pub fn passed(check: CheckKind, detail: impl Into<String>) -> Self {
        Self::with_status(check, CheckStatus::Passed, detail)
    }

    pub fn failed(check: CheckKind, detail: impl Into<String>) -> Self {
        Self::with_status(check, CheckStatus::Failed, detail)
    }

    pub fn inconclusive(check: CheckKind, detail: impl Into<String>) -> Self {
        Self::with_status(check, CheckStatus::Inconclusive, detail)
    }

    pub fn skipped(check: CheckKind, detail: impl Into<String>) -> Self {
        Self::with_status(check, CheckStatus::Skipped, detail)
    }

    fn with_status(check: CheckKind, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            check,
            status,
            valid: status == CheckStatus::Passed,
            detail: detail.into(),
            verified_by: None,
        }
    }

    fn verified_by(mut self, source: &SourceId) -> Self {
        self.verified_by = Some(source.clone());
        self
    }
}

/// Verification outcome and confidence for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub phone: FieldCheck,
    pub website: FieldCheck,
    pub email: FieldCheck,
    pub address: FieldCheck,
    pub check_score: u8,
    pub confidence_score: u8,
    pub qualified: bool,
    pub inconclusive: bool,
}

impl ValidationResult {
    /// Derives scores and the qualification verdict from completed checks.
    pub fn assemble(
        phone: FieldCheck,
        website: FieldCheck,
        email: FieldCheck,
        address: FieldCheck,
        pre_score: u8,
        config: &ValidationConfig,
    ) -> Self {
        let mut passed = 0u32;
        let mut counted = 0u32;
        for check in [&phone, &website, &email, &address] {
            let weight = config.weights.weight(check.check);
            match check.status {
                CheckStatus::Skipped => {}
                CheckStatus::Passed => {
                    passed += weight;
                    counted += weight;
                }
                CheckStatus::Failed | CheckStatus::Inconclusive => counted += weight,
            }
        }
        let check_score = if counted == 0 {
            0
        } else {
            ((200 * passed + counted) / (2 * counted)).min(100) as u8
        };
        let confidence_score =
            confidence_score(check_score, pre_score, config.carry_forward_percent);

        let mut result = Self {
            phone,
            website,
            email,
            address,
            check_score,
            confidence_score,
            qualified: false,
            inconclusive: false,
        };
        result.inconclusive = result
            .checks()
            .iter()
            .any(|check| check.status == CheckStatus::Inconclusive);
        result.qualified = u32::from(confidence_score) >= config.threshold
            && config
                .required_checks
                .iter()
                .all(|required| result.check(*required).status == CheckStatus::Passed);
        result
    }

    pub fn check(&self, kind: CheckKind) -> &FieldCheck {
        match kind {
            CheckKind::Phone => &self.phone,
            CheckKind::Website => &self.website,
            CheckKind::Email => &self.email,
            CheckKind::Address => &self.address,
        }
    }

    pub fn checks(&self) -> [&FieldCheck; 4] {
        [&self.phone, &self.website, &self.email, &self.address]
    }
}

/// Blends the verification score with the carried-forward pre-validation
/// score, rounding half up.
pub fn confidence_score(check_score: u8, pre_score: u8, carry_forward_percent: u32) -> u8 {
    let carry = carry_forward_percent.min(100);
    let blended = u32::from(check_score) * (100 - carry) + u32::from(pre_score) * carry;
    ((blended + 50) / 100).min(100) as u8
}

/// A candidate after quality validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    pub record: BusinessRecord,
    pub score: ScoreResult,
    pub validation: ValidationResult,
}

/// Result of validating a batch of candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchValidation {
    /// Validated candidates in input order.
    pub validated: Vec<ValidatedRecord>,
    /// Candidates left unvalidated after the target was reached.
    pub not_validated: usize,
}

enum Precheck {
    Ready(VerificationSubject),
    Rejected(String),
}

/// Runs enrichment and field checks against registered capabilities.
pub struct QualityValidator {
    config: ValidationConfig,
    rules: Arc<RuleTable>,
    enricher: Option<Metered<dyn DetailEnricher>>,
    verifiers: BTreeMap<CheckKind, Metered<dyn Verifier>>,
}

impl QualityValidator {
    pub fn new(config: ValidationConfig, rules: Arc<RuleTable>) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            rules,
            enricher: None,
            verifiers: BTreeMap::new(),
        })
    }

    pub fn with_enricher(mut self, enricher: Metered<dyn DetailEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_verifier(mut self, check: CheckKind, verifier: Metered<dyn Verifier>) -> Self {
        self.verifiers.insert(check, verifier);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn has_verifier(&self, check: CheckKind) -> bool {
        self.verifiers.contains_key(&check)
    }

    /// Validates one candidate. The returned record may carry enriched or
    /// resolved contact fields.
    pub async fn validate(
        &self,
        mut record: BusinessRecord,
        score: &ScoreResult,
        tracker: &CostTracker,
    ) -> (BusinessRecord, ValidationResult) {
        self.enrich(&mut record, tracker).await;

        let phone = self.run_check(CheckKind::Phone, &mut record, tracker).await;
        let website = self.run_check(CheckKind::Website, &mut record, tracker).await;
        let email = self.run_check(CheckKind::Email, &mut record, tracker).await;
        let address = self.run_check(CheckKind::Address, &mut record, tracker).await;

        let result =
            ValidationResult::assemble(phone, website, email, address, score.score, &self.config);
        debug!(
            name = record.name(),
            confidence = result.confidence_score,
            qualified = result.qualified,
            inconclusive = result.inconclusive,
            "candidate validated"
        );
        (record, result)
    }

    /// Validates candidates concurrently, `max_concurrency` at a time, keeping
    /// input order. Stops starting new waves once `target_records` candidates
    /// have qualified; candidates already in flight always complete.
    pub async fn validate_batch(
        &self,
        candidates: Vec<(BusinessRecord, ScoreResult)>,
        tracker: &CostTracker,
        target_records: usize,
    ) -> BatchValidation {
        let concurrency = self.config.max_concurrency.max(1);
        let mut pending = candidates.into_iter();
        let mut validated = Vec::new();
        let mut qualified = 0usize;

        while qualified < target_records {
            let wave = pending.by_ref().take(concurrency).collect::<Vec<_>>();
            if wave.is_empty() {
                break;
            }

            let results = stream::iter(wave)
                .map(move |(record, score)| async move {
                    let (record, validation) = self.validate(record, &score, tracker).await;
                    ValidatedRecord {
                        record,
                        score,
                        validation,
                    }
                })
                .buffered(concurrency)
                .collect::<Vec<_>>()
                .await;

            qualified += results
                .iter()
                .filter(|validated| validated.validation.qualified)
                .count();
            validated.extend(results);
        }

        let not_validated = pending.count();
        if not_validated > 0 {
            debug!(
                qualified,
                not_validated, "target reached; remaining candidates left unvalidated"
            );
        }

        BatchValidation {
            validated,
            not_validated,
        }
    }

    async fn enrich(&self, record: &mut BusinessRecord, tracker: &CostTracker) {
        let Some(enricher) = &self.enricher else {
            return;
        };
        if !record.missing_contact() {
            return;
        }
        if let Err(exhausted) = enricher.reserve(tracker) {
            debug!(enricher = %enricher.id(), %exhausted, "enrichment skipped");
            return;
        }

        let identity = BusinessIdentity::of(record);
        match enricher.throttled().await.enrich(&identity).await {
            Ok(details) => {
                let source = enricher.id().clone();
                let mut filled = 0;
                for (field, value) in [
                    (ContactField::Phone, details.phone),
                    (ContactField::Website, details.website),
                    (ContactField::Email, details.email),
                ] {
                    if let Some(value) = value {
                        if record.fill_contact(field, &value, &source) {
                            filled += 1;
                        }
                    }
                }
                debug!(enricher = %source, name = record.name(), filled, "record enriched");
            }
            Err(error) => {
                warn!(
                    enricher = %enricher.id(),
                    code = error.code(),
                    error = error.message(),
                    "enrichment failed"
                );
            }
        }
    }

    async fn run_check(
        &self,
        check: CheckKind,
        record: &mut BusinessRecord,
        tracker: &CostTracker,
    ) -> FieldCheck {
        let subject = match self.precheck(check, record) {
            Precheck::Ready(subject) => subject,
            Precheck::Rejected(detail) => return FieldCheck::failed(check, detail),
        };

        let Some(verifier) = self.verifiers.get(&check) else {
            return match check {
                CheckKind::Phone | CheckKind::Address => {
                    FieldCheck::passed(check, "structural check passed; no verifier registered")
                }
                CheckKind::Website | CheckKind::Email => {
                    self.incomplete(check, format!("no {check} verifier registered"))
                }
            };
        };

        if let Err(exhausted) = verifier.reserve(tracker) {
            debug!(%check, verifier = %verifier.id(), "verification skipped: budget exhausted");
            return self.incomplete(check, exhausted.to_string());
        }

        let verdict = match verifier.throttled().await.verify(subject.clone()).await {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(
                    %check,
                    verifier = %verifier.id(),
                    code = error.code(),
                    error = error.message(),
                    "verification failed"
                );
                return self.incomplete(check, format!("verifier error: {error}"));
            }
        };

        if !verdict.valid {
            return FieldCheck::failed(check, verdict.detail).verified_by(verifier.id());
        }

        if let VerificationSubject::EmailDomain(domain) = &subject {
            let Some(resolved) = verdict.resolved.as_deref() else {
                return FieldCheck::failed(
                    check,
                    format!("no deliverable mailbox resolved for {domain}"),
                )
                .verified_by(verifier.id());
            };
            if let Some(reason) = self.email_rejection(resolved) {
                return FieldCheck::failed(check, format!("resolved mailbox rejected: {reason}"))
                    .verified_by(verifier.id());
            }
            record.fill_contact(ContactField::Email, &resolved.to_lowercase(), verifier.id());
        }

        FieldCheck::passed(check, verdict.detail).verified_by(verifier.id())
    }

    fn incomplete(&self, check: CheckKind, detail: impl Into<String>) -> FieldCheck {
        if self.config.is_skippable(check) {
            FieldCheck::skipped(check, detail)
        } else {
            FieldCheck::inconclusive(check, detail)
        }
    }

    fn precheck(&self, check: CheckKind, record: &BusinessRecord) -> Precheck {
        match check {
            CheckKind::Phone => self.precheck_phone(record),
            CheckKind::Website => self.precheck_website(record),
            CheckKind::Email => self.precheck_email(record),
            CheckKind::Address => self.precheck_address(record),
        }
    }

    fn precheck_phone(&self, record: &BusinessRecord) -> Precheck {
        let Some(phone) = record.phone() else {
            return Precheck::Rejected(String::from("no phone number"));
        };
        let digits = phone_digits(phone);
        if digits.len() != 10 {
            return Precheck::Rejected(format!("expected 10 digits, found {}", digits.len()));
        }
        let matched = self.rules.evaluate(RuleTarget::Phone, &digits);
        if matched.vetoed() {
            return Precheck::Rejected(format!("reserved number ({})", matched.vetoes.join(", ")));
        }
        Precheck::Ready(VerificationSubject::Phone(digits))
    }

    fn precheck_website(&self, record: &BusinessRecord) -> Precheck {
        let Some(website) = record.website() else {
            return Precheck::Rejected(String::from("no website"));
        };
        let Some(host) = http_host(website) else {
            return Precheck::Rejected(format!("'{website}' is not a valid http(s) URL"));
        };
        let matched = self.rules.evaluate(RuleTarget::Website, &host);
        if matched.vetoed() {
            return Precheck::Rejected(format!(
                "placeholder domain {host} ({})",
                matched.vetoes.join(", ")
            ));
        }
        Precheck::Ready(VerificationSubject::Website(website.trim().to_owned()))
    }

    fn precheck_email(&self, record: &BusinessRecord) -> Precheck {
        if let Some(email) = record.email() {
            return match self.email_rejection(email) {
                Some(reason) => Precheck::Rejected(reason),
                None => Precheck::Ready(VerificationSubject::EmailAddress(
                    email.trim().to_lowercase(),
                )),
            };
        }

        let Some(website) = record.website() else {
            return Precheck::Rejected(String::from("no email address or website domain"));
        };
        let Some(host) = http_host(website) else {
            return Precheck::Rejected(String::from("website has no usable domain"));
        };
        if self.rules.evaluate(RuleTarget::Website, &host).vetoed() {
            return Precheck::Rejected(format!("placeholder domain {host}"));
        }
        let domain = host.strip_prefix("www.").unwrap_or(&host).to_owned();
        Precheck::Ready(VerificationSubject::EmailDomain(domain))
    }

    fn precheck_address(&self, record: &BusinessRecord) -> Precheck {
        let address = record.address().trim();
        let components = address_components(address);
        if components < ADDRESS_COMPONENTS_REQUIRED {
            return Precheck::Rejected(format!(
                "incomplete address: {components}/5 components present"
            ));
        }
        let matched = self.rules.evaluate(RuleTarget::Address, address);
        if matched.vetoed() {
            return Precheck::Rejected(format!(
                "disqualified address ({})",
                matched.vetoes.join(", ")
            ));
        }
        Precheck::Ready(VerificationSubject::Address(address.to_owned()))
    }

    fn email_rejection(&self, email: &str) -> Option<String> {
        let normalized = email.trim().to_lowercase();
        if !EMAIL_FORMAT.is_match(&normalized) {
            return Some(format!("'{normalized}' is not a valid email address"));
        }
        let matched = self.rules.evaluate(RuleTarget::Email, &normalized);
        if matched.vetoed() {
            return Some(format!("placeholder email ({})", matched.vetoes.join(", ")));
        }
        None
    }
}

impl std::fmt::Debug for QualityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityValidator")
            .field("config", &self.config)
            .field("enricher", &self.enricher.as_ref().map(Metered::id))
            .field("verifiers", &self.verifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Host of an absolute http(s) URL with a dotted host.
fn http_host(website: &str) -> Option<String> {
    let url = Url::parse(website.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = website_host(website);
    host.contains('.').then_some(host)
}

/// Counts street number, street type, city, state and postal code.
fn address_components(address: &str) -> usize {
    [
        &ADDRESS_NUMBER,
        &ADDRESS_STREET_TYPE,
        &ADDRESS_CITY,
        &ADDRESS_STATE,
        &ADDRESS_POSTAL,
    ]
    .into_iter()
    .filter(|regex| regex.is_match(address))
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{EnrichedDetails, SourceFuture, Verdict};
    use crate::source_policy::SourcePolicy;
    use crate::{Budget, SourceError};
    use std::sync::Mutex;

    struct StaticVerifier {
        id: &'static str,
        verdict: Result<Verdict, SourceError>,
        calls: Mutex<Vec<VerificationSubject>>,
    }

    impl StaticVerifier {
        fn new(id: &'static str, verdict: Result<Verdict, SourceError>) -> Arc<Self> {
            Arc::new(Self {
                id,
                verdict,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<VerificationSubject> {
            self.calls.lock().expect("calls mutex").clone()
        }
    }

    impl Verifier for StaticVerifier {
        fn id(&self) -> SourceId {
            SourceId::parse(self.id).expect("valid id")
        }

        fn verify<'a>(&'a self, subject: VerificationSubject) -> SourceFuture<'a, Verdict> {
            self.calls.lock().expect("calls mutex").push(subject);
            let verdict = self.verdict.clone();
            Box::pin(async move { verdict })
        }
    }

    struct StaticEnricher(EnrichedDetails);

    impl DetailEnricher for StaticEnricher {
        fn id(&self) -> SourceId {
            SourceId::parse("details_api").expect("valid id")
        }

        fn enrich<'a>(
            &'a self,
            _identity: &'a BusinessIdentity,
        ) -> SourceFuture<'a, EnrichedDetails> {
            let details = self.0.clone();
            Box::pin(async move { Ok(details) })
        }
    }

    fn policy(id: &str) -> SourcePolicy {
        SourcePolicy::new(SourceId::parse(id).expect("valid id")).with_cost_per_call(0.01)
    }

    fn metered(verifier: Arc<StaticVerifier>, id: &str) -> Metered<dyn Verifier> {
        let capability: Arc<dyn Verifier> = verifier;
        Metered::new(capability, policy(id))
    }

    fn validator(config: ValidationConfig) -> QualityValidator {
        QualityValidator::new(config, Arc::new(RuleTable::builtin())).expect("valid config")
    }

    fn tracker(calls: u64) -> CostTracker {
        CostTracker::new(&Budget {
            target_records: 5,
            max_external_calls: calls,
            cost_ceiling: 100.0,
        })
    }

    fn acme() -> BusinessRecord {
        BusinessRecord::new(
            SourceId::google_places(),
            "Acme Plumbing Co",
            "412 Birch Ave, Austin, TX 78745",
        )
        .expect("valid record")
        .with_phone("(512) 555-1234")
        .with_website("https://acmeplumbing.com")
    }

    fn perfect_score() -> ScoreResult {
        ScoreResult {
            name: 100,
            address: 100,
            phone: 100,
            website: 100,
            source: 100,
            score: 100,
            disqualified: false,
            vetoes: Vec::new(),
            penalties: Vec::new(),
        }
    }

    fn passed_all() -> [FieldCheck; 4] {
        CheckKind::ALL.map(|check| FieldCheck::passed(check, "ok"))
    }

    #[test]
    fn confidence_blends_check_and_pre_scores() {
        assert_eq!(confidence_score(100, 100, 15), 100);
        assert_eq!(confidence_score(80, 80, 15), 80);
        assert_eq!(confidence_score(80, 76, 15), 79);
        assert_eq!(confidence_score(50, 0, 0), 50);
    }

    #[test]
    fn qualification_boundary_is_inclusive() {
        let config = ValidationConfig::default();
        let [phone, website, email, _] = passed_all();

        let at_threshold = ValidationResult::assemble(
            phone.clone(),
            website.clone(),
            email.clone(),
            FieldCheck::failed(CheckKind::Address, "incomplete"),
            80,
            &config,
        );
        assert_eq!(at_threshold.check_score, 80);
        assert_eq!(at_threshold.confidence_score, 80);
        assert!(at_threshold.qualified);

        let below = ValidationResult::assemble(
            phone,
            website,
            email,
            FieldCheck::failed(CheckKind::Address, "incomplete"),
            76,
            &config,
        );
        assert_eq!(below.confidence_score, 79);
        assert!(!below.qualified);
    }

    #[test]
    fn failed_required_check_blocks_qualification() {
        let config = ValidationConfig {
            threshold: 50,
            ..ValidationConfig::default()
        };
        let [phone, website, _, address] = passed_all();

        let result = ValidationResult::assemble(
            phone,
            website,
            FieldCheck::inconclusive(CheckKind::Email, "no verifier"),
            address,
            100,
            &config,
        );

        assert_eq!(result.check_score, 70);
        assert!(result.inconclusive);
        assert!(!result.qualified);
    }

    #[test]
    fn skipped_checks_leave_the_denominator() {
        let config = ValidationConfig {
            skippable_checks: vec![CheckKind::Phone],
            ..ValidationConfig::default()
        };
        let [_, website, email, address] = passed_all();

        let result = ValidationResult::assemble(
            FieldCheck::skipped(CheckKind::Phone, "budget"),
            website,
            email,
            address,
            100,
            &config,
        );

        assert_eq!(result.check_score, 100);
        assert!(result.qualified);
        assert!(!result.inconclusive);
    }

    #[test]
    fn config_rejects_skippable_required_checks() {
        let config = ValidationConfig {
            skippable_checks: vec![CheckKind::Email],
            ..ValidationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::RequiredCheckSkippable { check: "email" })
        );

        let config = ValidationConfig {
            required_checks: vec![CheckKind::Website],
            ..ValidationConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MandatoryCheckMissing { check: "email" })
        );
    }

    #[test]
    fn address_components_are_counted() {
        assert_eq!(address_components("412 Birch Ave, Austin, TX 78745"), 5);
        assert_eq!(address_components("412 Birch Ave, Austin"), 2);
        assert_eq!(address_components("Birch Ave, Austin, TX 78745"), 4);
    }

    #[test]
    fn format_patterns_compile() {
        for pattern in [
            &EMAIL_FORMAT,
            &ADDRESS_NUMBER,
            &ADDRESS_STREET_TYPE,
            &ADDRESS_CITY,
            &ADDRESS_STATE,
            &ADDRESS_POSTAL,
        ] {
            LazyLock::force(pattern);
        }
        assert!(EMAIL_FORMAT.is_match("owner@acmeplumbing.com"));
        assert!(!EMAIL_FORMAT.is_match("owner at acmeplumbing"));
    }

    #[test]
    #[should_panic(expected = "built-in patterns must compile")]
    fn malformed_built_in_pattern_fails_loudly() {
        built_in(r"(unclosed");
    }

    #[tokio::test]
    async fn resolves_email_from_website_domain() {
        let email = StaticVerifier::new(
            "hunter_io",
            Ok(Verdict::valid("deliverable").with_resolved("Owner@AcmePlumbing.com")),
        );
        let website = StaticVerifier::new("site_probe", Ok(Verdict::valid("HTTP 200")));
        let validator = validator(ValidationConfig::default())
            .with_verifier(CheckKind::Email, metered(email.clone(), "hunter_io"))
            .with_verifier(CheckKind::Website, metered(website, "site_probe"));
        let tracker = tracker(10);

        let (record, result) = validator.validate(acme(), &perfect_score(), &tracker).await;

        assert_eq!(
            email.calls(),
            vec![VerificationSubject::EmailDomain(String::from("acmeplumbing.com"))]
        );
        assert_eq!(record.email(), Some("owner@acmeplumbing.com"));
        assert!(record
            .sources()
            .contains(&SourceId::parse("hunter_io").expect("valid id")));
        assert_eq!(result.check_score, 100);
        assert!(result.qualified);
        assert_eq!(tracker.snapshot().calls_made, 2);
    }

    #[tokio::test]
    async fn placeholder_email_fails_without_spending_budget() {
        let email = StaticVerifier::new("zerobounce", Ok(Verdict::valid("deliverable")));
        let validator = validator(ValidationConfig::default())
            .with_verifier(CheckKind::Email, metered(email.clone(), "zerobounce"));
        let tracker = tracker(10);
        let record = acme().with_email("test@acmeplumbing.com");

        let (_, result) = validator.validate(record, &perfect_score(), &tracker).await;

        assert_eq!(result.email.status, CheckStatus::Failed);
        assert!(email.calls().is_empty());
        assert_eq!(tracker.calls_for(&SourceId::parse("zerobounce").expect("valid id")), 0);
    }

    #[tokio::test]
    async fn missing_verifiers_are_inconclusive() {
        let validator = validator(ValidationConfig::default());
        let tracker = tracker(10);

        let (_, result) = validator.validate(acme(), &perfect_score(), &tracker).await;

        assert_eq!(result.phone.status, CheckStatus::Passed);
        assert_eq!(result.address.status, CheckStatus::Passed);
        assert_eq!(result.website.status, CheckStatus::Inconclusive);
        assert_eq!(result.email.status, CheckStatus::Inconclusive);
        assert!(result.inconclusive);
        assert!(!result.qualified);
    }

    #[tokio::test]
    async fn exhausted_budget_marks_checks_inconclusive() {
        let website = StaticVerifier::new("site_probe", Ok(Verdict::valid("HTTP 200")));
        let email = StaticVerifier::new("zerobounce", Ok(Verdict::valid("deliverable")));
        let validator = validator(ValidationConfig::default())
            .with_verifier(CheckKind::Website, metered(website.clone(), "site_probe"))
            .with_verifier(CheckKind::Email, metered(email.clone(), "zerobounce"));
        let tracker = tracker(1);

        let (_, result) = validator
            .validate(acme().with_email("owner@acmeplumbing.com"), &perfect_score(), &tracker)
            .await;

        assert_eq!(result.website.status, CheckStatus::Passed);
        assert_eq!(result.email.status, CheckStatus::Inconclusive);
        assert!(result.email.detail.contains("budget exhausted"));
        assert_eq!(website.calls().len(), 1);
        assert!(email.calls().is_empty());
        assert!(!result.qualified);
    }

    #[tokio::test]
    async fn enrichment_fills_only_missing_fields() {
        let enricher: Arc<dyn DetailEnricher> = Arc::new(StaticEnricher(EnrichedDetails {
            phone: Some(String::from("(737) 555-9000")),
            website: Some(String::from("https://acme-plumbing.com")),
            email: Some(String::from("office@acmeplumbing.com")),
            hours: None,
        }));
        let validator = validator(ValidationConfig::default())
            .with_enricher(Metered::new(enricher, policy("details_api")));
        let tracker = tracker(10);

        let (record, _) = validator.validate(acme(), &perfect_score(), &tracker).await;

        assert_eq!(record.phone(), Some("(512) 555-1234"));
        assert_eq!(record.website(), Some("https://acmeplumbing.com"));
        assert_eq!(record.email(), Some("office@acmeplumbing.com"));
        assert_eq!(
            tracker.calls_for(&SourceId::parse("details_api").expect("valid id")),
            1
        );
    }

    #[tokio::test]
    async fn batch_stops_after_target_is_reached() {
        let website = StaticVerifier::new("site_probe", Ok(Verdict::valid("HTTP 200")));
        let email = StaticVerifier::new("zerobounce", Ok(Verdict::valid("deliverable")));
        let config = ValidationConfig {
            max_concurrency: 2,
            ..ValidationConfig::default()
        };
        let validator = validator(config)
            .with_verifier(CheckKind::Website, metered(website, "site_probe"))
            .with_verifier(CheckKind::Email, metered(email, "zerobounce"));
        let tracker = tracker(100);
        let candidates = (0..6)
            .map(|index| {
                let record = BusinessRecord::new(
                    SourceId::google_places(),
                    format!("Acme Plumbing {index}"),
                    "412 Birch Ave, Austin, TX 78745",
                )
                .expect("valid record")
                .with_phone("(512) 555-1234")
                .with_website("https://acmeplumbing.com")
                .with_email("owner@acmeplumbing.com");
                (record, perfect_score())
            })
            .collect::<Vec<_>>();

        let batch = validator.validate_batch(candidates, &tracker, 3).await;

        assert_eq!(batch.validated.len(), 4);
        assert_eq!(batch.not_validated, 2);
        let names = batch
            .validated
            .iter()
            .map(|validated| validated.record.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "Acme Plumbing 0",
                "Acme Plumbing 1",
                "Acme Plumbing 2",
                "Acme Plumbing 3"
            ]
        );
    }
}
