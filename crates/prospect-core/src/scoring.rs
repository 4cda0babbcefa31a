//! Pre-validation scoring.
//!
//! A cheap, deterministic heuristic that runs before any paid verification.
//! Every field is scored independently in `0..=100`; the aggregate is the
//! weighted sum. Veto rules zero their field and disqualify the record, so a
//! vetoed record never reaches the validator regardless of its aggregate.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::rules::{RuleMatch, RuleTable, RuleTarget};
use crate::source_policy::SourcePolicies;
use crate::{BusinessRecord, ValidationError};

static STREET_NUMBER: LazyLock<Regex> = LazyLock::new(|| built_in(r"^\s*\d+"));
static CITY_SEGMENT: LazyLock<Regex> = LazyLock::new(|| built_in(r",\s*[A-Za-z][A-Za-z .'-]*"));
static STATE_POSTAL: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"\b[A-Z]{2}\s*\d{5}(-\d{4})?\b"));

const MIN_ADDRESS_LEN: usize = 10;

/// Field weights in percent. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub name: u32,
    pub address: u32,
    pub phone: u32,
    pub website: u32,
    pub source: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            name: 25,
            address: 25,
            phone: 20,
            website: 15,
            source: 15,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let sum = self.name + self.address + self.phone + self.website + self.source;
        if sum != 100 {
            return Err(ValidationError::WeightsNotNormalized {
                field: "scoring.weights",
                sum,
            });
        }
        Ok(())
    }
}

/// Scoring section of the pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum aggregate for a record to proceed to validation.
    pub threshold: u32,
    pub weights: ScoreWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 70,
            weights: ScoreWeights::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.threshold > 100 {
            return Err(ValidationError::ThresholdOutOfRange {
                field: "scoring.threshold",
                value: self.threshold,
            });
        }
        self.weights.validate()
    }
}

/// Per-field breakdown and aggregate of the pre-validation score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub name: u8,
    pub address: u8,
    pub phone: u8,
    pub website: u8,
    pub source: u8,
    pub score: u8,
    pub disqualified: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vetoes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub penalties: Vec<String>,
}

/// Pure, deterministic scorer over a rule table and trust table.
#[derive(Debug, Clone)]
pub struct PreValidationScorer {
    config: ScoringConfig,
    rules: Arc<RuleTable>,
    policies: SourcePolicies,
}

impl Default for PreValidationScorer {
    fn default() -> Self {
        Self::new(
            ScoringConfig::default(),
            Arc::new(RuleTable::builtin()),
            SourcePolicies::default(),
        )
    }
}

impl PreValidationScorer {
    pub fn new(config: ScoringConfig, rules: Arc<RuleTable>, policies: SourcePolicies) -> Self {
        Self {
            config,
            rules,
            policies,
        }
    }

    pub const fn threshold(&self) -> u32 {
        self.config.threshold
    }

    pub fn score(&self, record: &BusinessRecord) -> ScoreResult {
        let mut vetoes = Vec::new();
        let mut penalties = Vec::new();

        let name = apply_rules(
            base_name_score(record.name()),
            self.rules.evaluate(RuleTarget::Name, record.name().trim()),
            &mut vetoes,
            &mut penalties,
        );
        let address = apply_rules(
            base_address_score(record.address()),
            self.rules.evaluate(RuleTarget::Address, record.address().trim()),
            &mut vetoes,
            &mut penalties,
        );
        let phone = match record.phone() {
            Some(phone) => {
                let digits = phone_digits(phone);
                if digits.len() == 10 {
                    apply_rules(
                        100,
                        self.rules.evaluate(RuleTarget::Phone, &digits),
                        &mut vetoes,
                        &mut penalties,
                    )
                } else {
                    20
                }
            }
            None => 0,
        };
        let website = match record.website() {
            Some(website) => apply_rules(
                base_website_score(website),
                self.rules.evaluate(RuleTarget::Website, &website_host(website)),
                &mut vetoes,
                &mut penalties,
            ),
            None => 50,
        };
        let source = record
            .sources()
            .iter()
            .map(|source| self.policies.trust_for(source).min(100))
            .max()
            .unwrap_or(crate::source_policy::UNKNOWN_SOURCE_TRUST);

        let score = aggregate(&self.config.weights, [name, address, phone, website, source]);

        ScoreResult {
            name,
            address,
            phone,
            website,
            source,
            score,
            disqualified: !vetoes.is_empty(),
            vetoes,
            penalties,
        }
    }

    /// Whether a scored record may proceed to quality validation.
    pub fn passes(&self, result: &ScoreResult) -> bool {
        !result.disqualified && u32::from(result.score) >= self.config.threshold
    }
}

/// Vetoes force zero; penalties subtract points but never below 1.
fn apply_rules(
    base: u8,
    matched: RuleMatch,
    vetoes: &mut Vec<String>,
    penalties: &mut Vec<String>,
) -> u8 {
    if matched.vetoed() {
        vetoes.extend(matched.vetoes);
        return 0;
    }
    if base == 0 || matched.penalty == 0 {
        return base;
    }

    penalties.extend(matched.penalties);
    u32::from(base).saturating_sub(matched.penalty).max(1) as u8
}

/// Weighted sum of `[name, address, phone, website, source]`, rounded half up.
fn aggregate(weights: &ScoreWeights, subscores: [u8; 5]) -> u8 {
    let weights = [
        weights.name,
        weights.address,
        weights.phone,
        weights.website,
        weights.source,
    ];
    let weighted: u32 = subscores
        .iter()
        .zip(weights)
        .map(|(subscore, weight)| u32::from(*subscore) * weight)
        .sum();
    ((weighted + 50) / 100).min(100) as u8
}

/// Strips everything but ASCII digits.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Lowercased host of a website, or the lowercased raw value when it does not
/// parse even with an `http://` prefix.
pub fn website_host(website: &str) -> String {
    let trimmed = website.trim();
    Url::parse(trimmed)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| Url::parse(&format!("http://{trimmed}")).ok())
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| trimmed.to_ascii_lowercase())
}

fn base_name_score(name: &str) -> u8 {
    let trimmed = name.trim();
    if trimmed.chars().filter(|ch| !ch.is_whitespace()).count() < 2 {
        return 0;
    }
    match trimmed.chars().count() {
        0..=3 => 40,
        4..=7 => 60,
        8..=11 => 80,
        _ => 100,
    }
}

fn base_address_score(address: &str) -> u8 {
    let trimmed = address.trim();
    if trimmed.chars().count() < MIN_ADDRESS_LEN {
        return 0;
    }

    let mut score = 40u8;
    if STREET_NUMBER.is_match(trimmed) {
        score += 20;
    }
    if CITY_SEGMENT.is_match(trimmed) {
        score += 20;
    }
    if STATE_POSTAL.is_match(trimmed) {
        score += 20;
    }
    score.min(100)
}

fn base_website_score(website: &str) -> u8 {
    let Ok(url) = Url::parse(website.trim()) else {
        return 30;
    };
    let dotted_host = url
        .host_str()
        .is_some_and(|host| host.contains('.') && !host.starts_with('.') && !host.ends_with('.'));
    if matches!(url.scheme(), "http" | "https") && dotted_host {
        100
    } else {
        30
    }
}

pub(crate) fn built_in(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in patterns must compile")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceId;

    #[test]
    fn address_patterns_compile() {
        for pattern in [&STREET_NUMBER, &CITY_SEGMENT, &STATE_POSTAL] {
            LazyLock::force(pattern);
        }
        assert!(STATE_POSTAL.is_match("Austin, TX 78745"));
    }

    fn scorer() -> PreValidationScorer {
        PreValidationScorer::default()
    }

    fn acme() -> BusinessRecord {
        BusinessRecord::new(
            SourceId::google_places(),
            "Acme Plumbing Co",
            "412 Birch Ave, Austin, TX 78745",
        )
        .expect("valid record")
        .with_phone("5125551234")
        .with_website("https://acmeplumbing.com")
    }

    #[test]
    fn acme_plumbing_scores_perfectly() {
        let result = scorer().score(&acme());

        assert_eq!(
            (result.name, result.address, result.phone, result.website, result.source),
            (100, 100, 100, 100, 100)
        );
        assert_eq!(result.score, 100);
        assert!(!result.disqualified);
        assert!(scorer().passes(&result));
    }

    #[test]
    fn name_tiers_reward_specificity() {
        assert_eq!(base_name_score("A"), 0);
        assert_eq!(base_name_score("A B"), 40);
        assert_eq!(base_name_score("Acme"), 60);
        assert_eq!(base_name_score("Acme Inc"), 80);
        assert_eq!(base_name_score("Acme Plumbing"), 100);
    }

    #[test]
    fn template_name_is_vetoed_despite_perfect_fields() {
        let record = BusinessRecord::new(
            SourceId::google_places(),
            "Test Business 1",
            "412 Birch Ave, Austin, TX 78745",
        )
        .expect("valid record")
        .with_phone("5125551234")
        .with_website("https://acmeplumbing.com");

        let result = scorer().score(&record);

        assert_eq!(result.name, 0);
        assert_eq!(result.address, 100);
        assert!(result.disqualified);
        assert_eq!(result.vetoes, vec![String::from("name.template_prefix")]);
        assert!(!scorer().passes(&result));
    }

    #[test]
    fn sequential_main_street_is_disqualified() {
        let record = BusinessRecord::new(
            SourceId::google_places(),
            "Acme Plumbing Co",
            "100 Main St, Austin, TX 78701",
        )
        .expect("valid record")
        .with_phone("5125551234")
        .with_website("https://acmeplumbing.com");

        let result = scorer().score(&record);

        assert_eq!(result.address, 0);
        assert!(result.disqualified);
        assert_eq!(result.score, 75);
        assert!(!scorer().passes(&result));
    }

    #[test]
    fn address_components_add_bonuses() {
        assert_eq!(base_address_score("short"), 0);
        assert_eq!(base_address_score("Birch Avenue"), 40);
        assert_eq!(base_address_score("412 Birch Avenue"), 60);
        assert_eq!(base_address_score("412 Birch Ave, Austin"), 80);
        assert_eq!(base_address_score("412 Birch Ave, Austin, TX 78745"), 100);
    }

    #[test]
    fn phone_scoring() {
        let scorer = scorer();
        let base = BusinessRecord::new(SourceId::google_places(), "Acme Plumbing Co", "")
            .expect("valid record");

        assert_eq!(scorer.score(&base).phone, 0);
        assert_eq!(scorer.score(&base.clone().with_phone("555-0100")).phone, 20);
        assert_eq!(scorer.score(&base.clone().with_phone("(555) 123-4567")).phone, 0);
        assert_eq!(scorer.score(&base.with_phone("(512) 555-1234")).phone, 100);
    }

    #[test]
    fn website_scoring() {
        let scorer = scorer();
        let base = BusinessRecord::new(SourceId::google_places(), "Acme Plumbing Co", "")
            .expect("valid record");

        assert_eq!(scorer.score(&base).website, 50);
        assert_eq!(
            scorer
                .score(&base.clone().with_website("https://www.example.com"))
                .website,
            0
        );
        assert_eq!(
            scorer.score(&base.clone().with_website("example.com")).website,
            0
        );
        assert_eq!(
            scorer.score(&base.clone().with_website("acmeplumbing")).website,
            30
        );
        assert_eq!(
            scorer.score(&base.with_website("https://acme.wixsite.com")).website,
            60
        );
    }

    #[test]
    fn source_uses_most_trusted_provenance() {
        let mut record = BusinessRecord::new(
            SourceId::parse(SourceId::DIRECTORY).expect("valid source"),
            "Acme Plumbing Co",
            "",
        )
        .expect("valid record");
        assert_eq!(scorer().score(&record).source, 40);

        record.add_source(SourceId::foursquare());
        assert_eq!(scorer().score(&record).source, 90);

        let unknown = BusinessRecord::new(
            SourceId::parse("chamber_listing").expect("valid source"),
            "Acme Plumbing Co",
            "",
        )
        .expect("valid record");
        assert_eq!(scorer().score(&unknown).source, 50);
    }

    #[test]
    fn aggregate_stays_in_range_and_is_monotone() {
        let weights = ScoreWeights::default();
        let fixed = [[0u8; 5], [37, 100, 20, 50, 90], [100; 5]];

        for base in fixed {
            for field in 0..5 {
                let mut previous = 0;
                for value in 0..=100u8 {
                    let mut subscores = base;
                    subscores[field] = value;
                    let score = aggregate(&weights, subscores);
                    assert!(score <= 100);
                    assert!(score >= previous, "field {field} at {value} lowered the aggregate");
                    previous = score;
                }
            }
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = scorer();
        assert_eq!(scorer.score(&acme()), scorer.score(&acme()));
    }

    #[test]
    fn rejects_unnormalized_weights() {
        let config = ScoringConfig {
            threshold: 70,
            weights: ScoreWeights {
                name: 30,
                ..ScoreWeights::default()
            },
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::WeightsNotNormalized {
                field: "scoring.weights",
                sum: 105,
            })
        );
    }
}
