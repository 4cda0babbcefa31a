//! Data-driven disqualifying patterns.
//!
//! A [`Rule`] pairs a target field with a regular expression and an action.
//! `Veto` forces the field's subscore to zero and marks the record
//! disqualified; `Penalty` subtracts points. The built-in table covers known
//! placeholder names, template addresses, reserved phone ranges and
//! placeholder domains; configuration can append more rules.
//!
//! Rules see a normalized value per target:
//!
//! | Target | Value matched |
//! |--------|---------------|
//! | `name` | trimmed name |
//! | `address` | trimmed address |
//! | `phone` | digits only |
//! | `website` | lowercased host (or the raw value if it does not parse) |
//! | `email` | trimmed, lowercased address |

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Field a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    Name,
    Address,
    Phone,
    Website,
    Email,
}

impl RuleTarget {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Email => "email",
        }
    }
}

impl Display for RuleTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleTarget {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "address" => Ok(Self::Address),
            "phone" => Ok(Self::Phone),
            "website" => Ok(Self::Website),
            "email" => Ok(Self::Email),
            other => Err(ValidationError::InvalidRuleTarget {
                value: other.to_owned(),
            }),
        }
    }
}

/// What happens to the field subscore on a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    Veto,
    Penalty { points: u8 },
}

/// Serializable form of a rule, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub label: String,
    pub target: RuleTarget,
    pub pattern: String,
    #[serde(flatten)]
    pub action: RuleAction,
}

/// Compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    label: String,
    target: RuleTarget,
    pattern: Regex,
    action: RuleAction,
}

impl Rule {
    pub fn new(
        label: impl Into<String>,
        target: RuleTarget,
        pattern: &str,
        action: RuleAction,
    ) -> Result<Self, ValidationError> {
        let label = label.into();
        let pattern = Regex::new(pattern).map_err(|error| ValidationError::InvalidRulePattern {
            label: label.clone(),
            reason: error.to_string(),
        })?;

        Ok(Self {
            label,
            target,
            pattern,
            action,
        })
    }

    pub fn from_spec(spec: &RuleSpec) -> Result<Self, ValidationError> {
        Self::new(spec.label.clone(), spec.target, &spec.pattern, spec.action)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn target(&self) -> RuleTarget {
        self.target
    }

    pub const fn action(&self) -> RuleAction {
        self.action
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            label: self.label.clone(),
            target: self.target,
            pattern: self.pattern.as_str().to_owned(),
            action: self.action,
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }
}

/// Result of evaluating one field against the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMatch {
    pub vetoes: Vec<String>,
    pub penalty: u32,
    pub penalties: Vec<String>,
}

impl RuleMatch {
    pub fn vetoed(&self) -> bool {
        !self.vetoes.is_empty()
    }
}

/// Ordered collection of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

const BUILTIN_RULES: &[(&str, RuleTarget, &str, RuleAction)] = &[
    (
        "name.placeholder_company",
        RuleTarget::Name,
        r"(?i)^(business|company)\s+(llc|inc|corp|corporation|\d+)$",
        RuleAction::Veto,
    ),
    (
        "name.template_prefix",
        RuleTarget::Name,
        r"(?i)^(test|sample|generic|demo|fake|placeholder)\b",
        RuleAction::Veto,
    ),
    (
        "name.known_fake",
        RuleTarget::Name,
        r"(?i)^(artisan\s+bistro|downtown\s+caf[eé]|gourmet\s+restaurant)$",
        RuleAction::Veto,
    ),
    (
        "name.lorem_ipsum",
        RuleTarget::Name,
        r"(?i)lorem\s+ipsum",
        RuleAction::Veto,
    ),
    (
        "address.sequential_main_street",
        RuleTarget::Address,
        r"(?i)^\s*\d+\s+main\s+st(reet)?\b",
        RuleAction::Veto,
    ),
    (
        "address.po_box",
        RuleTarget::Address,
        r"(?i)\bp\.?\s*o\.?\s*box\b",
        RuleAction::Veto,
    ),
    (
        "address.virtual_office",
        RuleTarget::Address,
        r"(?i)virtual\s+office",
        RuleAction::Veto,
    ),
    (
        "address.fake_street",
        RuleTarget::Address,
        r"(?i)\b\d+\s+fake\s+st(reet)?\b",
        RuleAction::Veto,
    ),
    (
        "phone.reserved_area_code",
        RuleTarget::Phone,
        r"^(000|111|555|911|999)",
        RuleAction::Veto,
    ),
    (
        "phone.repeated_digit",
        RuleTarget::Phone,
        r"^(0{10}|1{10}|2{10}|3{10}|4{10}|5{10}|6{10}|7{10}|8{10}|9{10})$",
        RuleAction::Veto,
    ),
    (
        "phone.sequential",
        RuleTarget::Phone,
        r"^(1234567890|0123456789|9876543210)$",
        RuleAction::Veto,
    ),
    (
        "phone.fictional_exchange",
        RuleTarget::Phone,
        r"^\d{3}55501\d{2}$",
        RuleAction::Veto,
    ),
    (
        "website.placeholder_domain",
        RuleTarget::Website,
        r"(?i)(^|\.)(example\.(com|org|net)|test\.com|demo\.com|sample\.com|fake\.com|placeholder\.com|tempsite\.com|artisanbistro\.com|downtowncaf\.net|gourmetrestaurant\.org)$",
        RuleAction::Veto,
    ),
    (
        "website.free_host",
        RuleTarget::Website,
        r"(?i)(^|\.)(wixsite\.com|weebly\.com|blogspot\.com|wordpress\.com)$",
        RuleAction::Penalty { points: 40 },
    ),
    (
        "email.placeholder_domain",
        RuleTarget::Email,
        r"(?i)@(example\.(com|org|net)|test\.com|demo\.com|fake\.com|placeholder\.com)$",
        RuleAction::Veto,
    ),
    (
        "email.placeholder_mailbox",
        RuleTarget::Email,
        r"(?i)^(test|demo|fake|noreply|no-reply)@",
        RuleAction::Veto,
    ),
];

impl RuleTable {
    /// Built-in disqualifiers.
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(label, target, pattern, action)| {
                Rule::new(*label, *target, pattern, *action)
                    .expect("built-in rule patterns must compile")
            })
            .collect();
        Self { rules }
    }

    /// Built-in rules followed by configured ones.
    pub fn with_configured(specs: &[RuleSpec]) -> Result<Self, ValidationError> {
        let mut table = Self::builtin();
        table.extend_from_specs(specs)?;
        Ok(table)
    }

    pub fn extend_from_specs(&mut self, specs: &[RuleSpec]) -> Result<(), ValidationError> {
        let compiled = specs
            .iter()
            .map(Rule::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        self.rules.extend(compiled);
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule for `target` against an already normalized value.
    pub fn evaluate(&self, target: RuleTarget, value: &str) -> RuleMatch {
        let mut result = RuleMatch::default();
        for rule in self.rules.iter().filter(|rule| rule.target == target) {
            if !rule.matches(value) {
                continue;
            }
            match rule.action {
                RuleAction::Veto => result.vetoes.push(rule.label.clone()),
                RuleAction::Penalty { points } => {
                    result.penalty += u32::from(points);
                    result.penalties.push(rule.label.clone());
                }
            }
        }
        result
    }
}
