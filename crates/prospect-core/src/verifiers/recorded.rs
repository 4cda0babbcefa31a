use serde::{Deserialize, Serialize};

use crate::data_source::{
    CheckKind, SourceError, SourceFuture, Verdict, VerificationSubject, Verifier,
};
use crate::SourceId;

/// A verdict captured from an earlier verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedVerdict {
    pub check: CheckKind,
    /// Phone digits, URL, mailbox, domain or address, as handed to the verifier.
    pub subject: String,
    pub valid: bool,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

impl RecordedVerdict {
    fn matches(&self, subject: &VerificationSubject) -> bool {
        self.check == subject.check() && self.subject.trim().eq_ignore_ascii_case(subject.value())
    }

    fn verdict(&self) -> Verdict {
        let verdict = if self.valid {
            Verdict::valid(self.detail.as_str())
        } else {
            Verdict::invalid(self.detail.as_str())
        };
        match &self.resolved {
            Some(resolved) => verdict.with_resolved(resolved.as_str()),
            None => verdict,
        }
    }
}

/// Verifier replaying recorded verdicts.
///
/// Subjects without a recorded verdict are unavailable, never invalid, so an
/// incomplete recording leaves checks inconclusive.
#[derive(Debug, Clone)]
pub struct RecordedVerifier {
    id: SourceId,
    verdicts: Vec<RecordedVerdict>,
}

impl RecordedVerifier {
    pub fn new(verdicts: Vec<RecordedVerdict>) -> Self {
        Self {
            id: SourceId::recorded(),
            verdicts,
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

impl Verifier for RecordedVerifier {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn verify<'a>(&'a self, subject: VerificationSubject) -> SourceFuture<'a, Verdict> {
        let recorded = self
            .verdicts
            .iter()
            .find(|verdict| verdict.matches(&subject))
            .map(RecordedVerdict::verdict);
        Box::pin(async move {
            recorded.ok_or_else(|| {
                SourceError::unavailable(format!(
                    "no recorded {} verdict for '{}'",
                    subject.check(),
                    subject.value()
                ))
            })
        })
    }
}
