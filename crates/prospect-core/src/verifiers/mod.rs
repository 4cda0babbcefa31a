//! Bundled verifier implementations.

pub mod recorded;
pub mod website;

pub use recorded::{RecordedVerdict, RecordedVerifier};
pub use website::HttpWebsiteVerifier;
