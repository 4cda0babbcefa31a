use std::sync::Arc;
use std::time::Duration;

use crate::data_source::{SourceError, SourceFuture, Verdict, VerificationSubject, Verifier};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::SourceId;

const METHOD_NOT_ALLOWED: u16 = 405;

/// Website reachability probe.
///
/// Issues exactly one `HEAD` request per check, matching the one call the
/// validator reserves for it, and treats any 2xx or 3xx status as reachable.
/// A server that refuses `HEAD` with 405 answered but proved nothing about the
/// page, so it is reported as unavailable like a transport failure: the check
/// ends inconclusive rather than failed.
#[derive(Clone)]
pub struct HttpWebsiteVerifier {
    id: SourceId,
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl HttpWebsiteVerifier {
    pub fn new() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            id: SourceId::website_probe(),
            http_client,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn probe(&self, url: &str) -> Result<Verdict, SourceError> {
        let head = HttpRequest::head(url).with_timeout(self.timeout);
        let response = self.http_client.execute(head).await.map_err(|error| {
            SourceError::unavailable(format!("website probe failed for {url}: {error}"))
        })?;

        if response.status == METHOD_NOT_ALLOWED {
            return Err(SourceError::unavailable(format!(
                "{url} refuses HEAD (HTTP {METHOD_NOT_ALLOWED})"
            )));
        }

        if response.is_reachable() {
            Ok(Verdict::valid(format!("reachable (HTTP {})", response.status)))
        } else {
            Ok(Verdict::invalid(format!("unreachable (HTTP {})", response.status)))
        }
    }
}

impl Default for HttpWebsiteVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpWebsiteVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWebsiteVerifier")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Verifier for HttpWebsiteVerifier {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn verify<'a>(&'a self, subject: VerificationSubject) -> SourceFuture<'a, Verdict> {
        Box::pin(async move {
            match subject {
                VerificationSubject::Website(url) => self.probe(&url).await,
                other => Err(SourceError::invalid_request(format!(
                    "website probe cannot verify a {} subject",
                    other.check()
                ))),
            }
        })
    }
}
