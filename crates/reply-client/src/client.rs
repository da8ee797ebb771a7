use {
    async_trait::async_trait,
    chatrelay_config::BackendConfig,
    chatrelay_sessions::Turn,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, trace, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, histogram, labels, reply_client as rc_metrics};

use crate::error::{Error, Result};

/// Produces reply text for a conversation.
///
/// This is the seam the router depends on; [`HttpReplyClient`] is the
/// production implementation.
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Generate a reply for the full `turns` history on behalf of `user_id`.
    async fn generate(&self, turns: &[Turn], user_id: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    messages: &'a [Turn],
    #[serde(rename = "userId")]
    user_id: &'a str,
}

/// Reply backend reached over HTTP POST.
pub struct HttpReplyClient {
    client: reqwest::Client,
    url: Option<String>,
    api_key: Option<Secret<String>>,
}

impl HttpReplyClient {
    /// Build a client from config. A missing URL is not an error here; every
    /// `generate` call then fails with [`Error::ConfigurationMissing`].
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            client,
            url: config.url().map(str::to_string),
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.expose_secret().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn request(&self, url: &str, turns: &[Turn], user_id: &str) -> Result<String> {
        let body = ReplyRequest {
            messages: turns,
            user_id,
        };

        debug!(url, turns = turns.len(), "sending reply backend request");

        let mut req = self.client.post(url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let resp = req.send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if !status.is_success() {
            // The body is only for the log; a failed read must not mask the status.
            let body_text = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "reply backend error");
            return Err(Error::Status {
                code: status.as_u16(),
            });
        }

        let body_text = resp.text().await.map_err(Error::Transport)?;
        trace!(body = %body_text, "reply backend raw response");
        parse_response(&body_text)
    }
}

/// Pull the `response` text out of a backend body.
fn parse_response(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(Error::MalformedResponse)?;
    match value.get("response") {
        Some(serde_json::Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(Error::unexpected_shape(format!(
            "`response` is not a string: {other}"
        ))),
        None => Err(Error::unexpected_shape("missing `response` field")),
    }
}

#[async_trait]
impl ReplyBackend for HttpReplyClient {
    async fn generate(&self, turns: &[Turn], user_id: &str) -> Result<String> {
        let Some(url) = self.url.as_deref() else {
            warn!("reply backend url is not configured");
            return Err(Error::ConfigurationMissing);
        };

        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(rc_metrics::REQUESTS_TOTAL).increment(1);

        let result = self.request(url, turns, user_id).await;

        #[cfg(feature = "metrics")]
        histogram!(rc_metrics::REQUEST_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(kind = e.kind(), error = %e, "reply backend call failed");
            #[cfg(feature = "metrics")]
            counter!(rc_metrics::ERRORS_TOTAL, labels::KIND => e.kind()).increment(1);
        }
        result
    }
}
