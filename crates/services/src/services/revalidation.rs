//! Shared-secret revalidation: verifying incoming requests and pushing
//! revalidation to the public front end.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

pub const TOKEN_HEADER: &str = "x-revalidate-token";

#[derive(Debug, Clone, Error)]
pub enum RevalidationError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("front end rejected the revalidation token")]
    Unauthorized,
    #[error("front-end revalidation is not configured")]
    NotConfigured,
}

impl RevalidationError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status) || *status == 429,
            _ => false,
        }
    }
}

/// Secret shared with the front end. An empty secret never verifies.
#[derive(Clone)]
pub struct RevalidationToken {
    secret: String,
}

impl std::fmt::Debug for RevalidationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevalidationToken")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl RevalidationToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn verify(&self, presented: &str) -> bool {
        self.is_configured() && bool::from(self.secret.as_bytes().ct_eq(presented.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.secret
    }
}

/// Body of a revalidation request, in either direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct RevalidateRequest {
    /// Path prefix to refresh; everything when absent.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct RevalidateOutcome {
    pub path: Option<String>,
    pub invalidated: usize,
    pub frontend_notified: bool,
}

#[derive(Debug, Clone)]
pub struct RevalidationClient {
    http: Client,
    url: String,
    token: RevalidationToken,
    retry: ExponentialBuilder,
}

impl RevalidationClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(url: impl Into<String>, token: RevalidationToken) -> Result<Self, RevalidationError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("lexsite/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RevalidationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            token,
            retry: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(10))
                .with_max_times(3)
                .with_jitter(),
        })
    }

    pub fn with_retry(mut self, retry: ExponentialBuilder) -> Self {
        self.retry = retry;
        self
    }

    pub async fn revalidate(&self, path: Option<&str>) -> Result<(), RevalidationError> {
        let body = RevalidateRequest {
            path: path.map(str::to_string),
        };
        (|| async { self.send(&body).await })
            .retry(self.retry)
            .when(|e: &RevalidationError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Front-end revalidation failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;
        info!(url = %self.url, path = ?path, "Front end revalidated");
        Ok(())
    }

    async fn send(&self, body: &RevalidateRequest) -> Result<(), RevalidationError> {
        let res = self
            .http
            .post(&self.url)
            .header(TOKEN_HEADER, self.token.as_str())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RevalidationError::Unauthorized),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(RevalidationError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RevalidationError {
    if e.is_timeout() {
        RevalidationError::Timeout
    } else {
        RevalidationError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Answers every connection with the next canned status line.
    async fn serve(statuses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/revalidate", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            for status in statuses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(reply.as_bytes()).await;
            }
        });
        (url, hits)
    }

    fn fast_retry() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_max_times(3)
    }

    #[test]
    fn token_verification() {
        let token = RevalidationToken::new("s3cret");
        assert!(token.verify("s3cret"));
        assert!(!token.verify("s3cre"));
        assert!(!token.verify("S3CRET"));
        assert!(!RevalidationToken::new("").verify(""));
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", RevalidationToken::new("s3cret"));
        assert!(!rendered.contains("s3cret"));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let (url, hits) = serve(vec!["503 Service Unavailable", "200 OK"]).await;
        let client = RevalidationClient::new(url, RevalidationToken::new("t"))
            .unwrap()
            .with_retry(fast_retry());
        client.revalidate(Some("/news")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let (url, hits) = serve(vec!["401 Unauthorized", "200 OK"]).await;
        let client = RevalidationClient::new(url, RevalidationToken::new("wrong"))
            .unwrap()
            .with_retry(fast_retry());
        let err = client.revalidate(None).await.unwrap_err();
        assert!(matches!(err, RevalidationError::Unauthorized));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
