//! Core blackbox API client

use crate::config::ClientConfig;
use crate::error::{BlackboxError, Result};
use crate::types::{Action, Envelope, Session, MAX_UPLOAD_BYTES};
use reqwest::{multipart, Client as HttpClient, Response};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Multipart field (and file name) the upload endpoint reads
pub const UPLOAD_FIELD: &str = "file";

/// Client for the blackbox submission service
#[derive(Clone)]
pub struct BlackboxClient {
    http: Arc<HttpClient>,
    base_url: String,
}

impl BlackboxClient {
    /// Create a client against `base_url`, or the public service when `None`
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::default();
        if let Some(url) = base_url {
            config.base_url = url.to_string();
        }
        Self::with_config(config)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| BlackboxError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http: Arc::new(http),
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up the sessions tied to `user_id`. No side effects.
    pub async fn info(&self, user_id: &str) -> Result<Session> {
        let envelope = self.fetch(&lookup_query(Action::Info, user_id)).await?;
        Ok(Session::from_envelope(user_id, envelope))
    }

    /// Allocate a new session for `user_id`
    pub async fn create(&self, user_id: &str) -> Result<Session> {
        let envelope = self.fetch(&lookup_query(Action::Create, user_id)).await?;
        Ok(Session::from_envelope(user_id, envelope))
    }

    /// Submit the session for review, offering `payment` for the work.
    /// Not idempotent: calling it twice submits twice.
    pub async fn finalize(&self, session: &Session, payment: i64) -> Result<()> {
        self.fetch(&finalize_query(session, payment)).await?;
        Ok(())
    }

    /// Upload one file into the session.
    /// Payloads above [`MAX_UPLOAD_BYTES`] are sent anyway and left for the service to reject.
    pub async fn upload(&self, session: &Session, data: Vec<u8>) -> Result<()> {
        if data.len() > MAX_UPLOAD_BYTES {
            tracing::warn!(
                size = data.len(),
                limit = MAX_UPLOAD_BYTES,
                "upload exceeds the service limit, expect rejection"
            );
        }
        tracing::debug!(
            user = %session.user_id,
            session = %session.session_id,
            dev = session.dev_mode,
            size = data.len(),
            "uploading"
        );

        let form = multipart::Form::new().part(
            UPLOAD_FIELD,
            multipart::Part::bytes(data).file_name(UPLOAD_FIELD),
        );

        let response = self
            .http
            .post(&self.base_url)
            .query(&upload_query(session))
            .multipart(form)
            .send()
            .await?;

        decode(response).await.map(|_| ())
    }

    /// Drain `reader` to EOF and upload the result.
    /// The reader must terminate; a live stream never will.
    pub async fn upload_reader<R>(&self, session: &Session, mut reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.upload(session, data).await
    }

    async fn fetch(&self, query: &[(&'static str, String)]) -> Result<Envelope> {
        tracing::debug!(?query, "blackbox request");

        let response = self.http.get(&self.base_url).query(query).send().await?;
        decode(response).await
    }
}

/// Batch operations
impl BlackboxClient {
    /// Upload several files into one session concurrently.
    /// Results come back in input order.
    pub async fn upload_batch(&self, session: &Session, files: Vec<Vec<u8>>) -> Vec<Result<()>> {
        use futures::future::join_all;

        let futures = files
            .into_iter()
            .map(|data| async move { self.upload(session, data).await });

        join_all(futures).await
    }
}

async fn decode(response: Response) -> Result<Envelope> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(BlackboxError::Status { status, message });
    }

    let raw = response.bytes().await?;
    let envelope: Envelope = serde_json::from_slice(&raw)?;

    if !envelope.success {
        return Err(BlackboxError::Remote(envelope.error));
    }

    Ok(envelope)
}

fn lookup_query(action: Action, user_id: &str) -> Vec<(&'static str, String)> {
    vec![("id", user_id.to_string()), ("action", action.as_str().to_string())]
}

fn finalize_query(session: &Session, payment: i64) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("action", Action::Finalize.as_str().to_string()),
        ("pay", payment.to_string()),
        ("id", session.user_id.clone()),
        ("session", session.session_id.clone()),
    ];
    if session.dev_mode {
        query.push(("dev", "true".to_string()));
    }
    query
}

fn upload_query(session: &Session) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("session", session.session_id.clone()),
        ("id", session.user_id.clone()),
    ];
    if session.dev_mode {
        query.push(("dev", "true".to_string()));
    }
    query
}
