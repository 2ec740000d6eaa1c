//! Blackbox SDK - client for the blackbox creative-work submission service
//!
//! General usage:
//! 1. Call [`create`] or [`info`] with your ID. The returned [`Session`]
//!    carries the session ID and every session on the account.
//! 2. Upload assets with [`BlackboxClient::upload`] (or `upload_reader`,
//!    which drains a finite reader first). Max 10MB per upload and please
//!    stay under 500MB per account; host anything larger elsewhere and
//!    upload a link instead.
//! 3. Call [`BlackboxClient::finalize`] to submit the work for approval.
//!
//! Use [`Session::dev`] while integrating: with `dev_mode` set nothing is
//! stored and nothing is charged.

pub mod attach;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use attach::{Attached, TeeReader, UploadHandle};
pub use client::BlackboxClient;
pub use config::ClientConfig;
pub use error::{BlackboxError, Result};
pub use types::{Envelope, Session, DEV_SESSION_ID, DEV_USER_ID};

use tokio::io::AsyncRead;

/// Client configured from the environment (see [`ClientConfig::from_env`])
pub fn default_client() -> Result<BlackboxClient> {
    BlackboxClient::with_config(ClientConfig::from_env()?)
}

/// Look up the sessions of `user_id` with the default client
pub async fn info(user_id: &str) -> Result<Session> {
    default_client()?.info(user_id).await
}

/// Create a session for `user_id` with the default client
pub async fn create(user_id: &str) -> Result<Session> {
    default_client()?.create(user_id).await
}

/// Attach `reader` to the first session of `user_id` without holding a
/// session yourself. Any failure hands the reader back untouched.
pub async fn attach<R>(reader: R, user_id: &str) -> Attached<R>
where
    R: AsyncRead + Unpin,
{
    match default_client() {
        Ok(client) => client.attach_first(reader, user_id).await,
        Err(e) => {
            tracing::debug!(error = %e, "no client for attach, passing reader through");
            attach::Attached::passthrough(reader)
        }
    }
}
