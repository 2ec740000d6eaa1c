use serde::{Deserialize, Serialize};

/// Identifier the service accepts without persisting anything
pub const DEV_USER_ID: &str = "ZeroCool";
/// Session paired with [`DEV_USER_ID`]
pub const DEV_SESSION_ID: &str = "000-000-000";

/// Largest payload the service accepts per upload call. Not enforced client-side.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Total storage a single account may use. Not enforced client-side.
pub const ACCOUNT_QUOTA_BYTES: u64 = 500 * 1024 * 1024;

/// A unit of work on the service: files are uploaded into it, then it is finalized
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Personal identifier issued by the service
    pub user_id: String,
    /// The project currently targeted by uploads and finalize
    pub session_id: String,
    /// Uploads are discarded and finalize neither creates nor charges a work.
    /// Keep this on until the integration is known to work.
    pub dev_mode: bool,
    /// Every session tied to the account, as last reported by the service
    #[serde(default)]
    pub known_sessions: Vec<String>,
}

impl Session {
    /// Development credentials. Every call made with this value is side-effect free.
    pub fn dev() -> Self {
        Self {
            user_id: DEV_USER_ID.to_string(),
            session_id: DEV_SESSION_ID.to_string(),
            dev_mode: true,
            known_sessions: vec![DEV_SESSION_ID.to_string()],
        }
    }

    /// Build a session from a successful envelope.
    /// `requested_id` is used only when the service leaves `ID` empty.
    pub(crate) fn from_envelope(requested_id: &str, envelope: Envelope) -> Self {
        let user_id = if envelope.user_id.is_empty() {
            requested_id.to_string()
        } else {
            envelope.user_id
        };
        let dev_mode = user_id == DEV_USER_ID;

        Self {
            user_id,
            session_id: envelope.session_id,
            dev_mode,
            known_sessions: envelope.sessions,
        }
    }

    /// Point uploads and finalize at another session of the same user.
    /// The service decides whether the id is valid.
    pub fn switch_to(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
    }

    /// Switch to the first known session, if the account has any
    pub fn use_first_known(&mut self) -> bool {
        match self.known_sessions.first() {
            Some(first) => {
                self.session_id = first.clone();
                true
            }
            None => false,
        }
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }
}

/// Query-string action understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Info,
    Create,
    Finalize,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Info => "info",
            Action::Create => "create",
            Action::Finalize => "finalize",
        }
    }
}

/// The single JSON shape every endpoint answers with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Success", default)]
    pub success: bool,
    #[serde(rename = "Error", default)]
    pub error: String,
    #[serde(rename = "ID", default)]
    pub user_id: String,
    #[serde(rename = "Session", default)]
    pub session_id: String,
    #[serde(rename = "Sessions", default, deserialize_with = "null_as_empty")]
    pub sessions: Vec<String>,
}

// The service encodes an empty list as `null`
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
