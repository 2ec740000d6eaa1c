//! Tee a reader into a background upload
//!
//! Bytes the consumer reads through [`Attached`] are copied into a buffer.
//! The upload task is spawned right away but holds off until the consumer
//! hits EOF, so the service always receives the complete payload. If the
//! reader is dropped early nothing is sent and the task reports
//! [`BlackboxError::AttachAbandoned`].

use crate::client::BlackboxClient;
use crate::error::{BlackboxError, Result};
use crate::types::Session;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Tap {
    buffer: Vec<u8>,
    progress: Arc<AtomicUsize>,
    sink: oneshot::Sender<Vec<u8>>,
}

/// Reader that mirrors everything read through it into an upload buffer
pub struct TeeReader<R> {
    inner: R,
    tap: Option<Tap>,
}

impl<R> TeeReader<R> {
    fn passthrough(inner: R) -> Self {
        Self { inner, tap: None }
    }

    fn tapped(inner: R) -> (Self, oneshot::Receiver<Vec<u8>>, Arc<AtomicUsize>) {
        let (sink, rx) = oneshot::channel();
        let progress = Arc::new(AtomicUsize::new(0));
        let tap = Tap {
            buffer: Vec::new(),
            progress: progress.clone(),
            sink,
        };
        (Self { inner, tap: Some(tap) }, rx, progress)
    }

    /// Still collecting bytes for an upload
    pub fn is_capturing(&self) -> bool {
        self.tap.is_some()
    }

    /// Give back the wrapped reader. Abandons the upload if EOF was not reached.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TeeReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let had_room = buf.remaining() > 0;

        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let fresh = &buf.filled()[before..];
        if fresh.is_empty() {
            // Zero bytes into a non-empty buffer is EOF
            if had_room {
                if let Some(tap) = this.tap.take() {
                    let _ = tap.sink.send(tap.buffer);
                }
            }
        } else if let Some(tap) = this.tap.as_mut() {
            tap.buffer.extend_from_slice(fresh);
            tap.progress.store(tap.buffer.len(), Ordering::Relaxed);
        }

        Poll::Ready(Ok(()))
    }
}

/// Handle on the background upload started by an attach call.
///
/// Dropping it (or calling [`UploadHandle::detach`]) leaves the upload
/// running; its outcome is then only visible in the logs.
pub struct UploadHandle {
    join: JoinHandle<Result<()>>,
}

impl UploadHandle {
    /// Wait for the upload and return its result
    pub async fn wait(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| BlackboxError::Task(e.to_string()))?
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Fire and forget
    pub fn detach(self) {}
}

/// A reader returned by attach, plus the upload it feeds (if any)
pub struct Attached<R> {
    reader: TeeReader<R>,
    upload: Option<UploadHandle>,
}

impl<R> Attached<R> {
    pub(crate) fn passthrough(reader: R) -> Self {
        Self {
            reader: TeeReader::passthrough(reader),
            upload: None,
        }
    }

    /// `false` when attach fell back to handing the reader through untouched
    pub fn is_teed(&self) -> bool {
        self.upload.is_some()
    }

    /// Take the upload handle, leaving a plain reader behind
    pub fn take_upload(&mut self) -> Option<UploadHandle> {
        self.upload.take()
    }

    pub fn into_parts(self) -> (TeeReader<R>, Option<UploadHandle>) {
        (self.reader, self.upload)
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Attached<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

/// Attach operations
impl BlackboxClient {
    /// Mirror `reader` into an upload to `session`.
    ///
    /// Must be called inside a tokio runtime. The upload starts once the
    /// returned reader has been read to EOF.
    pub fn attach<R>(&self, session: &Session, reader: R) -> Attached<R>
    where
        R: AsyncRead + Unpin,
    {
        let (reader, rx, progress) = TeeReader::tapped(reader);
        let client = self.clone();
        let session = session.clone();

        let join = tokio::spawn(async move {
            let result = match rx.await {
                Ok(data) => client.upload(&session, data).await,
                Err(_) => Err(BlackboxError::AttachAbandoned {
                    bytes_read: progress.load(Ordering::Relaxed),
                }),
            };

            match &result {
                Ok(()) => tracing::debug!(session = %session.session_id, "attached upload complete"),
                Err(e) => tracing::warn!(session = %session.session_id, error = %e, "attached upload failed"),
            }
            result
        });

        Attached {
            reader,
            upload: Some(UploadHandle { join }),
        }
    }

    /// Attach to the first known session of `user_id`.
    ///
    /// When the lookup fails or the account has no sessions, the reader is
    /// handed back untouched and no upload happens.
    pub async fn attach_first<R>(&self, reader: R, user_id: &str) -> Attached<R>
    where
        R: AsyncRead + Unpin,
    {
        let mut session = match self.info(user_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(user = %user_id, error = %e, "attach lookup failed, passing reader through");
                return Attached::passthrough(reader);
            }
        };

        if !session.use_first_known() {
            tracing::debug!(user = %user_id, "no sessions to attach to, passing reader through");
            return Attached::passthrough(reader);
        }

        self.attach(&session, reader)
    }
}
