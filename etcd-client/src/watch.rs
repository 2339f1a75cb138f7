//! Watch - resilient long-poll watches on a key or directory.
//!
//! A [`Watch`] owns one transport and the last index it has observed. Each
//! [`Watch::run`] / [`Watch::run_once`] call builds a [`WatchSession`] from
//! etcd-core and executes the actions it returns:
//!
//! ```text
//! Watch::run ─► WatchSession::on_event ─► WatchAction
//!      ▲                                     │
//!      └──── WatchEvent ◄── Transport ◄──────┘
//! ```
//!
//! When the server reports that the requested index has been cleared, the
//! watch fetches the key without `wait`, hands that snapshot to the
//! callback, and resumes from the `X-Etcd-Index` header of the snapshot.
//!
//! Every request races the watch's [`CancellationToken`]; cancelling it
//! makes the current call return `Ok(())` without issuing further requests.

use etcd_core::{
    check_key, etcd_index, KeyspaceUrl, WatchAction, WatchEvent, WatchMode, WatchSession,
};
use etcd_types::{Index, Reply};
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::config::EtcdConfig;
use crate::transport::{HttpTransport, Transport, TransportError};

/// Outcome of the snapshot fetch after a cleared index.
#[derive(Debug)]
enum Recovery {
    /// The callback saw the snapshot. Carries the header index, if usable.
    Recovered(Option<Index>),
    /// The snapshot could not be fetched or decoded.
    Failed(ClientError),
}

/// A watch on the etcd v2 keys API.
///
/// Not meant to be shared between concurrent watches: the cursor and the
/// transport belong to one caller at a time (enforced by `&mut self`).
#[derive(Debug)]
pub struct Watch<T: Transport> {
    keyspace: KeyspaceUrl,
    transport: T,
    max_failures: u32,
    last_index: Option<Index>,
    cancel: CancellationToken,
}

impl Watch<HttpTransport> {
    /// Create a watch talking HTTP to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Init`] if the HTTP transport cannot be built
    /// and [`ClientError::Url`] if the endpoint is invalid.
    pub fn connect(config: &EtcdConfig) -> Result<Self, ClientError> {
        let transport =
            HttpTransport::new(&config.http).map_err(|e| ClientError::Init(e.to_string()))?;
        Self::new(config, transport)
    }
}

impl<T: Transport> Watch<T> {
    /// Create a watch with an explicit transport.
    pub fn new(config: &EtcdConfig, transport: T) -> Result<Self, ClientError> {
        Ok(Self {
            keyspace: config.keyspace()?,
            transport,
            max_failures: config.watch.max_failures,
            last_index: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `token` to stop this watch.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that stops this watch when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Last index observed by any call on this watch.
    pub fn last_index(&self) -> Option<Index> {
        self.last_index
    }

    /// Consecutive failures tolerated by [`Watch::run`].
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Watch `key` until the failure budget runs out or the watch is
    /// cancelled, invoking `callback` for every change.
    ///
    /// `prev_index` is the last index the caller has already seen. `None`
    /// (or zero) resumes from the index cached by a previous call, or waits
    /// for the next change when nothing is cached.
    ///
    /// A panic in `callback` unwinds out of this call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WatchFailed`] after `max_failures` consecutive
    /// failures, and [`ClientError::Url`] for an empty key.
    pub async fn run<F>(
        &mut self,
        key: &str,
        callback: F,
        prev_index: Option<Index>,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Reply),
    {
        self.drive(key, callback, prev_index, WatchMode::Continuous)
            .await
    }

    /// Wait for one change of `key` and return.
    ///
    /// A cleared index is recovered (the callback then sees the snapshot)
    /// and is not an error. The caller reschedules the next watch; the
    /// observed index is cached for it.
    ///
    /// # Errors
    ///
    /// Returns the transport, decode or server error of the long-poll.
    pub async fn run_once<F>(
        &mut self,
        key: &str,
        callback: F,
        prev_index: Option<Index>,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Reply),
    {
        self.drive(key, callback, prev_index, WatchMode::Once).await
    }

    async fn drive<F>(
        &mut self,
        key: &str,
        mut callback: F,
        prev_index: Option<Index>,
        mode: WatchMode,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Reply),
    {
        check_key(key)?;
        if let Some(index) = prev_index.filter(|i| !i.is_zero()) {
            self.last_index = Some(index);
        }

        let mut session = WatchSession::new(
            self.keyspace.clone(),
            key,
            self.last_index,
            mode,
            self.max_failures,
        );
        let mut action = session.on_event(WatchEvent::Start);

        loop {
            action = match action {
                WatchAction::Poll { url } => match self.poll(&url, key, &mut callback).await {
                    Some(Ok(event)) => session.on_event(event),
                    Some(Err(error)) => {
                        tracing::warn!("Watch on {} failed: {}", key, error);
                        let event = WatchEvent::Failed {
                            error: error.to_string(),
                        };
                        match session.on_event(event) {
                            // A single-shot watch stops at its first failure.
                            WatchAction::Finish => return Err(error),
                            next => next,
                        }
                    }
                    None => {
                        tracing::info!("Watch on {} cancelled", key);
                        return Ok(());
                    }
                },
                WatchAction::Recover { url } => {
                    let event = match self.recover(&url, &mut callback).await {
                        Some(Recovery::Recovered(index)) => {
                            tracing::info!("Recovered {} from snapshot at {:?}", key, index);
                            WatchEvent::Recovered { index }
                        }
                        Some(Recovery::Failed(e)) => {
                            tracing::warn!("Snapshot fetch for {} failed: {}", key, e);
                            WatchEvent::RecoveryFailed {
                                error: e.to_string(),
                            }
                        }
                        None => {
                            tracing::info!("Watch on {} cancelled", key);
                            return Ok(());
                        }
                    };
                    session.on_event(event)
                }
                WatchAction::Finish => return Ok(()),
                WatchAction::Abort {
                    failures,
                    last_error,
                } => {
                    tracing::error!(
                        "Watch on {} aborted after {} consecutive failures",
                        key,
                        failures
                    );
                    return Err(ClientError::WatchFailed {
                        failures,
                        last_error,
                    });
                }
            };

            self.last_index = session.cursor();
            let budget = session.budget();
            if matches!(action, WatchAction::Poll { .. }) && budget.remaining() < budget.max() {
                tracing::debug!(
                    "{} of {} failures left for {}",
                    budget.remaining(),
                    budget.max(),
                    key
                );
            }
        }
    }

    /// Issue one long-poll and deliver its reply.
    ///
    /// `Ok` carries the event for the session, `Err` a failure that counts
    /// against the budget, and `None` means the watch was cancelled.
    async fn poll<F>(
        &self,
        url: &str,
        key: &str,
        callback: &mut F,
    ) -> Option<Result<WatchEvent, ClientError>>
    where
        F: FnMut(&Reply),
    {
        tracing::debug!("Watching {}", url);
        let body = match self.fetch(url).await? {
            Ok(body) => body,
            Err(e) => return Some(Err(e.into())),
        };
        let event = match Reply::from_body(&body) {
            Ok(reply) => {
                callback(&reply);
                Ok(WatchEvent::Changed {
                    index: reply.modified_index(),
                })
            }
            Err(e) if e.is_index_cleared() => {
                tracing::info!("Index cleared while watching {}: {}", key, e);
                Ok(WatchEvent::IndexCleared)
            }
            Err(e) => Err(e.into()),
        };
        Some(event)
    }

    /// GET `url`, or `None` if the watch is cancelled first.
    async fn fetch(&self, url: &str) -> Option<Result<String, TransportError>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.transport.get(url) => Some(result),
        }
    }

    /// Fetch the bare key with header capture on and deliver it.
    ///
    /// Header capture is switched off again whatever the outcome.
    async fn recover<F>(&self, url: &str, callback: &mut F) -> Option<Recovery>
    where
        F: FnMut(&Reply),
    {
        self.transport.capture_headers(true);
        let fetched = self.fetch(url).await;
        let headers = self.transport.captured_headers();
        self.transport.capture_headers(false);

        let body = match fetched? {
            Ok(body) => body,
            Err(e) => return Some(Recovery::Failed(e.into())),
        };
        let reply = match Reply::from_body(&body) {
            Ok(reply) => reply,
            Err(e) => return Some(Recovery::Failed(e.into())),
        };
        callback(&reply);

        let index = etcd_index(headers.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        if index.is_none() {
            tracing::warn!("No usable X-Etcd-Index header for {}", url);
        }
        Some(Recovery::Recovered(index))
    }
}
