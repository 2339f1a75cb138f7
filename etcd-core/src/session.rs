//! Watch session state machine.
//!
//! A [`WatchSession`] holds everything one `run` / `run_once` call needs:
//! the key, the cursor, the failure budget and the current long-poll URL.
//! It performs no I/O. The caller feeds it [`WatchEvent`]s describing what
//! happened to the last request and executes the [`WatchAction`] it returns.
//!
//! ```text
//!            Start / Changed / Failed
//!          ┌────────────────────────────┐
//!          ▼                            │
//!   Poll{watch_url} ──IndexCleared──► Recover{key_url}
//!          │                            │ Recovered / RecoveryFailed
//!          │ budget exhausted           ▼
//!          └──────────────────────► Abort{failures}
//! ```
//!
//! In [`WatchMode::Once`] there is no budget: the first change, recovery
//! or failure yields [`WatchAction::Finish`]. A single-shot watch that
//! finishes right after a `Failed` event reports that failure to its caller.

use etcd_types::Index;

use crate::budget::FailureBudget;
use crate::keyspace::KeyspaceUrl;

/// Whether the session loops or stops after one long-poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Keep watching until the failure budget runs out.
    Continuous,
    /// One long-poll (plus a possible recovery fetch), then return.
    Once,
}

/// Outcome of the last request, fed back into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The session is starting; no request has been made yet.
    Start,
    /// The long-poll returned a change and the callback has seen it.
    Changed {
        /// Modification index of the reply.
        index: Index,
    },
    /// The long-poll returned "event index cleared" (error code 401).
    IndexCleared,
    /// The snapshot fetch succeeded and the callback has seen it.
    Recovered {
        /// Value of the `X-Etcd-Index` header, if present and well-formed.
        index: Option<Index>,
    },
    /// The snapshot fetch failed.
    RecoveryFailed {
        /// Error message.
        error: String,
    },
    /// The long-poll failed (transport error, timeout, undecodable body or
    /// any server error other than a cleared index).
    Failed {
        /// Error message.
        error: String,
    },
}

/// What the caller must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Issue a long-poll GET.
    Poll {
        /// The long-poll URL.
        url: String,
    },
    /// Issue a plain GET with header capture and deliver it as a snapshot.
    Recover {
        /// The bare key URL.
        url: String,
    },
    /// The single-shot watch is over.
    Finish,
    /// The continuous watch exhausted its failure budget.
    Abort {
        /// Consecutive failures counted.
        failures: u32,
        /// Message of the last failure, if one was recorded.
        last_error: Option<String>,
    },
}

impl WatchAction {
    /// Whether the session is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish | Self::Abort { .. })
    }
}

/// State of one watch call. NO I/O, just transitions.
#[derive(Debug, Clone)]
pub struct WatchSession {
    keyspace: KeyspaceUrl,
    key: String,
    mode: WatchMode,
    cursor: Option<Index>,
    budget: FailureBudget,
    watch_url: String,
    last_error: Option<String>,
    terminal: Option<WatchAction>,
}

impl WatchSession {
    /// Create a session for `key`.
    ///
    /// `start` is the last index the caller has already seen; a zero index
    /// is treated as unknown. `max_failures` only applies to
    /// [`WatchMode::Continuous`].
    pub fn new(
        keyspace: KeyspaceUrl,
        key: &str,
        start: Option<Index>,
        mode: WatchMode,
        max_failures: u32,
    ) -> Self {
        let cursor = start.filter(|i| !i.is_zero());
        let watch_url = keyspace.watch_url(key, cursor);
        Self {
            keyspace,
            key: key.to_string(),
            mode,
            cursor,
            budget: FailureBudget::new(max_failures),
            watch_url,
            last_error: None,
            terminal: None,
        }
    }

    /// Last index observed by this session.
    pub fn cursor(&self) -> Option<Index> {
        self.cursor
    }

    /// The URL the next long-poll will use.
    pub fn watch_url(&self) -> &str {
        &self.watch_url
    }

    /// The watched key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The session mode.
    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Remaining failure budget.
    pub fn budget(&self) -> &FailureBudget {
        &self.budget
    }

    /// Process an event and return the next action.
    ///
    /// Once a terminal action has been returned, every further event
    /// returns the same action again.
    pub fn on_event(&mut self, event: WatchEvent) -> WatchAction {
        if let Some(done) = &self.terminal {
            return done.clone();
        }

        let action = match (self.mode, event) {
            (WatchMode::Continuous, WatchEvent::Start) if self.budget.is_exhausted() => {
                self.abort()
            }
            (_, WatchEvent::Start) => self.poll(),

            (mode, WatchEvent::Changed { index }) => {
                self.advance(index);
                match mode {
                    WatchMode::Continuous => {
                        self.budget.reset();
                        self.last_error = None;
                        self.poll()
                    }
                    WatchMode::Once => WatchAction::Finish,
                }
            }

            (_, WatchEvent::IndexCleared) => WatchAction::Recover {
                url: self.keyspace.key_url(&self.key),
            },

            (mode, WatchEvent::Recovered { index }) => {
                if let Some(index) = index {
                    self.advance(index);
                }
                self.after_recovery(mode, None)
            }
            (mode, WatchEvent::RecoveryFailed { error }) => self.after_recovery(mode, Some(error)),

            (WatchMode::Continuous, WatchEvent::Failed { error }) => {
                self.last_error = Some(error);
                self.spend_or_abort()
            }
            (WatchMode::Once, WatchEvent::Failed { .. }) => WatchAction::Finish,
        };

        if action.is_terminal() {
            self.terminal = Some(action.clone());
        }
        action
    }

    /// Move the cursor forward. An index at or below the cursor is ignored
    /// so no request ever re-asks for an index already observed.
    fn advance(&mut self, index: Index) {
        if index.is_zero() {
            return;
        }
        if self.cursor.map_or(true, |c| index > c) {
            self.cursor = Some(index);
        }
        self.watch_url = self.keyspace.watch_url(&self.key, self.cursor);
    }

    fn after_recovery(&mut self, mode: WatchMode, error: Option<String>) -> WatchAction {
        match mode {
            // A cleared index counts as a failure even when the snapshot succeeded.
            WatchMode::Continuous => {
                self.last_error = Some(error.unwrap_or_else(|| "event index cleared".into()));
                self.spend_or_abort()
            }
            WatchMode::Once => WatchAction::Finish,
        }
    }

    fn spend_or_abort(&mut self) -> WatchAction {
        if self.budget.spend() {
            self.abort()
        } else {
            self.poll()
        }
    }

    fn poll(&self) -> WatchAction {
        WatchAction::Poll {
            url: self.watch_url.clone(),
        }
    }

    fn abort(&self) -> WatchAction {
        WatchAction::Abort {
            failures: self.budget.spent(),
            last_error: self.last_error.clone(),
        }
    }
}
