//! Arbitration of gimbal control among a master and its slaves.
//!
//! The gimbal is a single unit: exactly one RC holds it at any time, and
//! that is the master until it explicitly grants a slave's request. The
//! [`GimbalArbiter`] runs on the master and owns the pending-request set,
//! the response window and the holder. Slaves only ever see the outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_RESPONSE_WINDOW, EVENT_CHANNEL_CAPACITY};
use crate::error::RcError;
use crate::identity::{RcId, RcIdentity};
use crate::session::SessionManager;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of a gimbal-control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum GimbalControlResult {
    /// The master agreed; the requester now holds the gimbal.
    Granted = 0,
    /// The master refused.
    Denied = 1,
    /// The response window lapsed without a decision.
    Timeout = 2,
    #[num_enum(default)]
    Unknown = 3,
}

/// A request sitting in the master's pending set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GimbalControlRequest {
    pub requester: RcIdentity,
    pub issued_at: DateTime<Utc>,
}

/// Arbiter tuning. The response window mirrors the firmware's own deadline
/// for holding the requester's round trip open.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterConfig {
    pub response_window: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        ArbiterConfig { response_window: DEFAULT_RESPONSE_WINDOW }
    }
}

/// Pending-set and holder changes, for UI subscribers on the master.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbiterEvent {
    /// A request entered the pending set.
    RequestPending(GimbalControlRequest),
    /// A pending request left the set. A request aborted because its
    /// requester detached settles as [`GimbalControlResult::Unknown`].
    RequestSettled {
        requester: RcId,
        result: GimbalControlResult,
    },
    /// The gimbal unit moved to a new holder.
    HolderChanged { holder: RcId },
}

struct PendingEntry {
    /// Guards the expiry timer against settling a successor request that
    /// reused this requester's slot.
    seq: u64,
    request: GimbalControlRequest,
    resolver: oneshot::Sender<Result<GimbalControlResult, RcError>>,
}

struct ArbiterState {
    master: RcId,
    holder: RcId,
    next_seq: u64,
    pending: HashMap<RcId, PendingEntry>,
}

struct ArbiterShared {
    config: ArbiterConfig,
    session: Arc<Mutex<SessionManager>>,
    state: Mutex<ArbiterState>,
    events: broadcast::Sender<ArbiterEvent>,
}

/// The master-side gimbal control state machine. Cheap to clone; all
/// clones share one pending set and holder.
#[derive(Clone)]
pub struct GimbalArbiter {
    shared: Arc<ArbiterShared>,
}

impl GimbalArbiter {
    pub fn new(master: RcId, session: Arc<Mutex<SessionManager>>, config: ArbiterConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        GimbalArbiter {
            shared: Arc::new(ArbiterShared {
                config,
                session,
                state: Mutex::new(ArbiterState {
                    master,
                    holder: master,
                    next_seq: 0,
                    pending: HashMap::new(),
                }),
                events,
            }),
        }
    }

    /// Watch pending-set and holder changes. Delivery is best effort; a
    /// subscriber that falls behind loses the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<ArbiterEvent> {
        self.shared.events.subscribe()
    }

    /// Current holder of the gimbal unit.
    pub async fn holder(&self) -> RcId {
        self.shared.state.lock().await.holder
    }

    pub async fn holds_gimbal(&self, id: RcId) -> bool {
        self.shared.state.lock().await.holder == id
    }

    /// Pending requests in submission order.
    pub async fn pending(&self) -> Vec<GimbalControlRequest> {
        let state = self.shared.state.lock().await;
        let mut entries: Vec<_> = state
            .pending
            .values()
            .map(|entry| (entry.seq, entry.request.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, request)| request).collect()
    }

    /// Submit a request on behalf of an attached slave and wait for the
    /// outcome: the master's decision, or [`GimbalControlResult::Timeout`]
    /// once the response window lapses.
    ///
    /// Fails up front with [`RcError::NotAttached`] for a requester outside
    /// the slave set and [`RcError::RequestAlreadyPending`] while an earlier
    /// request from the same requester is still open. A requester detached
    /// mid-wait gets [`RcError::NotAttached`] as its resolution.
    pub async fn submit(&self, requester: RcIdentity) -> Result<GimbalControlResult, RcError> {
        let rx = self.enqueue(requester).await?;
        rx.await
            .map_err(|_| RcError::Protocol("pending gimbal request dropped unresolved".to_string()))?
    }

    /// Record a request without waiting for its outcome. Used when the
    /// requester's round trip is held open elsewhere and this arbiter only
    /// tracks the pending set.
    pub async fn register(&self, requester: RcIdentity) -> Result<(), RcError> {
        self.enqueue(requester).await.map(drop)
    }

    async fn enqueue(
        &self,
        requester: RcIdentity,
    ) -> Result<oneshot::Receiver<Result<GimbalControlResult, RcError>>, RcError> {
        // Lock order: arbiter state, then session. Never the reverse.
        let mut state = self.shared.state.lock().await;
        {
            let session = self.shared.session.lock().await;
            if !session.is_attached(requester.id) {
                return Err(RcError::NotAttached(requester.id));
            }
        }
        if state.pending.contains_key(&requester.id) {
            return Err(RcError::RequestAlreadyPending);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let request = GimbalControlRequest { requester: requester.clone(), issued_at: Utc::now() };
        let (tx, rx) = oneshot::channel();
        state.pending.insert(
            requester.id,
            PendingEntry { seq, request: request.clone(), resolver: tx },
        );
        info!(requester = %requester.id, "gimbal control requested");
        let _ = self.shared.events.send(ArbiterEvent::RequestPending(request));

        let arbiter = self.clone();
        let id = requester.id;
        let window = self.shared.config.response_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            arbiter.expire(id, seq).await;
        });
        Ok(rx)
    }

    /// Move the gimbal unit to `holder` and mirror the transfer into the
    /// slave table's permission records.
    async fn move_holder(&self, state: &mut ArbiterState, holder: RcId) {
        state.holder = holder;
        // Lock order: arbiter state, then session. Never the reverse.
        self.shared.session.lock().await.set_gimbal_holder(holder);
        let _ = self.shared.events.send(ArbiterEvent::HolderChanged { holder });
    }

    async fn expire(&self, id: RcId, seq: u64) {
        let mut state = self.shared.state.lock().await;
        match state.pending.get(&id) {
            Some(entry) if entry.seq == seq => {}
            _ => return,
        }
        if let Some(entry) = state.pending.remove(&id) {
            warn!(requester = %id, "gimbal control request expired unanswered");
            let _ = entry.resolver.send(Ok(GimbalControlResult::Timeout));
            let _ = self.shared.events.send(ArbiterEvent::RequestSettled {
                requester: id,
                result: GimbalControlResult::Timeout,
            });
        }
    }

    /// Settle a pending request with the operator's decision. Agreeing
    /// moves the gimbal unit to the requester; the previous holder loses it
    /// in the same step.
    ///
    /// Returns false when nothing was pending for `requester` (the request
    /// already timed out or was never made); that is a no-op, not an error.
    pub async fn respond(&self, requester: RcId, agree: bool) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(entry) = state.pending.remove(&requester) else {
            debug!(%requester, "response for a request that is no longer pending");
            return false;
        };
        let result = if agree { GimbalControlResult::Granted } else { GimbalControlResult::Denied };
        if agree && state.holder != requester {
            self.move_holder(&mut state, requester).await;
        }
        info!(%requester, %result, "gimbal control request settled");
        let _ = entry.resolver.send(Ok(result));
        let _ = self.shared.events.send(ArbiterEvent::RequestSettled { requester, result });
        true
    }

    /// Take the gimbal unit back to the master. Returns the holder that
    /// lost it, or None when the master already held it.
    pub async fn revoke(&self) -> Option<RcId> {
        let mut state = self.shared.state.lock().await;
        if state.holder == state.master {
            return None;
        }
        let previous = state.holder;
        let master = state.master;
        self.move_holder(&mut state, master).await;
        info!(%previous, "gimbal control revoked");
        Some(previous)
    }

    /// A slave left the session: abort its pending request (resolving the
    /// waiter with [`RcError::NotAttached`]) and return the gimbal to the
    /// master if the slave held it.
    pub async fn detach(&self, id: RcId) {
        let mut state = self.shared.state.lock().await;
        if let Some(entry) = state.pending.remove(&id) {
            debug!(requester = %id, "aborting pending request of a detached slave");
            let _ = entry.resolver.send(Err(RcError::NotAttached(id)));
            let _ = self.shared.events.send(ArbiterEvent::RequestSettled {
                requester: id,
                result: GimbalControlResult::Unknown,
            });
        }
        if state.holder == id {
            let master = state.master;
            self.move_holder(&mut state, master).await;
        }
    }
}
