use thiserror::Error;

use crate::transport::TransportError;

/// The primary error type for the `dualrc` library.
///
/// Protocol-level negative outcomes (password rejected, slave table full,
/// request timed out, ...) are NOT errors: they are ordinary values of
/// [`JoinMasterResult`](crate::session::JoinMasterResult) and
/// [`GimbalControlResult`](crate::arbiter::GimbalControlResult). `RcError`
/// covers link failures, missing capabilities and caller precondition
/// violations. Nothing here is retried internally; retry policy belongs to
/// the caller.
#[derive(Error, Debug)]
pub enum RcError {
    /// The RC hardware is unreachable over the transport. Always retryable.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[from] TransportError),

    /// The connected product has no master/slave (or remote focus) support.
    /// Fatal to the calling operation, never retryable.
    #[error("operation not supported by this product")]
    UnsupportedByProduct,

    /// `enter_pairing` was called while the RC is already pairing.
    #[error("pairing is already in progress")]
    AlreadyPairing,

    /// `start_master_search` was called while a search is already running.
    #[error("master search is already active")]
    SearchAlreadyActive,

    /// A gimbal-control request from the same requester is still pending.
    #[error("a gimbal control request is already pending")]
    RequestAlreadyPending,

    /// The referenced RC is not in the attached-slave set.
    #[error("remote controller {0} is not attached")]
    NotAttached(crate::identity::RcId),

    /// An argument failed validation before any round trip was attempted.
    #[error("invalid {0}: {1}")]
    InvalidParameter(&'static str, String),

    /// The transport answered with a reply that does not match the request.
    #[error("protocol error: {0}")]
    Protocol(String),
}
