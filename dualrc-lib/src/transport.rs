//! The seam between this library and whatever actually carries bytes.
//!
//! Commands and replies are typed here; framing, encoding, retries and
//! reply correlation all belong to the [`Transport`] implementation. The
//! library never sees a raw frame.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::arbiter::GimbalControlResult;
use crate::control::{ControlMode, GimbalControlSpeed, GimbalDialDirection};
use crate::identity::{RcId, RcIdentity};
use crate::pairing::PairingState;
use crate::session::{JoinMasterResult, ProductCapabilities, Role};
use crate::telemetry::{TelemetryKind, TelemetrySample};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Failures of the link itself, as opposed to negative protocol outcomes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer cannot be reached at the link layer.
    #[error("link unreachable: {0}")]
    Unreachable(String),
    /// No reply arrived within the transport's deadline.
    #[error("request timed out")]
    Timeout,
    /// The transport was shut down and will carry no further traffic.
    #[error("transport closed")]
    Closed,
}

/// A command sent to the remote controller hardware.
///
/// Requests that act on the master/slave link (`RequestGimbalControl`,
/// `JoinMaster`, ...) carry no sender field: the link layer attributes the
/// sender, a peer cannot speak for another RC.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Request {
    SetName(String),
    GetName,
    SetPassword(String),
    GetPassword,
    SetControlMode(ControlMode),
    GetControlMode,
    SetGimbalDialSpeed(u8),
    GetGimbalDialSpeed,
    SetGimbalDialDirection(GimbalDialDirection),
    GetGimbalDialDirection,
    SetCustomButtonTags { custom1: u8, custom2: u8 },
    GetCustomButtonTags,
    SetC1BindingEnabled(bool),
    GetC1BindingEnabled,
    GetCapabilities,
    EnterPairing,
    ExitPairing,
    GetPairingState,
    SetRole(Role),
    GetRole,
    StartMasterSearch,
    StopMasterSearch,
    GetSearchState,
    JoinMaster { id: RcId, name: String, password: String },
    RemoveMaster { id: RcId },
    RemoveSlave { id: RcId },
    GetSlaveList,
    /// Ask the master for gimbal control. The reply is held back until the
    /// master's operator decides or the response window lapses.
    RequestGimbalControl,
    /// Master's answer to a pending gimbal-control request.
    RespondGimbalRequest { requester: RcId, agree: bool },
    /// Withdraw a grant previously given to `holder`.
    RevokeGimbalControl { holder: RcId },
    SetSlaveControlMode(ControlMode),
    GetSlaveControlMode,
    SetSlaveJoystickGimbalSpeed(GimbalControlSpeed),
    GetSlaveJoystickGimbalSpeed,
}

/// Reply to a [`Request`]. Setters and link commands answer [`Reply::Ack`];
/// each getter has a payload variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reply {
    Ack,
    Name(String),
    Password(String),
    ControlMode(ControlMode),
    GimbalDialSpeed(u8),
    GimbalDialDirection(GimbalDialDirection),
    CustomButtonTags { custom1: u8, custom2: u8 },
    C1BindingEnabled(bool),
    Capabilities(ProductCapabilities),
    PairingState(PairingState),
    /// Role plus whether the unit currently reports a live aircraft link.
    Role { role: Role, connected: bool },
    SearchState { active: bool },
    JoinMaster(JoinMasterResult),
    SlaveList(Vec<RcIdentity>),
    GimbalControl(GimbalControlResult),
    SlaveGimbalSpeed(GimbalControlSpeed),
}

/// An async link to the remote controller hardware.
///
/// Implementations must correlate each reply to its request and enforce
/// their own reply deadline, surfacing it as [`TransportError::Timeout`].
/// Telemetry is at-most-once: a slow subscriber loses frames, it is never
/// fed stale ones.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its reply.
    async fn send_request(&self, request: Request) -> Result<Reply, TransportError>;

    /// Subscribe to unsolicited frames of one kind. Frames of a kind arrive
    /// in emission order; across kinds there is no ordering guarantee.
    async fn subscribe(
        &self,
        kind: TelemetryKind,
    ) -> Result<mpsc::Receiver<TelemetrySample>, TransportError>;
}
