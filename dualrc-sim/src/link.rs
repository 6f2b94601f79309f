//! In-process stand-in for the radio link.
//!
//! Models the local unit's firmware plus a handful of peer controllers in
//! range. Peers announce themselves while a scan runs, trickle in as slaves
//! once the local unit plays master, and each asks for gimbal control once
//! it is attached. When the local unit joins a peer as a slave instead, the
//! peer answers gimbal requests according to a fixed policy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use dualrc_lib::arbiter::GimbalControlResult;
use dualrc_lib::control::{ControlMode, GimbalControlSpeed, GimbalDialDirection};
use dualrc_lib::identity::{RcId, RcIdentity};
use dualrc_lib::pairing::PairingState;
use dualrc_lib::session::{JoinMasterResult, ProductCapabilities, Role, SessionEvent};
use dualrc_lib::telemetry::{
    BatteryInfo, HardwareState, JoystickAxis, TelemetryKind, TelemetrySample,
};
use dualrc_lib::transport::{Reply, Request, Transport, TransportError};
use tokio::sync::{Mutex, mpsc};
use tokio::time::sleep;
use tracing::debug;

/// What to do with a gimbal control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionPolicy {
    /// Approve it.
    Grant,
    /// Turn it down.
    Deny,
    /// Let the response window lapse.
    Ignore,
}

/// A controller in radio range of the local unit.
#[derive(Debug, Clone)]
pub struct SimPeer {
    pub identity: RcIdentity,
    pub password: String,
}

impl SimPeer {
    pub fn new(id: u32, name: &str, password: &str) -> Self {
        Self {
            identity: RcIdentity::new(RcId(id)).with_name(name),
            password: password.to_string(),
        }
    }
}

/// Mutable firmware registers of the local unit.
struct LinkState {
    name: String,
    password: String,
    control_mode: ControlMode,
    slave_control_mode: ControlMode,
    slave_gimbal_speed: GimbalControlSpeed,
    dial_speed: u8,
    dial_direction: GimbalDialDirection,
    custom_tags: (u8, u8),
    c1_binding: bool,
    pairing: PairingState,
    role: Role,
    search_active: bool,
    slaves: Vec<RcIdentity>,
    joined: Option<RcId>,
    holder: Option<RcId>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            name: "RC".to_string(),
            password: "0000".to_string(),
            control_mode: ControlMode::default(),
            slave_control_mode: ControlMode::slave_default(),
            slave_gimbal_speed: GimbalControlSpeed::default(),
            dial_speed: 50,
            dial_direction: GimbalDialDirection::Pitch,
            custom_tags: (0, 0),
            c1_binding: false,
            pairing: PairingState::NotPairing,
            role: Role::Normal,
            search_active: false,
            slaves: Vec::new(),
            joined: None,
            holder: None,
        }
    }
}

struct SimInner {
    capabilities: ProductCapabilities,
    peers: Vec<SimPeer>,
    remote_policy: DecisionPolicy,
    verdict_window: Duration,
    state: Mutex<LinkState>,
    channels: Mutex<HashMap<TelemetryKind, mpsc::Sender<TelemetrySample>>>,
}

impl SimInner {
    /// Deliver a push to the matching telemetry stream, if anyone listens.
    async fn push(&self, sample: TelemetrySample) {
        let sender = self.channels.lock().await.get(&sample.kind()).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(sample).await;
        }
    }

    /// Peers announce themselves while the scan stays active.
    async fn run_discovery_wave(&self) {
        for (index, peer) in self.peers.iter().enumerate() {
            sleep(Duration::from_millis(120)).await;
            if !self.state.lock().await.search_active {
                return;
            }
            let quality = 90u8.saturating_sub((index as u8).saturating_mul(7));
            let identity = peer.identity.clone().with_signal_quality(quality);
            self.push(TelemetrySample::Session(SessionEvent::DiscoveredMaster(identity)))
                .await;
        }
    }

    /// Peers trickle in as slaves, then each asks for the gimbal in turn.
    async fn run_join_wave(&self) {
        let limit = self.capabilities.max_slaves;
        for peer in self.peers.iter().take(limit) {
            sleep(Duration::from_millis(150)).await;
            {
                let mut state = self.state.lock().await;
                if state.role != Role::Master {
                    return;
                }
                state.slaves.push(peer.identity.clone());
            }
            self.push(TelemetrySample::Session(SessionEvent::SlaveJoined(peer.identity.clone())))
                .await;
        }
        for peer in self.peers.iter().take(limit) {
            sleep(Duration::from_millis(250)).await;
            if self.state.lock().await.role != Role::Master {
                return;
            }
            debug!(peer = %peer.identity.id, "peer asks for gimbal control");
            self.push(TelemetrySample::GimbalRequest(peer.identity.clone())).await;
        }
    }
}

/// Simulated radio link carrying one local unit and its peers.
pub struct SimLink {
    inner: Arc<SimInner>,
}

impl SimLink {
    pub fn new(peers: Vec<SimPeer>, remote_policy: DecisionPolicy, verdict_window: Duration) -> Self {
        Self {
            inner: Arc::new(SimInner {
                capabilities: ProductCapabilities {
                    supports_master_slave: true,
                    supports_remote_focus: true,
                    max_slaves: 3,
                },
                peers,
                remote_policy,
                verdict_window,
                state: Mutex::new(LinkState::default()),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Stream stick positions and a slowly draining battery, the way a
    /// powered unit does.
    pub fn start_background_traffic(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut percent: u8 = 100;
            let mut tick: i32 = 0;
            loop {
                sleep(Duration::from_millis(250)).await;
                tick += 1;
                // Left stick sweeps back and forth across its range.
                let wave = (tick % 21 - 10) * 66;
                let state = HardwareState {
                    left_horizontal: JoystickAxis { value: wave },
                    ..HardwareState::default()
                };
                inner.push(TelemetrySample::HardwareState(state)).await;
                if tick % 8 == 0 && percent > 1 {
                    percent -= 1;
                    inner
                        .push(TelemetrySample::Battery(BatteryInfo {
                            remaining_mah: 48 * percent as u32,
                            remaining_percent: percent,
                        }))
                        .await;
                }
            }
        });
    }
}

#[async_trait]
impl Transport for SimLink {
    async fn send_request(&self, request: Request) -> Result<Reply, TransportError> {
        let mut state = self.inner.state.lock().await;
        match request {
            Request::SetName(name) => {
                state.name = name;
                Ok(Reply::Ack)
            }
            Request::GetName => Ok(Reply::Name(state.name.clone())),
            Request::SetPassword(password) => {
                state.password = password;
                Ok(Reply::Ack)
            }
            Request::GetPassword => Ok(Reply::Password(state.password.clone())),
            Request::SetControlMode(mode) => {
                state.control_mode = mode;
                Ok(Reply::Ack)
            }
            Request::GetControlMode => Ok(Reply::ControlMode(state.control_mode)),
            Request::SetGimbalDialSpeed(speed) => {
                state.dial_speed = speed;
                Ok(Reply::Ack)
            }
            Request::GetGimbalDialSpeed => Ok(Reply::GimbalDialSpeed(state.dial_speed)),
            Request::SetGimbalDialDirection(direction) => {
                state.dial_direction = direction;
                Ok(Reply::Ack)
            }
            Request::GetGimbalDialDirection => {
                Ok(Reply::GimbalDialDirection(state.dial_direction))
            }
            Request::SetCustomButtonTags { custom1, custom2 } => {
                state.custom_tags = (custom1, custom2);
                Ok(Reply::Ack)
            }
            Request::GetCustomButtonTags => Ok(Reply::CustomButtonTags {
                custom1: state.custom_tags.0,
                custom2: state.custom_tags.1,
            }),
            Request::SetC1BindingEnabled(enabled) => {
                state.c1_binding = enabled;
                Ok(Reply::Ack)
            }
            Request::GetC1BindingEnabled => Ok(Reply::C1BindingEnabled(state.c1_binding)),
            Request::GetCapabilities => Ok(Reply::Capabilities(self.inner.capabilities)),
            Request::EnterPairing => {
                state.pairing = PairingState::Pairing;
                let inner = self.inner.clone();
                // The aircraft answers shortly after.
                tokio::spawn(async move {
                    sleep(Duration::from_millis(400)).await;
                    {
                        let mut state = inner.state.lock().await;
                        if state.pairing != PairingState::Pairing {
                            return;
                        }
                        state.pairing = PairingState::Completed;
                    }
                    inner.push(TelemetrySample::Pairing(PairingState::Completed)).await;
                });
                Ok(Reply::Ack)
            }
            Request::ExitPairing => {
                state.pairing = PairingState::NotPairing;
                Ok(Reply::Ack)
            }
            Request::GetPairingState => Ok(Reply::PairingState(state.pairing)),
            Request::SetRole(role) => {
                state.role = role;
                state.slaves.clear();
                state.holder = None;
                if role == Role::Master {
                    let inner = self.inner.clone();
                    tokio::spawn(async move { inner.run_join_wave().await });
                }
                Ok(Reply::Ack)
            }
            Request::GetRole => Ok(Reply::Role { role: state.role, connected: true }),
            Request::StartMasterSearch => {
                state.search_active = true;
                let inner = self.inner.clone();
                tokio::spawn(async move { inner.run_discovery_wave().await });
                Ok(Reply::Ack)
            }
            Request::StopMasterSearch => {
                state.search_active = false;
                Ok(Reply::Ack)
            }
            Request::GetSearchState => Ok(Reply::SearchState {
                active: state.search_active,
            }),
            Request::JoinMaster { id, name: _, password } => {
                let Some(peer) = self.inner.peers.iter().find(|p| p.identity.id == id) else {
                    return Ok(Reply::JoinMaster(JoinMasterResult::ResponseTimeout));
                };
                if peer.password != password {
                    return Ok(Reply::JoinMaster(JoinMasterResult::PasswordError));
                }
                state.joined = Some(id);
                state.role = Role::Slave;
                Ok(Reply::JoinMaster(JoinMasterResult::Successful))
            }
            Request::RemoveMaster { id } => {
                if state.joined == Some(id) {
                    state.joined = None;
                }
                Ok(Reply::Ack)
            }
            Request::RemoveSlave { id } => {
                state.slaves.retain(|slave| slave.id != id);
                Ok(Reply::Ack)
            }
            Request::GetSlaveList => Ok(Reply::SlaveList(state.slaves.clone())),
            Request::RequestGimbalControl => match self.inner.remote_policy {
                DecisionPolicy::Grant => Ok(Reply::GimbalControl(GimbalControlResult::Granted)),
                DecisionPolicy::Deny => Ok(Reply::GimbalControl(GimbalControlResult::Denied)),
                DecisionPolicy::Ignore => {
                    drop(state);
                    sleep(self.inner.verdict_window).await;
                    Ok(Reply::GimbalControl(GimbalControlResult::Timeout))
                }
            },
            Request::RespondGimbalRequest { requester, agree } => {
                if agree {
                    state.holder = Some(requester);
                }
                Ok(Reply::Ack)
            }
            Request::RevokeGimbalControl { holder } => {
                if state.holder == Some(holder) {
                    state.holder = None;
                }
                Ok(Reply::Ack)
            }
            Request::SetSlaveControlMode(mode) => {
                state.slave_control_mode = mode;
                Ok(Reply::Ack)
            }
            Request::GetSlaveControlMode => Ok(Reply::ControlMode(state.slave_control_mode)),
            Request::SetSlaveJoystickGimbalSpeed(speed) => {
                state.slave_gimbal_speed = speed;
                Ok(Reply::Ack)
            }
            Request::GetSlaveJoystickGimbalSpeed => {
                Ok(Reply::SlaveGimbalSpeed(state.slave_gimbal_speed))
            }
        }
    }

    async fn subscribe(
        &self,
        kind: TelemetryKind,
    ) -> Result<mpsc::Receiver<TelemetrySample>, TransportError> {
        let (sender, receiver) = mpsc::channel(64);
        self.inner.channels.lock().await.insert(kind, sender);
        Ok(receiver)
    }
}
