use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::arbiter::{
    ArbiterConfig, ArbiterEvent, GimbalArbiter, GimbalControlRequest, GimbalControlResult,
};
use crate::constants::{PERCENT_MAX, RC_NAME_MAX_LEN, RC_PASSWORD_LEN};
use crate::control::{ControlMode, GimbalControlSpeed, GimbalDialDirection};
use crate::error::RcError;
use crate::events::EventHub;
use crate::identity::{ControlPermission, RcId, RcIdentity};
use crate::pairing::{PairingMachine, PairingState};
use crate::session::{
    AdmitOutcome, JoinMasterResult, JoinedMaster, MasterSearchState, ProductCapabilities, Role,
    SessionEvent, SessionManager,
};
use crate::telemetry::{
    BatteryInfo, GpsData, HardwareState, RemoteFocusState, TelemetryKind, TelemetrySample,
};
use crate::transport::{Reply, Request, Transport};

const TELEMETRY_KINDS: [TelemetryKind; 7] = [
    TelemetryKind::HardwareState,
    TelemetryKind::Gps,
    TelemetryKind::Battery,
    TelemetryKind::RemoteFocus,
    TelemetryKind::GimbalRequest,
    TelemetryKind::Session,
    TelemetryKind::Pairing,
];

/// Handle to one remote controller over a [`Transport`].
///
/// All hardware state lives on the hardware; the handle keeps mirrors
/// (role, slaves, pairing, discovery results) that are reconciled on every
/// confirmed reply and on every unsolicited push. Commands validate their
/// arguments locally, round-trip, and only then touch a mirror.
///
/// Dropping the handle aborts the telemetry pump tasks.
pub struct RemoteController {
    transport: Arc<dyn Transport>,
    identity: RcIdentity,
    session: Arc<Mutex<SessionManager>>,
    pairing: Arc<Mutex<PairingMachine>>,
    arbiter: GimbalArbiter,
    hub: Arc<EventHub>,
    capabilities: Mutex<Option<ProductCapabilities>>,
    /// Local guard so one handle cannot stack gimbal-control round trips.
    request_pending: AtomicBool,
    #[allow(dead_code)]
    pumps: JoinSet<()>,
}

impl RemoteController {
    /// Connect over `transport`, identifying as `identity`, with the
    /// default arbiter tuning.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        identity: RcIdentity,
    ) -> Result<Self, RcError> {
        Self::connect_with(transport, identity, ArbiterConfig::default()).await
    }

    /// Connect with explicit arbiter tuning. Subscribes to every telemetry
    /// kind, then primes the capability and role mirrors.
    pub async fn connect_with(
        transport: Arc<dyn Transport>,
        identity: RcIdentity,
        config: ArbiterConfig,
    ) -> Result<Self, RcError> {
        info!(id = %identity.id, "connecting remote controller");
        let session = Arc::new(Mutex::new(SessionManager::new()));
        let pairing = Arc::new(Mutex::new(PairingMachine::new()));
        let arbiter = GimbalArbiter::new(identity.id, session.clone(), config);
        let hub = Arc::new(EventHub::new());

        let mut pumps = JoinSet::new();
        for kind in TELEMETRY_KINDS {
            let mut rx = transport.subscribe(kind).await?;
            let session = session.clone();
            let pairing = pairing.clone();
            let arbiter = arbiter.clone();
            let hub = hub.clone();
            pumps.spawn(async move {
                while let Some(sample) = rx.recv().await {
                    dispatch_sample(sample, &session, &pairing, &arbiter, &hub).await;
                }
                debug!(%kind, "telemetry stream closed");
            });
        }

        let controller = RemoteController {
            transport,
            identity,
            session,
            pairing,
            arbiter,
            hub,
            capabilities: Mutex::new(None),
            request_pending: AtomicBool::new(false),
            pumps,
        };
        controller.capabilities().await?;
        controller.role().await?;
        Ok(controller)
    }

    /// Identity this handle connected as.
    pub fn identity(&self) -> &RcIdentity {
        &self.identity
    }

    pub fn id(&self) -> RcId {
        self.identity.id
    }

    /// Feature support of the connected product. Queried once, then served
    /// from the cache.
    pub async fn capabilities(&self) -> Result<ProductCapabilities, RcError> {
        {
            let cache = self.capabilities.lock().await;
            if let Some(capabilities) = *cache {
                return Ok(capabilities);
            }
        }
        let reply = self.transport.send_request(Request::GetCapabilities).await?;
        let capabilities = match reply {
            Reply::Capabilities(capabilities) => capabilities,
            _ => return Err(RcError::Protocol("unexpected reply type".to_string())),
        };
        *self.capabilities.lock().await = Some(capabilities);
        self.session.lock().await.set_capabilities(capabilities);
        Ok(capabilities)
    }

    pub async fn is_master_slave_mode_supported(&self) -> Result<bool, RcError> {
        Ok(self.capabilities().await?.supports_master_slave)
    }

    pub async fn is_remote_focus_supported(&self) -> Result<bool, RcError> {
        Ok(self.capabilities().await?.supports_remote_focus)
    }

    // Identity and hardware configuration.

    /// Set the display name, at most
    /// [`RC_NAME_MAX_LEN`](crate::constants::RC_NAME_MAX_LEN) characters.
    pub async fn set_name(&self, name: &str) -> Result<(), RcError> {
        validate_name(name)?;
        match self.transport.send_request(Request::SetName(name.to_string())).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn name(&self) -> Result<String, RcError> {
        match self.transport.send_request(Request::GetName).await? {
            Reply::Name(name) => Ok(name),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Set the join password, exactly
    /// [`RC_PASSWORD_LEN`](crate::constants::RC_PASSWORD_LEN) digits.
    pub async fn set_password(&self, password: &str) -> Result<(), RcError> {
        validate_password(password)?;
        match self.transport.send_request(Request::SetPassword(password.to_string())).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn password(&self) -> Result<String, RcError> {
        match self.transport.send_request(Request::GetPassword).await? {
            Reply::Password(password) => Ok(password),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Apply a stick layout. Slave layouts go through
    /// [`set_slave_control_mode`](Self::set_slave_control_mode) instead.
    pub async fn set_control_mode(&self, mode: ControlMode) -> Result<(), RcError> {
        mode.validate()?;
        if mode.style.is_slave_style() {
            return Err(RcError::InvalidParameter(
                "control mode",
                "slave styles are set through set_slave_control_mode".to_string(),
            ));
        }
        match self.transport.send_request(Request::SetControlMode(mode)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn control_mode(&self) -> Result<ControlMode, RcError> {
        match self.transport.send_request(Request::GetControlMode).await? {
            Reply::ControlMode(mode) => Ok(mode),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Speed of the gimbal dial, 0 to 100 percent.
    pub async fn set_gimbal_dial_speed(&self, speed: u8) -> Result<(), RcError> {
        if speed > PERCENT_MAX {
            return Err(RcError::InvalidParameter(
                "gimbal dial speed",
                format!("{speed} exceeds {PERCENT_MAX}"),
            ));
        }
        match self.transport.send_request(Request::SetGimbalDialSpeed(speed)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn gimbal_dial_speed(&self) -> Result<u8, RcError> {
        match self.transport.send_request(Request::GetGimbalDialSpeed).await? {
            Reply::GimbalDialSpeed(speed) => Ok(speed),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Which gimbal axis the dial drives.
    pub async fn set_gimbal_dial_direction(
        &self,
        direction: GimbalDialDirection,
    ) -> Result<(), RcError> {
        match self.transport.send_request(Request::SetGimbalDialDirection(direction)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn gimbal_dial_direction(&self) -> Result<GimbalDialDirection, RcError> {
        match self.transport.send_request(Request::GetGimbalDialDirection).await? {
            Reply::GimbalDialDirection(direction) => Ok(direction),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Tag values reported back in hardware state for the C1/C2 buttons.
    pub async fn set_custom_button_tags(&self, custom1: u8, custom2: u8) -> Result<(), RcError> {
        match self
            .transport
            .send_request(Request::SetCustomButtonTags { custom1, custom2 })
            .await?
        {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn custom_button_tags(&self) -> Result<(u8, u8), RcError> {
        match self.transport.send_request(Request::GetCustomButtonTags).await? {
            Reply::CustomButtonTags { custom1, custom2 } => Ok((custom1, custom2)),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn set_c1_binding_enabled(&self, enabled: bool) -> Result<(), RcError> {
        match self.transport.send_request(Request::SetC1BindingEnabled(enabled)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn c1_binding_enabled(&self) -> Result<bool, RcError> {
        match self.transport.send_request(Request::GetC1BindingEnabled).await? {
            Reply::C1BindingEnabled(enabled) => Ok(enabled),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    // Aircraft pairing.

    /// Start pairing with an aircraft. Fails with
    /// [`RcError::AlreadyPairing`] while a pairing attempt is running.
    pub async fn enter_pairing(&self) -> Result<(), RcError> {
        self.pairing.lock().await.ensure_can_enter()?;
        match self.transport.send_request(Request::EnterPairing).await? {
            Reply::Ack => {
                let changed = self.pairing.lock().await.apply(PairingState::Pairing);
                if let Some(state) = changed {
                    self.hub.publish_pairing(state);
                }
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Cancel pairing. A no-op without a round trip when nothing is
    /// pairing.
    pub async fn exit_pairing(&self) -> Result<(), RcError> {
        if self.pairing.lock().await.exit_is_noop() {
            return Ok(());
        }
        match self.transport.send_request(Request::ExitPairing).await? {
            Reply::Ack => {
                let changed = self.pairing.lock().await.apply(PairingState::NotPairing);
                if let Some(state) = changed {
                    self.hub.publish_pairing(state);
                }
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Query the pairing state. A failed query marks the mirror `Unknown`
    /// before the error is returned.
    pub async fn pairing_state(&self) -> Result<PairingState, RcError> {
        let reply = match self.transport.send_request(Request::GetPairingState).await {
            Ok(reply) => reply,
            Err(err) => {
                let changed = self.pairing.lock().await.apply(PairingState::Unknown);
                if let Some(state) = changed {
                    self.hub.publish_pairing(state);
                }
                return Err(err.into());
            }
        };
        match reply {
            Reply::PairingState(state) => {
                let mut machine = self.pairing.lock().await;
                let changed = machine.apply(state);
                let current = machine.state();
                drop(machine);
                if let Some(state) = changed {
                    self.hub.publish_pairing(state);
                }
                Ok(current)
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    // Role and session management.

    /// Query the hardware role and reconcile the mirror with it. The flag
    /// reports whether the unit sees a live aircraft link.
    pub async fn role(&self) -> Result<(Role, bool), RcError> {
        match self.transport.send_request(Request::GetRole).await? {
            Reply::Role { role, connected } => {
                self.apply_role(role).await;
                Ok((role, connected))
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Switch role. `Master` and `Slave` require master/slave support.
    /// Leaving `Master` detaches every admitted slave and settles their
    /// pending gimbal requests.
    pub async fn set_role(&self, role: Role) -> Result<(), RcError> {
        if role == Role::Unknown {
            return Err(RcError::InvalidParameter(
                "role",
                "Unknown is not a settable role".to_string(),
            ));
        }
        if matches!(role, Role::Master | Role::Slave) {
            self.ensure_master_slave_supported().await?;
        }
        match self.transport.send_request(Request::SetRole(role)).await? {
            Reply::Ack => {
                info!(%role, "role changed");
                self.apply_role(role).await;
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Slaves currently attached, with their current permissions. The
    /// session mirror is resynchronized against the hardware's list.
    pub async fn slave_list(&self) -> Result<Vec<RcIdentity>, RcError> {
        self.ensure_role(Role::Master, "listing slaves").await?;
        match self.transport.send_request(Request::GetSlaveList).await? {
            Reply::SlaveList(list) => {
                let (added, removed) = self.session.lock().await.replace_slaves(list);
                for identity in added {
                    self.hub.publish_session(SessionEvent::SlaveJoined(identity));
                }
                for id in removed {
                    self.arbiter.detach(id).await;
                    self.hub.publish_session(SessionEvent::SlaveLeft(id));
                }
                // The wire list carries whatever permission bits the
                // firmware last saw; the arbiter's holder wins.
                let holder = self.arbiter.holder().await;
                let mut session = self.session.lock().await;
                session.set_gimbal_holder(holder);
                Ok(session.slaves())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Kick a slave out of the session. Removing an id that is not
    /// attached succeeds without effect.
    pub async fn remove_slave(&self, id: RcId) -> Result<(), RcError> {
        self.ensure_role(Role::Master, "removing a slave").await?;
        match self.transport.send_request(Request::RemoveSlave { id }).await? {
            Reply::Ack => {
                let removed = self.session.lock().await.remove_slave(id);
                self.arbiter.detach(id).await;
                if removed.is_some() {
                    info!(slave = %id, "slave removed");
                    self.hub.publish_session(SessionEvent::SlaveLeft(id));
                }
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Leave the master `id`. A no-op when not attached, or when attached
    /// to a different master.
    pub async fn remove_master(&self, id: RcId) -> Result<(), RcError> {
        let joined = self.session.lock().await.joined_master();
        match joined {
            Some(master) if master.id == id => {}
            _ => return Ok(()),
        }
        match self.transport.send_request(Request::RemoveMaster { id }).await? {
            Reply::Ack => {
                self.session.lock().await.master_lost();
                info!(master = %id, "left master");
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    // Master discovery and joining.

    /// Start scanning for masters in range. Fails with
    /// [`RcError::SearchAlreadyActive`] while a scan is running.
    pub async fn start_master_search(&self) -> Result<(), RcError> {
        self.ensure_master_slave_supported().await?;
        if self.session.lock().await.search_state() == MasterSearchState::Active {
            return Err(RcError::SearchAlreadyActive);
        }
        match self.transport.send_request(Request::StartMasterSearch).await? {
            Reply::Ack => self.session.lock().await.start_search(),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Stop the scan, keeping results readable. A no-op without a round
    /// trip when no scan is running.
    pub async fn stop_master_search(&self) -> Result<(), RcError> {
        if self.session.lock().await.search_state() != MasterSearchState::Active {
            return Ok(());
        }
        match self.transport.send_request(Request::StopMasterSearch).await? {
            Reply::Ack => {
                self.session.lock().await.stop_search();
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Scan lifecycle, reconciled against the hardware. The firmware stops
    /// a scan on its own after a while, so the mirror follows the wire.
    pub async fn search_state(&self) -> Result<MasterSearchState, RcError> {
        match self.transport.send_request(Request::GetSearchState).await? {
            Reply::SearchState { active } => {
                let mut session = self.session.lock().await;
                if !active {
                    session.stop_search();
                } else if session.search_state() != MasterSearchState::Active {
                    let _ = session.start_search();
                }
                Ok(session.search_state())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Masters discovered so far. Empty before the first scan.
    pub async fn available_masters(&self) -> Vec<RcIdentity> {
        self.session.lock().await.available_masters()
    }

    /// Ask `id` to accept this controller as a slave. Negative outcomes
    /// (wrong password, table full, no answer) are values, not errors.
    pub async fn join_master(
        &self,
        id: RcId,
        name: &str,
        password: &str,
    ) -> Result<JoinMasterResult, RcError> {
        self.ensure_master_slave_supported().await?;
        validate_password(password)?;
        let request = Request::JoinMaster {
            id,
            name: name.to_string(),
            password: password.to_string(),
        };
        match self.transport.send_request(request).await? {
            Reply::JoinMaster(result) => {
                if result == JoinMasterResult::Successful {
                    info!(master = %id, "joined master");
                }
                self.session.lock().await.record_join(
                    RcIdentity::new(id).with_name(name),
                    password,
                    result,
                );
                Ok(result)
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Credentials of the joined master, if this controller is a slave.
    pub async fn joined_master(&self) -> Option<JoinedMaster> {
        self.session.lock().await.joined_master()
    }

    // Gimbal control arbitration, master side.

    /// Requests awaiting a decision, oldest first.
    pub async fn pending_gimbal_requests(&self) -> Vec<GimbalControlRequest> {
        self.arbiter.pending().await
    }

    /// Current holder of the gimbal unit.
    pub async fn gimbal_holder(&self) -> RcId {
        self.arbiter.holder().await
    }

    /// The permission set this controller itself operates under, derived
    /// from its role and whether it holds the gimbal unit. A master that
    /// granted the gimbal away keeps the camera; a slave holds nothing
    /// until a grant comes through.
    pub async fn own_permissions(&self) -> ControlPermission {
        let role = self.session.lock().await.role();
        let holds = self.arbiter.holds_gimbal(self.identity.id).await;
        match (role, holds) {
            (Role::Master, true) => ControlPermission::master_defaults(),
            (Role::Master, false) => ControlPermission::camera_only(),
            (_, true) => ControlPermission::gimbal_only(),
            (_, false) => ControlPermission::none(),
        }
    }

    /// Answer a pending request. Granting hands the gimbal to the
    /// requester; the previous holder loses it in the same step. Answering
    /// a request that already settled is a no-op.
    pub async fn respond_to_gimbal_request(
        &self,
        requester: RcId,
        agree: bool,
    ) -> Result<(), RcError> {
        self.ensure_role(Role::Master, "responding to a gimbal request").await?;
        let request = Request::RespondGimbalRequest { requester, agree };
        match self.transport.send_request(request).await? {
            Reply::Ack => {
                if !self.arbiter.respond(requester, agree).await {
                    debug!(%requester, "response matched no pending request");
                }
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Take the gimbal back from whichever slave holds it. A no-op when
    /// the master already holds it.
    pub async fn revoke_gimbal_control(&self) -> Result<(), RcError> {
        self.ensure_role(Role::Master, "revoking gimbal control").await?;
        let holder = self.arbiter.holder().await;
        if holder == self.identity.id {
            return Ok(());
        }
        match self.transport.send_request(Request::RevokeGimbalControl { holder }).await? {
            Reply::Ack => {
                self.arbiter.revoke().await;
                Ok(())
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    // Gimbal control, slave side.

    /// Ask the master for gimbal control and wait for the outcome. The
    /// round trip stays open until the master decides or its response
    /// window lapses, so expect to wait.
    pub async fn request_gimbal_control(&self) -> Result<GimbalControlResult, RcError> {
        self.ensure_master_slave_supported().await?;
        if self.session.lock().await.joined_master().is_none() {
            return Err(RcError::NotAttached(self.identity.id));
        }
        if self.request_pending.swap(true, Ordering::SeqCst) {
            return Err(RcError::RequestAlreadyPending);
        }
        let outcome = self.transport.send_request(Request::RequestGimbalControl).await;
        self.request_pending.store(false, Ordering::SeqCst);
        match outcome? {
            Reply::GimbalControl(result) => {
                info!(%result, "gimbal control request answered");
                Ok(result)
            }
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Stick layout used while acting as a slave. The style must be one of
    /// the slave styles.
    pub async fn set_slave_control_mode(&self, mode: ControlMode) -> Result<(), RcError> {
        mode.validate()?;
        if !mode.style.is_slave_style() {
            return Err(RcError::InvalidParameter(
                "control mode",
                "expected a slave control style".to_string(),
            ));
        }
        self.ensure_role(Role::Slave, "configuring the slave control mode").await?;
        match self.transport.send_request(Request::SetSlaveControlMode(mode)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn slave_control_mode(&self) -> Result<ControlMode, RcError> {
        match self.transport.send_request(Request::GetSlaveControlMode).await? {
            Reply::ControlMode(mode) => Ok(mode),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    /// Gimbal slew speed applied to this slave's joystick input.
    pub async fn set_slave_joystick_gimbal_speed(
        &self,
        speed: GimbalControlSpeed,
    ) -> Result<(), RcError> {
        speed.validate()?;
        self.ensure_role(Role::Slave, "configuring the slave gimbal speed").await?;
        match self.transport.send_request(Request::SetSlaveJoystickGimbalSpeed(speed)).await? {
            Reply::Ack => Ok(()),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    pub async fn slave_joystick_gimbal_speed(&self) -> Result<GimbalControlSpeed, RcError> {
        match self.transport.send_request(Request::GetSlaveJoystickGimbalSpeed).await? {
            Reply::SlaveGimbalSpeed(speed) => Ok(speed),
            _ => Err(RcError::Protocol("unexpected reply type".to_string())),
        }
    }

    // Subscriptions. All channels are best effort: a subscriber that falls
    // behind loses the oldest items.

    pub fn subscribe_hardware_state(&self) -> broadcast::Receiver<HardwareState> {
        self.hub.subscribe_hardware_state()
    }

    pub fn subscribe_gps(&self) -> broadcast::Receiver<GpsData> {
        self.hub.subscribe_gps()
    }

    pub fn subscribe_battery(&self) -> broadcast::Receiver<BatteryInfo> {
        self.hub.subscribe_battery()
    }

    pub fn subscribe_remote_focus(&self) -> broadcast::Receiver<RemoteFocusState> {
        self.hub.subscribe_remote_focus()
    }

    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.hub.subscribe_session_events()
    }

    pub fn subscribe_pairing_updates(&self) -> broadcast::Receiver<PairingState> {
        self.hub.subscribe_pairing_updates()
    }

    /// Pending-set and holder changes of the gimbal arbiter.
    pub fn subscribe_gimbal_requests(&self) -> broadcast::Receiver<ArbiterEvent> {
        self.arbiter.subscribe()
    }

    // Internal helpers.

    async fn ensure_master_slave_supported(&self) -> Result<(), RcError> {
        if self.capabilities().await?.supports_master_slave {
            Ok(())
        } else {
            Err(RcError::UnsupportedByProduct)
        }
    }

    async fn ensure_role(&self, required: Role, operation: &'static str) -> Result<(), RcError> {
        let current = self.session.lock().await.role();
        if current == required {
            Ok(())
        } else {
            Err(RcError::InvalidParameter(
                "role",
                format!("{operation} requires the {required} role, current role is {current}"),
            ))
        }
    }

    /// Reconcile the session mirror with a confirmed role, settling
    /// whatever the transition detached.
    async fn apply_role(&self, role: Role) {
        let transition = self.session.lock().await.set_role(role);
        for identity in transition.detached {
            self.arbiter.detach(identity.id).await;
            self.hub.publish_session(SessionEvent::SlaveLeft(identity.id));
        }
    }
}

async fn dispatch_sample(
    sample: TelemetrySample,
    session: &Mutex<SessionManager>,
    pairing: &Mutex<PairingMachine>,
    arbiter: &GimbalArbiter,
    hub: &EventHub,
) {
    match sample {
        TelemetrySample::HardwareState(state) => hub.publish_hardware_state(state),
        TelemetrySample::Gps(data) => hub.publish_gps(data),
        TelemetrySample::Battery(info) => hub.publish_battery(info),
        TelemetrySample::RemoteFocus(state) => hub.publish_remote_focus(state),
        TelemetrySample::GimbalRequest(requester) => {
            if let Err(err) = arbiter.register(requester).await {
                debug!(%err, "dropping gimbal request push");
            }
        }
        TelemetrySample::Session(event) => {
            handle_session_event(event, session, arbiter, hub).await;
        }
        TelemetrySample::Pairing(state) => {
            let changed = pairing.lock().await.apply(state);
            if let Some(state) = changed {
                hub.publish_pairing(state);
            }
        }
    }
}

async fn handle_session_event(
    event: SessionEvent,
    session: &Mutex<SessionManager>,
    arbiter: &GimbalArbiter,
    hub: &EventHub,
) {
    match event {
        SessionEvent::DiscoveredMaster(identity) => {
            let fresh = session.lock().await.record_discovery(identity);
            if let Some(identity) = fresh {
                hub.publish_session(SessionEvent::DiscoveredMaster(identity));
            }
        }
        SessionEvent::SlaveJoined(identity) => {
            let outcome = session.lock().await.admit_slave(identity.clone());
            match outcome {
                AdmitOutcome::Admitted => {
                    info!(slave = %identity.id, "slave joined");
                    hub.publish_session(SessionEvent::SlaveJoined(identity));
                }
                AdmitOutcome::Refreshed => {}
                AdmitOutcome::Full => {
                    warn!(slave = %identity.id, "join push exceeds the slave limit, ignored");
                }
                AdmitOutcome::NotMaster => {
                    debug!(slave = %identity.id, "join push while not master, ignored");
                }
            }
        }
        SessionEvent::SlaveLeft(id) => {
            let removed = session.lock().await.remove_slave(id);
            arbiter.detach(id).await;
            if removed.is_some() {
                hub.publish_session(SessionEvent::SlaveLeft(id));
            }
        }
        SessionEvent::MasterDisconnected => {
            session.lock().await.master_lost();
            hub.publish_session(SessionEvent::MasterDisconnected);
        }
    }
}

fn validate_name(name: &str) -> Result<(), RcError> {
    if name.is_empty() || name.chars().count() > RC_NAME_MAX_LEN {
        return Err(RcError::InvalidParameter(
            "name",
            format!("must be 1 to {RC_NAME_MAX_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), RcError> {
    if password.len() != RC_PASSWORD_LEN || !password.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RcError::InvalidParameter(
            "password",
            format!("must be exactly {RC_PASSWORD_LEN} digits"),
        ));
    }
    Ok(())
}
