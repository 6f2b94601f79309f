//! Role and membership bookkeeping for master/slave coordination.
//!
//! [`SessionManager`] is the synchronous core: it mirrors the role the
//! hardware last confirmed, the admitted slaves while acting as master and
//! the discovery results while acting as slave. All wire traffic stays in
//! the device layer.

use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::debug;

use crate::constants::DEFAULT_MAX_SLAVES;
use crate::error::RcError;
use crate::identity::{Directory, RcId, RcIdentity};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Operating role of a remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Role {
    /// Controls the aircraft and arbitrates gimbal control among slaves.
    Master = 0,
    /// Attached to a master; flies nothing, may hold gimbal control.
    Slave = 1,
    /// Standalone operation, no master/slave coordination.
    Normal = 2,
    #[num_enum(default)]
    Unknown = 3,
}

/// Outcome of a join attempt, as reported by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum JoinMasterResult {
    Successful = 0,
    PasswordError = 1,
    Rejected = 2,
    /// The master already has its maximum number of slaves.
    ReachMaximum = 3,
    ResponseTimeout = 4,
    #[num_enum(default)]
    Unknown = 5,
}

/// Feature support reported by the hardware. Everything defaults to
/// unsupported until a capability query has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProductCapabilities {
    pub supports_master_slave: bool,
    pub supports_remote_focus: bool,
    pub max_slaves: usize,
}

impl Default for ProductCapabilities {
    fn default() -> Self {
        ProductCapabilities {
            supports_master_slave: false,
            supports_remote_focus: false,
            max_slaves: DEFAULT_MAX_SLAVES,
        }
    }
}

/// Credentials of the master this controller joined as a slave.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinedMaster {
    pub id: RcId,
    pub name: String,
    pub password: String,
}

/// Membership and discovery changes, pushed to session subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionEvent {
    /// A master answered the search broadcast.
    DiscoveredMaster(RcIdentity),
    /// A slave was admitted by this master.
    SlaveJoined(RcIdentity),
    /// A slave was removed or detached from this master.
    SlaveLeft(RcId),
    /// The master this slave was attached to is gone.
    MasterDisconnected,
}

/// Lifecycle of the master discovery scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MasterSearchState {
    /// No scan has run since the current role was entered.
    Idle,
    /// Scan running, discoveries are being collected.
    Active,
    /// Scan stopped, results remain readable.
    Stopped,
}

/// What happened to a slave asking to be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// New slave, recorded.
    Admitted,
    /// Already attached, identity refreshed.
    Refreshed,
    /// Slave list is at the capability limit.
    Full,
    /// This controller is not acting as master.
    NotMaster,
}

/// Result of a role change, carrying the slaves that were detached by it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleTransition {
    pub role: Role,
    /// Slaves that lost their session because the master role was left.
    pub detached: Vec<RcIdentity>,
}

#[derive(Debug)]
pub struct SessionManager {
    role: Role,
    capabilities: ProductCapabilities,
    slaves: Directory,
    discovered: Directory,
    search: MasterSearchState,
    joined_master: Option<JoinedMaster>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            role: Role::Unknown,
            capabilities: ProductCapabilities::default(),
            slaves: Directory::new(),
            discovered: Directory::new(),
            search: MasterSearchState::Idle,
            joined_master: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn capabilities(&self) -> ProductCapabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: ProductCapabilities) {
        self.capabilities = capabilities;
    }

    /// Apply a confirmed role change.
    ///
    /// Leaving `Master` detaches every admitted slave; leaving `Slave`
    /// forgets the joined master. Discovery results belong to the old
    /// role's context and are dropped either way.
    pub fn set_role(&mut self, role: Role) -> RoleTransition {
        if role == self.role {
            return RoleTransition { role, detached: Vec::new() };
        }
        let detached = if self.role == Role::Master {
            let detached = self.slaves.to_vec();
            self.slaves.clear();
            detached
        } else {
            Vec::new()
        };
        if self.role == Role::Slave {
            self.joined_master = None;
        }
        self.search = MasterSearchState::Idle;
        self.discovered.clear();
        self.role = role;
        RoleTransition { role, detached }
    }

    /// True while `id` is an admitted slave of this master.
    pub fn is_attached(&self, id: RcId) -> bool {
        self.role == Role::Master && self.slaves.contains(id)
    }

    pub fn slaves(&self) -> Vec<RcIdentity> {
        self.slaves.to_vec()
    }

    pub fn slave_count(&self) -> usize {
        self.slaves.len()
    }

    /// Record a slave the hardware reports as joined. Re-admitting an
    /// attached slave refreshes its identity instead of counting twice.
    pub fn admit_slave(&mut self, identity: RcIdentity) -> AdmitOutcome {
        if self.role != Role::Master {
            return AdmitOutcome::NotMaster;
        }
        if self.slaves.contains(identity.id) {
            self.slaves.upsert(identity);
            return AdmitOutcome::Refreshed;
        }
        if self.slaves.len() >= self.capabilities.max_slaves {
            return AdmitOutcome::Full;
        }
        self.slaves.upsert(identity);
        AdmitOutcome::Admitted
    }

    /// Drop a slave from the session. Removing an unknown id is a no-op.
    pub fn remove_slave(&mut self, id: RcId) -> Option<RcIdentity> {
        self.slaves.remove(id)
    }

    /// Mirror a gimbal transfer into the slave table: exactly the entry
    /// matching `holder` carries the unit afterwards. The master's own id
    /// has no entry, so it clears the unit everywhere.
    pub fn set_gimbal_holder(&mut self, holder: RcId) {
        self.slaves.set_gimbal_holder(holder);
    }

    /// Resynchronize the slave set with the list the hardware reports.
    /// Returns the slaves that appeared and the ids that disappeared.
    pub fn replace_slaves(&mut self, list: Vec<RcIdentity>) -> (Vec<RcIdentity>, Vec<RcId>) {
        let mut incoming = Directory::new();
        for identity in list {
            incoming.upsert(identity);
        }
        let added: Vec<RcIdentity> = incoming
            .to_vec()
            .into_iter()
            .filter(|slave| !self.slaves.contains(slave.id))
            .collect();
        let removed: Vec<RcId> = self
            .slaves
            .ids()
            .into_iter()
            .filter(|id| !incoming.contains(*id))
            .collect();
        self.slaves = incoming;
        (added, removed)
    }

    pub fn search_state(&self) -> MasterSearchState {
        self.search
    }

    pub fn start_search(&mut self) -> Result<(), RcError> {
        if self.search == MasterSearchState::Active {
            return Err(RcError::SearchAlreadyActive);
        }
        self.discovered.clear();
        self.search = MasterSearchState::Active;
        Ok(())
    }

    /// Stop the scan, keeping its results. Returns false when no scan was
    /// running, so callers can skip the hardware round trip.
    pub fn stop_search(&mut self) -> bool {
        if self.search == MasterSearchState::Active {
            self.search = MasterSearchState::Stopped;
            true
        } else {
            false
        }
    }

    /// Record a master that answered the scan. Returns the identity when it
    /// is a new discovery; refreshes of an already-listed master stay quiet.
    /// Reports arriving while no scan is active are dropped.
    pub fn record_discovery(&mut self, identity: RcIdentity) -> Option<RcIdentity> {
        if self.search != MasterSearchState::Active {
            debug!(id = %identity.id, "discovery report outside an active search, dropped");
            return None;
        }
        let is_new = !self.discovered.contains(identity.id);
        self.discovered.upsert(identity.clone());
        is_new.then_some(identity)
    }

    /// Masters found so far. Empty before the first scan of this role.
    pub fn available_masters(&self) -> Vec<RcIdentity> {
        self.discovered.to_vec()
    }

    /// Record the outcome of a join attempt. A success makes this
    /// controller a slave of `master` and caches the credentials.
    pub fn record_join(&mut self, master: RcIdentity, password: &str, result: JoinMasterResult) {
        if result != JoinMasterResult::Successful {
            return;
        }
        self.joined_master = Some(JoinedMaster {
            id: master.id,
            name: master.name.clone().unwrap_or_default(),
            password: password.to_string(),
        });
        self.role = Role::Slave;
    }

    pub fn joined_master(&self) -> Option<JoinedMaster> {
        self.joined_master.clone()
    }

    /// Forget the joined master after it disconnected or removed us.
    pub fn master_lost(&mut self) {
        self.joined_master = None;
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(id: u32, name: &str) -> RcIdentity {
        RcIdentity::new(RcId(id)).with_name(name)
    }

    fn master_session(max_slaves: usize) -> SessionManager {
        let mut session = SessionManager::new();
        session.set_capabilities(ProductCapabilities {
            supports_master_slave: true,
            supports_remote_focus: false,
            max_slaves,
        });
        session.set_role(Role::Master);
        session
    }

    #[test]
    fn test_leaving_master_detaches_all_slaves() {
        let mut session = master_session(3);
        session.admit_slave(rc(2, "BRAVO"));
        session.admit_slave(rc(3, "CHARLY"));

        let transition = session.set_role(Role::Normal);
        assert_eq!(transition.role, Role::Normal);
        let detached: Vec<RcId> = transition.detached.iter().map(|s| s.id).collect();
        assert_eq!(detached, vec![RcId(2), RcId(3)]);
        assert_eq!(session.slave_count(), 0);
        assert!(!session.is_attached(RcId(2)));
    }

    #[test]
    fn test_same_role_transition_is_a_noop() {
        let mut session = master_session(3);
        session.admit_slave(rc(2, "BRAVO"));
        let transition = session.set_role(Role::Master);
        assert!(transition.detached.is_empty());
        assert_eq!(session.slave_count(), 1, "slaves must survive a same-role set");
    }

    #[test]
    fn test_admit_refreshes_attached_slave() {
        let mut session = master_session(1);
        assert_eq!(session.admit_slave(rc(2, "BRAVO")), AdmitOutcome::Admitted);
        assert_eq!(
            session.admit_slave(rc(2, "BRAVO2").with_signal_quality(80)),
            AdmitOutcome::Refreshed
        );
        assert_eq!(session.slave_count(), 1);
        assert_eq!(session.slaves()[0].signal_quality, 80);
    }

    #[test]
    fn test_admit_rejects_beyond_limit() {
        let mut session = master_session(2);
        session.admit_slave(rc(2, "BRAVO"));
        session.admit_slave(rc(3, "CHARLY"));
        assert_eq!(session.admit_slave(rc(4, "DELTA")), AdmitOutcome::Full);
        assert_eq!(session.slave_count(), 2);
    }

    #[test]
    fn test_admit_requires_master_role() {
        let mut session = SessionManager::new();
        session.set_role(Role::Normal);
        assert_eq!(session.admit_slave(rc(2, "BRAVO")), AdmitOutcome::NotMaster);
    }

    #[test]
    fn test_search_lifecycle() {
        let mut session = SessionManager::new();
        session.set_role(Role::Slave);
        assert_eq!(session.search_state(), MasterSearchState::Idle);

        session.start_search().unwrap();
        assert!(matches!(session.start_search(), Err(RcError::SearchAlreadyActive)));

        assert!(session.record_discovery(rc(9, "ALPHA")).is_some());
        assert!(session.stop_search());
        assert!(!session.stop_search(), "stopping twice must be a no-op");
        assert_eq!(session.search_state(), MasterSearchState::Stopped);
        assert_eq!(session.available_masters().len(), 1, "results survive the stop");
    }

    #[test]
    fn test_discovery_outside_active_search_is_dropped() {
        let mut session = SessionManager::new();
        session.set_role(Role::Slave);
        assert!(session.record_discovery(rc(9, "ALPHA")).is_none());
        assert!(session.available_masters().is_empty());
    }

    #[test]
    fn test_rediscovery_is_deduplicated() {
        let mut session = SessionManager::new();
        session.set_role(Role::Slave);
        session.start_search().unwrap();
        assert!(session.record_discovery(rc(9, "ALPHA")).is_some());
        assert!(session.record_discovery(rc(9, "ALPHA").with_signal_quality(50)).is_none());
        assert_eq!(session.available_masters().len(), 1);
        assert_eq!(session.available_masters()[0].signal_quality, 50, "refresh must still apply");
    }

    #[test]
    fn test_new_search_clears_previous_results() {
        let mut session = SessionManager::new();
        session.set_role(Role::Slave);
        session.start_search().unwrap();
        session.record_discovery(rc(9, "ALPHA"));
        session.stop_search();
        session.start_search().unwrap();
        assert!(session.available_masters().is_empty());
    }

    #[test]
    fn test_available_masters_empty_before_first_search() {
        let session = SessionManager::new();
        assert!(session.available_masters().is_empty());
    }

    #[test]
    fn test_failed_join_leaves_no_master() {
        let mut session = SessionManager::new();
        session.set_role(Role::Normal);
        session.record_join(rc(9, "ALPHA"), "1234", JoinMasterResult::PasswordError);
        assert!(session.joined_master().is_none());
        assert_eq!(session.role(), Role::Normal);
    }

    #[test]
    fn test_successful_join_records_credentials_and_role() {
        let mut session = SessionManager::new();
        session.set_role(Role::Normal);
        session.record_join(rc(9, "ALPHA"), "1234", JoinMasterResult::Successful);
        let master = session.joined_master().expect("join must record the master");
        assert_eq!(master.id, RcId(9));
        assert_eq!(master.name, "ALPHA");
        assert_eq!(master.password, "1234");
        assert_eq!(session.role(), Role::Slave);
    }

    #[test]
    fn test_leaving_slave_forgets_master() {
        let mut session = SessionManager::new();
        session.record_join(rc(9, "ALPHA"), "1234", JoinMasterResult::Successful);
        session.set_role(Role::Normal);
        assert!(session.joined_master().is_none());
    }

    #[test]
    fn test_replace_slaves_reports_diff() {
        let mut session = master_session(3);
        session.admit_slave(rc(2, "BRAVO"));
        session.admit_slave(rc(3, "CHARLY"));

        let (added, removed) = session.replace_slaves(vec![rc(3, "CHARLY"), rc(4, "DELTA")]);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, RcId(4));
        assert_eq!(removed, vec![RcId(2)]);
        assert_eq!(session.slave_count(), 2);
    }

    #[test]
    fn test_gimbal_holder_is_exclusive_in_the_slave_table() {
        let mut session = master_session(3);
        session.admit_slave(rc(2, "BRAVO"));
        session.admit_slave(rc(3, "CHARLY"));

        session.set_gimbal_holder(RcId(2));
        let slaves = session.slaves();
        assert!(slaves[0].permissions.has_full_gimbal());
        assert!(!slaves[1].permissions.has_any_gimbal());

        // The master's own id has no entry: everything clears.
        session.set_gimbal_holder(RcId(1));
        assert!(session.slaves().iter().all(|s| !s.permissions.has_any_gimbal()));
    }

    #[test]
    fn test_unlisted_role_code_maps_to_unknown() {
        assert_eq!(Role::from(9u8), Role::Unknown);
        assert_eq!(JoinMasterResult::from(9u8), JoinMasterResult::Unknown);
    }
}
