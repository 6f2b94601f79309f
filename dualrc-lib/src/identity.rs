use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Factory-assigned unique identifier of a remote controller. Burned in
/// during manufacturing, never changes for the lifetime of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RcId(pub u32);

impl RcId {
    pub const fn new(raw: u32) -> Self {
        RcId(raw)
    }
}

impl fmt::Display for RcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RcId {
    fn from(raw: u32) -> Self {
        RcId(raw)
    }
}

/// Per-capability control grants of one remote controller.
///
/// The three gimbal axes are brokered as a single unit between the master
/// and at most one slave; the camera rights stay with the master and are
/// never delegated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPermission {
    pub gimbal_yaw: bool,
    pub gimbal_roll: bool,
    pub gimbal_pitch: bool,
    pub playback: bool,
    pub record: bool,
    pub capture: bool,
}

impl ControlPermission {
    /// No grants at all. The state of a freshly joined slave.
    pub const fn none() -> Self {
        ControlPermission {
            gimbal_yaw: false,
            gimbal_roll: false,
            gimbal_pitch: false,
            playback: false,
            record: false,
            capture: false,
        }
    }

    /// Everything granted. The master's state while it holds the gimbal.
    pub const fn master_defaults() -> Self {
        ControlPermission {
            gimbal_yaw: true,
            gimbal_roll: true,
            gimbal_pitch: true,
            playback: true,
            record: true,
            capture: true,
        }
    }

    /// Camera rights only; the master's state after delegating the gimbal.
    pub const fn camera_only() -> Self {
        ControlPermission {
            gimbal_yaw: false,
            gimbal_roll: false,
            gimbal_pitch: false,
            playback: true,
            record: true,
            capture: true,
        }
    }

    /// The full gimbal unit without any camera rights; the state of a
    /// slave that currently holds the gimbal.
    pub const fn gimbal_only() -> Self {
        ControlPermission {
            gimbal_yaw: true,
            gimbal_roll: true,
            gimbal_pitch: true,
            playback: false,
            record: false,
            capture: false,
        }
    }

    /// Same grants with the gimbal unit set or cleared as a whole.
    pub const fn with_gimbal(mut self, granted: bool) -> Self {
        self.gimbal_yaw = granted;
        self.gimbal_roll = granted;
        self.gimbal_pitch = granted;
        self
    }

    /// True when all three gimbal axes are granted.
    pub fn has_full_gimbal(&self) -> bool {
        self.gimbal_yaw && self.gimbal_roll && self.gimbal_pitch
    }

    /// True when any gimbal axis is granted. The protocol only ever grants
    /// the axes as a unit, so this differing from [`has_full_gimbal`]
    /// indicates corrupted state.
    ///
    /// [`has_full_gimbal`]: ControlPermission::has_full_gimbal
    pub fn has_any_gimbal(&self) -> bool {
        self.gimbal_yaw || self.gimbal_roll || self.gimbal_pitch
    }
}

/// Everything the SDK knows about one remote controller: the immutable id,
/// the user-settable name and password, the last reported signal quality in
/// percent and the current control grants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RcIdentity {
    pub id: RcId,
    pub name: Option<String>,
    pub password: Option<String>,
    /// Signal quality of the RC-to-RC link in percent [0, 100].
    pub signal_quality: u8,
    pub permissions: ControlPermission,
}

impl RcIdentity {
    pub fn new(id: RcId) -> Self {
        RcIdentity {
            id,
            name: None,
            password: None,
            signal_quality: 0,
            permissions: ControlPermission::none(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_signal_quality(mut self, quality: u8) -> Self {
        self.signal_quality = quality;
        self
    }
}

/// Id-keyed set of known remote controllers.
///
/// Used for both master-search results and the attached-slave table; a
/// repeated report for a known id refreshes the mutable fields instead of
/// creating a duplicate entry.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: BTreeMap<RcId, RcIdentity>,
}

impl Directory {
    pub fn new() -> Self {
        Directory::default()
    }

    /// Insert or refresh an identity. An existing record keeps its password
    /// if the report carries none (discovery reports never include one).
    pub fn upsert(&mut self, identity: RcIdentity) {
        match self.entries.get_mut(&identity.id) {
            Some(existing) => {
                if identity.name.is_some() {
                    existing.name = identity.name;
                }
                if identity.password.is_some() {
                    existing.password = identity.password;
                }
                existing.signal_quality = identity.signal_quality;
                existing.permissions = identity.permissions;
            }
            None => {
                self.entries.insert(identity.id, identity);
            }
        }
    }

    pub fn remove(&mut self, id: RcId) -> Option<RcIdentity> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: RcId) -> Option<&RcIdentity> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: RcId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<RcId> {
        self.entries.keys().copied().collect()
    }

    /// All entries ordered by id.
    pub fn to_vec(&self) -> Vec<RcIdentity> {
        self.entries.values().cloned().collect()
    }

    /// Rewrite every entry's gimbal unit so that exactly the entry matching
    /// `holder` carries it. An id without an entry (the master itself)
    /// clears the unit everywhere.
    pub fn set_gimbal_holder(&mut self, holder: RcId) {
        for entry in self.entries.values_mut() {
            entry.permissions = entry.permissions.with_gimbal(entry.id == holder);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
