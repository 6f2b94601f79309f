//! Pairing between the remote controller and an aircraft.

use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::warn;

use crate::error::RcError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Progress of aircraft pairing as last reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum PairingState {
    /// Not pairing. The idle state.
    NotPairing = 0,
    /// Pairing is in progress.
    Pairing = 1,
    /// The last pairing attempt finished successfully.
    Completed = 2,
    /// State could not be read from the hardware.
    #[num_enum(default)]
    Unknown = 3,
}

/// Local mirror of the pairing state with the legal-transition rules.
///
/// The hardware owns the real state; this tracks the last confirmed value
/// so callers can be rejected or short-circuited without a round trip.
#[derive(Debug)]
pub struct PairingMachine {
    state: PairingState,
}

impl PairingMachine {
    pub fn new() -> Self {
        PairingMachine { state: PairingState::Unknown }
    }

    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Reject re-entry while a pairing attempt is already running.
    /// Entering from any other state, `Unknown` included, is allowed.
    pub fn ensure_can_enter(&self) -> Result<(), RcError> {
        if self.state == PairingState::Pairing {
            Err(RcError::AlreadyPairing)
        } else {
            Ok(())
        }
    }

    /// True when an exit request would be a no-op on the hardware.
    pub fn exit_is_noop(&self) -> bool {
        self.state == PairingState::NotPairing
    }

    /// Record a state confirmed by the hardware, either as a command ack or
    /// an unsolicited push. Returns the new state when it changed.
    ///
    /// `Completed` is only reachable from `Pairing`; a completion seen in
    /// any other state is a stale push and is dropped.
    pub fn apply(&mut self, observed: PairingState) -> Option<PairingState> {
        if observed == PairingState::Completed && self.state != PairingState::Pairing {
            warn!(current = %self.state, "ignoring stale pairing completion");
            return None;
        }
        if observed == self.state {
            return None;
        }
        self.state = observed;
        Some(observed)
    }
}

impl Default for PairingMachine {
    fn default() -> Self {
        PairingMachine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_allowed_from_idle_completed_and_unknown() {
        let mut machine = PairingMachine::new();
        assert!(machine.ensure_can_enter().is_ok(), "Unknown must allow entering");

        machine.apply(PairingState::Pairing);
        machine.apply(PairingState::NotPairing);
        assert!(machine.ensure_can_enter().is_ok(), "NotPairing must allow entering");

        machine.apply(PairingState::Pairing);
        machine.apply(PairingState::Completed);
        assert!(machine.ensure_can_enter().is_ok(), "Completed must allow entering");
    }

    #[test]
    fn test_reenter_while_pairing_is_rejected() {
        let mut machine = PairingMachine::new();
        machine.apply(PairingState::Pairing);
        assert!(matches!(machine.ensure_can_enter(), Err(RcError::AlreadyPairing)));
    }

    #[test]
    fn test_stale_completion_is_dropped() {
        let mut machine = PairingMachine::new();
        machine.apply(PairingState::NotPairing);
        assert_eq!(machine.apply(PairingState::Completed), None);
        assert_eq!(machine.state(), PairingState::NotPairing);
    }

    #[test]
    fn test_completion_from_pairing_applies() {
        let mut machine = PairingMachine::new();
        machine.apply(PairingState::Pairing);
        assert_eq!(machine.apply(PairingState::Completed), Some(PairingState::Completed));
        assert_eq!(machine.state(), PairingState::Completed);
    }

    #[test]
    fn test_apply_same_state_reports_no_change() {
        let mut machine = PairingMachine::new();
        machine.apply(PairingState::Pairing);
        assert_eq!(machine.apply(PairingState::Pairing), None);
    }

    #[test]
    fn test_exit_is_noop_only_when_not_pairing() {
        let mut machine = PairingMachine::new();
        assert!(!machine.exit_is_noop(), "Unknown state still needs a round trip");
        machine.apply(PairingState::NotPairing);
        assert!(machine.exit_is_noop());
    }

    #[test]
    fn test_unlisted_state_code_maps_to_unknown() {
        assert_eq!(PairingState::from(7u8), PairingState::Unknown);
    }
}
