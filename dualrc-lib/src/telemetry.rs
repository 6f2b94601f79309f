//! Telemetry payloads pushed by the remote controller hardware.
//!
//! These are plain data carriers; decoding them off the wire is the
//! transport's job.

use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

use crate::identity::RcIdentity;
use crate::pairing::PairingState;
use crate::session::SessionEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One physical stick axis. Centered at 0, full deflection at
/// [`JOYSTICK_MAX`](crate::constants::JOYSTICK_MAX) counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoystickAxis {
    pub value: i32,
}

/// Upper-left wheel (the gimbal dial). Same count range as a stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeftWheel {
    pub value: i32,
}

/// Upper-right wheel. Unlike the sticks it is absolute, 0 to
/// [`RIGHT_WHEEL_MAX`](crate::constants::RIGHT_WHEEL_MAX), and doubles as a
/// push button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RightWheel {
    pub present: bool,
    /// True when the value moved since the previous report.
    pub changed: bool,
    pub button_down: bool,
    /// True while the wheel is being turned clockwise.
    pub clockwise: bool,
    pub value: u16,
}

/// A momentary push button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HardwareButton {
    pub present: bool,
    pub down: bool,
}

/// Position of the landing-gear transformation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TransformationSwitchState {
    Retract = 0,
    Deploy = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformationSwitch {
    pub present: bool,
    pub state: TransformationSwitchState,
}

impl Default for TransformationSwitch {
    fn default() -> Self {
        TransformationSwitch { present: false, state: TransformationSwitchState::Deploy }
    }
}

/// Position of the flight-mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FlightModeSwitchPosition {
    /// Function mode.
    F = 0,
    /// Attitude mode.
    A = 1,
    /// Positioning mode.
    #[num_enum(default)]
    P = 2,
    /// Sport mode.
    S = 3,
}

/// Snapshot of every physical input on the remote controller.
///
/// Stick axes are listed in the order the hardware reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HardwareState {
    pub left_horizontal: JoystickAxis,
    pub left_vertical: JoystickAxis,
    pub right_vertical: JoystickAxis,
    pub right_horizontal: JoystickAxis,
    pub left_wheel: LeftWheel,
    pub right_wheel: RightWheel,
    pub transformation_switch: TransformationSwitch,
    pub flight_mode_switch: FlightModeSwitchPosition,
    pub go_home_button: HardwareButton,
    pub record_button: HardwareButton,
    pub shutter_button: HardwareButton,
    pub playback_button: HardwareButton,
    pub pause_button: HardwareButton,
    pub custom_button_1: HardwareButton,
    pub custom_button_2: HardwareButton,
}

impl Default for FlightModeSwitchPosition {
    fn default() -> Self {
        FlightModeSwitchPosition::P
    }
}

/// UTC timestamp attached to a GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// GPS fix of the remote controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsData {
    pub time: GpsTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Speed toward east in m/s; negative means moving west.
    pub speed_east: f32,
    /// Speed toward north in m/s; negative means moving south.
    pub speed_north: f32,
    pub satellite_count: u8,
    /// Horizontal accuracy in meters.
    pub accuracy: f32,
    /// False until the receiver has a usable fix; ignore the rest then.
    pub valid: bool,
}

/// Battery charge of the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatteryInfo {
    pub remaining_mah: u32,
    pub remaining_percent: u8,
}

/// What the focus dial adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FocusControlType {
    Aperture = 0,
    FocalLength = 1,
}

/// Turning direction of the focus dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FocusControlDirection {
    Clockwise = 0,
    CounterClockwise = 1,
}

/// State of the remote focus accessory, when one is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RemoteFocusState {
    pub focus_control_works: bool,
    pub control_type: FocusControlType,
    pub direction: FocusControlDirection,
}

impl Default for RemoteFocusState {
    fn default() -> Self {
        RemoteFocusState {
            focus_control_works: false,
            control_type: FocusControlType::Aperture,
            direction: FocusControlDirection::Clockwise,
        }
    }
}

/// Topic of an unsolicited frame. Subscribers pick one kind; the transport
/// keeps per-kind delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TelemetryKind {
    HardwareState,
    Gps,
    Battery,
    RemoteFocus,
    /// A slave asking this controller for gimbal control.
    GimbalRequest,
    /// Master/slave membership changes and discovery hits.
    Session,
    /// Pairing progress pushed while pairing is active.
    Pairing,
}

/// One unsolicited frame from the hardware.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TelemetrySample {
    HardwareState(HardwareState),
    Gps(GpsData),
    Battery(BatteryInfo),
    RemoteFocus(RemoteFocusState),
    GimbalRequest(RcIdentity),
    Session(SessionEvent),
    Pairing(PairingState),
}

impl TelemetrySample {
    pub fn kind(&self) -> TelemetryKind {
        match self {
            TelemetrySample::HardwareState(_) => TelemetryKind::HardwareState,
            TelemetrySample::Gps(_) => TelemetryKind::Gps,
            TelemetrySample::Battery(_) => TelemetryKind::Battery,
            TelemetrySample::RemoteFocus(_) => TelemetryKind::RemoteFocus,
            TelemetrySample::GimbalRequest(_) => TelemetryKind::GimbalRequest,
            TelemetrySample::Session(_) => TelemetryKind::Session,
            TelemetrySample::Pairing(_) => TelemetryKind::Pairing,
        }
    }
}
