//! Stick mapping, gimbal speed and dial types.
//!
//! Every enum here carries the device's numeric code in its `repr` so a
//! transport implementation can encode it without a lookup table; the
//! library itself only deals in the typed values.

use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

use crate::constants::{CONTROL_CHANNEL_COUNT, PERCENT_MAX};
use crate::error::RcError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stick layout of a remote controller.
///
/// The three preset layouts are the classic Mode 1/2/3 schemes; `Custom`
/// and `SlaveCustom` carry an explicit channel map instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ControlStyle {
    /// Mode 1: left stick pitch/yaw, right stick throttle/roll.
    Japanese = 0,
    /// Mode 2: left stick throttle/yaw, right stick pitch/roll.
    American = 1,
    /// Mode 3: left stick pitch/roll, right stick throttle/yaw.
    Chinese = 2,
    /// Free channel mapping, given by the channel array.
    Custom = 3,
    /// Default layout of a slave remote controller.
    SlaveDefault = 4,
    /// Free channel mapping for a slave remote controller.
    SlaveCustom = 5,
    #[num_enum(default)]
    Unknown = 6,
}

impl ControlStyle {
    /// True for the styles reserved for slave remote controllers.
    pub fn is_slave_style(&self) -> bool {
        matches!(self, ControlStyle::SlaveDefault | ControlStyle::SlaveCustom)
    }

    /// True for the styles that carry an explicit channel map.
    pub fn is_custom(&self) -> bool {
        matches!(self, ControlStyle::Custom | ControlStyle::SlaveCustom)
    }
}

/// Logical control channel driven by one physical stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ControlChannelName {
    Throttle = 0,
    Pitch = 1,
    Roll = 2,
    Yaw = 3,
}

/// One entry of the channel map: which logical channel a physical axis
/// drives and whether its direction is inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlChannel {
    pub channel: ControlChannelName,
    pub reversed: bool,
}

impl ControlChannel {
    pub const fn normal(channel: ControlChannelName) -> Self {
        ControlChannel { channel, reversed: false }
    }
}

/// Complete stick configuration: a style plus one channel entry per
/// physical axis, ordered left-horizontal, left-vertical, right-vertical,
/// right-horizontal (the order hardware state reports the sticks in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlMode {
    pub style: ControlStyle,
    pub channels: [ControlChannel; CONTROL_CHANNEL_COUNT],
}

impl ControlMode {
    const fn preset(style: ControlStyle, names: [ControlChannelName; CONTROL_CHANNEL_COUNT]) -> Self {
        ControlMode {
            style,
            channels: [
                ControlChannel::normal(names[0]),
                ControlChannel::normal(names[1]),
                ControlChannel::normal(names[2]),
                ControlChannel::normal(names[3]),
            ],
        }
    }

    /// Mode 2. The factory default.
    pub const fn american() -> Self {
        use ControlChannelName::*;
        Self::preset(ControlStyle::American, [Yaw, Throttle, Pitch, Roll])
    }

    /// Mode 1.
    pub const fn japanese() -> Self {
        use ControlChannelName::*;
        Self::preset(ControlStyle::Japanese, [Yaw, Pitch, Throttle, Roll])
    }

    /// Mode 3.
    pub const fn chinese() -> Self {
        use ControlChannelName::*;
        Self::preset(ControlStyle::Chinese, [Roll, Pitch, Throttle, Yaw])
    }

    /// Custom layout from an explicit channel map.
    pub const fn custom(channels: [ControlChannel; CONTROL_CHANNEL_COUNT]) -> Self {
        ControlMode { style: ControlStyle::Custom, channels }
    }

    /// Default layout for a slave remote controller.
    pub const fn slave_default() -> Self {
        use ControlChannelName::*;
        Self::preset(ControlStyle::SlaveDefault, [Yaw, Throttle, Pitch, Roll])
    }

    /// Custom layout for a slave remote controller.
    pub const fn slave_custom(channels: [ControlChannel; CONTROL_CHANNEL_COUNT]) -> Self {
        ControlMode { style: ControlStyle::SlaveCustom, channels }
    }

    /// Check the invariant of custom maps: the four entries must name four
    /// distinct channels (which then necessarily cover every axis).
    pub fn validate(&self) -> Result<(), RcError> {
        if self.style == ControlStyle::Unknown {
            return Err(RcError::InvalidParameter(
                "control mode",
                "style Unknown cannot be applied".into(),
            ));
        }
        if self.style.is_custom() {
            let mut names: Vec<ControlChannelName> = self.channels.iter().map(|c| c.channel).collect();
            names.sort();
            names.dedup();
            if names.len() != CONTROL_CHANNEL_COUNT {
                return Err(RcError::InvalidParameter(
                    "control mode",
                    "custom channel map must assign each of throttle/pitch/roll/yaw exactly once".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::american()
    }
}

/// Gimbal slew speeds a slave's joystick applies, per axis, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GimbalControlSpeed {
    pub pitch: u8,
    pub roll: u8,
    pub yaw: u8,
}

impl GimbalControlSpeed {
    pub const fn new(pitch: u8, roll: u8, yaw: u8) -> Self {
        GimbalControlSpeed { pitch, roll, yaw }
    }

    pub fn validate(&self) -> Result<(), RcError> {
        for (axis, value) in [("pitch", self.pitch), ("roll", self.roll), ("yaw", self.yaw)] {
            if value > PERCENT_MAX {
                return Err(RcError::InvalidParameter(
                    "gimbal speed",
                    format!("{axis} speed {value} exceeds {PERCENT_MAX}"),
                ));
            }
        }
        Ok(())
    }
}

/// Which gimbal axis the gimbal dial (upper-left wheel) drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum GimbalDialDirection {
    Pitch = 0,
    Roll = 1,
    Yaw = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_pass_validation() {
        for mode in [
            ControlMode::american(),
            ControlMode::japanese(),
            ControlMode::chinese(),
            ControlMode::slave_default(),
        ] {
            assert!(mode.validate().is_ok(), "preset {:?} must validate", mode.style);
        }
    }

    #[test]
    fn test_preset_maps_cover_every_channel() {
        for mode in [ControlMode::american(), ControlMode::japanese(), ControlMode::chinese()] {
            let mut names: Vec<ControlChannelName> =
                mode.channels.iter().map(|c| c.channel).collect();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), CONTROL_CHANNEL_COUNT, "{:?} map misses a channel", mode.style);
        }
    }

    #[test]
    fn test_custom_map_requires_distinct_channels() {
        use ControlChannelName::*;
        let mode = ControlMode::custom([
            ControlChannel::normal(Throttle),
            ControlChannel::normal(Throttle),
            ControlChannel::normal(Pitch),
            ControlChannel::normal(Roll),
        ]);
        assert!(matches!(mode.validate(), Err(RcError::InvalidParameter("control mode", _))));
    }

    #[test]
    fn test_valid_custom_map_is_accepted() {
        use ControlChannelName::*;
        let mode = ControlMode::custom([
            ControlChannel { channel: Pitch, reversed: true },
            ControlChannel::normal(Throttle),
            ControlChannel::normal(Yaw),
            ControlChannel::normal(Roll),
        ]);
        assert!(mode.validate().is_ok());
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        let mode = ControlMode { style: ControlStyle::Unknown, ..ControlMode::american() };
        assert!(mode.validate().is_err());
    }

    #[test]
    fn test_unlisted_style_code_maps_to_unknown() {
        assert_eq!(ControlStyle::from(42u8), ControlStyle::Unknown);
    }

    #[test]
    fn test_slave_styles_are_flagged() {
        assert!(ControlStyle::SlaveDefault.is_slave_style());
        assert!(ControlStyle::SlaveCustom.is_slave_style());
        assert!(!ControlStyle::American.is_slave_style());
    }

    #[test]
    fn test_gimbal_speed_bounds() {
        assert!(GimbalControlSpeed::new(100, 100, 100).validate().is_ok());
        assert!(GimbalControlSpeed::new(101, 0, 0).validate().is_err());
        assert!(GimbalControlSpeed::new(0, 101, 0).validate().is_err());
        assert!(GimbalControlSpeed::new(0, 0, 101).validate().is_err());
    }
}
