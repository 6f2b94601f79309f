// Protocol constants for the dual-operator remote controller link

use std::time::Duration;

/// Number of physical stick channels (left/right stick, two axes each)
pub const CONTROL_CHANNEL_COUNT: usize = 4;

/// Maximum length of a remote controller name in characters
pub const RC_NAME_MAX_LEN: usize = 6;

/// Exact length of a remote controller password (ASCII digits)
pub const RC_PASSWORD_LEN: usize = 4;

/// Upper bound of signal quality and gimbal speed percentages
pub const PERCENT_MAX: u8 = 100;

/// Joystick and gimbal-dial deflection range: [-JOYSTICK_MAX, JOYSTICK_MAX]
pub const JOYSTICK_MAX: i32 = 660;

/// Camera settings dial (right wheel) value range: [0, RIGHT_WHEEL_MAX]
pub const RIGHT_WHEEL_MAX: u16 = 1320;

/// How long the arbiter waits for the master's decision before a pending
/// gimbal-control request resolves with `Timeout`
pub const DEFAULT_RESPONSE_WINDOW: Duration = Duration::from_secs(15);

/// Buffer depth of each per-kind event broadcast channel; slow subscribers
/// lose the oldest samples first (best-effort delivery)
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Slaves a master accepts when the hardware does not report a limit.
pub const DEFAULT_MAX_SLAVES: usize = 3;
