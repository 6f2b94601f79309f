pub mod arbiter;
pub mod constants;
pub mod control;
pub mod device;
pub mod error;
pub mod events;
pub mod identity;
pub mod pairing;
pub mod session;
pub mod telemetry;
pub mod transport;

// Re-export the main entry points for easy access
pub use device::RemoteController;
pub use error::RcError;
