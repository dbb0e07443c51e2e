//! Radio device implementations.
//!
//! The protocol engine talks to the medium through a pair of frame
//! queues; a device implementation moves [`crate::LinkFrame`]s between
//! those queues and whatever carries them:
//!
//! - `echo`: loopback device for single-node smoke testing
//! - `simulator`: queue pair toward an external network hub that owns the
//!   topology and assigns per-link RSSI

#[cfg(feature = "radio-device-echo")]
pub mod echo;

#[cfg(feature = "radio-device-simulator")]
pub mod simulator;

#[cfg(feature = "radio-device-echo")]
pub use echo::{radio_device_task, RadioDevice};

#[cfg(feature = "radio-device-simulator")]
pub use simulator::{radio_device_task, RadioDevice};
