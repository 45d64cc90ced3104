//! Host side of the rfremote microcontroller protocol.
//!
//! Switch commands are looked up in a [`CommandRegistry`], expanded into
//! pulses, framed and sent over a [`DeviceLink`], which then waits for the
//! device to acknowledge.

pub mod config;
pub mod error;
pub mod frame;
pub mod link;
pub mod protocol;
pub mod pulse;
pub mod registry;

pub use config::{CommandDef, Tables};
pub use error::{Error, Result};
pub use frame::FrameMode;
pub use link::{DeviceLink, LinkSettings, LinkState, Port, PortTransport, Transport};
#[cfg(feature = "serial")]
pub use link::SerialTransport;
pub use protocol::{IrCode, SensorValue};
pub use pulse::{ConversionTable, Level, Pulse};
pub use registry::{CommandRegistry, Dispatch};
