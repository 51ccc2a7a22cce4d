#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # Oarlock 🚣
//!
//! A Rust library for talking to rowing ergometer performance monitors
//! (Concept2 PM5 family) over Bluetooth Low Energy using the CSAFE frame
//! protocol.
//!
//! The crate has three layers:
//!
//! - **Framing** ([`frame`]): CSAFE frame encoding and a streaming parser.
//!   Frames carry byte-stuffed content between start/end markers with an
//!   XOR checksum; the parser handles standard and extended (addressed)
//!   frames from either side of the link.
//! - **Engine** ([`monitor`]): [`PerformanceMonitor`] queues command
//!   buffers, keeps exactly one frame in flight, matches response units to
//!   the commands that asked for them, and settles every command's typed
//!   receiver exactly once — on response, timeout, error, or disconnect.
//! - **Link** ([`ble`], [`replay`]): the btleplug-based PM transport plus
//!   recording/replay decorators for reproducing sessions offline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use oarlock::ble::{ConnectionParams, PmScanner};
//! use oarlock::{MonitorConfig, PerformanceMonitor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ConnectionParams::default();
//!     let config = MonitorConfig::default();
//!
//!     let mut scanner = PmScanner::new().await?;
//!     let devices = scanner.scan(&params).await?;
//!     let transport = scanner.connect(&devices[0], &config, &params).await?;
//!
//!     let monitor = PerformanceMonitor::with_config(transport, config);
//!     tokio::spawn(oarlock::ble::route_events(monitor.clone()));
//!
//!     let mut buffer = monitor.new_buffer();
//!     let version = buffer.get_version();
//!     let distance = buffer.get_distance();
//!     monitor.send(buffer).await?;
//!
//!     println!("firmware {}", version.recv().await?.firmware_version);
//!     let distance = distance.recv().await?;
//!     println!("distance {} (unit {})", distance.value, distance.unit);
//!     Ok(())
//! }
//! ```
//!
//! ## Telemetry
//!
//! The PM pushes rowing telemetry independently of the command channel.
//! Subscribe with [`PerformanceMonitor::subscribe`] and receive decoded
//! [`TelemetryEvent`] records; set [`MonitorConfig::multiplex`] to use the
//! single multiplexed characteristic on hosts with a limited notification
//! budget.

/// Bluetooth Low Energy link to the performance monitor
pub mod ble;
/// Command catalog, typed buffers, and response receivers
pub mod commands;
/// Protocol constants and command identifiers
pub mod defs;
/// Error types and handling
pub mod error;
/// CSAFE frame encoding and the streaming parser
pub mod frame;
/// The protocol engine
pub mod monitor;
/// Session recording and replay
pub mod replay;
/// Telemetry record decoding
pub mod telemetry;
/// Transport contract between engine and link
pub mod transport;
/// Type definitions and data structures
pub mod types;

// Re-export the main types for convenient usage
pub use ble::BleTransport;
pub use commands::{CommandBuffer, CommandRegistry, UnitValue, ValueReceiver, VersionInfo};
pub use error::{OarlockError, Result};
pub use frame::{FrameParser, FrameStatus, ParserSide};
pub use monitor::PerformanceMonitor;
pub use replay::{RecordingTransport, ReplayTransport, SessionLog};
pub use telemetry::TelemetryEvent;
pub use transport::{TelemetryChannel, Transport};
pub use types::{
    DeviceInfo, ExtendedAddress, IntervalType, MonitorConfig, SlaveState, StrokeState,
    WorkoutState, WorkoutType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
