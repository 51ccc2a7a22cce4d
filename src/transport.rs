//! Transport contract between the protocol engine and a physical link.
//!
//! Outbound bytes go through [`Transport::write`]; inbound notifications
//! and disconnects are pushed into the engine by the adapter that owns the
//! link (see [`crate::monitor::PerformanceMonitor::handle_csafe_data`] and
//! friends). Decorating a transport is how recording and replay work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Writable half of a link to a performance monitor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one chunk of frame bytes to the monitor. Chunks never exceed
    /// [`Transport::packet_size`] bytes.
    async fn write(&self, data: &[u8]) -> Result<()>;

    /// Largest write this link accepts, in bytes.
    fn packet_size(&self) -> usize;
}

/// Notification source a telemetry payload arrived on. The source decides
/// which payload layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryChannel {
    /// General rowing status
    GeneralStatus,
    /// First additional status record
    AdditionalStatus1,
    /// Second additional status record
    AdditionalStatus2,
    /// Per-stroke data
    StrokeData,
    /// Additional per-stroke data
    AdditionalStrokeData,
    /// Split/interval data
    SplitIntervalData,
    /// Additional split/interval data
    AdditionalSplitIntervalData,
    /// Workout summary
    WorkoutSummary,
    /// Additional workout summary
    AdditionalWorkoutSummary,
    /// Heart-rate belt information
    HeartRateBeltInformation,
    /// The single multiplexed characteristic carrying a type id prefix
    Multiplexed,
}
