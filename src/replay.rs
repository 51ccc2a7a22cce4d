//! Session recording and deterministic replay.
//!
//! [`RecordingTransport`] wraps a live link and timestamps everything that
//! crosses it: outbound frame chunks through [`Transport::write`], inbound
//! notifications through the `note_*` hooks the notification router calls.
//! The resulting [`SessionLog`] serializes to JSON and can later drive a
//! [`ReplayTransport`], which checks the engine's writes against the log
//! in order and feeds the recorded notifications back on their original
//! schedule. Protocol bugs reported from the field become reproducible
//! tests this way.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{OarlockError, Result};
use crate::monitor::PerformanceMonitor;
use crate::transport::{TelemetryChannel, Transport};

/// One timestamped event on the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Milliseconds since the recording started
    pub elapsed_ms: u64,
    /// What crossed the link
    pub kind: RecordedEventKind,
}

/// Direction and payload of a recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordedEventKind {
    /// Host wrote one frame chunk
    Write {
        /// Chunk bytes as written
        data: Vec<u8>,
    },
    /// Monitor notified on the CSAFE response characteristic
    Csafe {
        /// Notification payload
        data: Vec<u8>,
    },
    /// Monitor notified on a telemetry characteristic
    Telemetry {
        /// Source characteristic
        channel: TelemetryChannel,
        /// Notification payload
        data: Vec<u8>,
    },
    /// The link dropped
    Disconnect,
}

/// A complete recorded session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLog {
    /// Events in recording order
    pub events: Vec<RecordedEvent>,
}

impl SessionLog {
    /// Parse a log from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::SessionLog`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the log to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::SessionLog`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a log from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::Io`] on read failure and
    /// [`OarlockError::SessionLog`] on malformed JSON.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Write the log to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::Io`] on write failure.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

/// Transport decorator that records everything crossing the link.
///
/// Writes are captured transparently. The notification router must call
/// [`RecordingTransport::note_csafe`] / [`RecordingTransport::note_telemetry`]
/// / [`RecordingTransport::note_disconnect`] before handing each event to
/// the engine so the inbound side lands in the log too.
pub struct RecordingTransport<T> {
    inner: T,
    started: Instant,
    events: Mutex<Vec<RecordedEvent>>,
}

impl<T: Transport> RecordingTransport<T> {
    /// Start recording on top of `inner`. The clock starts now.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped transport.
    #[must_use]
    pub const fn inner(&self) -> &T {
        &self.inner
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    async fn push(&self, kind: RecordedEventKind) {
        let event = RecordedEvent {
            elapsed_ms: self.elapsed_ms(),
            kind,
        };
        self.events.lock().await.push(event);
    }

    /// Record an inbound CSAFE notification.
    pub async fn note_csafe(&self, data: &[u8]) {
        self.push(RecordedEventKind::Csafe {
            data: data.to_vec(),
        })
        .await;
    }

    /// Record an inbound telemetry notification.
    pub async fn note_telemetry(&self, channel: TelemetryChannel, data: &[u8]) {
        self.push(RecordedEventKind::Telemetry {
            channel,
            data: data.to_vec(),
        })
        .await;
    }

    /// Record the link dropping.
    pub async fn note_disconnect(&self) {
        self.push(RecordedEventKind::Disconnect).await;
    }

    /// Snapshot the log recorded so far.
    pub async fn log(&self) -> SessionLog {
        SessionLog {
            events: self.events.lock().await.clone(),
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn write(&self, data: &[u8]) -> Result<()> {
        self.push(RecordedEventKind::Write {
            data: data.to_vec(),
        })
        .await;
        self.inner.write(data).await
    }

    fn packet_size(&self) -> usize {
        self.inner.packet_size()
    }
}

/// Transport that replays a [`SessionLog`] instead of talking to hardware.
///
/// Each engine write is checked against the next recorded write, in order.
/// A byte-for-byte mismatch means the code under test no longer produces
/// the traffic it produced when the session was captured, and the write
/// fails with [`OarlockError::Transport`].
pub struct ReplayTransport {
    writes: Vec<Vec<u8>>,
    cursor: Mutex<usize>,
    packet_size: usize,
}

impl ReplayTransport {
    /// Build a replay transport from the writes in `log`.
    #[must_use]
    pub fn new(log: &SessionLog) -> Self {
        let writes = log
            .events
            .iter()
            .filter_map(|event| match &event.kind {
                RecordedEventKind::Write { data } => Some(data.clone()),
                _ => None,
            })
            .collect();
        Self {
            writes,
            cursor: Mutex::new(0),
            packet_size: 20,
        }
    }

    /// Number of recorded writes not yet consumed.
    pub async fn remaining_writes(&self) -> usize {
        self.writes.len() - *self.cursor.lock().await
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn write(&self, data: &[u8]) -> Result<()> {
        let mut cursor = self.cursor.lock().await;
        let Some(expected) = self.writes.get(*cursor) else {
            return Err(OarlockError::Transport(format!(
                "unexpected write of {} byte(s) past end of recorded session",
                data.len()
            )));
        };
        if expected != data {
            return Err(OarlockError::Transport(format!(
                "write #{} diverges from recorded session: expected {expected:02x?}, got {data:02x?}",
                *cursor
            )));
        }
        debug!(index = *cursor, bytes = data.len(), "replayed write verified");
        *cursor += 1;
        Ok(())
    }

    fn packet_size(&self) -> usize {
        self.packet_size
    }
}

/// Feed the inbound half of `log` into the engine on its original
/// schedule. Returns once every recorded event has been delivered.
///
/// Recorded writes are not delivered here; they are consumed by the
/// [`ReplayTransport`] as the engine re-produces them.
pub async fn replay_session(monitor: &PerformanceMonitor<ReplayTransport>, log: &SessionLog) {
    info!(events = log.events.len(), "replaying session");
    let started = Instant::now();
    for event in &log.events {
        let at = Duration::from_millis(event.elapsed_ms);
        if let Some(wait) = at.checked_sub(started.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        match &event.kind {
            RecordedEventKind::Write { .. } => {}
            RecordedEventKind::Csafe { data } => monitor.handle_csafe_data(data).await,
            RecordedEventKind::Telemetry { channel, data } => {
                monitor.handle_telemetry(*channel, data).await;
            }
            RecordedEventKind::Disconnect => monitor.handle_disconnect().await,
        }
    }
    let leftover = monitor.transport().remaining_writes().await;
    if leftover > 0 {
        warn!(leftover, "recorded writes were never re-produced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MonitorConfig;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn write(&self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn packet_size(&self) -> usize {
            20
        }
    }

    #[tokio::test]
    async fn test_recording_captures_both_directions() {
        let recorder = RecordingTransport::new(NullTransport);
        recorder.write(&[0xF1, 0x80, 0x80, 0xF2]).await.unwrap();
        recorder.note_csafe(&[0xF1, 0x01, 0x01, 0xF2]).await;
        recorder
            .note_telemetry(TelemetryChannel::HeartRateBeltInformation, &[0; 6])
            .await;
        recorder.note_disconnect().await;

        let log = recorder.log().await;
        assert_eq!(log.events.len(), 4);
        assert!(matches!(log.events[0].kind, RecordedEventKind::Write { .. }));
        assert!(matches!(log.events[3].kind, RecordedEventKind::Disconnect));
    }

    #[tokio::test]
    async fn test_log_json_round_trip() {
        let recorder = RecordingTransport::new(NullTransport);
        recorder.write(&[0xF1, 0x80, 0x80, 0xF2]).await.unwrap();
        recorder
            .note_telemetry(TelemetryChannel::GeneralStatus, &[1, 2, 3])
            .await;
        let log = recorder.log().await;

        let json = log.to_json().unwrap();
        let parsed = SessionLog::from_json(&json).unwrap();
        assert_eq!(parsed, log);
    }

    #[tokio::test]
    async fn test_replay_verifies_writes_in_order() {
        let log = SessionLog {
            events: vec![
                RecordedEvent {
                    elapsed_ms: 0,
                    kind: RecordedEventKind::Write { data: vec![1, 2] },
                },
                RecordedEvent {
                    elapsed_ms: 5,
                    kind: RecordedEventKind::Write { data: vec![3, 4] },
                },
            ],
        };
        let replay = ReplayTransport::new(&log);

        replay.write(&[1, 2]).await.unwrap();
        assert_eq!(replay.remaining_writes().await, 1);
        replay.write(&[3, 4]).await.unwrap();
        assert!(matches!(
            replay.write(&[5]).await,
            Err(OarlockError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_replay_rejects_diverging_write() {
        let log = SessionLog {
            events: vec![RecordedEvent {
                elapsed_ms: 0,
                kind: RecordedEventKind::Write { data: vec![1, 2] },
            }],
        };
        let replay = ReplayTransport::new(&log);
        assert!(matches!(
            replay.write(&[9, 9]).await,
            Err(OarlockError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_replay_session_delivers_telemetry() {
        let log = SessionLog {
            events: vec![RecordedEvent {
                elapsed_ms: 0,
                kind: RecordedEventKind::Telemetry {
                    channel: TelemetryChannel::HeartRateBeltInformation,
                    data: vec![0, 72, 60, 3, 0, 0],
                },
            }],
        };
        let monitor = PerformanceMonitor::with_config(
            ReplayTransport::new(&log),
            MonitorConfig::default(),
        );
        let mut telemetry = monitor.subscribe();

        replay_session(&monitor, &log).await;

        let event = telemetry.recv().await.unwrap();
        assert!(matches!(
            event,
            crate::telemetry::TelemetryEvent::HeartRateBelt(_)
        ));
    }
}
