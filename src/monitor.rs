//! The protocol engine: one performance monitor, one transport, a FIFO of
//! pending frames and at most one transaction in flight.
//!
//! [`PerformanceMonitor::send`] consumes a [`CommandBuffer`], encodes it
//! into one or more frames and queues them. Frames are transmitted
//! strictly one at a time; the next frame leaves only after the previous
//! one's response has been fully verified, timed out or failed. Replies
//! are buffered while a response frame is being parsed and dispatched to
//! the per-command receivers only once the end marker checks out, so a
//! frame that dies halfway never resolves half its commands.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::commands::{CommandBuffer, CommandRegistry, RawCommand};
use crate::error::{OarlockError, Result};
use crate::frame::{self, FrameEvent, FrameParser, ParsedCommand};
use crate::telemetry::{self, MuxAssembler, TelemetryEvent};
use crate::transport::{TelemetryChannel, Transport};
use crate::types::{ExtendedAddress, MonitorConfig};

const TELEMETRY_CHANNEL_CAPACITY: usize = 64;

struct SendQueueEntry {
    commands: Vec<RawCommand>,
    frame: BytesMut,
}

struct ResponseTracker {
    parser: FrameParser,
    commands: Vec<RawCommand>,
    replies: Vec<Option<Bytes>>,
    next_index: usize,
    generation: u64,
}

impl ResponseTracker {
    fn new(commands: Vec<RawCommand>, verify_checksums: bool, generation: u64) -> Self {
        let mut parser = FrameParser::host();
        parser.set_checksum_verification(verify_checksums);
        let replies = commands.iter().map(|_| None).collect();
        Self {
            parser,
            commands,
            replies,
            next_index: 0,
            generation,
        }
    }

    /// Match one parsed response unit against the next expectant command.
    fn accept(&mut self, parsed: &ParsedCommand) -> Result<()> {
        while self.next_index < self.commands.len()
            && !self.commands[self.next_index].wait_for_response
        {
            self.replies[self.next_index] = Some(Bytes::new());
            self.next_index += 1;
        }
        let Some(expected) = self.commands.get(self.next_index) else {
            return Err(OarlockError::Protocol(format!(
                "unexpected extra response unit for command {:02X}",
                parsed.command
            )));
        };
        if parsed.command != expected.command {
            return Err(OarlockError::CommandMismatch {
                expected: expected.command,
                received: parsed.command,
            });
        }
        if parsed.detail_command != expected.detail_command {
            return Err(OarlockError::CommandMismatch {
                expected: expected.detail_command.unwrap_or(expected.command),
                received: parsed.detail_command.unwrap_or(parsed.command),
            });
        }
        self.replies[self.next_index] = Some(parsed.data.clone());
        self.next_index += 1;
        Ok(())
    }

    /// Dispatch every buffered reply. Only called after the end marker
    /// verified.
    fn resolve(mut self) {
        for (command, reply) in self.commands.iter_mut().zip(self.replies) {
            let Some(sender) = command.reply.take() else {
                continue;
            };
            let outcome = reply.ok_or_else(|| {
                OarlockError::Protocol(format!(
                    "no response unit received for command {:02X}",
                    command.command
                ))
            });
            let _ = sender.send(outcome);
        }
    }

    /// Fail every unresolved command with a copy of `error`.
    fn fail(mut self, error: &OarlockError) {
        for command in &mut self.commands {
            if let Some(sender) = command.reply.take() {
                let _ = sender.send(Err(error.replicate()));
            }
        }
    }
}

struct ProtocolState {
    active: Option<ResponseTracker>,
    queue: VecDeque<SendQueueEntry>,
    generation: u64,
    mux: MuxAssembler,
}

struct MonitorShared<T> {
    transport: T,
    config: MonitorConfig,
    registry: Arc<CommandRegistry>,
    state: Mutex<ProtocolState>,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
}

/// Handle to the protocol engine for one performance monitor.
///
/// Cheap to clone; all clones share the same queue and transport.
pub struct PerformanceMonitor<T> {
    shared: Arc<MonitorShared<T>>,
}

impl<T> Clone for PerformanceMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for PerformanceMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + 'static> PerformanceMonitor<T> {
    /// Engine with the default configuration and the standard command
    /// catalog.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, MonitorConfig::default())
    }

    /// Engine with a custom configuration.
    #[must_use]
    pub fn with_config(transport: T, config: MonitorConfig) -> Self {
        Self::with_registry(transport, config, CommandRegistry::standard())
    }

    /// Engine with a custom configuration and command registry.
    #[must_use]
    pub fn with_registry(transport: T, config: MonitorConfig, registry: CommandRegistry) -> Self {
        let (telemetry_tx, _) = broadcast::channel(TELEMETRY_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(MonitorShared {
                transport,
                config,
                registry: Arc::new(registry),
                state: Mutex::new(ProtocolState {
                    active: None,
                    queue: VecDeque::new(),
                    generation: 0,
                    mux: MuxAssembler::new(),
                }),
                telemetry_tx,
            }),
        }
    }

    /// The command registry buffers of this engine resolve names against.
    #[must_use]
    pub fn registry(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.shared.registry)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// The transport this engine writes to.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// Fresh command buffer for a standard frame.
    #[must_use]
    pub fn new_buffer(&self) -> CommandBuffer {
        CommandBuffer::new(Arc::clone(&self.shared.registry), None)
    }

    /// Fresh command buffer for an extended (addressed) frame.
    #[must_use]
    pub fn new_extended_buffer(&self, address: ExtendedAddress) -> CommandBuffer {
        CommandBuffer::new(Arc::clone(&self.shared.registry), Some(address))
    }

    /// Subscribe to decoded telemetry records.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.shared.telemetry_tx.subscribe()
    }

    /// Encode a buffer into frames and queue them for transmission.
    ///
    /// Returns as soon as the frames are queued; per-command results
    /// arrive through the receivers the buffer handed out. A buffer larger
    /// than one frame is split into consecutive frames when
    /// [`MonitorConfig::split_large_frames`] allows it.
    ///
    /// # Errors
    ///
    /// [`OarlockError::OversizeCommand`] when a single command cannot fit
    /// a frame, or when splitting is disabled and the buffer exceeds the
    /// frame capacity. On error every receiver of the buffer is failed
    /// with a copy of the same error.
    pub async fn send(&self, buffer: CommandBuffer) -> Result<()> {
        let (mut commands, address) = buffer.into_parts();
        if commands.is_empty() {
            return Ok(());
        }
        if let Some(ordering) = self.shared.config.sort_commands {
            commands.sort_by(ordering);
        }

        let entries = match self.build_entries(commands, address) {
            Ok(entries) => entries,
            Err((commands, error)) => {
                for mut command in commands {
                    if let Some(sender) = command.reply.take() {
                        let _ = sender.send(Err(error.replicate()));
                    }
                }
                return Err(error);
            }
        };

        {
            let mut state = self.shared.state.lock().await;
            state.queue.extend(entries);
        }
        self.pump().await;
        Ok(())
    }

    /// Pack commands into frame-sized queue entries.
    #[allow(clippy::type_complexity)]
    fn build_entries(
        &self,
        commands: Vec<RawCommand>,
        address: Option<ExtendedAddress>,
    ) -> std::result::Result<Vec<SendQueueEntry>, (Vec<RawCommand>, OarlockError)> {
        let capacity = frame::frame_capacity(address.is_some());
        let mut encoded = Vec::with_capacity(commands.len());
        let mut total = 0;
        for command in &commands {
            match frame::encode_command(command) {
                Ok(bytes) => {
                    total += bytes.len();
                    encoded.push(bytes);
                }
                Err(error) => return Err((commands, error)),
            }
        }
        if total > capacity && !self.shared.config.split_large_frames {
            return Err((
                commands,
                OarlockError::OversizeCommand {
                    size: total,
                    max: capacity,
                },
            ));
        }

        let mut entries = Vec::new();
        let mut body = Vec::new();
        let mut chunk = Vec::new();
        for (command, bytes) in commands.into_iter().zip(encoded) {
            if !body.is_empty() && body.len() + bytes.len() > capacity {
                entries.push(SendQueueEntry {
                    commands: std::mem::take(&mut chunk),
                    frame: frame::encode_frame(&body, address),
                });
                body.clear();
            }
            body.extend_from_slice(&bytes);
            chunk.push(command);
        }
        entries.push(SendQueueEntry {
            commands: chunk,
            frame: frame::encode_frame(&body, address),
        });
        Ok(entries)
    }

    /// Transmit queued frames until one is in flight or the queue drains.
    async fn pump(&self) {
        loop {
            let (entry, generation) = {
                let mut state = self.shared.state.lock().await;
                if state.active.is_some() {
                    return;
                }
                let Some(entry) = state.queue.pop_front() else {
                    return;
                };
                state.generation += 1;
                let generation = state.generation;
                // The tracker is armed before the first byte goes out so a
                // fast response cannot race past it.
                state.active = Some(ResponseTracker::new(
                    entry.commands,
                    self.shared.config.verify_checksums,
                    generation,
                ));
                (entry.frame, generation)
            };

            self.arm_timeout(generation);

            debug!(bytes = entry.len(), "transmitting frame");
            let packet_size = self.shared.transport.packet_size().max(1);
            let mut write_error = None;
            for chunk in entry.chunks(packet_size) {
                if let Err(error) = self.shared.transport.write(chunk).await {
                    write_error = Some(error);
                    break;
                }
            }
            match write_error {
                None => return,
                Some(error) => {
                    warn!(error = %error, "frame transmission failed");
                    self.fail_active(&error).await;
                }
            }
        }
    }

    fn arm_timeout(&self, generation: u64) {
        let monitor = self.clone();
        let timeout_ms = self.shared.config.command_timeout_ms;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            let expired = {
                let mut state = monitor.shared.state.lock().await;
                match &state.active {
                    Some(tracker) if tracker.generation == generation => state.active.take(),
                    _ => None,
                }
            };
            if let Some(tracker) = expired {
                warn!(timeout_ms, "response timed out");
                tracker.fail(&OarlockError::ResponseTimeout { timeout_ms });
                monitor.pump().await;
            }
        });
    }

    /// Fail the in-flight transaction, then move on to the next frame.
    async fn fail_active(&self, error: &OarlockError) {
        let tracker = {
            let mut state = self.shared.state.lock().await;
            state.generation += 1;
            state.active.take()
        };
        if let Some(tracker) = tracker {
            tracker.fail(error);
        }
    }

    /// Feed response bytes received from the transport.
    ///
    /// Chunk boundaries are meaningless; a frame may arrive over any
    /// number of calls. Frame-level errors fail only the in-flight
    /// transaction and the queue moves on.
    pub async fn handle_csafe_data(&self, data: &[u8]) {
        enum Outcome {
            Pending,
            Failed(ResponseTracker, OarlockError),
            Finished(ResponseTracker),
        }

        let outcome = {
            let mut state = self.shared.state.lock().await;
            let Some(mut tracker) = state.active.take() else {
                warn!(bytes = data.len(), "response data with no transaction in flight");
                return;
            };
            match tracker.parser.feed(data) {
                Err(error) => {
                    state.generation += 1;
                    Outcome::Failed(tracker, error)
                }
                Ok(events) => {
                    let mut failure = None;
                    let mut finished = false;
                    for event in events {
                        match event {
                            FrameEvent::Command(parsed) => {
                                if let Err(error) = tracker.accept(&parsed) {
                                    failure = Some(error);
                                    break;
                                }
                            }
                            FrameEvent::End { status, .. } => {
                                if let Some(status) = status {
                                    debug!(
                                        slave_state = %status.slave_state,
                                        prev_frame = %status.prev_frame_state,
                                        toggle = status.frame_toggle,
                                        "frame complete"
                                    );
                                }
                                finished = true;
                                break;
                            }
                        }
                    }
                    if let Some(error) = failure {
                        state.generation += 1;
                        Outcome::Failed(tracker, error)
                    } else if finished {
                        state.generation += 1;
                        Outcome::Finished(tracker)
                    } else {
                        // Mid-frame; put the tracker back and keep waiting.
                        state.active = Some(tracker);
                        Outcome::Pending
                    }
                }
            }
        };

        match outcome {
            Outcome::Pending => {}
            Outcome::Failed(tracker, error) => {
                tracker.fail(&error);
                self.pump().await;
            }
            Outcome::Finished(tracker) => {
                tracker.resolve();
                self.pump().await;
            }
        }
    }

    /// Feed a telemetry notification received from the transport.
    ///
    /// Decoded records are published to every [`Self::subscribe`]
    /// receiver. Decode failures are logged and dropped; they never affect
    /// in-flight commands.
    pub async fn handle_telemetry(&self, channel: TelemetryChannel, data: &[u8]) {
        if channel == TelemetryChannel::Multiplexed {
            let events = {
                let mut state = self.shared.state.lock().await;
                state.mux.feed(data)
            };
            match events {
                Ok(events) => {
                    for event in events {
                        let _ = self.shared.telemetry_tx.send(event);
                    }
                }
                Err(error) => warn!(error = %error, "dropping multiplexed telemetry record"),
            }
            return;
        }
        match telemetry::decode_direct(channel, data) {
            Ok(event) => {
                let _ = self.shared.telemetry_tx.send(event);
            }
            Err(error) => warn!(error = %error, ?channel, "dropping telemetry record"),
        }
    }

    /// Tear down all protocol state after the transport dropped.
    ///
    /// The in-flight transaction and every queued frame fail with
    /// [`OarlockError::Disconnected`]; parser and assembler state is
    /// cleared so a reconnect starts from a clean slate.
    pub async fn handle_disconnect(&self) {
        let (active, queue) = {
            let mut state = self.shared.state.lock().await;
            state.generation += 1;
            state.mux.reset();
            (state.active.take(), std::mem::take(&mut state.queue))
        };
        if let Some(tracker) = active {
            tracker.fail(&OarlockError::Disconnected);
        }
        for entry in queue {
            for mut command in entry.commands {
                if let Some(sender) = command.reply.take() {
                    let _ = sender.send(Err(OarlockError::Disconnected));
                }
            }
        }
        debug!("protocol state cleared after disconnect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use crate::types::StrokeState;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Records writes; responses are injected by the tests directly.
    struct ScriptedTransport {
        writes: StdMutex<Vec<Vec<u8>>>,
        fail_writes: bool,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                writes: StdMutex::new(Vec::new()),
                fail_writes: false,
            }
        }

        fn failing() -> Self {
            Self {
                writes: StdMutex::new(Vec::new()),
                fail_writes: true,
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn write(&self, data: &[u8]) -> Result<()> {
            if self.fail_writes {
                return Err(OarlockError::Transport("link down".into()));
            }
            self.writes.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn packet_size(&self) -> usize {
            20
        }
    }

    fn frames_written(monitor: &PerformanceMonitor<ScriptedTransport>) -> usize {
        let writes = monitor.shared.transport.writes.lock().unwrap();
        writes.iter().filter(|w| w.first() == Some(&0xF1)).count()
    }

    /// Response frame with a status byte and `[cmd, len, data]` units.
    fn response_frame(units: &[(u8, Option<u8>, &[u8])]) -> Vec<u8> {
        let mut body = vec![0x01u8]; // status: Ready, prev frame Ok
        for (command, detail, data) in units {
            body.push(*command);
            match detail {
                Some(detail) => {
                    body.push(data.len() as u8 + 2);
                    body.push(*detail);
                    body.push(data.len() as u8);
                }
                None => body.push(data.len() as u8),
            }
            body.extend_from_slice(data);
        }
        encode_frame(&body, None).to_vec()
    }

    fn quick_config() -> MonitorConfig {
        MonitorConfig {
            command_timeout_ms: 40,
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_single_frame_request_response() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut buffer = monitor.new_buffer();
        let stroke = buffer.get_stroke_state();
        let drag = buffer.get_drag_factor();
        monitor.send(buffer).await.unwrap();
        assert_eq!(frames_written(&monitor), 1);

        let response = response_frame(&[
            (0x7F, Some(0xBF), &[0x02]),
            (0x7F, Some(0xC1), &[0x1E]),
        ]);
        monitor.handle_csafe_data(&response).await;

        assert_eq!(stroke.recv().await.unwrap(), StrokeState::Driving);
        assert_eq!(drag.recv().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_replies_held_until_end_marker() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut buffer = monitor.new_buffer();
        let drag = buffer.get_drag_factor();
        monitor.send(buffer).await.unwrap();

        let response = response_frame(&[(0x7F, Some(0xC1), &[0x73])]);
        let (head, tail) = response.split_at(response.len() - 1);
        monitor.handle_csafe_data(head).await;
        {
            // The unit is fully parsed but the frame has not ended.
            let state = monitor.shared.state.lock().await;
            assert!(state.active.is_some());
        }
        monitor.handle_csafe_data(tail).await;
        assert_eq!(drag.recv().await.unwrap(), 115);
    }

    #[tokio::test]
    async fn test_second_frame_waits_for_first_response() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());

        let mut first = monitor.new_buffer();
        let first_rx = first.get_drag_factor();
        monitor.send(first).await.unwrap();

        let mut second = monitor.new_buffer();
        let second_rx = second.get_stroke_state();
        monitor.send(second).await.unwrap();

        assert_eq!(frames_written(&monitor), 1);

        monitor
            .handle_csafe_data(&response_frame(&[(0x7F, Some(0xC1), &[0x64])]))
            .await;
        assert_eq!(first_rx.recv().await.unwrap(), 100);
        assert_eq!(frames_written(&monitor), 2);

        monitor
            .handle_csafe_data(&response_frame(&[(0x7F, Some(0xBF), &[0x04])]))
            .await;
        assert_eq!(second_rx.recv().await.unwrap(), StrokeState::Recovery);
    }

    #[tokio::test]
    async fn test_timeout_fails_transaction_and_pumps_queue() {
        let monitor =
            PerformanceMonitor::with_config(ScriptedTransport::new(), quick_config());

        let mut first = monitor.new_buffer();
        let first_rx = first.get_drag_factor();
        monitor.send(first).await.unwrap();

        let mut second = monitor.new_buffer();
        let second_rx = second.get_stroke_state();
        monitor.send(second).await.unwrap();

        assert!(matches!(
            first_rx.recv().await,
            Err(OarlockError::ResponseTimeout { timeout_ms: 40 })
        ));

        // The timeout task pumps the queue; wait for the second frame to
        // leave before answering it.
        while frames_written(&monitor) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        monitor
            .handle_csafe_data(&response_frame(&[(0x7F, Some(0xBF), &[0x00])]))
            .await;
        assert_eq!(
            second_rx.recv().await.unwrap(),
            StrokeState::WaitingForWheelToReachMinSpeed
        );
    }

    #[tokio::test]
    async fn test_command_mismatch_is_fatal_for_transaction() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut buffer = monitor.new_buffer();
        let drag = buffer.get_drag_factor();
        monitor.send(buffer).await.unwrap();

        // Stroke-state response for a drag-factor request.
        monitor
            .handle_csafe_data(&response_frame(&[(0x7F, Some(0xBF), &[0x02])]))
            .await;
        assert!(matches!(
            drag.recv().await,
            Err(OarlockError::CommandMismatch {
                expected: 0xC1,
                received: 0xBF,
            })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_checksum_fails_transaction() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut buffer = monitor.new_buffer();
        let drag = buffer.get_drag_factor();
        monitor.send(buffer).await.unwrap();

        let mut response = response_frame(&[(0x7F, Some(0xC1), &[0x1E])]);
        let checksum_at = response.len() - 2;
        response[checksum_at] ^= 0x40;
        monitor.handle_csafe_data(&response).await;
        assert!(matches!(
            drag.recv().await,
            Err(OarlockError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_flushes_queue() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());

        let mut first = monitor.new_buffer();
        let first_rx = first.get_drag_factor();
        monitor.send(first).await.unwrap();

        let mut second = monitor.new_buffer();
        let second_rx = second.get_stroke_state();
        monitor.send(second).await.unwrap();

        monitor.handle_disconnect().await;
        assert!(matches!(
            first_rx.recv().await,
            Err(OarlockError::Disconnected)
        ));
        assert!(matches!(
            second_rx.recv().await,
            Err(OarlockError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_write_failure_fails_buffer() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::failing());
        let mut buffer = monitor.new_buffer();
        let drag = buffer.get_drag_factor();
        monitor.send(buffer).await.unwrap();
        assert!(matches!(
            drag.recv().await,
            Err(OarlockError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_large_buffer_splits_into_consecutive_frames() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut buffer = monitor.new_buffer();
        // 24 proprietary gets encode to 4 bytes each: 96 bytes of body,
        // which exceeds the 93-byte frame capacity.
        let receivers: Vec<_> = (0..24).map(|_| buffer.get_drag_factor()).collect();
        monitor.send(buffer).await.unwrap();
        assert_eq!(frames_written(&monitor), 1);

        let unit: (u8, Option<u8>, &[u8]) = (0x7F, Some(0xC1), &[0x1E]);
        monitor
            .handle_csafe_data(&response_frame(&vec![unit; 23]))
            .await;
        assert_eq!(frames_written(&monitor), 2);
        monitor
            .handle_csafe_data(&response_frame(&[unit]))
            .await;

        for receiver in receivers {
            assert_eq!(receiver.recv().await.unwrap(), 30);
        }
    }

    #[tokio::test]
    async fn test_split_disabled_rejects_large_buffer() {
        let config = MonitorConfig {
            split_large_frames: false,
            ..MonitorConfig::default()
        };
        let monitor = PerformanceMonitor::with_config(ScriptedTransport::new(), config);
        let mut buffer = monitor.new_buffer();
        let receivers: Vec<_> = (0..24).map(|_| buffer.get_drag_factor()).collect();

        let result = monitor.send(buffer).await;
        assert!(matches!(
            result,
            Err(OarlockError::OversizeCommand { size: 96, max: 93 })
        ));
        for receiver in receivers {
            assert!(matches!(
                receiver.recv().await,
                Err(OarlockError::OversizeCommand { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_telemetry_published_to_subscribers() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut subscriber = monitor.subscribe();

        let mut payload = vec![0u8; 19];
        payload[10] = 2; // driving
        payload[18] = 120;
        monitor
            .handle_telemetry(TelemetryChannel::GeneralStatus, &payload)
            .await;

        match subscriber.recv().await.unwrap() {
            TelemetryEvent::GeneralStatus(status) => {
                assert_eq!(status.stroke_state, StrokeState::Driving);
                assert_eq!(status.drag_factor, 120);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_multiplexed_telemetry_goes_through_assembler() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let mut subscriber = monitor.subscribe();

        let mut packet = vec![49u8];
        packet.extend_from_slice(&[0u8; 19]);
        monitor
            .handle_telemetry(TelemetryChannel::Multiplexed, &packet)
            .await;
        assert!(matches!(
            subscriber.recv().await.unwrap(),
            TelemetryEvent::GeneralStatus(_)
        ));

        // Unknown ids are dropped without disturbing anything.
        monitor
            .handle_telemetry(TelemetryChannel::Multiplexed, &[200, 1, 2])
            .await;
        assert!(subscriber.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_buffer_is_a_no_op() {
        let monitor = PerformanceMonitor::new(ScriptedTransport::new());
        let buffer = monitor.new_buffer();
        monitor.send(buffer).await.unwrap();
        assert_eq!(frames_written(&monitor), 0);
    }
}
