//! CSAFE frame codec: encoding of command buffers into stuffed, checksummed
//! frames and a per-byte restartable parser for the reverse direction.
//!
//! Frames look like:
//!
//! ```text
//! [0xF1]                  [stuffed content] [checksum] [0xF2]
//! [0xF0] [src] [dst]      [stuffed content] [checksum] [0xF2]
//! ```
//!
//! Content bytes in `0xF0..=0xF3` are escaped as `0xF3, offset` with
//! `offset = value - 0xF0`. The checksum is the XOR of every unstuffed
//! content byte (address bytes included). Because the checksum byte is
//! indistinguishable from content until the end marker arrives, the parser
//! holds every unstuffed byte back by one position; the byte left in the
//! delay slot when `0xF2` shows up is the checksum.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::commands::RawCommand;
use crate::defs;
use crate::error::{OarlockError, Result};
use crate::types::{ExtendedAddress, PrevFrameState, SlaveState};

/// Maximum unstuffed content bytes a frame can carry.
#[must_use]
pub const fn frame_capacity(extended: bool) -> usize {
    let addr = if extended { defs::EXT_FRAME_ADDR_LEN } else { 0 };
    defs::FRAME_MAX_SIZE - defs::FRAME_FLG_LEN - defs::FRAME_CHKSUM_LEN - addr
}

/// Encode a single command into its wire form.
///
/// Short commands (top bit set, no parameters) become one byte. Long
/// commands get a `command, byteCount` header; proprietary wrapper commands
/// additionally carry a `detailCommand, detailByteCount` inner header.
///
/// # Errors
///
/// Returns [`OarlockError::InvalidParameters`] when a short command carries
/// data or a proprietary wrapper lacks a detail command, and
/// [`OarlockError::OversizeCommand`] when the encoded form cannot fit a
/// frame at all.
pub fn encode_command(command: &RawCommand) -> Result<Vec<u8>> {
    let is_short = command.command & defs::SHORT_CMD_TYPE_MSK != 0
        && !defs::is_proprietary_wrapper(command.command);

    if is_short {
        if !command.data.is_empty() {
            return Err(OarlockError::InvalidParameters(format!(
                "short command {:02X} cannot carry parameter bytes",
                command.command
            )));
        }
        return Ok(vec![command.command]);
    }

    let mut out = Vec::with_capacity(command.data.len() + 4);
    out.push(command.command);
    if defs::is_proprietary_wrapper(command.command) {
        let detail = command.detail_command.ok_or_else(|| {
            OarlockError::InvalidParameters(format!(
                "proprietary command {:02X} requires a detail command",
                command.command
            ))
        })?;
        let inner_len = command.data.len();
        let outer_len = inner_len + defs::LONG_CMD_HDR_LENGTH;
        if outer_len > u8::MAX as usize {
            return Err(OarlockError::InvalidParameters(format!(
                "command {:02X} parameters do not fit a one-byte length",
                command.command
            )));
        }
        out.push(outer_len as u8);
        out.push(detail);
        out.push(inner_len as u8);
    } else {
        if command.data.len() > u8::MAX as usize {
            return Err(OarlockError::InvalidParameters(format!(
                "command {:02X} parameters do not fit a one-byte length",
                command.command
            )));
        }
        out.push(command.data.len() as u8);
    }
    out.extend_from_slice(&command.data);

    let max = frame_capacity(true);
    if out.len() > max {
        return Err(OarlockError::OversizeCommand {
            size: out.len(),
            max,
        });
    }
    Ok(out)
}

/// Encode a slice of commands into one contiguous frame body.
///
/// # Errors
///
/// Propagates the per-command errors of [`encode_command`].
pub fn encode_commands(commands: &[RawCommand]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for command in commands {
        body.extend_from_slice(&encode_command(command)?);
    }
    Ok(body)
}

fn put_stuffed(out: &mut BytesMut, byte: u8) {
    if (defs::EXT_FRAME_START_BYTE..=defs::FRAME_STUFF_BYTE).contains(&byte) {
        out.put_u8(defs::FRAME_STUFF_BYTE);
        out.put_u8(byte - defs::EXT_FRAME_START_BYTE);
    } else {
        out.put_u8(byte);
    }
}

/// Wrap an encoded command body into a complete frame: start marker,
/// optional source/destination prefix, stuffed content, stuffed checksum,
/// end marker.
#[must_use]
pub fn encode_frame(body: &[u8], address: Option<ExtendedAddress>) -> BytesMut {
    let mut out = BytesMut::with_capacity(body.len() * 2 + 6);
    let mut checksum = 0u8;

    if let Some(addr) = address {
        out.put_u8(defs::EXT_FRAME_START_BYTE);
        put_stuffed(&mut out, addr.source);
        put_stuffed(&mut out, addr.destination);
        checksum ^= addr.source;
        checksum ^= addr.destination;
    } else {
        out.put_u8(defs::FRAME_START_BYTE);
    }

    for &byte in body {
        checksum ^= byte;
        put_stuffed(&mut out, byte);
    }
    put_stuffed(&mut out, checksum);
    out.put_u8(defs::FRAME_END_BYTE);
    out
}

/// Status byte of a response frame, decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatus {
    /// Monitor state machine position
    pub slave_state: SlaveState,
    /// Outcome of the previous frame
    pub prev_frame_state: PrevFrameState,
    /// Frame count toggle bit
    pub frame_toggle: bool,
}

impl From<u8> for FrameStatus {
    fn from(value: u8) -> Self {
        Self {
            slave_state: SlaveState::from(value),
            prev_frame_state: PrevFrameState::from(value),
            frame_toggle: value & defs::FRAMECNT_FLG != 0,
        }
    }
}

/// One command unit parsed out of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command byte
    pub command: u8,
    /// Detail command byte, for proprietary wrapper commands
    pub detail_command: Option<u8>,
    /// Parameter or response bytes
    pub data: Bytes,
}

/// Something the parser produced while consuming bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete command unit inside the current frame
    Command(ParsedCommand),
    /// The current frame ended with a verified checksum
    End {
        /// Decomposed status byte; absent on the monitor side
        status: Option<FrameStatus>,
        /// Source/destination prefix of an extended frame
        address: Option<ExtendedAddress>,
    },
}

/// Which end of the link this parser models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserSide {
    /// Parses monitor responses: a status byte, then response units that
    /// always carry a length header
    Host,
    /// Parses host command frames: no status byte, short commands are a
    /// single byte
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    ExtendedSource,
    ExtendedDestination,
    Status,
    Command,
    CommandLength,
    DetailCommand,
    DetailLength,
    Data,
}

/// Per-byte restartable CSAFE frame parser.
///
/// Feed it whatever chunks the transport delivers; it carries its state
/// across calls, so a frame split over many 20-byte BLE notifications
/// parses identically to one delivered whole. Any frame error resets the
/// parser to scan for the next start marker.
#[derive(Debug)]
pub struct FrameParser {
    side: ParserSide,
    verify_checksums: bool,
    in_frame: bool,
    state: ParseState,
    pending_stuff: bool,
    delay_slot: Option<u8>,
    checksum: u8,
    address: Option<ExtendedAddress>,
    status: Option<FrameStatus>,
    command: u8,
    detail_command: Option<u8>,
    remaining: usize,
    data: BytesMut,
}

impl FrameParser {
    /// Parser for the host side of the link (monitor responses).
    #[must_use]
    pub fn host() -> Self {
        Self::new(ParserSide::Host)
    }

    /// Parser for the monitor side of the link (host command frames).
    #[must_use]
    pub fn monitor() -> Self {
        Self::new(ParserSide::Monitor)
    }

    fn new(side: ParserSide) -> Self {
        Self {
            side,
            verify_checksums: true,
            in_frame: false,
            state: ParseState::Command,
            pending_stuff: false,
            delay_slot: None,
            checksum: 0,
            address: None,
            status: None,
            command: 0,
            detail_command: None,
            remaining: 0,
            data: BytesMut::new(),
        }
    }

    /// Disable or re-enable checksum verification.
    pub fn set_checksum_verification(&mut self, verify: bool) {
        self.verify_checksums = verify;
    }

    /// Drop any partial frame and scan for the next start marker.
    pub fn reset(&mut self) {
        self.in_frame = false;
        self.state = ParseState::Command;
        self.pending_stuff = false;
        self.delay_slot = None;
        self.checksum = 0;
        self.address = None;
        self.status = None;
        self.detail_command = None;
        self.remaining = 0;
        self.data.clear();
    }

    /// Consume a chunk of transport bytes, returning every event it
    /// completed. The chunk boundaries carry no meaning.
    ///
    /// # Errors
    ///
    /// [`OarlockError::ChecksumMismatch`] when a frame ends with a bad
    /// checksum and [`OarlockError::MalformedFrame`] for structural
    /// violations. Either error resets the parser.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<FrameEvent>> {
        let mut events = Vec::new();
        for &byte in bytes {
            if let Some(event) = self.push(byte).inspect_err(|_| self.reset())? {
                events.push(event);
            }
        }
        Ok(events)
    }

    fn begin(&mut self, extended: bool) {
        self.reset();
        self.in_frame = true;
        self.state = if extended {
            ParseState::ExtendedSource
        } else if self.side == ParserSide::Host {
            ParseState::Status
        } else {
            ParseState::Command
        };
    }

    fn push(&mut self, byte: u8) -> Result<Option<FrameEvent>> {
        if !self.in_frame {
            match byte {
                defs::FRAME_START_BYTE => self.begin(false),
                defs::EXT_FRAME_START_BYTE => self.begin(true),
                other => trace!(byte = other, "discarding byte outside frame"),
            }
            return Ok(None);
        }

        match byte {
            defs::FRAME_START_BYTE => {
                trace!("start marker inside frame, restarting");
                self.begin(false);
                Ok(None)
            }
            defs::EXT_FRAME_START_BYTE => {
                trace!("extended start marker inside frame, restarting");
                self.begin(true);
                Ok(None)
            }
            defs::FRAME_END_BYTE => self.finish(),
            defs::FRAME_STUFF_BYTE => {
                if self.pending_stuff {
                    return Err(OarlockError::MalformedFrame(
                        "stuff byte following stuff byte".into(),
                    ));
                }
                self.pending_stuff = true;
                Ok(None)
            }
            raw => {
                let value = if self.pending_stuff {
                    self.pending_stuff = false;
                    if raw > defs::FRAME_MAX_STUFF_OFFSET {
                        return Err(OarlockError::MalformedFrame(format!(
                            "invalid stuff offset {raw:02X}"
                        )));
                    }
                    defs::EXT_FRAME_START_BYTE + raw
                } else {
                    raw
                };
                // Delay every content byte by one position so the trailing
                // checksum is never consumed as content.
                let released = self.delay_slot.replace(value);
                match released {
                    Some(content) => {
                        self.checksum ^= content;
                        self.consume(content)
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Option<FrameEvent>> {
        if self.pending_stuff {
            return Err(OarlockError::MalformedFrame(
                "frame ended inside a stuff sequence".into(),
            ));
        }
        let Some(received) = self.delay_slot.take() else {
            return Err(OarlockError::MalformedFrame("empty frame".into()));
        };
        if self.state != ParseState::Command {
            return Err(OarlockError::MalformedFrame(
                "frame ended inside a command unit".into(),
            ));
        }
        if self.verify_checksums && received != self.checksum {
            return Err(OarlockError::ChecksumMismatch {
                calculated: self.checksum,
                received,
            });
        }
        let event = FrameEvent::End {
            status: self.status,
            address: self.address,
        };
        self.reset();
        Ok(Some(event))
    }

    fn consume(&mut self, byte: u8) -> Result<Option<FrameEvent>> {
        match self.state {
            ParseState::ExtendedSource => {
                self.address = Some(ExtendedAddress {
                    source: byte,
                    destination: 0,
                });
                self.state = ParseState::ExtendedDestination;
                Ok(None)
            }
            ParseState::ExtendedDestination => {
                if let Some(addr) = self.address.as_mut() {
                    addr.destination = byte;
                }
                self.state = if self.side == ParserSide::Host {
                    ParseState::Status
                } else {
                    ParseState::Command
                };
                Ok(None)
            }
            ParseState::Status => {
                self.status = Some(FrameStatus::from(byte));
                self.state = ParseState::Command;
                Ok(None)
            }
            ParseState::Command => {
                self.command = byte;
                self.detail_command = None;
                self.data.clear();
                // On the host side every response unit has a length header;
                // only outgoing frames carry bare short commands.
                if self.side == ParserSide::Monitor
                    && byte & defs::SHORT_CMD_TYPE_MSK != 0
                    && !defs::is_proprietary_wrapper(byte)
                {
                    return Ok(Some(self.emit()));
                }
                self.state = ParseState::CommandLength;
                Ok(None)
            }
            ParseState::CommandLength => {
                self.remaining = byte as usize;
                if defs::is_proprietary_wrapper(self.command) {
                    if self.remaining < defs::LONG_CMD_HDR_LENGTH {
                        return Err(OarlockError::MalformedFrame(format!(
                            "proprietary command {:02X} length {} too short for detail header",
                            self.command, self.remaining
                        )));
                    }
                    self.state = ParseState::DetailCommand;
                } else if self.remaining == 0 {
                    self.state = ParseState::Command;
                    return Ok(Some(self.emit()));
                } else {
                    self.state = ParseState::Data;
                }
                Ok(None)
            }
            ParseState::DetailCommand => {
                self.detail_command = Some(byte);
                self.remaining -= 1;
                self.state = ParseState::DetailLength;
                Ok(None)
            }
            ParseState::DetailLength => {
                self.remaining -= 1;
                if byte as usize != self.remaining {
                    return Err(OarlockError::MalformedFrame(format!(
                        "detail length {byte} does not match outer length remainder {}",
                        self.remaining
                    )));
                }
                if self.remaining == 0 {
                    self.state = ParseState::Command;
                    return Ok(Some(self.emit()));
                }
                self.state = ParseState::Data;
                Ok(None)
            }
            ParseState::Data => {
                self.data.put_u8(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = ParseState::Command;
                    return Ok(Some(self.emit()));
                }
                Ok(None)
            }
        }
    }

    fn emit(&mut self) -> FrameEvent {
        FrameEvent::Command(ParsedCommand {
            command: self.command,
            detail_command: self.detail_command,
            data: self.data.split().freeze(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{PmGetDataCmd, ProprietaryCmd, ShortDataCmd};

    fn short(command: u8) -> RawCommand {
        RawCommand {
            wait_for_response: true,
            command,
            detail_command: None,
            data: Vec::new(),
            reply: None,
        }
    }

    fn long(command: u8, data: &[u8]) -> RawCommand {
        RawCommand {
            wait_for_response: true,
            command,
            detail_command: None,
            data: data.to_vec(),
            reply: None,
        }
    }

    fn proprietary(command: u8, detail: u8, data: &[u8]) -> RawCommand {
        RawCommand {
            wait_for_response: true,
            command,
            detail_command: Some(detail),
            data: data.to_vec(),
            reply: None,
        }
    }

    #[test]
    fn test_encode_short_command() {
        let body = encode_command(&short(ShortDataCmd::GetCadence as u8)).unwrap();
        assert_eq!(body, vec![0xA7]);
    }

    #[test]
    fn test_encode_long_command() {
        let body = encode_command(&long(0x21, &[0xA0, 0x86, 0x01, 0x24])).unwrap();
        assert_eq!(body, vec![0x21, 0x04, 0xA0, 0x86, 0x01, 0x24]);
    }

    #[test]
    fn test_encode_proprietary_command() {
        let body = encode_command(&proprietary(
            ProprietaryCmd::GetPmData as u8,
            PmGetDataCmd::DragFactor as u8,
            &[],
        ))
        .unwrap();
        // Outer length covers the two-byte detail header.
        assert_eq!(body, vec![0x7F, 0x02, 0xC1, 0x00]);
    }

    #[test]
    fn test_encode_frame_wraps_and_checksums() {
        let frame = encode_frame(&[0xA7], None);
        // checksum over a single byte is that byte
        assert_eq!(frame.as_ref(), &[0xF1, 0xA7, 0xA7, 0xF2]);
    }

    #[test]
    fn test_encode_frame_stuffs_control_bytes() {
        let body = vec![0xF0, 0xF1, 0xF2, 0xF3];
        let frame = encode_frame(&body, None);
        let inner = &frame[1..frame.len() - 1];
        assert!(inner
            .iter()
            .all(|b| !(0xF0..=0xF2).contains(b)));
        // 0xF0^0xF1^0xF2^0xF3 == 0x00, no stuffing needed for the checksum
        assert_eq!(
            frame.as_ref(),
            &[0xF1, 0xF3, 0x00, 0xF3, 0x01, 0xF3, 0x02, 0xF3, 0x03, 0x00, 0xF2]
        );
    }

    #[test]
    fn test_extended_frame_carries_address() {
        let addr = ExtendedAddress {
            source: 0x00,
            destination: 0xFD,
        };
        let frame = encode_frame(&[0xA7], Some(addr));
        assert_eq!(frame[0], 0xF0);
        assert_eq!(&frame[1..3], &[0x00, 0xFD]);

        let mut parser = FrameParser::monitor();
        let events = parser.feed(&frame).unwrap();
        assert_eq!(events.len(), 2);
        match &events[1] {
            FrameEvent::End { address, .. } => assert_eq!(*address, Some(addr)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_mixed_buffer() {
        let commands = vec![
            short(ShortDataCmd::GetPace as u8),
            long(0x24, &[0x05]),
            proprietary(
                ProprietaryCmd::GetPmData as u8,
                PmGetDataCmd::StrokeState as u8,
                &[],
            ),
        ];
        let body = encode_commands(&commands).unwrap();
        let frame = encode_frame(&body, None);

        let mut parser = FrameParser::monitor();
        let events = parser.feed(&frame).unwrap();
        assert_eq!(events.len(), 4);
        match &events[0] {
            FrameEvent::Command(c) => {
                assert_eq!(c.command, 0xA6);
                assert!(c.data.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[1] {
            FrameEvent::Command(c) => {
                assert_eq!(c.command, 0x24);
                assert_eq!(c.data.as_ref(), &[0x05]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[2] {
            FrameEvent::Command(c) => {
                assert_eq!(c.command, 0x7F);
                assert_eq!(c.detail_command, Some(0xBF));
                assert!(c.data.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[3], FrameEvent::End { status: None, .. }));
    }

    #[test]
    fn test_round_trip_all_byte_values_survive_stuffing() {
        for value in 0u8..=255 {
            let commands = vec![long(0x1A, &[value])];
            let body = encode_commands(&commands).unwrap();
            let frame = encode_frame(&body, None);

            let mut parser = FrameParser::monitor();
            let events = parser.feed(&frame).unwrap();
            match &events[0] {
                FrameEvent::Command(c) => assert_eq!(c.data.as_ref(), &[value]),
                other => panic!("unexpected event for {value:02X}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_host_side_parses_status_and_response_units() {
        // status 0x81: Ready, prev frame Ok, toggle set
        let content = [0x81, 0x7F, 0x03, 0xC1, 0x01, 0x1E];
        let checksum = content.iter().fold(0u8, |acc, b| acc ^ b);
        let mut wire = vec![0xF1];
        wire.extend_from_slice(&content);
        wire.push(checksum);
        wire.push(0xF2);

        let mut parser = FrameParser::host();
        let events = parser.feed(&wire).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            FrameEvent::Command(c) => {
                assert_eq!(c.command, 0x7F);
                assert_eq!(c.detail_command, Some(0xC1));
                assert_eq!(c.data.as_ref(), &[0x1E]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match &events[1] {
            FrameEvent::End {
                status: Some(status),
                ..
            } => {
                assert_eq!(status.slave_state, SlaveState::Ready);
                assert_eq!(status.prev_frame_state, PrevFrameState::Ok);
                assert!(status.frame_toggle);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_chunked_feeding_matches_single_feed() {
        let commands = vec![
            proprietary(0x7E, 0x8D, &[]),
            long(0x20, &[0x00, 0x14, 0x00]),
        ];
        let body = encode_commands(&commands).unwrap();
        let frame = encode_frame(&body, None);

        let mut whole = FrameParser::monitor();
        let expected = whole.feed(&frame).unwrap();

        let mut chunked = FrameParser::monitor();
        let mut actual = Vec::new();
        for byte in frame.iter() {
            actual.extend(chunked.feed(&[*byte]).unwrap());
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_checksum_corruption_detected() {
        let content = [0x01, 0xA7, 0x01, 0x2C];
        let checksum = content.iter().fold(0u8, |acc, b| acc ^ b);
        let mut wire = vec![0xF1];
        wire.extend_from_slice(&content);
        wire.push(checksum ^ 0x10);
        wire.push(0xF2);

        let mut parser = FrameParser::host();
        match parser.feed(&wire) {
            Err(OarlockError::ChecksumMismatch { .. }) => {}
            other => panic!("expected checksum error, got {other:?}"),
        }

        // A valid frame parses after the error reset.
        let good = encode_frame(&[0xA7], None);
        let mut monitor = FrameParser::monitor();
        monitor.feed(&[0xF1, 0x42]).unwrap();
        monitor.reset();
        assert_eq!(monitor.feed(&good).unwrap().len(), 2);
    }

    #[test]
    fn test_checksum_verification_can_be_disabled() {
        let content = [0x01];
        let mut wire = vec![0xF1];
        wire.extend_from_slice(&content);
        wire.push(0x55); // wrong checksum
        wire.push(0xF2);

        let mut parser = FrameParser::host();
        parser.set_checksum_verification(false);
        let events = parser.feed(&wire).unwrap();
        assert!(matches!(events.last(), Some(FrameEvent::End { .. })));
    }

    #[test]
    fn test_invalid_stuff_offset_rejected() {
        let mut parser = FrameParser::monitor();
        let result = parser.feed(&[0xF1, 0xF3, 0x07]);
        assert!(matches!(result, Err(OarlockError::MalformedFrame(_))));
    }

    #[test]
    fn test_detail_length_inconsistency_rejected() {
        // outer length says 3 (detail + count + 1 data byte) but the inner
        // count claims 5
        let content = [0x01, 0x7F, 0x03, 0xC1, 0x05, 0x1E];
        let checksum = content.iter().fold(0u8, |acc, b| acc ^ b);
        let mut wire = vec![0xF1];
        wire.extend_from_slice(&content);
        wire.push(checksum);
        wire.push(0xF2);

        let mut parser = FrameParser::host();
        assert!(matches!(
            parser.feed(&wire),
            Err(OarlockError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_truncated_frame_rejected_at_end_marker() {
        // long command promises 4 data bytes but the frame ends early
        let mut parser = FrameParser::monitor();
        let result = parser.feed(&[0xF1, 0x21, 0x04, 0xA0, 0x86, 0xF2]);
        assert!(matches!(result, Err(OarlockError::MalformedFrame(_))));
    }

    #[test]
    fn test_bytes_outside_frames_are_ignored() {
        let mut parser = FrameParser::monitor();
        parser.feed(&[0x00, 0x55, 0xAA]).unwrap();
        let frame = encode_frame(&[0xA7], None);
        let events = parser.feed(&frame).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_frame_capacity() {
        assert_eq!(frame_capacity(false), 93);
        assert_eq!(frame_capacity(true), 91);
    }
}
