//! Decoders for the rowing telemetry the monitor pushes on its
//! notification characteristics.
//!
//! Every record exists in two layouts: the direct characteristic layout
//! and the multiplexed layout, where a one-byte type id selects the record
//! and a couple of fields are dropped to stay within the 20-byte
//! notification budget. Multi-byte values are little endian; heart-rate
//! bytes use `0xFF` as the "no belt paired" sentinel.

use tracing::warn;

use crate::error::{OarlockError, Result};
use crate::transport::TelemetryChannel;
use crate::types::{
    AdditionalWorkoutSummaryData, AdditionalWorkoutSummaryData2, ErgMachineType,
    HeartRateBeltInformation, IntervalType, RowingAdditionalSplitIntervalData,
    RowingAdditionalStatus1, RowingAdditionalStatus2, RowingAdditionalStrokeData,
    RowingGeneralStatus, RowingSplitIntervalData, RowingState, RowingStrokeData, StrokeState,
    WorkoutDurationType, WorkoutState, WorkoutSummaryData, WorkoutType,
};

/// Multiplexed type ids, one per record.
const MUX_GENERAL_STATUS: u8 = 49;
const MUX_ADDITIONAL_STATUS1: u8 = 50;
const MUX_ADDITIONAL_STATUS2: u8 = 51;
const MUX_STROKE_DATA: u8 = 53;
const MUX_ADDITIONAL_STROKE_DATA: u8 = 54;
const MUX_SPLIT_INTERVAL_DATA: u8 = 55;
const MUX_ADDITIONAL_SPLIT_INTERVAL_DATA: u8 = 56;
const MUX_WORKOUT_SUMMARY: u8 = 57;
const MUX_ADDITIONAL_WORKOUT_SUMMARY: u8 = 58;
const MUX_HEART_RATE_BELT: u8 = 59;
const MUX_ADDITIONAL_WORKOUT_SUMMARY2: u8 = 60;

/// One decoded telemetry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// General rowing status
    GeneralStatus(RowingGeneralStatus),
    /// First additional status record
    AdditionalStatus1(RowingAdditionalStatus1),
    /// Second additional status record
    AdditionalStatus2(RowingAdditionalStatus2),
    /// Per-stroke data
    StrokeData(RowingStrokeData),
    /// Additional per-stroke data
    AdditionalStrokeData(RowingAdditionalStrokeData),
    /// Split/interval data
    SplitIntervalData(RowingSplitIntervalData),
    /// Additional split/interval data
    AdditionalSplitIntervalData(RowingAdditionalSplitIntervalData),
    /// Workout summary
    WorkoutSummary(WorkoutSummaryData),
    /// Additional workout summary
    AdditionalWorkoutSummary(AdditionalWorkoutSummaryData),
    /// Second additional workout summary
    AdditionalWorkoutSummary2(AdditionalWorkoutSummaryData2),
    /// Heart-rate belt information
    HeartRateBelt(HeartRateBeltInformation),
}

fn need(data: &[u8], len: usize, what: &str) -> Result<()> {
    if data.len() < len {
        return Err(OarlockError::DecodeError(format!(
            "{what}: expected {len} bytes, got {}",
            data.len()
        )));
    }
    if data.len() > len {
        warn!(
            record = what,
            expected = len,
            actual = data.len(),
            "telemetry payload has trailing bytes"
        );
    }
    Ok(())
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u24_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], 0])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

const fn heart_rate(byte: u8) -> Option<u8> {
    if byte == 0xFF {
        None
    } else {
        Some(byte)
    }
}

fn decode_general_status(data: &[u8]) -> Result<TelemetryEvent> {
    need(data, 19, "general status")?;
    Ok(TelemetryEvent::GeneralStatus(RowingGeneralStatus {
        elapsed_time: u24_at(data, 0),
        distance: u24_at(data, 3),
        workout_type: WorkoutType::from(data[6]),
        interval_type: IntervalType::from(data[7]),
        workout_state: WorkoutState::from(data[8]),
        rowing_state: RowingState::from(data[9]),
        stroke_state: StrokeState::from(data[10]),
        total_work_distance: u24_at(data, 11),
        workout_duration: u24_at(data, 14),
        workout_duration_type: WorkoutDurationType::from(data[17]),
        drag_factor: data[18],
    }))
}

fn decode_additional_status1(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    // The direct layout replaces the trailing average power with an erg
    // machine type byte.
    need(data, if mux { 18 } else { 17 }, "additional status 1")?;
    Ok(TelemetryEvent::AdditionalStatus1(RowingAdditionalStatus1 {
        elapsed_time: u24_at(data, 0),
        speed: u16_at(data, 3),
        stroke_rate: data[5],
        heart_rate: heart_rate(data[6]),
        current_pace: u16_at(data, 7),
        average_pace: u16_at(data, 9),
        rest_distance: u16_at(data, 11),
        rest_time: u24_at(data, 13),
        average_power: if mux { Some(u16_at(data, 16)) } else { None },
    }))
}

fn decode_additional_status2(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    need(data, if mux { 18 } else { 20 }, "additional status 2")?;
    let mut at = 4;
    let average_power = if mux {
        None
    } else {
        at += 2;
        Some(u16_at(data, 4))
    };
    Ok(TelemetryEvent::AdditionalStatus2(RowingAdditionalStatus2 {
        elapsed_time: u24_at(data, 0),
        interval_count: data[3],
        average_power,
        total_calories: u16_at(data, at),
        split_average_pace: u16_at(data, at + 2),
        split_average_power: u16_at(data, at + 4),
        split_average_calories: u16_at(data, at + 6),
        last_split_time: u24_at(data, at + 8),
        last_split_distance: u24_at(data, at + 11),
    }))
}

fn decode_stroke_data(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    need(data, if mux { 18 } else { 20 }, "stroke data")?;
    let (work_per_stroke, count_at) = if mux {
        (None, 16)
    } else {
        (Some(u16_at(data, 16)), 18)
    };
    Ok(TelemetryEvent::StrokeData(RowingStrokeData {
        elapsed_time: u24_at(data, 0),
        distance: u24_at(data, 3),
        drive_length: data[6],
        drive_time: data[7],
        stroke_recovery_time: u16_at(data, 8),
        stroke_distance: u16_at(data, 10),
        peak_drive_force: u16_at(data, 12),
        average_drive_force: u16_at(data, 14),
        work_per_stroke,
        stroke_count: u16_at(data, count_at),
    }))
}

fn decode_additional_stroke_data(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    need(data, if mux { 17 } else { 15 }, "additional stroke data")?;
    Ok(TelemetryEvent::AdditionalStrokeData(
        RowingAdditionalStrokeData {
            elapsed_time: u24_at(data, 0),
            stroke_power: u16_at(data, 3),
            stroke_calories: u16_at(data, 5),
            stroke_count: u16_at(data, 7),
            projected_work_time: u24_at(data, 9),
            projected_work_distance: u24_at(data, 12),
            work_per_stroke: if mux { Some(u16_at(data, 15)) } else { None },
        },
    ))
}

fn decode_split_interval_data(data: &[u8]) -> Result<TelemetryEvent> {
    need(data, 18, "split interval data")?;
    Ok(TelemetryEvent::SplitIntervalData(RowingSplitIntervalData {
        elapsed_time: u24_at(data, 0),
        distance: u24_at(data, 3),
        interval_time: u24_at(data, 6),
        interval_distance: u24_at(data, 9),
        interval_rest_time: u16_at(data, 12),
        interval_rest_distance: u16_at(data, 14),
        interval_type: IntervalType::from(data[16]),
        interval_number: data[17],
    }))
}

fn decode_additional_split_interval_data(data: &[u8]) -> Result<TelemetryEvent> {
    need(data, 18, "additional split interval data")?;
    Ok(TelemetryEvent::AdditionalSplitIntervalData(
        RowingAdditionalSplitIntervalData {
            elapsed_time: u24_at(data, 0),
            interval_average_stroke_rate: data[3],
            interval_work_heartrate: heart_rate(data[4]),
            interval_rest_heartrate: heart_rate(data[5]),
            interval_average_pace: u16_at(data, 6),
            interval_total_calories: u16_at(data, 8),
            interval_average_calories: u16_at(data, 10),
            interval_speed: u16_at(data, 12),
            interval_power: u16_at(data, 14),
            split_average_drag_factor: data[16],
            interval_number: data[17],
        },
    ))
}

fn decode_workout_summary(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    need(data, if mux { 18 } else { 20 }, "workout summary")?;
    Ok(TelemetryEvent::WorkoutSummary(WorkoutSummaryData {
        log_entry_date: u16_at(data, 0),
        log_entry_time: u16_at(data, 2),
        elapsed_time: u24_at(data, 4),
        distance: u24_at(data, 7),
        average_stroke_rate: data[10],
        ending_heartrate: heart_rate(data[11]),
        average_heartrate: heart_rate(data[12]),
        min_heartrate: heart_rate(data[13]),
        max_heartrate: heart_rate(data[14]),
        drag_factor_average: data[15],
        recovery_heart_rate: heart_rate(data[16]),
        workout_type: WorkoutType::from(data[17]),
        average_pace: if mux { None } else { Some(u16_at(data, 18)) },
    }))
}

fn decode_additional_workout_summary(data: &[u8], mux: bool) -> Result<TelemetryEvent> {
    need(data, if mux { 18 } else { 19 }, "additional workout summary")?;
    let mut at = 4;
    let interval_type = if mux {
        None
    } else {
        at += 1;
        Some(IntervalType::from(data[4]))
    };
    Ok(TelemetryEvent::AdditionalWorkoutSummary(
        AdditionalWorkoutSummaryData {
            log_entry_date: u16_at(data, 0),
            log_entry_time: u16_at(data, 2),
            interval_type,
            interval_size: u16_at(data, at),
            interval_count: data[at + 2],
            total_calories: u16_at(data, at + 3),
            watts: u16_at(data, at + 5),
            total_rest_distance: u24_at(data, at + 7),
            interval_rest_time: u16_at(data, at + 10),
            average_calories: u16_at(data, at + 12),
        },
    ))
}

fn decode_additional_workout_summary2(data: &[u8]) -> Result<TelemetryEvent> {
    need(data, 10, "additional workout summary 2")?;
    Ok(TelemetryEvent::AdditionalWorkoutSummary2(
        AdditionalWorkoutSummaryData2 {
            log_entry_date: u16_at(data, 0),
            log_entry_time: u16_at(data, 2),
            average_pace: u16_at(data, 4),
            game_identifier: data[6],
            game_score: u16_at(data, 7),
            erg_machine_type: ErgMachineType::from(data[9]),
        },
    ))
}

fn decode_heart_rate_belt(data: &[u8]) -> Result<TelemetryEvent> {
    need(data, 6, "heart rate belt information")?;
    Ok(TelemetryEvent::HeartRateBelt(HeartRateBeltInformation {
        manufacturer_id: data[0],
        device_type: data[1],
        belt_id: u32_at(data, 2),
    }))
}

/// Decode a payload from one of the direct notification characteristics.
///
/// # Errors
///
/// [`OarlockError::DecodeError`] on truncated payloads and
/// [`OarlockError::InvalidParameters`] for the multiplexed channel, which
/// must go through a [`MuxAssembler`].
pub fn decode_direct(channel: TelemetryChannel, data: &[u8]) -> Result<TelemetryEvent> {
    match channel {
        TelemetryChannel::GeneralStatus => decode_general_status(data),
        TelemetryChannel::AdditionalStatus1 => decode_additional_status1(data, false),
        TelemetryChannel::AdditionalStatus2 => decode_additional_status2(data, false),
        TelemetryChannel::StrokeData => decode_stroke_data(data, false),
        TelemetryChannel::AdditionalStrokeData => decode_additional_stroke_data(data, false),
        TelemetryChannel::SplitIntervalData => decode_split_interval_data(data),
        TelemetryChannel::AdditionalSplitIntervalData => {
            decode_additional_split_interval_data(data)
        }
        TelemetryChannel::WorkoutSummary => decode_workout_summary(data, false),
        TelemetryChannel::AdditionalWorkoutSummary => {
            decode_additional_workout_summary(data, false)
        }
        TelemetryChannel::HeartRateBeltInformation => decode_heart_rate_belt(data),
        TelemetryChannel::Multiplexed => Err(OarlockError::InvalidParameters(
            "multiplexed payloads must be fed to a MuxAssembler".into(),
        )),
    }
}

/// Expected payload length for a multiplexed type id.
const fn mux_payload_len(type_id: u8) -> Option<usize> {
    match type_id {
        MUX_GENERAL_STATUS => Some(19),
        MUX_ADDITIONAL_STATUS1
        | MUX_ADDITIONAL_STATUS2
        | MUX_SPLIT_INTERVAL_DATA
        | MUX_ADDITIONAL_SPLIT_INTERVAL_DATA
        | MUX_WORKOUT_SUMMARY
        | MUX_ADDITIONAL_WORKOUT_SUMMARY => Some(18),
        MUX_STROKE_DATA => Some(18),
        MUX_ADDITIONAL_STROKE_DATA => Some(17),
        MUX_HEART_RATE_BELT => Some(6),
        MUX_ADDITIONAL_WORKOUT_SUMMARY2 => Some(10),
        _ => None,
    }
}

fn decode_mux(type_id: u8, data: &[u8]) -> Result<TelemetryEvent> {
    match type_id {
        MUX_GENERAL_STATUS => decode_general_status(data),
        MUX_ADDITIONAL_STATUS1 => decode_additional_status1(data, true),
        MUX_ADDITIONAL_STATUS2 => decode_additional_status2(data, true),
        MUX_STROKE_DATA => decode_stroke_data(data, true),
        MUX_ADDITIONAL_STROKE_DATA => decode_additional_stroke_data(data, true),
        MUX_SPLIT_INTERVAL_DATA => decode_split_interval_data(data),
        MUX_ADDITIONAL_SPLIT_INTERVAL_DATA => decode_additional_split_interval_data(data),
        MUX_WORKOUT_SUMMARY => decode_workout_summary(data, true),
        MUX_ADDITIONAL_WORKOUT_SUMMARY => decode_additional_workout_summary(data, true),
        MUX_ADDITIONAL_WORKOUT_SUMMARY2 => decode_additional_workout_summary2(data),
        MUX_HEART_RATE_BELT => decode_heart_rate_belt(data),
        other => Err(OarlockError::DecodeError(format!(
            "unknown multiplexed type id {other}"
        ))),
    }
}

/// Reassembles multiplexed notifications into complete records.
///
/// Each record starts with a one-byte type id; the remaining payload may
/// arrive split over several notifications when the link's packet size is
/// small, so the assembler buffers until the record's declared length is
/// reached. Unknown type ids drop the notification with a warning rather
/// than failing the stream.
#[derive(Debug, Default)]
pub struct MuxAssembler {
    pending: Option<(u8, usize, Vec<u8>)>,
}

impl MuxAssembler {
    /// Fresh assembler with no partial record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any partial record.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Consume one notification's bytes, returning the records completed.
    ///
    /// # Errors
    ///
    /// [`OarlockError::DecodeError`] when a completed record fails to
    /// decode; the partial state is cleared so the stream continues.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<TelemetryEvent>> {
        let mut events = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            match self.pending.take() {
                None => {
                    let type_id = rest[0];
                    rest = &rest[1..];
                    let Some(expected) = mux_payload_len(type_id) else {
                        warn!(type_id, "unknown multiplexed record type, dropping");
                        return Ok(events);
                    };
                    self.pending = Some((type_id, expected, Vec::with_capacity(expected)));
                }
                Some((type_id, expected, mut buf)) => {
                    let take = (expected - buf.len()).min(rest.len());
                    buf.extend_from_slice(&rest[..take]);
                    rest = &rest[take..];
                    if buf.len() == expected {
                        events.push(decode_mux(type_id, &buf)?);
                    } else {
                        self.pending = Some((type_id, expected, buf));
                    }
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general_status_payload() -> Vec<u8> {
        let mut data = vec![0u8; 19];
        data[0..3].copy_from_slice(&[0x10, 0x27, 0x00]); // 10000 ticks = 100 s
        data[3..6].copy_from_slice(&[0xE8, 0x03, 0x00]); // 1000 ticks = 100 m
        data[6] = 1; // just row with splits
        data[7] = 255; // no interval
        data[8] = 1; // workout row
        data[9] = 1; // active
        data[10] = 2; // driving
        data[17] = 128; // distance goal
        data[18] = 115; // drag factor
        data
    }

    #[test]
    fn test_decode_general_status() {
        let data = general_status_payload();
        match decode_direct(TelemetryChannel::GeneralStatus, &data).unwrap() {
            TelemetryEvent::GeneralStatus(status) => {
                assert_eq!(status.elapsed_time, 10_000);
                assert_eq!(status.distance, 1_000);
                assert_eq!(status.workout_type, WorkoutType::JustRowSplits);
                assert_eq!(status.interval_type, IntervalType::None);
                assert_eq!(status.workout_state, WorkoutState::WorkoutRow);
                assert_eq!(status.rowing_state, RowingState::Active);
                assert_eq!(status.stroke_state, StrokeState::Driving);
                assert_eq!(
                    status.workout_duration_type,
                    WorkoutDurationType::Distance
                );
                assert_eq!(status.drag_factor, 115);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_truncated_payload_fails() {
        let data = vec![0u8; 10];
        assert!(matches!(
            decode_direct(TelemetryChannel::GeneralStatus, &data),
            Err(OarlockError::DecodeError(_))
        ));
    }

    #[test]
    fn test_heart_rate_sentinel() {
        let mut data = vec![0u8; 17];
        data[6] = 0xFF;
        match decode_direct(TelemetryChannel::AdditionalStatus1, &data).unwrap() {
            TelemetryEvent::AdditionalStatus1(status) => {
                assert_eq!(status.heart_rate, None);
                assert_eq!(status.average_power, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let mut data = vec![0u8; 18];
        data[6] = 142;
        data[16..18].copy_from_slice(&[0x96, 0x00]);
        let mut assembler = MuxAssembler::new();
        let mut packet = vec![50];
        packet.extend_from_slice(&data);
        match &assembler.feed(&packet).unwrap()[0] {
            TelemetryEvent::AdditionalStatus1(status) => {
                assert_eq!(status.heart_rate, Some(142));
                assert_eq!(status.average_power, Some(150));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_mux_general_status() {
        let mut packet = vec![49];
        packet.extend_from_slice(&general_status_payload());
        let mut assembler = MuxAssembler::new();
        let events = assembler.feed(&packet).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TelemetryEvent::GeneralStatus(_)));
    }

    #[test]
    fn test_mux_unknown_type_is_non_fatal() {
        let mut assembler = MuxAssembler::new();
        let packet = [200u8, 1, 2, 3];
        let events = assembler.feed(&packet).unwrap();
        assert!(events.is_empty());

        // The stream keeps working afterwards.
        let mut packet = vec![49];
        packet.extend_from_slice(&general_status_payload());
        assert_eq!(assembler.feed(&packet).unwrap().len(), 1);
    }

    #[test]
    fn test_mux_record_split_across_notifications() {
        let mut packet = vec![49];
        packet.extend_from_slice(&general_status_payload());
        let (first, second) = packet.split_at(8);

        let mut assembler = MuxAssembler::new();
        assert!(assembler.feed(first).unwrap().is_empty());
        let events = assembler.feed(second).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            TelemetryEvent::GeneralStatus(status) => assert_eq!(status.drag_factor, 115),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_mux_heart_rate_belt() {
        let packet = [59u8, 0x01, 0x02, 0x44, 0x33, 0x22, 0x11];
        let mut assembler = MuxAssembler::new();
        match &assembler.feed(&packet).unwrap()[0] {
            TelemetryEvent::HeartRateBelt(info) => {
                assert_eq!(info.manufacturer_id, 1);
                assert_eq!(info.device_type, 2);
                assert_eq!(info.belt_id, 0x1122_3344);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_direct_stroke_data_has_work_per_stroke() {
        let mut data = vec![0u8; 20];
        data[16..18].copy_from_slice(&[0x2A, 0x00]);
        data[18..20].copy_from_slice(&[0x07, 0x00]);
        match decode_direct(TelemetryChannel::StrokeData, &data).unwrap() {
            TelemetryEvent::StrokeData(stroke) => {
                assert_eq!(stroke.work_per_stroke, Some(42));
                assert_eq!(stroke.stroke_count, 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let mut mux_data = vec![53u8];
        mux_data.extend_from_slice(&data[..16]);
        mux_data.extend_from_slice(&[0x07, 0x00]);
        let mut assembler = MuxAssembler::new();
        match &assembler.feed(&mux_data).unwrap()[0] {
            TelemetryEvent::StrokeData(stroke) => {
                assert_eq!(stroke.work_per_stroke, None);
                assert_eq!(stroke.stroke_count, 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_workout_summary_layout_difference() {
        let mut direct = vec![0u8; 20];
        direct[17] = 5; // fixed time with splits
        direct[18..20].copy_from_slice(&[0x84, 0x03]); // pace 900
        match decode_direct(TelemetryChannel::WorkoutSummary, &direct).unwrap() {
            TelemetryEvent::WorkoutSummary(summary) => {
                assert_eq!(summary.workout_type, WorkoutType::FixedTimeSplits);
                assert_eq!(summary.average_pace, Some(900));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let mut packet = vec![57u8];
        packet.extend_from_slice(&direct[..18]);
        let mut assembler = MuxAssembler::new();
        match &assembler.feed(&packet).unwrap()[0] {
            TelemetryEvent::WorkoutSummary(summary) => {
                assert_eq!(summary.average_pace, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
