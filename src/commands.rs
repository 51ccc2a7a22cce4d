//! Command registry, command buffer and the typed receivers a buffer
//! hands out for every queued command.
//!
//! A [`CommandBuffer`] accumulates commands and is consumed by
//! [`crate::monitor::PerformanceMonitor::send`]. Every push returns a
//! [`ValueReceiver`] that resolves once the whole frame's response has been
//! verified, carrying either the decoded value or the error that failed the
//! transaction.

use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::defs::{
    self, LongCfgCmd, LongDataCmd, PmGetCfgCmd, PmGetDataCmd, PmSetCfgCmd, ProprietaryCmd,
    ShortCtrlCmd, ShortDataCmd, ShortStatusCmd,
};
use crate::error::{OarlockError, Result};
use crate::types::{
    ExtendedAddress, IntervalType, Program, ScreenType, ScreenValue, StrokeState, Unit,
    WorkoutDurationType, WorkoutState, WorkoutType,
};

/// Broad category of a command, used for registry bookkeeping and for the
/// default transmit ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Single-byte state transition command
    ShortControl,
    /// Single-byte value query
    ShortGet,
    /// Standard long command setting a value
    LongSet,
    /// Proprietary configuration read (wrapped in GETPMCFG)
    ProprietaryGetCfg,
    /// Proprietary data read (wrapped in GETPMDATA)
    ProprietaryGetData,
    /// Proprietary configuration write (wrapped in SETPMCFG)
    ProprietarySetCfg,
    /// Proprietary data write (wrapped in SETPMDATA)
    ProprietarySetData,
}

/// Description of one command the registry knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    /// Registry name, unique
    pub name: String,
    /// Command category
    pub kind: CommandKind,
    /// Command byte (the wrapper byte for proprietary commands)
    pub command: u8,
    /// Detail command byte for proprietary commands
    pub detail: Option<u8>,
}

impl CommandDef {
    /// Describe a command.
    #[must_use]
    pub fn new(name: &str, kind: CommandKind, command: u8, detail: Option<u8>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            command,
            detail,
        }
    }
}

/// Name-keyed table of known commands.
///
/// The engine owns one behind an `Arc` and hands it to every buffer it
/// creates; custom commands are added with [`CommandRegistry::register`]
/// before the registry is shared.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDef>,
}

impl CommandRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the standard command catalog.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let catalog = [
            ("get_status", CommandKind::ShortGet, ShortCtrlCmd::GetStatus as u8, None),
            ("reset", CommandKind::ShortControl, ShortCtrlCmd::Reset as u8, None),
            ("go_idle", CommandKind::ShortControl, ShortCtrlCmd::GoIdle as u8, None),
            ("go_in_use", CommandKind::ShortControl, ShortCtrlCmd::GoInUse as u8, None),
            ("go_finished", CommandKind::ShortControl, ShortCtrlCmd::GoFinished as u8, None),
            ("go_ready", CommandKind::ShortControl, ShortCtrlCmd::GoReady as u8, None),
            ("get_version", CommandKind::ShortGet, ShortStatusCmd::GetVersion as u8, None),
            ("get_serial", CommandKind::ShortGet, ShortStatusCmd::GetSerial as u8, None),
            ("get_distance", CommandKind::ShortGet, ShortDataCmd::GetHorizontal as u8, None),
            ("get_calories", CommandKind::ShortGet, ShortDataCmd::GetCalories as u8, None),
            ("get_pace", CommandKind::ShortGet, ShortDataCmd::GetPace as u8, None),
            ("get_cadence", CommandKind::ShortGet, ShortDataCmd::GetCadence as u8, None),
            ("get_heart_rate", CommandKind::ShortGet, ShortDataCmd::GetHrCur as u8, None),
            ("get_power", CommandKind::ShortGet, ShortDataCmd::GetPower as u8, None),
            ("set_time", CommandKind::LongSet, LongCfgCmd::SetTime as u8, None),
            ("set_date", CommandKind::LongSet, LongCfgCmd::SetDate as u8, None),
            ("set_timeout", CommandKind::LongSet, LongCfgCmd::SetTimeout as u8, None),
            ("set_work", CommandKind::LongSet, LongDataCmd::SetTWork as u8, None),
            ("set_distance", CommandKind::LongSet, LongDataCmd::SetHorizontal as u8, None),
            ("set_total_calories", CommandKind::LongSet, LongDataCmd::SetCalories as u8, None),
            ("set_program", CommandKind::LongSet, LongDataCmd::SetProgram as u8, None),
            ("set_power", CommandKind::LongSet, LongDataCmd::SetPower as u8, None),
            ("get_firmware_version", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::FwVersion as u8)),
            ("get_hardware_version", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::HwVersion as u8)),
            ("get_workout_type", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::WorkoutType as u8)),
            ("get_workout_state", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::WorkoutState as u8)),
            ("get_interval_type", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::IntervalType as u8)),
            ("get_workout_interval_count", CommandKind::ProprietaryGetCfg, ProprietaryCmd::GetPmCfg as u8, Some(PmGetCfgCmd::WorkoutIntervalCount as u8)),
            ("get_work_time", CommandKind::ProprietaryGetData, ProprietaryCmd::GetPmData as u8, Some(PmGetDataCmd::WorkTime as u8)),
            ("get_work_distance", CommandKind::ProprietaryGetData, ProprietaryCmd::GetPmData as u8, Some(PmGetDataCmd::WorkDistance as u8)),
            ("get_stroke_rate", CommandKind::ProprietaryGetData, ProprietaryCmd::GetPmData as u8, Some(PmGetDataCmd::StrokeRate as u8)),
            ("get_stroke_state", CommandKind::ProprietaryGetData, ProprietaryCmd::GetPmData as u8, Some(PmGetDataCmd::StrokeState as u8)),
            ("get_drag_factor", CommandKind::ProprietaryGetData, ProprietaryCmd::GetPmData as u8, Some(PmGetDataCmd::DragFactor as u8)),
            ("set_workout_type", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::WorkoutType as u8)),
            ("set_workout_duration", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::WorkoutDuration as u8)),
            ("set_rest_duration", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::RestDuration as u8)),
            ("set_split_duration", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::SplitDuration as u8)),
            ("set_target_pace_time", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::TargetPaceTime as u8)),
            ("set_screen_state", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::ScreenState as u8)),
            ("configure_workout", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::ConfigureWorkout as u8)),
            ("set_target_average_watts", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::TargetAvgWatts as u8)),
            ("set_target_calories_per_hour", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::TargetCalsPerHour as u8)),
            ("set_interval_type", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::IntervalType as u8)),
            ("set_workout_interval_count", CommandKind::ProprietarySetCfg, ProprietaryCmd::SetPmCfg as u8, Some(PmSetCfgCmd::WorkoutIntervalCount as u8)),
        ];
        for (name, kind, command, detail) in catalog {
            // Names in the built-in catalog are unique by construction.
            let _ = registry.register(CommandDef::new(name, kind, command, detail));
        }
        registry
    }

    /// Add a command definition.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::InvalidParameters`] when the name is taken.
    pub fn register(&mut self, def: CommandDef) -> Result<()> {
        if self.commands.contains_key(&def.name) {
            return Err(OarlockError::InvalidParameters(format!(
                "command name '{}' is already registered",
                def.name
            )));
        }
        self.commands.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up a command by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandDef> {
        self.commands.get(name)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// One encodable command with its pending reply channel.
#[derive(Debug)]
pub struct RawCommand {
    /// Whether a response unit is expected for this command
    pub wait_for_response: bool,
    /// Command byte (the wrapper byte for proprietary commands)
    pub command: u8,
    /// Detail command byte for proprietary commands
    pub detail_command: Option<u8>,
    /// Parameter bytes
    pub data: Vec<u8>,
    /// Resolved with the raw response payload or the transaction error
    pub(crate) reply: Option<oneshot::Sender<Result<Bytes>>>,
}

fn category_rank(command: &RawCommand) -> u8 {
    match command.command {
        c if c == ProprietaryCmd::SetPmCfg as u8 => 2,
        c if c == ProprietaryCmd::SetPmData as u8 => 3,
        c if c == ProprietaryCmd::GetPmCfg as u8 => 4,
        c if c == ProprietaryCmd::GetPmData as u8 => 5,
        c if c & defs::SHORT_CMD_TYPE_MSK != 0 => {
            if c <= ShortCtrlCmd::BadId as u8 {
                0
            } else {
                6
            }
        }
        _ => 1,
    }
}

/// Default transmit ordering: state transitions first, then standard and
/// proprietary sets, then gets. Applied with a stable sort, so push order
/// is preserved within a category.
#[must_use]
pub fn category_order(a: &RawCommand, b: &RawCommand) -> Ordering {
    category_rank(a).cmp(&category_rank(b))
}

type Decoder<T> = Box<dyn FnOnce(Bytes) -> Result<T> + Send>;

/// Pending result of one queued command.
///
/// Resolves after the frame carrying the command receives a fully verified
/// response, or with the error that sank the transaction.
pub struct ValueReceiver<T> {
    receiver: oneshot::Receiver<Result<Bytes>>,
    decoder: Decoder<T>,
}

impl<T> std::fmt::Debug for ValueReceiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueReceiver").finish_non_exhaustive()
    }
}

impl<T> ValueReceiver<T> {
    /// Await and decode the response for this command.
    ///
    /// # Errors
    ///
    /// The transaction error, [`OarlockError::Aborted`] when the engine
    /// dropped the command without settling it, or
    /// [`OarlockError::DecodeError`] when the payload does not fit.
    pub async fn recv(self) -> Result<T> {
        let payload = self
            .receiver
            .await
            .map_err(|_| OarlockError::Aborted)??;
        (self.decoder)(payload)
    }
}

fn need(data: &Bytes, len: usize) -> Result<()> {
    if data.len() < len {
        return Err(OarlockError::DecodeError(format!(
            "expected at least {len} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

fn le_u16(data: &Bytes, offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn le_u32(data: &Bytes, offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Version block returned by the standard version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Manufacturer id
    pub manufacturer_id: u8,
    /// CSAFE interface definition id
    pub cid: u8,
    /// Model number
    pub model: u8,
    /// Hardware version
    pub hardware_version: u16,
    /// Firmware version
    pub firmware_version: u16,
}

/// Value with the measurement unit the monitor reported it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitValue {
    /// Raw value
    pub value: u16,
    /// Unit identifier byte
    pub unit: u8,
}

/// Accumulates commands for one transaction.
///
/// Obtained from [`crate::monitor::PerformanceMonitor::new_buffer`]; every
/// push method returns a receiver for that command's decoded response, and
/// the buffer itself is consumed by `send`.
#[derive(Debug)]
pub struct CommandBuffer {
    registry: Arc<CommandRegistry>,
    address: Option<ExtendedAddress>,
    commands: Vec<RawCommand>,
}

impl CommandBuffer {
    pub(crate) fn new(registry: Arc<CommandRegistry>, address: Option<ExtendedAddress>) -> Self {
        Self {
            registry,
            address,
            commands: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<RawCommand>, Option<ExtendedAddress>) {
        (self.commands, self.address)
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push_with<T>(
        &mut self,
        command: u8,
        detail: Option<u8>,
        data: Vec<u8>,
        decoder: Decoder<T>,
    ) -> ValueReceiver<T> {
        let (tx, rx) = oneshot::channel();
        self.commands.push(RawCommand {
            wait_for_response: true,
            command,
            detail_command: detail,
            data,
            reply: Some(tx),
        });
        ValueReceiver {
            receiver: rx,
            decoder,
        }
    }

    /// Queue a raw command by bytes, receiving the undecoded payload.
    pub fn push_raw(
        &mut self,
        command: u8,
        detail: Option<u8>,
        data: Vec<u8>,
    ) -> ValueReceiver<Bytes> {
        self.push_with(command, detail, data, Box::new(Ok))
    }

    /// Queue a registered command by name, receiving the undecoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::InvalidParameters`] for an unknown name.
    pub fn push(&mut self, name: &str, data: Vec<u8>) -> Result<ValueReceiver<Bytes>> {
        let def = self.registry.get(name).ok_or_else(|| {
            OarlockError::InvalidParameters(format!("unknown command '{name}'"))
        })?;
        let (command, detail) = (def.command, def.detail);
        Ok(self.push_raw(command, detail, data))
    }

    // Short control commands

    /// Reset the monitor to the ready state.
    pub fn reset(&mut self) -> ValueReceiver<()> {
        self.push_unit(ShortCtrlCmd::Reset as u8, None, Vec::new())
    }

    /// Move the monitor to the idle state.
    pub fn go_idle(&mut self) -> ValueReceiver<()> {
        self.push_unit(ShortCtrlCmd::GoIdle as u8, None, Vec::new())
    }

    /// Move the monitor to the in-use state.
    pub fn go_in_use(&mut self) -> ValueReceiver<()> {
        self.push_unit(ShortCtrlCmd::GoInUse as u8, None, Vec::new())
    }

    /// Move the monitor to the finished state.
    pub fn go_finished(&mut self) -> ValueReceiver<()> {
        self.push_unit(ShortCtrlCmd::GoFinished as u8, None, Vec::new())
    }

    /// Move the monitor to the ready state.
    pub fn go_ready(&mut self) -> ValueReceiver<()> {
        self.push_unit(ShortCtrlCmd::GoReady as u8, None, Vec::new())
    }

    // Short get commands

    /// Request the status byte only; resolves when the frame settles.
    pub fn get_status(&mut self) -> ValueReceiver<Bytes> {
        self.push_raw(ShortCtrlCmd::GetStatus as u8, None, Vec::new())
    }

    /// Query the manufacturer/model/version block.
    pub fn get_version(&mut self) -> ValueReceiver<VersionInfo> {
        self.push_with(
            ShortStatusCmd::GetVersion as u8,
            None,
            Vec::new(),
            Box::new(|data| {
                need(&data, 7)?;
                Ok(VersionInfo {
                    manufacturer_id: data[0],
                    cid: data[1],
                    model: data[2],
                    hardware_version: le_u16(&data, 3),
                    firmware_version: le_u16(&data, 5),
                })
            }),
        )
    }

    /// Query the current horizontal distance with its unit.
    pub fn get_distance(&mut self) -> ValueReceiver<UnitValue> {
        self.push_with(
            ShortDataCmd::GetHorizontal as u8,
            None,
            Vec::new(),
            Box::new(|data| {
                need(&data, 3)?;
                Ok(UnitValue {
                    value: le_u16(&data, 0),
                    unit: data[2],
                })
            }),
        )
    }

    /// Query the current pace with its unit.
    pub fn get_pace(&mut self) -> ValueReceiver<UnitValue> {
        self.push_unit_value(ShortDataCmd::GetPace as u8)
    }

    /// Query the current power with its unit.
    pub fn get_power(&mut self) -> ValueReceiver<UnitValue> {
        self.push_unit_value(ShortDataCmd::GetPower as u8)
    }

    /// Query the current cadence (strokes per minute) with its unit.
    pub fn get_cadence(&mut self) -> ValueReceiver<UnitValue> {
        self.push_unit_value(ShortDataCmd::GetCadence as u8)
    }

    /// Query the accumulated calories.
    pub fn get_calories(&mut self) -> ValueReceiver<u16> {
        self.push_with(
            ShortDataCmd::GetCalories as u8,
            None,
            Vec::new(),
            Box::new(|data| {
                need(&data, 2)?;
                Ok(le_u16(&data, 0))
            }),
        )
    }

    /// Query the current heart rate in bpm.
    pub fn get_heart_rate(&mut self) -> ValueReceiver<u8> {
        self.push_with(
            ShortDataCmd::GetHrCur as u8,
            None,
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(data[0])
            }),
        )
    }

    // Standard long set commands

    /// Set the time of day.
    pub fn set_time(&mut self, hour: u8, minute: u8, second: u8) -> ValueReceiver<()> {
        self.push_unit(LongCfgCmd::SetTime as u8, None, vec![hour, minute, second])
    }

    /// Set the date. The year is an offset from 1900.
    pub fn set_date(&mut self, year: u8, month: u8, day: u8) -> ValueReceiver<()> {
        self.push_unit(LongCfgCmd::SetDate as u8, None, vec![year, month, day])
    }

    /// Set the state timeout in seconds.
    pub fn set_timeout(&mut self, seconds: u8) -> ValueReceiver<()> {
        self.push_unit(LongCfgCmd::SetTimeout as u8, None, vec![seconds])
    }

    /// Set the workout time goal.
    pub fn set_work(&mut self, hour: u8, minute: u8, second: u8) -> ValueReceiver<()> {
        self.push_unit(LongDataCmd::SetTWork as u8, None, vec![hour, minute, second])
    }

    /// Set the horizontal distance goal.
    pub fn set_distance(&mut self, value: u16, unit: Unit) -> ValueReceiver<()> {
        let mut data = value.to_le_bytes().to_vec();
        data.push(unit as u8);
        self.push_unit(LongDataCmd::SetHorizontal as u8, None, data)
    }

    /// Set the calorie goal.
    pub fn set_total_calories(&mut self, calories: u16) -> ValueReceiver<()> {
        self.push_unit(
            LongDataCmd::SetCalories as u8,
            None,
            calories.to_le_bytes().to_vec(),
        )
    }

    /// Select a stored program.
    pub fn set_program(&mut self, program: Program) -> ValueReceiver<()> {
        self.push_unit(LongDataCmd::SetProgram as u8, None, vec![program as u8])
    }

    /// Set the power goal.
    pub fn set_power(&mut self, value: u16, unit: Unit) -> ValueReceiver<()> {
        let mut data = value.to_le_bytes().to_vec();
        data.push(unit as u8);
        self.push_unit(LongDataCmd::SetPower as u8, None, data)
    }

    // Proprietary get commands

    /// Query the current stroke state.
    pub fn get_stroke_state(&mut self) -> ValueReceiver<StrokeState> {
        self.push_with(
            ProprietaryCmd::GetPmData as u8,
            Some(PmGetDataCmd::StrokeState as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(StrokeState::from(data[0]))
            }),
        )
    }

    /// Query the current drag factor.
    pub fn get_drag_factor(&mut self) -> ValueReceiver<u8> {
        self.push_with(
            ProprietaryCmd::GetPmData as u8,
            Some(PmGetDataCmd::DragFactor as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(data[0])
            }),
        )
    }

    /// Query the elapsed work distance in 0.1 m ticks.
    pub fn get_work_distance(&mut self) -> ValueReceiver<u32> {
        self.push_le_u32(ProprietaryCmd::GetPmData as u8, PmGetDataCmd::WorkDistance as u8)
    }

    /// Query the elapsed work time in 0.01 s ticks.
    pub fn get_work_time(&mut self) -> ValueReceiver<u32> {
        self.push_le_u32(ProprietaryCmd::GetPmData as u8, PmGetDataCmd::WorkTime as u8)
    }

    /// Query the current stroke rate.
    pub fn get_stroke_rate(&mut self) -> ValueReceiver<u8> {
        self.push_with(
            ProprietaryCmd::GetPmData as u8,
            Some(PmGetDataCmd::StrokeRate as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(data[0])
            }),
        )
    }

    /// Query the active workout type.
    pub fn get_workout_type(&mut self) -> ValueReceiver<WorkoutType> {
        self.push_with(
            ProprietaryCmd::GetPmCfg as u8,
            Some(PmGetCfgCmd::WorkoutType as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(WorkoutType::from(data[0]))
            }),
        )
    }

    /// Query the workout state.
    pub fn get_workout_state(&mut self) -> ValueReceiver<WorkoutState> {
        self.push_with(
            ProprietaryCmd::GetPmCfg as u8,
            Some(PmGetCfgCmd::WorkoutState as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(WorkoutState::from(data[0]))
            }),
        )
    }

    /// Query the active interval type.
    pub fn get_interval_type(&mut self) -> ValueReceiver<IntervalType> {
        self.push_with(
            ProprietaryCmd::GetPmCfg as u8,
            Some(PmGetCfgCmd::IntervalType as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(IntervalType::from(data[0]))
            }),
        )
    }

    /// Query the configured workout interval count.
    pub fn get_workout_interval_count(&mut self) -> ValueReceiver<u8> {
        self.push_with(
            ProprietaryCmd::GetPmCfg as u8,
            Some(PmGetCfgCmd::WorkoutIntervalCount as u8),
            Vec::new(),
            Box::new(|data| {
                need(&data, 1)?;
                Ok(data[0])
            }),
        )
    }

    // Proprietary set commands

    /// Select the workout type.
    pub fn set_workout_type(&mut self, workout_type: WorkoutType) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::WorkoutType, vec![workout_type.as_u8()])
    }

    /// Set the workout duration goal.
    pub fn set_workout_duration(
        &mut self,
        duration_type: WorkoutDurationType,
        value: u32,
    ) -> ValueReceiver<()> {
        let mut data = vec![duration_type.as_u8()];
        data.extend_from_slice(&value.to_le_bytes());
        self.push_pm_cfg(PmSetCfgCmd::WorkoutDuration, data)
    }

    /// Set the rest duration in seconds.
    pub fn set_rest_duration(&mut self, seconds: u16) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::RestDuration, seconds.to_le_bytes().to_vec())
    }

    /// Set the split duration.
    pub fn set_split_duration(
        &mut self,
        duration_type: WorkoutDurationType,
        value: u32,
    ) -> ValueReceiver<()> {
        let mut data = vec![duration_type.as_u8()];
        data.extend_from_slice(&value.to_le_bytes());
        self.push_pm_cfg(PmSetCfgCmd::SplitDuration, data)
    }

    /// Set the target pace time in 0.01 s ticks.
    pub fn set_target_pace_time(&mut self, value: u32) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::TargetPaceTime, value.to_le_bytes().to_vec())
    }

    /// Drive the monitor screen state machine.
    pub fn set_screen_state(
        &mut self,
        screen_type: ScreenType,
        value: ScreenValue,
    ) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::ScreenState, vec![screen_type as u8, value as u8])
    }

    /// Enter or leave workout programming mode.
    pub fn configure_workout(&mut self, programming_mode: bool) -> ValueReceiver<()> {
        self.push_pm_cfg(
            PmSetCfgCmd::ConfigureWorkout,
            vec![u8::from(programming_mode)],
        )
    }

    /// Set the target average power in watts.
    pub fn set_target_average_watts(&mut self, watts: u16) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::TargetAvgWatts, watts.to_le_bytes().to_vec())
    }

    /// Set the target caloric burn rate in cal/hr.
    pub fn set_target_calories_per_hour(&mut self, calories: u16) -> ValueReceiver<()> {
        self.push_pm_cfg(
            PmSetCfgCmd::TargetCalsPerHour,
            calories.to_le_bytes().to_vec(),
        )
    }

    /// Select the interval type.
    pub fn set_interval_type(&mut self, interval_type: IntervalType) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::IntervalType, vec![interval_type.as_u8()])
    }

    /// Set the number of workout intervals.
    pub fn set_workout_interval_count(&mut self, count: u8) -> ValueReceiver<()> {
        self.push_pm_cfg(PmSetCfgCmd::WorkoutIntervalCount, vec![count])
    }

    fn push_unit(&mut self, command: u8, detail: Option<u8>, data: Vec<u8>) -> ValueReceiver<()> {
        self.push_with(command, detail, data, Box::new(|_| Ok(())))
    }

    fn push_unit_value(&mut self, command: u8) -> ValueReceiver<UnitValue> {
        self.push_with(
            command,
            None,
            Vec::new(),
            Box::new(|data| {
                need(&data, 3)?;
                Ok(UnitValue {
                    value: le_u16(&data, 0),
                    unit: data[2],
                })
            }),
        )
    }

    fn push_pm_cfg(&mut self, detail: PmSetCfgCmd, data: Vec<u8>) -> ValueReceiver<()> {
        self.push_unit(ProprietaryCmd::SetPmCfg as u8, Some(detail as u8), data)
    }

    fn push_le_u32(&mut self, command: u8, detail: u8) -> ValueReceiver<u32> {
        self.push_with(
            command,
            Some(detail),
            Vec::new(),
            Box::new(|data| {
                need(&data, 4)?;
                Ok(le_u32(&data, 0))
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> CommandBuffer {
        CommandBuffer::new(Arc::new(CommandRegistry::standard()), None)
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDef::new("custom", CommandKind::ShortGet, 0xA0, None))
            .unwrap();
        let result =
            registry.register(CommandDef::new("custom", CommandKind::ShortGet, 0xA1, None));
        assert!(matches!(result, Err(OarlockError::InvalidParameters(_))));
    }

    #[test]
    fn test_standard_registry_catalog() {
        let registry = CommandRegistry::standard();
        let drag = registry.get("get_drag_factor").unwrap();
        assert_eq!(drag.command, 0x7F);
        assert_eq!(drag.detail, Some(0xC1));
        assert_eq!(drag.kind, CommandKind::ProprietaryGetData);

        let duration = registry.get("set_workout_duration").unwrap();
        assert_eq!(duration.command, 0x76);
        assert_eq!(duration.detail, Some(0x03));
        assert!(registry.get("no_such_command").is_none());
    }

    #[test]
    fn test_buffer_accumulates_commands() {
        let mut buffer = buffer();
        assert!(buffer.is_empty());
        let _state = buffer.get_stroke_state();
        let _drag = buffer.get_drag_factor();
        assert_eq!(buffer.len(), 2);

        let (commands, address) = buffer.into_parts();
        assert!(address.is_none());
        assert_eq!(commands[0].command, 0x7F);
        assert_eq!(commands[0].detail_command, Some(0xBF));
        assert_eq!(commands[1].detail_command, Some(0xC1));
    }

    #[test]
    fn test_workout_duration_encoding() {
        let mut buffer = buffer();
        let _rx = buffer.set_workout_duration(WorkoutDurationType::Distance, 2000);
        let (commands, _) = buffer.into_parts();
        assert_eq!(commands[0].command, 0x76);
        assert_eq!(commands[0].detail_command, Some(0x03));
        assert_eq!(commands[0].data, vec![128, 0xD0, 0x07, 0x00, 0x00]);
    }

    #[test]
    fn test_push_by_name_uses_registry() {
        let mut buffer = buffer();
        let _rx = buffer.push("get_work_time", Vec::new()).unwrap();
        let (commands, _) = buffer.into_parts();
        assert_eq!(commands[0].command, 0x7F);
        assert_eq!(commands[0].detail_command, Some(0xA0));

        let mut buffer = CommandBuffer::new(Arc::new(CommandRegistry::standard()), None);
        assert!(buffer.push("bogus", Vec::new()).is_err());
    }

    #[test]
    fn test_category_order_groups_sets_before_gets() {
        let mut buffer = buffer();
        let _a = buffer.get_drag_factor();
        let _b = buffer.set_workout_type(WorkoutType::JustRowSplits);
        let _c = buffer.get_stroke_state();
        let _d = buffer.go_in_use();
        let (mut commands, _) = buffer.into_parts();

        commands.sort_by(category_order);
        // control first, then the proprietary set, then the two gets in
        // their original relative order
        assert_eq!(commands[0].command, 0x85);
        assert_eq!(commands[1].command, 0x76);
        assert_eq!(commands[2].detail_command, Some(0xC1));
        assert_eq!(commands[3].detail_command, Some(0xBF));
    }

    #[tokio::test]
    async fn test_value_receiver_decodes_payload() {
        let mut buffer = buffer();
        let receiver = buffer.get_stroke_state();
        let (mut commands, _) = buffer.into_parts();
        let reply = commands[0].reply.take().unwrap();
        reply.send(Ok(Bytes::from_static(&[0x02]))).unwrap();
        assert_eq!(receiver.recv().await.unwrap(), StrokeState::Driving);
    }

    #[tokio::test]
    async fn test_value_receiver_surfaces_transaction_error() {
        let mut buffer = buffer();
        let receiver = buffer.get_drag_factor();
        let (mut commands, _) = buffer.into_parts();
        let reply = commands[0].reply.take().unwrap();
        reply
            .send(Err(OarlockError::ResponseTimeout { timeout_ms: 500 }))
            .unwrap();
        assert!(matches!(
            receiver.recv().await,
            Err(OarlockError::ResponseTimeout { timeout_ms: 500 })
        ));
    }

    #[tokio::test]
    async fn test_value_receiver_dropped_sender_is_aborted() {
        let mut buffer = buffer();
        let receiver = buffer.get_drag_factor();
        drop(buffer);
        assert!(matches!(receiver.recv().await, Err(OarlockError::Aborted)));
    }

    #[test]
    fn test_short_decoder_rejects_truncated_payload() {
        let data = Bytes::from_static(&[0x01]);
        assert!(need(&data, 2).is_err());
        assert!(need(&data, 1).is_ok());
    }
}
