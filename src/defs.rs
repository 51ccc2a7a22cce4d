//! CSAFE framing constants and command identifier tables.
//!
//! These values come from the public CSAFE specification and the Concept2
//! PM proprietary extension of it. They are pure data: the frame codec and
//! the command registry consume them, nothing in here has behavior.

/// Start marker of an extended (addressed) frame.
pub const EXT_FRAME_START_BYTE: u8 = 0xF0;
/// Start marker of a standard frame.
pub const FRAME_START_BYTE: u8 = 0xF1;
/// End marker of every frame.
pub const FRAME_END_BYTE: u8 = 0xF2;
/// Escape byte introducing a stuffed control value.
pub const FRAME_STUFF_BYTE: u8 = 0xF3;
/// Highest offset a stuff byte may carry (0xF0 + offset recovers the value).
pub const FRAME_MAX_STUFF_OFFSET: u8 = 3;

/// Total byte budget of one frame, markers included.
pub const FRAME_MAX_SIZE: usize = 96;
/// Start + end marker length.
pub const FRAME_FLG_LEN: usize = 2;
/// Source + destination prefix length of an extended frame.
pub const EXT_FRAME_ADDR_LEN: usize = 2;
/// Trailing checksum length.
pub const FRAME_CHKSUM_LEN: usize = 1;

/// Commands with this bit set are single-byte short commands.
pub const SHORT_CMD_TYPE_MSK: u8 = 0x80;
/// Header length of a long command (command byte + byte count).
pub const LONG_CMD_HDR_LENGTH: usize = 2;
/// Header length of a response unit (command byte + byte count).
pub const RSP_HDR_LENGTH: usize = 2;

/// Destination address of the host (PC/phone side).
pub const DESTINATION_ADDR_HOST: u8 = 0x00;
/// Destination address of the master erg in a daisy chain.
pub const DESTINATION_ADDR_ERG_MASTER: u8 = 0x01;
/// Broadcast destination address.
pub const DESTINATION_ADDR_BROADCAST: u8 = 0xFF;
/// Default single-erg destination address.
pub const DESTINATION_ADDR_ERG_DEFAULT: u8 = 0xFD;

/// First id of the long PM-proprietary wrapper command range.
pub const PMPROPRIETARY_CMD_LONG_MIN: u8 = 0x76;
/// One past the last id of the long PM-proprietary wrapper range.
pub const PMPROPRIETARY_CMD_LONG_MAX: u8 = 0x80;

/// Low nibble of the status byte: slave state.
pub const SLAVESTATE_MSK: u8 = 0x0F;
/// Bits 4-5 of the status byte: previous frame result.
pub const PREVFRAMESTATUS_MSK: u8 = 0x30;
/// Bit 7 of the status byte: frame count toggle.
pub const FRAMECNT_FLG: u8 = 0x80;

/// Standard short control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShortCtrlCmd {
    /// Request the status byte only.
    GetStatus = 0x80,
    /// Reset the slave to the ready state.
    Reset = 0x81,
    /// Go to the idle state.
    GoIdle = 0x82,
    /// Go to the have-id state.
    GoHaveId = 0x83,
    /// Go to the in-use state.
    GoInUse = 0x85,
    /// Go to the finished state.
    GoFinished = 0x86,
    /// Go to the ready state.
    GoReady = 0x87,
    /// Report an invalid id.
    BadId = 0x88,
}

/// Standard short status commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShortStatusCmd {
    /// Manufacturer/model/firmware version block.
    GetVersion = 0x91,
    /// Slave id.
    GetId = 0x92,
    /// Unit capabilities.
    GetUnits = 0x93,
    /// Serial number digits.
    GetSerial = 0x94,
}

/// Standard short data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShortDataCmd {
    /// Accumulated work time.
    GetTWork = 0xA0,
    /// Horizontal distance plus unit.
    GetHorizontal = 0xA1,
    /// Accumulated calories.
    GetCalories = 0xA3,
    /// Current speed plus unit.
    GetSpeed = 0xA5,
    /// Current pace plus unit.
    GetPace = 0xA6,
    /// Current cadence (strokes/minute) plus unit.
    GetCadence = 0xA7,
    /// Current heart rate.
    GetHrCur = 0xB0,
    /// Current power plus unit.
    GetPower = 0xB4,
}

/// Standard long configuration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LongCfgCmd {
    /// Set the time of day (hour, minute, second).
    SetTime = 0x11,
    /// Set the date (year, month, day).
    SetDate = 0x12,
    /// Set the state timeout in seconds.
    SetTimeout = 0x13,
}

/// Standard long data commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LongDataCmd {
    /// Set the workout time goal (hour, minute, second).
    SetTWork = 0x20,
    /// Set the horizontal distance goal (value, unit).
    SetHorizontal = 0x21,
    /// Set the calorie goal.
    SetCalories = 0x23,
    /// Select a stored program.
    SetProgram = 0x24,
    /// Set the power target (value, unit).
    SetPower = 0x34,
}

/// The four PM-proprietary wrapper commands; the real operation is the
/// detail command carried inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProprietaryCmd {
    /// Push a PM configuration value.
    SetPmCfg = 0x76,
    /// Push a PM data value.
    SetPmData = 0x77,
    /// Pull a PM configuration value.
    GetPmCfg = 0x7E,
    /// Pull a PM data value.
    GetPmData = 0x7F,
}

/// PM detail commands pulled through [`ProprietaryCmd::GetPmCfg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PmGetCfgCmd {
    /// Firmware version string.
    FwVersion = 0x80,
    /// Hardware version string.
    HwVersion = 0x81,
    /// Current workout type.
    WorkoutType = 0x89,
    /// Current workout state.
    WorkoutState = 0x8D,
    /// Current interval type.
    IntervalType = 0x8E,
    /// Configured number of workout intervals.
    WorkoutIntervalCount = 0x9F,
}

/// PM detail commands pulled through [`ProprietaryCmd::GetPmData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PmGetDataCmd {
    /// Elapsed work time in 0.01 s ticks.
    WorkTime = 0xA0,
    /// Elapsed work distance in 0.1 m ticks.
    WorkDistance = 0xA3,
    /// Current stroke rate.
    StrokeRate = 0xB3,
    /// Current flywheel stroke state.
    StrokeState = 0xBF,
    /// Current drag factor.
    DragFactor = 0xC1,
}

/// PM detail commands pushed through [`ProprietaryCmd::SetPmCfg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PmSetCfgCmd {
    /// Select the workout type.
    WorkoutType = 0x01,
    /// Set the workout duration (type byte + 32-bit value).
    WorkoutDuration = 0x03,
    /// Set the rest duration in seconds.
    RestDuration = 0x04,
    /// Set the split duration (type byte + 32-bit value).
    SplitDuration = 0x05,
    /// Set the target pace time in 0.01 s ticks.
    TargetPaceTime = 0x06,
    /// Drive the monitor screen state machine.
    ScreenState = 0x13,
    /// Enter or leave workout programming mode.
    ConfigureWorkout = 0x14,
    /// Set the target average power in watts.
    TargetAvgWatts = 0x15,
    /// Set the target caloric burn rate.
    TargetCalsPerHour = 0x16,
    /// Select the interval type.
    IntervalType = 0x17,
    /// Set the number of workout intervals.
    WorkoutIntervalCount = 0x18,
}

/// True when `command` is one of the long PM-proprietary wrappers and
/// therefore carries a detail command header.
#[must_use]
pub const fn is_proprietary_wrapper(command: u8) -> bool {
    command >= PMPROPRIETARY_CMD_LONG_MIN && command < PMPROPRIETARY_CMD_LONG_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proprietary_wrapper_range() {
        assert!(is_proprietary_wrapper(ProprietaryCmd::SetPmCfg as u8));
        assert!(is_proprietary_wrapper(ProprietaryCmd::GetPmData as u8));
        assert!(!is_proprietary_wrapper(LongDataCmd::SetProgram as u8));
        assert!(!is_proprietary_wrapper(ShortCtrlCmd::GetStatus as u8));
    }

    #[test]
    fn test_short_commands_have_type_bit() {
        assert_ne!(ShortCtrlCmd::GetStatus as u8 & SHORT_CMD_TYPE_MSK, 0);
        assert_ne!(ShortDataCmd::GetHrCur as u8 & SHORT_CMD_TYPE_MSK, 0);
        assert_eq!(LongCfgCmd::SetTime as u8 & SHORT_CMD_TYPE_MSK, 0);
    }
}
