use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commands::RawCommand;
use crate::defs;

/// State machine position of the monitor, carried in the low nibble of
/// every response status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlaveState {
    /// The monitor detected an internal error
    Error,
    /// Ready to accept commands
    Ready,
    /// Idle, waiting for user input
    Idle,
    /// An id digit sequence was accepted
    HaveId,
    /// A workout is in progress
    InUse,
    /// The workout is paused
    Paused,
    /// The workout has finished
    Finished,
    /// Manual (non-programmed) operation
    Manual,
    /// The monitor is offline
    Offline,
    /// A state nibble this library does not know
    Unknown(u8),
}

impl From<u8> for SlaveState {
    fn from(value: u8) -> Self {
        match value & defs::SLAVESTATE_MSK {
            0 => Self::Error,
            1 => Self::Ready,
            2 => Self::Idle,
            3 => Self::HaveId,
            5 => Self::InUse,
            6 => Self::Paused,
            7 => Self::Finished,
            8 => Self::Manual,
            9 => Self::Offline,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SlaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Ready => write!(f, "Ready"),
            Self::Idle => write!(f, "Idle"),
            Self::HaveId => write!(f, "HaveId"),
            Self::InUse => write!(f, "InUse"),
            Self::Paused => write!(f, "Paused"),
            Self::Finished => write!(f, "Finished"),
            Self::Manual => write!(f, "Manual"),
            Self::Offline => write!(f, "Offline"),
            Self::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

/// Outcome of the previous frame, bits 4-5 of the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrevFrameState {
    /// Previous frame was accepted
    Ok,
    /// Previous frame was rejected
    Reject,
    /// Previous frame was corrupt
    Bad,
    /// The monitor was not ready for the previous frame
    NotReady,
}

impl From<u8> for PrevFrameState {
    fn from(value: u8) -> Self {
        match (value & defs::PREVFRAMESTATUS_MSK) >> 4 {
            0 => Self::Ok,
            1 => Self::Reject,
            2 => Self::Bad,
            _ => Self::NotReady,
        }
    }
}

impl fmt::Display for PrevFrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "Ok"),
            Self::Reject => write!(f, "Reject"),
            Self::Bad => write!(f, "Bad"),
            Self::NotReady => write!(f, "NotReady"),
        }
    }
}

/// Workout type reported in the general status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutType {
    /// Just row, no splits
    JustRowNoSplits,
    /// Just row with splits
    JustRowSplits,
    /// Fixed distance, no splits
    FixedDistanceNoSplits,
    /// Fixed distance with splits
    FixedDistanceSplits,
    /// Fixed time, no splits
    FixedTimeNoSplits,
    /// Fixed time with splits
    FixedTimeSplits,
    /// Fixed time intervals
    FixedTimeInterval,
    /// Fixed distance intervals
    FixedDistanceInterval,
    /// Variable intervals
    VariableInterval,
    /// Variable intervals with undefined rest
    VariableUndefinedRestInterval,
    /// Fixed calorie goal
    FixedCalorie,
    /// Fixed watt-minute goal
    FixedWattMinutes,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for WorkoutType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::JustRowNoSplits,
            1 => Self::JustRowSplits,
            2 => Self::FixedDistanceNoSplits,
            3 => Self::FixedDistanceSplits,
            4 => Self::FixedTimeNoSplits,
            5 => Self::FixedTimeSplits,
            6 => Self::FixedTimeInterval,
            7 => Self::FixedDistanceInterval,
            8 => Self::VariableInterval,
            9 => Self::VariableUndefinedRestInterval,
            10 => Self::FixedCalorie,
            11 => Self::FixedWattMinutes,
            other => Self::Unknown(other),
        }
    }
}

impl WorkoutType {
    /// Wire value of this workout type.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::JustRowNoSplits => 0,
            Self::JustRowSplits => 1,
            Self::FixedDistanceNoSplits => 2,
            Self::FixedDistanceSplits => 3,
            Self::FixedTimeNoSplits => 4,
            Self::FixedTimeSplits => 5,
            Self::FixedTimeInterval => 6,
            Self::FixedDistanceInterval => 7,
            Self::VariableInterval => 8,
            Self::VariableUndefinedRestInterval => 9,
            Self::FixedCalorie => 10,
            Self::FixedWattMinutes => 11,
            Self::Unknown(v) => v,
        }
    }
}

/// Interval type within an interval workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalType {
    /// Timed interval
    Time,
    /// Distance interval
    Distance,
    /// Rest interval
    Rest,
    /// Timed interval with undefined rest
    TimeRestUndefined,
    /// Distance interval with undefined rest
    DistanceRestUndefined,
    /// Undefined rest interval
    RestUndefined,
    /// Calorie interval
    Calories,
    /// Calorie interval with undefined rest
    CaloriesRestUndefined,
    /// Watt-minute interval
    WattMinute,
    /// Watt-minute interval with undefined rest
    WattMinuteRestUndefined,
    /// No interval type
    None,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for IntervalType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Time,
            1 => Self::Distance,
            2 => Self::Rest,
            3 => Self::TimeRestUndefined,
            4 => Self::DistanceRestUndefined,
            5 => Self::RestUndefined,
            6 => Self::Calories,
            7 => Self::CaloriesRestUndefined,
            8 => Self::WattMinute,
            9 => Self::WattMinuteRestUndefined,
            255 => Self::None,
            other => Self::Unknown(other),
        }
    }
}

impl IntervalType {
    /// Wire value of this interval type.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Time => 0,
            Self::Distance => 1,
            Self::Rest => 2,
            Self::TimeRestUndefined => 3,
            Self::DistanceRestUndefined => 4,
            Self::RestUndefined => 5,
            Self::Calories => 6,
            Self::CaloriesRestUndefined => 7,
            Self::WattMinute => 8,
            Self::WattMinuteRestUndefined => 9,
            Self::None => 255,
            Self::Unknown(v) => v,
        }
    }
}

/// Workout state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutState {
    /// Waiting for the workout to begin
    WaitToBegin,
    /// Rowing the workout
    WorkoutRow,
    /// Countdown pause
    CountDownPause,
    /// Resting between intervals
    IntervalRest,
    /// Working a timed interval
    IntervalWorkTime,
    /// Working a distance interval
    IntervalWorkDistance,
    /// Rest ending into a timed interval
    IntervalRestEndToWorkTime,
    /// Rest ending into a distance interval
    IntervalRestEndToWorkDistance,
    /// Timed interval transitioning to rest
    IntervalWorkTimeToRest,
    /// Distance interval transitioning to rest
    IntervalWorkDistanceToRest,
    /// Workout ended
    WorkoutEnd,
    /// Workout terminated by the user
    Terminate,
    /// Workout stored to the log
    WorkoutLogged,
    /// Workout re-armed
    Rearm,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for WorkoutState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::WaitToBegin,
            1 => Self::WorkoutRow,
            2 => Self::CountDownPause,
            3 => Self::IntervalRest,
            4 => Self::IntervalWorkTime,
            5 => Self::IntervalWorkDistance,
            6 => Self::IntervalRestEndToWorkTime,
            7 => Self::IntervalRestEndToWorkDistance,
            8 => Self::IntervalWorkTimeToRest,
            9 => Self::IntervalWorkDistanceToRest,
            10 => Self::WorkoutEnd,
            11 => Self::Terminate,
            12 => Self::WorkoutLogged,
            13 => Self::Rearm,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitToBegin => write!(f, "WaitToBegin"),
            Self::WorkoutRow => write!(f, "WorkoutRow"),
            Self::CountDownPause => write!(f, "CountDownPause"),
            Self::IntervalRest => write!(f, "IntervalRest"),
            Self::IntervalWorkTime => write!(f, "IntervalWorkTime"),
            Self::IntervalWorkDistance => write!(f, "IntervalWorkDistance"),
            Self::IntervalRestEndToWorkTime => write!(f, "IntervalRestEndToWorkTime"),
            Self::IntervalRestEndToWorkDistance => write!(f, "IntervalRestEndToWorkDistance"),
            Self::IntervalWorkTimeToRest => write!(f, "IntervalWorkTimeToRest"),
            Self::IntervalWorkDistanceToRest => write!(f, "IntervalWorkDistanceToRest"),
            Self::WorkoutEnd => write!(f, "WorkoutEnd"),
            Self::Terminate => write!(f, "Terminate"),
            Self::WorkoutLogged => write!(f, "WorkoutLogged"),
            Self::Rearm => write!(f, "Rearm"),
            Self::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

/// Whether the flywheel is being rowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowingState {
    /// Not rowing
    Inactive,
    /// Rowing
    Active,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for RowingState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Inactive,
            1 => Self::Active,
            other => Self::Unknown(other),
        }
    }
}

/// Position within the stroke cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeState {
    /// Waiting for the flywheel to reach minimum speed
    WaitingForWheelToReachMinSpeed,
    /// Waiting for the flywheel to accelerate
    WaitingForWheelToAccelerate,
    /// Drive phase
    Driving,
    /// Dwelling after the drive
    DwellingAfterDrive,
    /// Recovery phase
    Recovery,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for StrokeState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::WaitingForWheelToReachMinSpeed,
            1 => Self::WaitingForWheelToAccelerate,
            2 => Self::Driving,
            3 => Self::DwellingAfterDrive,
            4 => Self::Recovery,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for StrokeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForWheelToReachMinSpeed => write!(f, "WaitingForWheelToReachMinSpeed"),
            Self::WaitingForWheelToAccelerate => write!(f, "WaitingForWheelToAccelerate"),
            Self::Driving => write!(f, "Driving"),
            Self::DwellingAfterDrive => write!(f, "DwellingAfterDrive"),
            Self::Recovery => write!(f, "Recovery"),
            Self::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

/// Duration type of a workout goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutDurationType {
    /// Time goal
    Time,
    /// Calorie goal
    Calories,
    /// Watt-minute goal
    WattMinutes,
    /// Distance goal
    Distance,
    /// Watts goal
    Watts,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for WorkoutDurationType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Time,
            64 => Self::Calories,
            96 => Self::WattMinutes,
            128 => Self::Distance,
            192 => Self::Watts,
            other => Self::Unknown(other),
        }
    }
}

impl WorkoutDurationType {
    /// Wire value of this duration type.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Time => 0,
            Self::Calories => 64,
            Self::WattMinutes => 96,
            Self::Distance => 128,
            Self::Watts => 192,
            Self::Unknown(v) => v,
        }
    }
}

/// Physical machine variant reported in the workout summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErgMachineType {
    /// Static model D
    StaticD,
    /// Static model C
    StaticC,
    /// Static model A
    StaticA,
    /// Static model B
    StaticB,
    /// Static model E
    StaticE,
    /// Static Dynamic
    StaticDynamic,
    /// Model A on slides
    SlidesA,
    /// Model B on slides
    SlidesB,
    /// Model C on slides
    SlidesC,
    /// Model D on slides
    SlidesD,
    /// Model E on slides
    SlidesE,
    /// Dynamic on slides
    SlidesDynamic,
    /// Static Dyno
    StaticDyno,
    /// Static SkiErg
    StaticSki,
    /// A value this library does not know
    Unknown(u8),
}

impl From<u8> for ErgMachineType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::StaticD,
            1 => Self::StaticC,
            2 => Self::StaticA,
            3 => Self::StaticB,
            5 => Self::StaticE,
            8 => Self::StaticDynamic,
            16 => Self::SlidesA,
            17 => Self::SlidesB,
            18 => Self::SlidesC,
            19 => Self::SlidesD,
            20 => Self::SlidesE,
            32 => Self::SlidesDynamic,
            64 => Self::StaticDyno,
            128 => Self::StaticSki,
            other => Self::Unknown(other),
        }
    }
}

/// Monitor screen family selected by the screen-state command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScreenType {
    /// No screen
    None = 0,
    /// Workout screens
    Workout = 1,
    /// Race screens
    Race = 2,
    /// CSAFE screens
    Csafe = 3,
    /// Diagnostic screens
    Diagnostic = 4,
    /// Manufacturing screens
    Manufacturing = 5,
}

/// Screen value within a [`ScreenType`] family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScreenValue {
    /// No value
    None = 0,
    /// Prepare to row the programmed workout
    PrepareToRowWorkout = 1,
    /// Terminate the current workout
    TerminateWorkout = 2,
    /// Re-arm the workout
    RearmWorkout = 3,
    /// Refresh local log card copies
    RefreshLogCard = 4,
    /// Prepare to race start
    PrepareToRaceStart = 5,
    /// Go to the main screen
    GoToMainScreen = 6,
    /// Log device busy warning
    LogCardBusyWarning = 7,
    /// Log device select user
    LogCardSelectUser = 8,
    /// Reset race parameters
    ResetRaceParams = 9,
    /// Cable test slave indication
    CableTestSlave = 10,
    /// Display type set to target
    ChangeDisplayTypeTarget = 20,
    /// Display type set to standard
    ChangeDisplayTypeStandard = 21,
    /// Display type set to force/velocity
    ChangeDisplayTypeForceVelocity = 22,
    /// Display type set to pace boat
    ChangeDisplayTypePaceBoat = 23,
    /// Display type set to per-stroke
    ChangeDisplayTypePerStroke = 24,
    /// Display type set to simple
    ChangeDisplayTypeSimple = 25,
    /// Units set to time/meters
    ChangeUnitsTypeTimeMeters = 30,
    /// Units set to pace
    ChangeUnitsTypePace = 31,
    /// Units set to watts
    ChangeUnitsTypeWatts = 32,
    /// Units set to caloric burn rate
    ChangeUnitsTypeCaloricBurnRate = 33,
    /// Units set to calories
    ChangeUnitsTypeCalories = 46,
    /// Force a screen redraw
    ScreenRedraw = 255,
}

/// Stored program slot selectable via the program command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Program {
    /// The programmed workout
    Programmed = 0,
    /// Standard list slot 1
    StandardList1 = 1,
    /// Standard list slot 2
    StandardList2 = 2,
    /// Standard list slot 3
    StandardList3 = 3,
    /// Standard list slot 4
    StandardList4 = 4,
    /// Standard list slot 5
    StandardList5 = 5,
    /// Custom list slot 1
    CustomList1 = 6,
    /// Custom list slot 2
    CustomList2 = 7,
    /// Custom list slot 3
    CustomList3 = 8,
    /// Custom list slot 4
    CustomList4 = 9,
    /// Custom list slot 5
    CustomList5 = 10,
    /// Favorites slot 1
    FavoritesList1 = 11,
    /// Favorites slot 2
    FavoritesList2 = 12,
    /// Favorites slot 3
    FavoritesList3 = 13,
    /// Favorites slot 4
    FavoritesList4 = 14,
    /// Favorites slot 5
    FavoritesList5 = 15,
}

/// Measurement unit identifiers used by the standard set commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Unit {
    /// Miles
    DistanceMile = 1,
    /// Feet
    DistanceFeet = 5,
    /// Miles per hour
    SpeedMilePerHour = 16,
    /// Kilometres
    DistanceKm = 33,
    /// Metres
    DistanceMeter = 36,
    /// Kilometres per hour
    SpeedKmPerHour = 48,
    /// Minutes per mile
    PaceMinutePerMile = 55,
    /// Minutes per kilometre
    PaceMinutePerKm = 56,
    /// Seconds per kilometre
    PaceSecondsPerKm = 57,
    /// Seconds per mile
    PaceSecondsPerMile = 58,
    /// Calories
    EnergyCalories = 72,
    /// Watts
    PowerWatts = 88,
}

/// Source and destination bytes of an extended frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedAddress {
    /// Address of the frame sender
    pub source: u8,
    /// Address of the frame receiver
    pub destination: u8,
}

impl Default for ExtendedAddress {
    fn default() -> Self {
        Self {
            source: defs::DESTINATION_ADDR_HOST,
            destination: defs::DESTINATION_ADDR_ERG_DEFAULT,
        }
    }
}

/// Pluggable command ordering used when a buffer is sorted before transmit.
pub type CommandOrdering = fn(&RawCommand, &RawCommand) -> std::cmp::Ordering;

/// Tunable behavior of a [`crate::monitor::PerformanceMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How long to wait for a complete response frame, in milliseconds
    pub command_timeout_ms: u64,
    /// Subscribe to the single multiplexed characteristic instead of the
    /// individual rowing-status characteristics
    pub multiplex: bool,
    /// Verify the XOR checksum of incoming frames
    pub verify_checksums: bool,
    /// Split a buffer that exceeds the frame capacity into consecutive
    /// frames instead of rejecting it
    pub split_large_frames: bool,
    /// Stable ordering applied to a buffer's commands before encoding;
    /// `None` transmits in push order
    pub sort_commands: Option<CommandOrdering>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 500,
            multiplex: false,
            verify_checksums: true,
            split_large_frames: true,
            sort_commands: Some(crate::commands::category_order),
        }
    }
}

/// Identity of a discovered or connected performance monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Advertised device name
    pub name: String,
    /// Peripheral address
    pub address: Option<String>,
    /// Signal strength (RSSI)
    pub rssi: i16,
    /// Serial number
    pub serial_number: Option<String>,
    /// Hardware revision
    pub hardware_revision: Option<String>,
    /// Firmware revision
    pub firmware_revision: Option<String>,
    /// Manufacturer name
    pub manufacturer: Option<String>,
}

impl DeviceInfo {
    /// Create device info for a freshly discovered peripheral.
    #[must_use]
    pub const fn new(name: String, rssi: i16) -> Self {
        Self {
            name,
            address: None,
            rssi,
            serial_number: None,
            hardware_revision: None,
            firmware_revision: None,
            manufacturer: None,
        }
    }
}

/// General rowing status. Times are 0.01 s ticks, distances 0.1 m ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingGeneralStatus {
    /// Elapsed workout time
    pub elapsed_time: u32,
    /// Distance rowed
    pub distance: u32,
    /// Active workout type
    pub workout_type: WorkoutType,
    /// Active interval type
    pub interval_type: IntervalType,
    /// Workout state machine position
    pub workout_state: WorkoutState,
    /// Whether the flywheel is being rowed
    pub rowing_state: RowingState,
    /// Position in the stroke cycle
    pub stroke_state: StrokeState,
    /// Total work distance
    pub total_work_distance: u32,
    /// Workout duration goal
    pub workout_duration: u32,
    /// Type of the duration goal
    pub workout_duration_type: WorkoutDurationType,
    /// Current drag factor
    pub drag_factor: u8,
}

/// First additional status record. Pace values are 0.01 s ticks per 500 m.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingAdditionalStatus1 {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Speed in 0.001 m/s
    pub speed: u16,
    /// Strokes per minute
    pub stroke_rate: u8,
    /// Heart rate in bpm, `None` when no belt is paired
    pub heart_rate: Option<u8>,
    /// Current pace
    pub current_pace: u16,
    /// Average pace
    pub average_pace: u16,
    /// Rest distance in metres
    pub rest_distance: u16,
    /// Rest time in 0.01 s ticks
    pub rest_time: u32,
    /// Average power in watts; only present on the multiplexed layout
    pub average_power: Option<u16>,
}

/// Second additional status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingAdditionalStatus2 {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Interval number
    pub interval_count: u8,
    /// Average power in watts; only present on the direct layout
    pub average_power: Option<u16>,
    /// Total calories burned
    pub total_calories: u16,
    /// Average pace over the current split
    pub split_average_pace: u16,
    /// Average power over the current split in watts
    pub split_average_power: u16,
    /// Average calories over the current split
    pub split_average_calories: u16,
    /// Time of the last split in 0.01 s ticks
    pub last_split_time: u32,
    /// Distance of the last split in 0.1 m ticks
    pub last_split_distance: u32,
}

/// Per-stroke data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingStrokeData {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Distance rowed in 0.1 m ticks
    pub distance: u32,
    /// Drive length in 0.01 m
    pub drive_length: u8,
    /// Drive time in 0.01 s
    pub drive_time: u8,
    /// Recovery time in 0.01 s
    pub stroke_recovery_time: u16,
    /// Distance covered by the stroke in 0.01 m
    pub stroke_distance: u16,
    /// Peak drive force in 0.1 lbs
    pub peak_drive_force: u16,
    /// Average drive force in 0.1 lbs
    pub average_drive_force: u16,
    /// Work per stroke in 0.1 J; only present on the direct layout
    pub work_per_stroke: Option<u16>,
    /// Stroke count since workout start
    pub stroke_count: u16,
}

/// Additional per-stroke data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingAdditionalStrokeData {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Power of the stroke in watts
    pub stroke_power: u16,
    /// Caloric burn rate during the stroke in cal/hr
    pub stroke_calories: u16,
    /// Stroke count since workout start
    pub stroke_count: u16,
    /// Projected total work time in seconds
    pub projected_work_time: u32,
    /// Projected total work distance in metres
    pub projected_work_distance: u32,
    /// Work per stroke in 0.1 J; only present on the multiplexed layout
    pub work_per_stroke: Option<u16>,
}

/// Split/interval data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingSplitIntervalData {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Distance rowed in 0.1 m ticks
    pub distance: u32,
    /// Time of the split in 0.1 s ticks
    pub interval_time: u32,
    /// Distance of the split in metres
    pub interval_distance: u32,
    /// Rest time of the interval in seconds
    pub interval_rest_time: u16,
    /// Rest distance of the interval in metres
    pub interval_rest_distance: u16,
    /// Type of the interval
    pub interval_type: IntervalType,
    /// Interval number
    pub interval_number: u8,
}

/// Additional split/interval data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowingAdditionalSplitIntervalData {
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Average stroke rate over the interval
    pub interval_average_stroke_rate: u8,
    /// Work heart rate, `None` when no belt is paired
    pub interval_work_heartrate: Option<u8>,
    /// Rest heart rate, `None` when no belt is paired
    pub interval_rest_heartrate: Option<u8>,
    /// Average pace over the interval in 0.1 s ticks
    pub interval_average_pace: u16,
    /// Total calories over the interval
    pub interval_total_calories: u16,
    /// Average calories over the interval in cal/hr
    pub interval_average_calories: u16,
    /// Average speed over the interval in 0.001 m/s
    pub interval_speed: u16,
    /// Average power over the interval in watts
    pub interval_power: u16,
    /// Average drag factor over the split
    pub split_average_drag_factor: u8,
    /// Interval number
    pub interval_number: u8,
}

/// Workout summary record, published when a workout completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutSummaryData {
    /// Log entry date
    pub log_entry_date: u16,
    /// Log entry time
    pub log_entry_time: u16,
    /// Elapsed workout time in 0.01 s ticks
    pub elapsed_time: u32,
    /// Distance rowed in 0.1 m ticks
    pub distance: u32,
    /// Average stroke rate
    pub average_stroke_rate: u8,
    /// Heart rate at workout end, `None` when no belt was paired
    pub ending_heartrate: Option<u8>,
    /// Average heart rate, `None` when no belt was paired
    pub average_heartrate: Option<u8>,
    /// Minimum heart rate, `None` when no belt was paired
    pub min_heartrate: Option<u8>,
    /// Maximum heart rate, `None` when no belt was paired
    pub max_heartrate: Option<u8>,
    /// Average drag factor
    pub drag_factor_average: u8,
    /// Recovery heart rate, `None` when no belt was paired
    pub recovery_heart_rate: Option<u8>,
    /// Workout type
    pub workout_type: WorkoutType,
    /// Average pace in 0.1 s ticks; only present on the direct layout
    pub average_pace: Option<u16>,
}

/// Additional workout summary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalWorkoutSummaryData {
    /// Log entry date
    pub log_entry_date: u16,
    /// Log entry time
    pub log_entry_time: u16,
    /// Interval type; only present on the direct layout
    pub interval_type: Option<IntervalType>,
    /// Interval size in metres or seconds
    pub interval_size: u16,
    /// Number of intervals
    pub interval_count: u8,
    /// Total calories burned
    pub total_calories: u16,
    /// Average power in watts
    pub watts: u16,
    /// Total rest distance in metres
    pub total_rest_distance: u32,
    /// Rest time between intervals in seconds
    pub interval_rest_time: u16,
    /// Average caloric burn rate in cal/hr
    pub average_calories: u16,
}

/// Second additional workout summary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalWorkoutSummaryData2 {
    /// Log entry date
    pub log_entry_date: u16,
    /// Log entry time
    pub log_entry_time: u16,
    /// Average pace in 0.1 s ticks
    pub average_pace: u16,
    /// Game identifier
    pub game_identifier: u8,
    /// Game score
    pub game_score: u16,
    /// Physical machine variant
    pub erg_machine_type: ErgMachineType,
}

/// Paired heart-rate belt identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateBeltInformation {
    /// Belt manufacturer id
    pub manufacturer_id: u8,
    /// Belt device type
    pub device_type: u8,
    /// Belt id
    pub belt_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slave_state_from_status_byte() {
        // High bits (frame toggle, prev frame status) must not leak in.
        assert_eq!(SlaveState::from(0x81), SlaveState::Ready);
        assert_eq!(SlaveState::from(0x05), SlaveState::InUse);
        assert_eq!(SlaveState::from(0x09), SlaveState::Offline);
        assert_eq!(SlaveState::from(0x04), SlaveState::Unknown(4));
    }

    #[test]
    fn test_prev_frame_state_from_status_byte() {
        assert_eq!(PrevFrameState::from(0x01), PrevFrameState::Ok);
        assert_eq!(PrevFrameState::from(0x11), PrevFrameState::Reject);
        assert_eq!(PrevFrameState::from(0x21), PrevFrameState::Bad);
        assert_eq!(PrevFrameState::from(0x31), PrevFrameState::NotReady);
    }

    #[test]
    fn test_stroke_state_from_u8() {
        assert_eq!(StrokeState::from(2), StrokeState::Driving);
        assert_eq!(StrokeState::from(4), StrokeState::Recovery);
        assert_eq!(StrokeState::from(99), StrokeState::Unknown(99));
    }

    #[test]
    fn test_workout_type_round_trip() {
        for raw in 0..=11 {
            assert_eq!(WorkoutType::from(raw).as_u8(), raw);
        }
        assert_eq!(WorkoutType::from(42), WorkoutType::Unknown(42));
    }

    #[test]
    fn test_duration_type_sparse_values() {
        assert_eq!(WorkoutDurationType::from(128), WorkoutDurationType::Distance);
        assert_eq!(WorkoutDurationType::from(192), WorkoutDurationType::Watts);
        assert_eq!(
            WorkoutDurationType::from(7),
            WorkoutDurationType::Unknown(7)
        );
    }

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.command_timeout_ms, 500);
        assert!(!config.multiplex);
        assert!(config.verify_checksums);
        assert!(config.split_large_frames);
        assert!(config.sort_commands.is_some());
    }

    #[test]
    fn test_default_extended_address() {
        let addr = ExtendedAddress::default();
        assert_eq!(addr.source, defs::DESTINATION_ADDR_HOST);
        assert_eq!(addr.destination, defs::DESTINATION_ADDR_ERG_DEFAULT);
    }
}
