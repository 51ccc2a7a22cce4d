use std::time::Duration;
use tracing::{error, info};

use oarlock::ble::{route_events, ConnectionParams, PmScanner};
use oarlock::types::WorkoutDurationType;
use oarlock::{MonitorConfig, PerformanceMonitor, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("🚣 Oarlock Basic Workout Example");
    info!("Searching for performance monitors...");

    let params = ConnectionParams::default();
    let config = MonitorConfig::default();

    let mut scanner = PmScanner::new().await?;
    let devices = scanner.scan(&params).await?;
    let Some(device) = devices.first() else {
        error!("❌ No performance monitor found");
        return Err(oarlock::OarlockError::DeviceNotFound);
    };
    info!("✅ Found: {} (rssi {})", device.name, device.rssi);

    let transport = scanner.connect(device, &config, &params).await?;
    if let Some(serial) = &transport.device().serial_number {
        info!("Serial number: {serial}");
    }

    let monitor = PerformanceMonitor::with_config(transport, config);
    tokio::spawn(route_events(monitor.clone()));

    // Identify the monitor
    let mut buffer = monitor.new_buffer();
    let version = buffer.get_version();
    monitor.send(buffer).await?;
    let version = version.recv().await?;
    info!(
        "Monitor model {} hw {} fw {}",
        version.model, version.hardware_version, version.firmware_version
    );

    // Program a 2000 m piece with 500 m splits
    let mut buffer = monitor.new_buffer();
    buffer.reset();
    buffer.set_workout_duration(WorkoutDurationType::Distance, 2000 * 10);
    buffer.set_split_duration(WorkoutDurationType::Distance, 500 * 10);
    buffer.configure_workout(true);
    buffer.go_in_use();
    monitor.send(buffer).await?;
    info!("🏁 Workout programmed: 2000 m with 500 m splits, row to start");

    // Poll the monitor while the piece runs
    let mut poll = tokio::time::interval(Duration::from_secs(2));
    loop {
        poll.tick().await;

        let mut buffer = monitor.new_buffer();
        let distance = buffer.get_work_distance();
        let stroke_rate = buffer.get_stroke_rate();
        let pace = buffer.get_pace();
        if let Err(e) = monitor.send(buffer).await {
            error!("❌ Poll failed: {e}");
            break;
        }

        match (distance.recv().await, stroke_rate.recv().await, pace.recv().await) {
            (Ok(distance), Ok(stroke_rate), Ok(pace)) => {
                println!(
                    "distance {:7.1} m | {stroke_rate:2} spm | pace {:5} s/km",
                    f64::from(distance) / 10.0,
                    pace.value
                );
            }
            (distance, stroke_rate, pace) => {
                error!("❌ Poll response incomplete: {distance:?} {stroke_rate:?} {pace:?}");
                break;
            }
        }
    }

    info!("🔌 Done");
    Ok(())
}
