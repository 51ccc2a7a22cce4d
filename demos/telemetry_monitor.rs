use tracing::{error, info, warn};

use oarlock::ble::{route_events, ConnectionParams, PmScanner};
use oarlock::{MonitorConfig, PerformanceMonitor, Result, TelemetryEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("📊 Oarlock Telemetry Monitor Example");
    info!("Searching for performance monitors...");

    let params = ConnectionParams::default();
    // One multiplexed subscription instead of ten individual ones
    let config = MonitorConfig {
        multiplex: true,
        ..MonitorConfig::default()
    };

    let mut scanner = PmScanner::new().await?;
    let devices = scanner.scan(&params).await?;
    let Some(device) = devices.first() else {
        error!("❌ No performance monitor found");
        return Err(oarlock::OarlockError::DeviceNotFound);
    };

    let transport = scanner.connect(device, &config, &params).await?;
    info!("✅ Connected to: {}", transport.device().name);

    let monitor = PerformanceMonitor::with_config(transport, config);
    tokio::spawn(route_events(monitor.clone()));

    info!("🔍 Streaming telemetry, press Ctrl+C to stop");
    let mut telemetry = monitor.subscribe();

    loop {
        match telemetry.recv().await {
            Ok(TelemetryEvent::GeneralStatus(status)) => {
                println!(
                    "⏱️  {:7.2} s | {:7.1} m | workout {:?} | stroke {:?}",
                    f64::from(status.elapsed_time) / 100.0,
                    f64::from(status.distance) / 10.0,
                    status.workout_state,
                    status.stroke_state
                );
            }
            Ok(TelemetryEvent::StrokeData(stroke)) => {
                println!(
                    "🚣 stroke {:4} | drive {:4} ticks | distance/stroke {:5}",
                    stroke.stroke_count, stroke.drive_time, stroke.stroke_distance
                );
            }
            Ok(TelemetryEvent::HeartRateBelt(belt)) => {
                println!(
                    "❤️  belt manufacturer {} device {} id {}",
                    belt.manufacturer_id, belt.device_type, belt.belt_id
                );
            }
            Ok(event) => {
                println!("📦 {event:?}");
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                warn!("⚠️  Dropped {missed} telemetry record(s), consumer too slow");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                warn!("❌ Monitor disconnected");
                break;
            }
        }
    }

    info!("🔌 Done");
    Ok(())
}
