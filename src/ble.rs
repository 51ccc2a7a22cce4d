//! Bluetooth Low Energy link to a PM5 performance monitor via `btleplug`.
//!
//! The PM exposes three services: device information (serial, versions),
//! a control service carrying CSAFE frames both ways, and a rowing
//! service whose characteristics push the telemetry records. Hosts with a
//! limited notification budget can subscribe to the single multiplexed
//! characteristic instead of the ten individual ones
//! ([`crate::types::MonitorConfig::multiplex`]).

use btleplug::{
    api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType},
    platform::{Manager, Peripheral},
};
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{OarlockError, Result};
use crate::monitor::PerformanceMonitor;
use crate::transport::{TelemetryChannel, Transport};
use crate::types::{DeviceInfo, MonitorConfig};

/// Device information service.
pub const PM_DEVICE_INFO_SERVICE_UUID: &str = "ce060010-43e5-11e4-916c-0800200c9a66";
/// Model number characteristic.
pub const PM_MODEL_CHAR_UUID: &str = "ce060011-43e5-11e4-916c-0800200c9a66";
/// Serial number characteristic.
pub const PM_SERIAL_CHAR_UUID: &str = "ce060012-43e5-11e4-916c-0800200c9a66";
/// Hardware revision characteristic.
pub const PM_HARDWARE_REVISION_CHAR_UUID: &str = "ce060013-43e5-11e4-916c-0800200c9a66";
/// Firmware revision characteristic.
pub const PM_FIRMWARE_REVISION_CHAR_UUID: &str = "ce060014-43e5-11e4-916c-0800200c9a66";
/// Manufacturer name characteristic.
pub const PM_MANUFACTURER_CHAR_UUID: &str = "ce060015-43e5-11e4-916c-0800200c9a66";

/// Control service carrying CSAFE frames.
pub const PM_CONTROL_SERVICE_UUID: &str = "ce060020-43e5-11e4-916c-0800200c9a66";
/// Characteristic the host writes CSAFE frames to.
pub const PM_CSAFE_TX_CHAR_UUID: &str = "ce060021-43e5-11e4-916c-0800200c9a66";
/// Characteristic the monitor answers CSAFE frames on.
pub const PM_CSAFE_RX_CHAR_UUID: &str = "ce060022-43e5-11e4-916c-0800200c9a66";

/// Rowing telemetry service.
pub const PM_ROWING_SERVICE_UUID: &str = "ce060030-43e5-11e4-916c-0800200c9a66";
/// General rowing status characteristic.
pub const PM_GENERAL_STATUS_CHAR_UUID: &str = "ce060031-43e5-11e4-916c-0800200c9a66";
/// First additional status characteristic.
pub const PM_ADDITIONAL_STATUS1_CHAR_UUID: &str = "ce060032-43e5-11e4-916c-0800200c9a66";
/// Second additional status characteristic.
pub const PM_ADDITIONAL_STATUS2_CHAR_UUID: &str = "ce060033-43e5-11e4-916c-0800200c9a66";
/// Sample rate control characteristic.
pub const PM_SAMPLE_RATE_CHAR_UUID: &str = "ce060034-43e5-11e4-916c-0800200c9a66";
/// Stroke data characteristic.
pub const PM_STROKE_DATA_CHAR_UUID: &str = "ce060035-43e5-11e4-916c-0800200c9a66";
/// Additional stroke data characteristic.
pub const PM_ADDITIONAL_STROKE_DATA_CHAR_UUID: &str = "ce060036-43e5-11e4-916c-0800200c9a66";
/// Split/interval data characteristic.
pub const PM_SPLIT_INTERVAL_CHAR_UUID: &str = "ce060037-43e5-11e4-916c-0800200c9a66";
/// Additional split/interval data characteristic.
pub const PM_ADDITIONAL_SPLIT_INTERVAL_CHAR_UUID: &str = "ce060038-43e5-11e4-916c-0800200c9a66";
/// Workout summary characteristic.
pub const PM_WORKOUT_SUMMARY_CHAR_UUID: &str = "ce060039-43e5-11e4-916c-0800200c9a66";
/// Additional workout summary characteristic.
pub const PM_ADDITIONAL_WORKOUT_SUMMARY_CHAR_UUID: &str = "ce06003a-43e5-11e4-916c-0800200c9a66";
/// Heart-rate belt information characteristic.
pub const PM_HEART_RATE_BELT_CHAR_UUID: &str = "ce06003b-43e5-11e4-916c-0800200c9a66";
/// Multiplexed telemetry characteristic.
pub const PM_MULTIPLEXED_CHAR_UUID: &str = "ce060080-43e5-11e4-916c-0800200c9a66";

/// Largest write the PM accepts per BLE packet.
pub const PM_PACKET_SIZE: usize = 20;

fn parse_uuid(uuid: &str) -> Result<Uuid> {
    Uuid::parse_str(uuid).map_err(|e| OarlockError::Protocol(format!("invalid UUID {uuid}: {e}")))
}

/// Map a notification characteristic to the telemetry channel it carries.
#[must_use]
pub fn telemetry_channel(uuid: Uuid) -> Option<TelemetryChannel> {
    let table = [
        (PM_GENERAL_STATUS_CHAR_UUID, TelemetryChannel::GeneralStatus),
        (PM_ADDITIONAL_STATUS1_CHAR_UUID, TelemetryChannel::AdditionalStatus1),
        (PM_ADDITIONAL_STATUS2_CHAR_UUID, TelemetryChannel::AdditionalStatus2),
        (PM_STROKE_DATA_CHAR_UUID, TelemetryChannel::StrokeData),
        (PM_ADDITIONAL_STROKE_DATA_CHAR_UUID, TelemetryChannel::AdditionalStrokeData),
        (PM_SPLIT_INTERVAL_CHAR_UUID, TelemetryChannel::SplitIntervalData),
        (PM_ADDITIONAL_SPLIT_INTERVAL_CHAR_UUID, TelemetryChannel::AdditionalSplitIntervalData),
        (PM_WORKOUT_SUMMARY_CHAR_UUID, TelemetryChannel::WorkoutSummary),
        (PM_ADDITIONAL_WORKOUT_SUMMARY_CHAR_UUID, TelemetryChannel::AdditionalWorkoutSummary),
        (PM_HEART_RATE_BELT_CHAR_UUID, TelemetryChannel::HeartRateBeltInformation),
        (PM_MULTIPLEXED_CHAR_UUID, TelemetryChannel::Multiplexed),
    ];
    table
        .iter()
        .find(|(s, _)| Uuid::parse_str(s).is_ok_and(|parsed| parsed == uuid))
        .map(|(_, channel)| *channel)
}

/// Scan and connection parameters for the BLE link.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Scan duration in milliseconds
    pub scan_timeout_ms: u64,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 10_000,
            connect_timeout_ms: 30_000,
        }
    }
}

/// Scans for performance monitors advertising the PM rowing service.
pub struct PmScanner {
    manager: Manager,
    found: Vec<Peripheral>,
}

impl PmScanner {
    /// Create a scanner on the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::Ble`] if the Bluetooth stack cannot be
    /// initialized.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        Ok(Self {
            manager,
            found: Vec::new(),
        })
    }

    /// Scan for performance monitors, returning discovered devices sorted
    /// by descending signal strength.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::DeviceNotFound`] when no adapter is
    /// available and [`OarlockError::Ble`] for stack failures.
    pub async fn scan(&mut self, params: &ConnectionParams) -> Result<Vec<DeviceInfo>> {
        info!("scanning for performance monitors");

        let adapters = self.manager.adapters().await?;
        let Some(central) = adapters.first() else {
            return Err(OarlockError::DeviceNotFound);
        };

        let service_uuid = parse_uuid(PM_ROWING_SERVICE_UUID)?;
        central
            .start_scan(ScanFilter {
                services: vec![service_uuid],
            })
            .await?;
        tokio::time::sleep(Duration::from_millis(params.scan_timeout_ms)).await;
        central.stop_scan().await?;

        self.found.clear();
        let mut devices = Vec::new();
        for peripheral in central.peripherals().await? {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            if !properties.services.contains(&service_uuid) {
                continue;
            }
            let name = properties
                .local_name
                .clone()
                .unwrap_or_else(|| "PM".to_string());
            let mut device = DeviceInfo::new(name, properties.rssi.unwrap_or(0));
            device.address = Some(properties.address.to_string());
            info!(name = %device.name, rssi = device.rssi, "found performance monitor");
            devices.push(device);
            self.found.push(peripheral);
        }

        devices.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        info!("scan complete, {} monitor(s) found", devices.len());
        Ok(devices)
    }

    /// Connect to a previously scanned device and set up the
    /// characteristic subscriptions.
    ///
    /// The subscription set depends on [`MonitorConfig::multiplex`]:
    /// either the ten individual rowing characteristics or the single
    /// multiplexed one, plus the CSAFE response characteristic either
    /// way.
    ///
    /// # Errors
    ///
    /// [`OarlockError::DeviceNotFound`] when `device` was not produced by
    /// the last scan, [`OarlockError::ResponseTimeout`] when the
    /// connection attempt times out, [`OarlockError::ConnectionFailed`] /
    /// [`OarlockError::Protocol`] when the PM services are not where they
    /// should be.
    pub async fn connect(
        &self,
        device: &DeviceInfo,
        config: &MonitorConfig,
        params: &ConnectionParams,
    ) -> Result<BleTransport> {
        let mut peripheral = None;
        for candidate in &self.found {
            if let Ok(Some(properties)) = candidate.properties().await {
                if Some(properties.address.to_string()) == device.address {
                    peripheral = Some(candidate.clone());
                    break;
                }
            }
        }
        let peripheral = peripheral.ok_or(OarlockError::DeviceNotFound)?;

        info!(name = %device.name, "connecting");
        timeout(
            Duration::from_millis(params.connect_timeout_ms),
            peripheral.connect(),
        )
        .await
        .map_err(|_| OarlockError::ResponseTimeout {
            timeout_ms: params.connect_timeout_ms,
        })?
        .map_err(|e| OarlockError::ConnectionFailed(e.to_string()))?;

        peripheral.discover_services().await?;
        let characteristics = peripheral.characteristics();
        let find = |uuid: &str| -> Result<Characteristic> {
            let parsed = parse_uuid(uuid)?;
            characteristics
                .iter()
                .find(|c| c.uuid == parsed)
                .cloned()
                .ok_or_else(|| {
                    OarlockError::Protocol(format!("characteristic {uuid} not found"))
                })
        };

        let tx_char = find(PM_CSAFE_TX_CHAR_UUID)?;
        peripheral.subscribe(&find(PM_CSAFE_RX_CHAR_UUID)?).await?;
        if config.multiplex {
            peripheral.subscribe(&find(PM_MULTIPLEXED_CHAR_UUID)?).await?;
        } else {
            for uuid in [
                PM_GENERAL_STATUS_CHAR_UUID,
                PM_ADDITIONAL_STATUS1_CHAR_UUID,
                PM_ADDITIONAL_STATUS2_CHAR_UUID,
                PM_STROKE_DATA_CHAR_UUID,
                PM_ADDITIONAL_STROKE_DATA_CHAR_UUID,
                PM_SPLIT_INTERVAL_CHAR_UUID,
                PM_ADDITIONAL_SPLIT_INTERVAL_CHAR_UUID,
                PM_WORKOUT_SUMMARY_CHAR_UUID,
                PM_ADDITIONAL_WORKOUT_SUMMARY_CHAR_UUID,
                PM_HEART_RATE_BELT_CHAR_UUID,
            ] {
                // Not every firmware exposes every characteristic.
                match find(uuid) {
                    Ok(characteristic) => peripheral.subscribe(&characteristic).await?,
                    Err(e) => warn!(uuid, error = %e, "telemetry characteristic missing"),
                }
            }
        }

        let mut device = device.clone();
        read_device_info(&peripheral, &characteristics, &mut device).await;
        info!(name = %device.name, serial = ?device.serial_number, "connected");

        Ok(BleTransport {
            peripheral,
            tx_char,
            device,
        })
    }
}

async fn read_info_string(
    peripheral: &Peripheral,
    characteristics: &std::collections::BTreeSet<Characteristic>,
    uuid: &str,
) -> Option<String> {
    let parsed = Uuid::parse_str(uuid).ok()?;
    let characteristic = characteristics.iter().find(|c| c.uuid == parsed)?;
    match peripheral.read(characteristic).await {
        Ok(bytes) => Some(
            String::from_utf8_lossy(&bytes)
                .trim_end_matches('\0')
                .to_string(),
        ),
        Err(e) => {
            debug!(uuid, error = %e, "device info read failed");
            None
        }
    }
}

async fn read_device_info(
    peripheral: &Peripheral,
    characteristics: &std::collections::BTreeSet<Characteristic>,
    device: &mut DeviceInfo,
) {
    device.serial_number = read_info_string(peripheral, characteristics, PM_SERIAL_CHAR_UUID).await;
    device.hardware_revision =
        read_info_string(peripheral, characteristics, PM_HARDWARE_REVISION_CHAR_UUID).await;
    device.firmware_revision =
        read_info_string(peripheral, characteristics, PM_FIRMWARE_REVISION_CHAR_UUID).await;
    device.manufacturer =
        read_info_string(peripheral, characteristics, PM_MANUFACTURER_CHAR_UUID).await;
}

/// Connected BLE link to a performance monitor.
pub struct BleTransport {
    peripheral: Peripheral,
    tx_char: Characteristic,
    device: DeviceInfo,
}

impl BleTransport {
    /// Identity of the connected monitor, including the device-information
    /// strings read at connect time.
    #[must_use]
    pub const fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Whether the peripheral is still connected.
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Disconnect from the monitor.
    ///
    /// # Errors
    ///
    /// Returns [`OarlockError::Ble`] if the disconnect fails.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for BleTransport {
    async fn write(&self, data: &[u8]) -> Result<()> {
        trace!(bytes = data.len(), "ble write");
        self.peripheral
            .write(&self.tx_char, data, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    fn packet_size(&self) -> usize {
        PM_PACKET_SIZE
    }
}

/// Route BLE notifications into the protocol engine until the peripheral
/// disconnects, then tear the engine's state down.
///
/// Spawn this next to the engine:
///
/// ```no_run
/// # async fn doc(monitor: oarlock::PerformanceMonitor<oarlock::BleTransport>) {
/// tokio::spawn(oarlock::ble::route_events(monitor.clone()));
/// # }
/// ```
///
/// # Errors
///
/// Returns [`OarlockError::Ble`] if the notification stream cannot be
/// opened.
pub async fn route_events(monitor: PerformanceMonitor<BleTransport>) -> Result<()> {
    let peripheral = monitor.transport().peripheral.clone();
    let csafe_rx = parse_uuid(PM_CSAFE_RX_CHAR_UUID)?;
    let mut notifications = peripheral.notifications().await?;

    while let Some(notification) = notifications.next().await {
        if notification.uuid == csafe_rx {
            monitor.handle_csafe_data(&notification.value).await;
        } else if let Some(channel) = telemetry_channel(notification.uuid) {
            monitor.handle_telemetry(channel, &notification.value).await;
        } else {
            trace!(uuid = %notification.uuid, "notification on unknown characteristic");
        }
    }

    info!("notification stream closed, tearing down");
    monitor.handle_disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_parse() {
        for uuid in [
            PM_DEVICE_INFO_SERVICE_UUID,
            PM_CONTROL_SERVICE_UUID,
            PM_ROWING_SERVICE_UUID,
            PM_CSAFE_TX_CHAR_UUID,
            PM_CSAFE_RX_CHAR_UUID,
            PM_MULTIPLEXED_CHAR_UUID,
            PM_SAMPLE_RATE_CHAR_UUID,
        ] {
            assert!(Uuid::parse_str(uuid).is_ok(), "bad UUID {uuid}");
        }
    }

    #[test]
    fn test_telemetry_channel_mapping() {
        let uuid = Uuid::parse_str(PM_GENERAL_STATUS_CHAR_UUID).unwrap();
        assert_eq!(telemetry_channel(uuid), Some(TelemetryChannel::GeneralStatus));

        let uuid = Uuid::parse_str(PM_MULTIPLEXED_CHAR_UUID).unwrap();
        assert_eq!(telemetry_channel(uuid), Some(TelemetryChannel::Multiplexed));

        let uuid = Uuid::parse_str(PM_CSAFE_TX_CHAR_UUID).unwrap();
        assert_eq!(telemetry_channel(uuid), None);
    }
}
