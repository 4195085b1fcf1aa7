use crux_core::Command;

use crate::events::{Event, MonitorEvent};
use crate::model::Model;
use crate::types::{DeviceStatus, DeviceTime, SensorReading};
use crate::{handle_response, http_get};
use crate::Effect;

/// Handle polled device information.
///
/// Polls run independently of page state; failures are only logged.
pub fn handle(event: MonitorEvent, model: &mut Model) -> Command<Effect, Event> {
    match event {
        MonitorEvent::RefreshStatus => {
            http_get!(Monitor, MonitorEvent, "/updateStatus", StatusResponse, DeviceStatus)
        }

        MonitorEvent::RefreshReadings => http_get!(
            Monitor,
            MonitorEvent,
            "/getValue",
            ReadingsResponse,
            Vec<SensorReading>
        ),

        MonitorEvent::RefreshClock => {
            http_get!(Monitor, MonitorEvent, "/getTime", ClockResponse, DeviceTime)
        }

        MonitorEvent::StatusResponse(result) => handle_response!(model, result, {
            on_success: |model, status| {
                model.device_status = Some(status);
            },
            no_loading: true,
        }),

        MonitorEvent::ReadingsResponse(result) => handle_response!(model, result, {
            on_success: |model, readings| {
                model.sensor_readings = readings;
            },
            no_loading: true,
        }),

        MonitorEvent::ClockResponse(result) => handle_response!(model, result, {
            on_success: |model, time| {
                model.device_time = Some(time);
            },
            no_loading: true,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_updates_model() {
        let mut model = Model::default();
        let status = DeviceStatus {
            free_heap: 120_000,
            sketch_size: 900_000,
            free_sketch_space: 1_000_000,
            ..Default::default()
        };

        let _ = handle(MonitorEvent::StatusResponse(Ok(status.clone())), &mut model);

        assert_eq!(model.device_status, Some(status));
    }

    #[test]
    fn failed_poll_is_not_surfaced() {
        let mut model = Model {
            is_loading: true,
            ..Default::default()
        };

        let _ = handle(
            MonitorEvent::StatusResponse(Err("StatusResponse failed: timeout".to_string())),
            &mut model,
        );

        assert_eq!(model.error_message, None);
        assert!(model.is_loading);
        assert_eq!(model.device_status, None);
    }

    #[test]
    fn readings_feed_selected_parameter_value() {
        let mut model = Model::default();
        let doc = serde_json::json!({
            "nameData": ["temp"],
            "temp": [1, 3, 100, 0.1, 0]
        });
        model.modbus.registry = crate::types::ParameterRegistry::from_document(&doc).unwrap();

        let _ = handle(
            MonitorEvent::ReadingsResponse(Ok(vec![SensorReading {
                sensor: "temp".to_string(),
                value: 21.456,
            }])),
            &mut model,
        );

        assert_eq!(model.selected_parameter_reading(), Some(21.46));
    }

    #[test]
    fn clock_response_updates_time() {
        let mut model = Model::default();

        let _ = handle(
            MonitorEvent::ClockResponse(Ok(DeviceTime {
                datetime: "2024-05-01 12:00:00".to_string(),
            })),
            &mut model,
        );

        assert_eq!(
            model.device_time.map(|t| t.datetime),
            Some("2024-05-01 12:00:00".to_string())
        );
    }
}
