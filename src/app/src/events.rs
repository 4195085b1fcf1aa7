use serde::{Deserialize, Serialize};

use crate::commands::upload::UploadOutput;
use crate::types::*;

/// Configuration page events (load, edit, submit and page actions)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ConfigEvent {
    Open {
        page: ConfigPage,
    },
    Reload,
    Edit {
        field: String,
        value: FieldValue,
    },
    Submit,
    /// Reset the counter or timer of the open digital input
    ResetCounter,
    RestartDevice,

    // HTTP responses (internal events, skipped from serialization)
    #[serde(skip)]
    Loaded {
        page: ConfigPage,
        result: Result<ConfigSnapshot, String>,
    },
    #[serde(skip)]
    Saved {
        page: ConfigPage,
        outcome: SaveOutcome,
    },
    #[serde(skip)]
    ResetCounterResponse(Result<(), String>),
    #[serde(skip)]
    RestartDeviceResponse(Result<(), String>),
}

/// Modbus parameter registry events
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ModbusEvent {
    Open,
    Select {
        name: String,
    },
    UpdateSerialConfig {
        config: SerialConfig,
    },
    Upsert {
        name: String,
        form: ParameterForm,
    },
    SaveParameter {
        original: String,
        name: String,
        form: ParameterForm,
    },
    Rename {
        from: String,
        to: String,
    },
    Delete {
        name: String,
    },
    /// Persist the current registry again, e.g. after a failed save
    Persist,

    #[serde(skip)]
    Loaded(Result<serde_json::Value, String>),
    #[serde(skip)]
    Persisted(SaveOutcome),
}

/// Firmware upload events
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum FirmwareEvent {
    SelectFile {
        name: String,
        size: u64,
    },
    StartUpload,
    /// Sent by the shell while the image is streamed
    UploadProgress {
        loaded: u64,
        total: u64,
    },
    Retry,
    /// Sent by the shell once per second while a reboot countdown runs
    CountdownTick,
    ConfigureCountdown {
        seconds: u32,
    },

    #[serde(skip)]
    UploadFinished(UploadOutput),
}

/// Polled device information (status, live readings, clock)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    RefreshStatus,
    RefreshReadings,
    RefreshClock,

    #[serde(skip)]
    StatusResponse(Result<DeviceStatus, String>),
    #[serde(skip)]
    ReadingsResponse(Result<Vec<SensorReading>, String>),
    #[serde(skip)]
    ClockResponse(Result<DeviceTime, String>),
}

/// UI events (clear messages)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    ClearError,
    ClearSuccess,
}

/// Root event type, delegating to domain-specific events
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Initialize,
    Config(ConfigEvent),
    Modbus(ModbusEvent),
    Firmware(FirmwareEvent),
    Monitor(MonitorEvent),
    Ui(UiEvent),
}
