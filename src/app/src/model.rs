use serde::{Deserialize, Serialize};

use crate::types::*;

/// Trait for types that can handle error messages
///
/// This allows HTTP helper functions to work with Model without directly depending on it.
pub trait ModelErrorHandler {
    fn set_error(&mut self, error: String);
}

/// State of the configuration page currently open
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConfigPageState {
    pub page: ConfigPage,
    pub sync: SyncState,
    pub bindings: FieldBindingSet,
    pub form: FormState,
}

impl ConfigPageState {
    /// Submit is only possible once the initial load resolved and while no save is in flight
    pub fn can_submit(&self) -> bool {
        self.sync.is_ready() && !self.form.has_errors() && self.page.save_endpoint().is_some()
    }
}

/// State of the Modbus setup page
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModbusPageState {
    pub registry: ParameterRegistry,
    pub sync: SyncState,
    /// Inline message of the last rejected registry operation
    pub registry_error: Option<String>,
}

impl ModbusPageState {
    pub fn can_mutate(&self) -> bool {
        self.sync.is_ready()
    }
}

/// Application Model - the complete state
/// Also serves as the ViewModel when serialized
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct Model {
    // Configuration pages
    pub config: ConfigPageState,
    pub modbus: ModbusPageState,

    // Firmware update
    pub upload: UploadSession,

    // Polled device information
    pub device_status: Option<DeviceStatus>,
    pub sensor_readings: Vec<SensorReading>,
    pub device_time: Option<DeviceTime>,

    // UI state
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,

    // Overlay spinner state
    pub overlay_spinner: OverlaySpinnerState,
}

impl Model {
    /// Start a loading operation (sets is_loading=true, clears error)
    pub fn start_loading(&mut self) {
        self.is_loading = true;
        self.error_message = None;
    }

    /// Stop loading and clear error
    pub fn stop_loading(&mut self) {
        self.is_loading = false;
        self.error_message = None;
    }

    /// Set an error message and stop loading
    pub fn set_error(&mut self, error: String) {
        self.is_loading = false;
        self.error_message = Some(error);
    }

    /// Set an error message, stop loading, and return a render command
    pub fn set_error_and_render(
        &mut self,
        error: String,
    ) -> crux_core::Command<crate::Effect, crate::events::Event> {
        self.set_error(error);
        crux_core::render::render()
    }

    /// Clear the error message without affecting the loading state.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Live value of a sensor from the last `/getValue` poll
    pub fn reading(&self, sensor: &str) -> Option<f64> {
        self.sensor_readings
            .iter()
            .find(|r| r.sensor == sensor)
            .map(SensorReading::display_value)
    }

    /// Live value of the selected Modbus parameter
    pub fn selected_parameter_reading(&self) -> Option<f64> {
        self.modbus
            .registry
            .selected()
            .and_then(|name| self.reading(name))
    }
}

impl ModelErrorHandler for Model {
    fn set_error(&mut self, error: String) {
        Model::set_error(self, error)
    }
}
