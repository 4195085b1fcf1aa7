mod config;
mod firmware;
mod modbus;
mod monitor;
mod ui;

use crux_core::Command;

use crate::events::{ConfigEvent, Event};
use crate::model::Model;
use crate::types::ConfigPage;
use crate::Effect;

/// Main update dispatcher - routes events to domain-specific handlers
pub fn update(event: Event, model: &mut Model) -> Command<Effect, Event> {
    match event {
        // Initialization: the landing page shows the device overview
        Event::Initialize => config::handle(
            ConfigEvent::Open {
                page: ConfigPage::Home,
            },
            model,
        ),

        // Configuration pages domain
        Event::Config(config_event) => config::handle(config_event, model),

        // Modbus registry domain
        Event::Modbus(modbus_event) => modbus::handle(modbus_event, model),

        // Firmware upload domain
        Event::Firmware(firmware_event) => firmware::handle(firmware_event, model),

        // Polled device information
        Event::Monitor(monitor_event) => monitor::handle(monitor_event, model),

        // UI actions domain
        Event::Ui(ui_event) => ui::handle(ui_event, model),
    }
}
