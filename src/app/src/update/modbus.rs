use crux_core::{render::render, Command};

use crate::events::{Event, ModbusEvent};
use crate::handle_request_error;
use crate::model::Model;
use crate::types::{Encoding, ParameterRegistry, RegistryError, SaveOutcome, SyncState};
use crate::{device_get, device_post};
use crate::Effect;

const LOAD_ENDPOINT: &str = "/modbusLoad";
const SAVE_ENDPOINT: &str = "/modbus_setup";

/// Handle Modbus setup events
pub fn handle(event: ModbusEvent, model: &mut Model) -> Command<Effect, Event> {
    match event {
        ModbusEvent::Open => {
            if model.modbus.sync == SyncState::Saving {
                model.modbus.registry_error = Some("A save is already in progress".to_string());
                return render();
            }
            model.modbus.sync = SyncState::Loading;
            model.modbus.registry_error = None;
            device_get!(
                Modbus,
                ModbusEvent,
                model,
                LOAD_ENDPOINT,
                Loaded,
                "Load Modbus setup",
                expect_json: serde_json::Value
            )
        }

        ModbusEvent::Loaded(result) => handle_loaded(result, model),

        ModbusEvent::Select { name } => {
            let result = model.modbus.registry.select(&name).map(|_| ());
            model.modbus.registry_error = result.err().map(|e| e.to_string());
            render()
        }

        ModbusEvent::UpdateSerialConfig { config } => {
            mutate(model, |registry| registry.update_serial_config(config))
        }

        ModbusEvent::Upsert { name, form } => mutate(model, |registry| registry.upsert(&name, &form)),

        ModbusEvent::SaveParameter {
            original,
            name,
            form,
        } => mutate(model, |registry| {
            registry.save_parameter(&original, &name, &form)
        }),

        ModbusEvent::Rename { from, to } => mutate(model, |registry| registry.rename(&from, &to)),

        ModbusEvent::Delete { name } => mutate(model, |registry| registry.delete(&name)),

        ModbusEvent::Persist => {
            if let Err(msg) = check_mutable(model) {
                model.modbus.registry_error = Some(msg);
                return render();
            }
            persist(model)
        }

        ModbusEvent::Persisted(outcome) => handle_persisted(outcome, model),
    }
}

fn handle_loaded(result: Result<serde_json::Value, String>, model: &mut Model) -> Command<Effect, Event> {
    let parsed = result.and_then(|doc| {
        ParameterRegistry::from_document(&doc).map_err(|e| format!("Load Modbus setup failed: {e}"))
    });

    match parsed {
        Ok(registry) => {
            model.modbus.registry = registry;
            model.modbus.sync = SyncState::Ready;
            model.stop_loading();
        }
        Err(e) => {
            model.modbus.sync = SyncState::LoadFailed(e.clone());
            model.set_error(e);
        }
    }

    render()
}

fn check_mutable(model: &Model) -> Result<(), String> {
    match model.modbus.sync {
        SyncState::Ready => Ok(()),
        SyncState::Saving => Err("A save is already in progress".to_string()),
        _ => Err("Modbus setup is not loaded".to_string()),
    }
}

/// Apply one registry operation and persist the result.
///
/// A failed operation leaves the registry untouched and issues no request.
fn mutate(
    model: &mut Model,
    op: impl FnOnce(&mut ParameterRegistry) -> Result<(), RegistryError>,
) -> Command<Effect, Event> {
    if let Err(msg) = check_mutable(model) {
        model.modbus.registry_error = Some(msg);
        return render();
    }

    match op(&mut model.modbus.registry) {
        Ok(()) => {
            model.modbus.registry_error = None;
            persist(model)
        }
        Err(e) => {
            log::debug!("registry operation rejected: {e}");
            model.modbus.registry_error = Some(e.to_string());
            render()
        }
    }
}

/// Send the whole registry to the device (full replace)
fn persist(model: &mut Model) -> Command<Effect, Event> {
    let body = match serde_json::to_string(&model.modbus.registry.to_document()) {
        Ok(body) => body,
        Err(e) => return handle_request_error(model, "Modbus setup", e),
    };

    model.modbus.sync = SyncState::Saving;

    device_post!(
        model,
        SAVE_ENDPOINT,
        Encoding::Json,
        body: body,
        outcome: |outcome| Event::Modbus(ModbusEvent::Persisted(outcome))
    )
}

fn handle_persisted(outcome: SaveOutcome, model: &mut Model) -> Command<Effect, Event> {
    if model.modbus.sync != SyncState::Saving {
        log::debug!("dropping Modbus save outcome without pending save");
        return Command::done();
    }
    model.modbus.sync = SyncState::Ready;

    match outcome.error() {
        None => {
            model.stop_loading();
            model.success_message = Some(outcome.notification("Modbus setup"));
        }
        Some(e) => {
            log::warn!("persisting Modbus setup failed: {e}");
            model.set_error(outcome.notification("Modbus setup"));
        }
    }

    render()
}
