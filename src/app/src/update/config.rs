use crux_core::{render::render, Command};

use crate::events::{ConfigEvent, Event};
use crate::handle_request_error;
use crate::model::{ConfigPageState, Model};
use crate::types::{ConfigPage, ConfigSnapshot, FieldValue, FormState, SaveOutcome, SyncState};
use crate::types::RESET_CONTROL;
use crate::{device_get, device_post, handle_response};
use crate::Effect;

/// Handle configuration page events (load, edit, submit and page actions)
pub fn handle(event: ConfigEvent, model: &mut Model) -> Command<Effect, Event> {
    match event {
        ConfigEvent::Open { page } => handle_open(page, model),

        ConfigEvent::Reload => {
            if model.config.sync == SyncState::Saving {
                log::debug!("ignoring reload of {} while saving", model.config.page);
                return Command::done();
            }
            handle_open(model.config.page, model)
        }

        ConfigEvent::Loaded { page, result } => handle_loaded(page, result, model),

        ConfigEvent::Edit { field, value } => handle_edit(&field, value, model),

        ConfigEvent::Submit => handle_submit(model),

        ConfigEvent::Saved { page, outcome } => handle_saved(page, outcome, model),

        ConfigEvent::ResetCounter => handle_reset_counter(model),

        ConfigEvent::ResetCounterResponse(result) => handle_response!(model, result, {
            success_message: "Value reset successfully",
        }),

        ConfigEvent::RestartDevice => device_get!(
            Config,
            ConfigEvent,
            model,
            "/networkLoad?restart=1",
            RestartDeviceResponse,
            "Restart device"
        ),

        ConfigEvent::RestartDeviceResponse(result) => handle_response!(model, result, {
            success_message: "Device is restarting",
        }),
    }
}

/// Switch to `page` and load its snapshot from the device
fn handle_open(page: ConfigPage, model: &mut Model) -> Command<Effect, Event> {
    if let Err(e) = page.validate() {
        return model.set_error_and_render(e);
    }

    // The save outcome belongs to the page it was issued for
    if model.config.sync == SyncState::Saving {
        model.error_message = Some(format!(
            "Wait until {} is saved before opening {page}",
            model.config.page
        ));
        return render();
    }

    model.config = ConfigPageState {
        page,
        sync: SyncState::Loading,
        bindings: page.bindings(),
        form: FormState::default(),
    };

    device_get!(
        model,
        page.load_endpoint(),
        format!("Load {page}"),
        snapshot: move |result| Event::Config(ConfigEvent::Loaded { page, result })
    )
}

fn handle_loaded(
    page: ConfigPage,
    result: Result<ConfigSnapshot, String>,
    model: &mut Model,
) -> Command<Effect, Event> {
    if page != model.config.page {
        log::debug!("dropping stale snapshot of {page}");
        return Command::done();
    }

    match result {
        Ok(raw) => {
            let snapshot = page.prepare_snapshot(raw);
            model.config.form = model.config.bindings.populate(&snapshot);
            model.config.sync = SyncState::Ready;
            model.stop_loading();
        }
        Err(e) => {
            model.config.sync = SyncState::LoadFailed(e.clone());
            model.set_error(e);
        }
    }

    render()
}

fn handle_edit(field: &str, value: FieldValue, model: &mut Model) -> Command<Effect, Event> {
    if !model.config.sync.is_ready() {
        return model.set_error_and_render(format!("{} is not editable yet", model.config.page));
    }

    let state = &mut model.config;
    match state.bindings.edit(&mut state.form, field, value) {
        Ok(()) => render(),
        Err(e) => model.set_error_and_render(e.to_string()),
    }
}

fn handle_submit(model: &mut Model) -> Command<Effect, Event> {
    let page = model.config.page;

    let Some(endpoint) = page.save_endpoint() else {
        return model.set_error_and_render(format!("{page} is read-only"));
    };

    match &model.config.sync {
        SyncState::Ready => {}
        SyncState::Saving => {
            log::debug!("save of {page} already in flight");
            return Command::done();
        }
        _ => return model.set_error_and_render(format!("{page} is not loaded yet")),
    }

    if model.config.form.has_errors() {
        let fields: Vec<&str> = model.config.form.errors.keys().map(String::as_str).collect();
        let msg = format!("Please correct the invalid fields: {}", fields.join(", "));
        return model.set_error_and_render(msg);
    }

    let payload = model.config.bindings.collect(&model.config.form);
    let body = match payload.encode(page.encoding()) {
        Ok(body) => body,
        Err(e) => return handle_request_error(model, "save", e),
    };

    model.config.sync = SyncState::Saving;

    device_post!(
        model,
        endpoint,
        page.encoding(),
        body: body,
        outcome: move |outcome| Event::Config(ConfigEvent::Saved { page, outcome })
    )
}

fn handle_saved(page: ConfigPage, outcome: SaveOutcome, model: &mut Model) -> Command<Effect, Event> {
    if page != model.config.page || model.config.sync != SyncState::Saving {
        log::debug!("dropping stale save outcome of {page}");
        return Command::done();
    }

    model.config.sync = SyncState::Ready;
    let what = page.to_string();

    match outcome.error() {
        None => {
            model.stop_loading();
            model.config.form.mark_saved();
            model.success_message = Some(outcome.notification(&what));
        }
        Some(e) => {
            log::warn!("saving {page} failed: {e}");
            model.set_error(outcome.notification(&what));
        }
    }

    render()
}

fn handle_reset_counter(model: &mut Model) -> Command<Effect, Event> {
    let ConfigPage::DigitalInput(input) = model.config.page else {
        return model.set_error_and_render(
            "Counter reset is only available on digital input pages".to_string(),
        );
    };

    if !model.config.sync.is_ready() {
        return model.set_error_and_render(format!("{} is not loaded yet", model.config.page));
    }

    if model.config.form.is_disabled(RESET_CONTROL) {
        let mode = model
            .config
            .form
            .value("taskMode")
            .map(FieldValue::as_text)
            .unwrap_or_default();
        return model.set_error_and_render(format!("Counter reset is not available in {mode} mode"));
    }

    device_get!(
        Config,
        ConfigEvent,
        model,
        format!("/digitalLoad?reset={input}"),
        ResetCounterResponse,
        "Reset counter"
    )
}
