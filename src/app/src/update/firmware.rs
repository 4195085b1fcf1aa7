use crux_core::{render::render, Command};

use crate::build_url;
use crate::commands::upload::UploadOutput;
use crate::events::{Event, FirmwareEvent};
use crate::model::Model;
use crate::types::{ImageKind, OverlaySpinnerState, UploadFailure, UploadState};
use crate::{Effect, UploadCmd};

const UPLOAD_ENDPOINT: &str = "/update";

/// Handle firmware upload events
pub fn handle(event: FirmwareEvent, model: &mut Model) -> Command<Effect, Event> {
    match event {
        FirmwareEvent::SelectFile { name, size } => {
            match model.upload.select(&name, size) {
                Ok(file) => {
                    log::info!("selected {} ({:?}, {} bytes)", file.name, file.kind, file.size);
                    model.clear_error();
                }
                Err(e) => model.set_error(e.to_string()),
            }
            render()
        }

        FirmwareEvent::StartUpload => handle_start(model),

        FirmwareEvent::UploadProgress { loaded, total } => {
            match model.upload.report_progress(loaded, total) {
                Some(progress) => {
                    model.overlay_spinner.set_progress(progress);
                    render()
                }
                None => Command::done(),
            }
        }

        FirmwareEvent::UploadFinished(output) => handle_finished(output, model),

        FirmwareEvent::Retry => {
            match model.upload.retry() {
                Ok(()) => model.clear_error(),
                Err(e) => model.set_error(e.to_string()),
            }
            render()
        }

        FirmwareEvent::CountdownTick => handle_tick(model),

        FirmwareEvent::ConfigureCountdown { seconds } => {
            model.upload.set_countdown_secs(seconds);
            render()
        }
    }
}

fn handle_start(model: &mut Model) -> Command<Effect, Event> {
    let (file_name, kind) = match model.upload.start() {
        Ok(file) => (file.name.clone(), file.kind),
        Err(e) => return model.set_error_and_render(e.to_string()),
    };

    let title = match kind {
        ImageKind::Firmware => "Uploading firmware",
        ImageKind::Filesystem => "Uploading filesystem image",
    };

    model.start_loading();
    model.success_message = None;
    model.overlay_spinner = OverlaySpinnerState::new(title)
        .with_text(file_name.clone())
        .with_progress(0);

    Command::all([
        render(),
        UploadCmd::start(build_url(UPLOAD_ENDPOINT), file_name)
            .build()
            .then_send(|output| Event::Firmware(FirmwareEvent::UploadFinished(output))),
    ])
}

fn handle_finished(output: UploadOutput, model: &mut Model) -> Command<Effect, Event> {
    let result = match output {
        UploadOutput::Completed { status, body } => model.upload.finish(status, &body),
        UploadOutput::ConnectionError { message } => model
            .upload
            .fail(UploadFailure::ConnectionError(message)),
    };

    if let Err(e) = result {
        log::warn!("ignoring upload result: {e}");
        return Command::done();
    }

    match model.upload.state().clone() {
        UploadState::Succeeded => {
            model.stop_loading();
            let countdown = model.upload.countdown_secs();
            model.success_message = Some("Update successful, device is rebooting".to_string());
            model.overlay_spinner = OverlaySpinnerState::new("Rebooting device")
                .with_text("Reconnecting when the countdown elapsed")
                .with_progress(100);
            model.overlay_spinner.set_countdown(countdown);
        }
        UploadState::Failed(failure) => {
            model.overlay_spinner = OverlaySpinnerState::default();
            model.set_error(format!("Update failed: {failure}"));
        }
        other => log::warn!("unexpected upload state after response: {other:?}"),
    }

    render()
}

fn handle_tick(model: &mut Model) -> Command<Effect, Event> {
    let before = model.upload.state().clone();
    let reached_zero = model.upload.tick();

    if *model.upload.state() == before {
        return Command::done();
    }
    if let UploadState::Rebooting { countdown } = *model.upload.state() {
        model.overlay_spinner.set_countdown(countdown);
    }

    if reached_zero {
        log::info!(
            "reboot countdown elapsed, redirecting to {}",
            model.upload.redirect_to().unwrap_or_default()
        );
        model.overlay_spinner = OverlaySpinnerState::default();
    }

    render()
}
