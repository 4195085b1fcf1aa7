//! Subcommand implementations driving the core through the shell

use anyhow::{Context, Result};
use iocontrol_ui_core::{
    format_bytes, ConfigEvent, ConfigPage, ControlKind, Event, FieldValue, FirmwareEvent,
    ModbusEvent, Model, MonitorEvent, ParameterForm, SerialConfig, UploadState,
};
use std::{path::Path, time::Duration};

use crate::shell::Shell;

/// Split a `field=value` argument
pub fn parse_assignment(arg: &str) -> Result<(String, FieldValue)> {
    let (field, value) = arg
        .split_once('=')
        .with_context(|| format!("expected field=value, got {arg}"))?;
    let field = field.trim();
    anyhow::ensure!(!field.is_empty(), "missing field name in {arg}");
    Ok((field.to_string(), FieldValue::text(value)))
}

/// Fail with the message the core reported for the last action
fn check(model: &Model) -> Result<()> {
    match &model.error_message {
        Some(e) => anyhow::bail!("{e}"),
        None => Ok(()),
    }
}

fn check_registry(model: &Model) -> Result<()> {
    check(model)?;
    match &model.modbus.registry_error {
        Some(e) => anyhow::bail!("{e}"),
        None => Ok(()),
    }
}

fn report_success(model: &Model) {
    if let Some(msg) = &model.success_message {
        println!("{msg}");
    }
}

async fn open_page(shell: &mut Shell, page: ConfigPage) -> Result<Model> {
    let model = shell
        .dispatch(Event::Config(ConfigEvent::Open { page }))
        .await?;
    check(&model)?;
    Ok(model)
}

pub async fn show(shell: &mut Shell, page: ConfigPage) -> Result<()> {
    let model = open_page(shell, page).await?;
    print_page(&model);
    Ok(())
}

pub async fn set(shell: &mut Shell, page: ConfigPage, assignments: &[String]) -> Result<()> {
    let edits = assignments
        .iter()
        .map(|arg| parse_assignment(arg))
        .collect::<Result<Vec<_>>>()?;

    open_page(shell, page).await?;

    for (field, value) in edits {
        let model = shell
            .dispatch(Event::Config(ConfigEvent::Edit {
                field: field.clone(),
                value,
            }))
            .await?;
        check(&model).with_context(|| format!("failed to set {field}"))?;
        if let Some(e) = model.config.form.errors.get(&field) {
            anyhow::bail!("{field}: {e}");
        }
    }

    let model = shell
        .dispatch(Event::Config(ConfigEvent::Submit))
        .await?;
    check(&model)?;
    report_success(&model);
    Ok(())
}

pub async fn restart(shell: &mut Shell) -> Result<()> {
    let model = shell
        .dispatch(Event::Config(ConfigEvent::RestartDevice))
        .await?;
    check(&model)?;
    report_success(&model);
    Ok(())
}

pub async fn reset_counter(shell: &mut Shell, input: u8) -> Result<()> {
    open_page(shell, ConfigPage::DigitalInput(input)).await?;
    let model = shell
        .dispatch(Event::Config(ConfigEvent::ResetCounter))
        .await?;
    check(&model)?;
    report_success(&model);
    Ok(())
}

/// Load the registry, then apply `event` if given
pub async fn modbus(shell: &mut Shell, event: Option<ModbusEvent>) -> Result<()> {
    let model = shell.dispatch(Event::Modbus(ModbusEvent::Open)).await?;
    check(&model).context("failed to load Modbus setup")?;

    let Some(event) = event else {
        print_registry(&model);
        return Ok(());
    };

    let model = shell.dispatch(Event::Modbus(event)).await?;
    check_registry(&model)?;
    report_success(&model);
    Ok(())
}

/// Serial settings of the loaded registry with the given fields replaced
pub async fn modbus_serial(
    shell: &mut Shell,
    apply: impl FnOnce(&mut SerialConfig),
) -> Result<()> {
    let model = shell.dispatch(Event::Modbus(ModbusEvent::Open)).await?;
    check(&model).context("failed to load Modbus setup")?;

    let mut config = model.modbus.registry.serial().clone();
    apply(&mut config);

    let model = shell
        .dispatch(Event::Modbus(ModbusEvent::UpdateSerialConfig { config }))
        .await?;
    check_registry(&model)?;
    report_success(&model);
    Ok(())
}

pub async fn upload(shell: &mut Shell, file: &Path, countdown: Option<u32>) -> Result<()> {
    let countdown = countdown.unwrap_or(shell.config().reboot_countdown_secs);
    shell
        .dispatch(Event::Firmware(FirmwareEvent::ConfigureCountdown { seconds: countdown }))
        .await?;

    let metadata = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file name {}", file.display()))?
        .to_string();

    shell.set_upload_path(file.to_path_buf());
    let model = shell
        .dispatch(Event::Firmware(FirmwareEvent::SelectFile {
            name,
            size: metadata.len(),
        }))
        .await?;
    check(&model)?;

    let model = shell
        .dispatch(Event::Firmware(FirmwareEvent::StartUpload))
        .await?;
    check(&model)?;
    anyhow::ensure!(
        *model.upload.state() == UploadState::Succeeded,
        "upload ended in unexpected state {:?}",
        model.upload.state()
    );
    report_success(&model);

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let model = shell
            .dispatch(Event::Firmware(FirmwareEvent::CountdownTick))
            .await?;
        if let Some(target) = model.upload.redirect_to() {
            println!("Device should be available again at {}{target}", shell.config().device_url);
            break;
        }
        if let Some(seconds) = model.overlay_spinner.countdown_seconds() {
            println!("Reconnecting in {seconds}s");
        }
    }

    Ok(())
}

pub async fn status(shell: &mut Shell, watch: bool) -> Result<()> {
    loop {
        let model = shell
            .dispatch(Event::Monitor(MonitorEvent::RefreshStatus))
            .await?;
        match &model.device_status {
            Some(status) => {
                println!(
                    "free heap: {}  image: {}  free update space: {}",
                    format_bytes(status.free_heap),
                    format_bytes(status.sketch_size),
                    format_bytes(status.free_sketch_space)
                );
                if let Some(state) = &status.status {
                    println!("update status: {state}");
                }
                if let Some(error) = &status.error {
                    println!("update error: {error}");
                }
            }
            None if !watch => anyhow::bail!("device status unavailable"),
            None => log::warn!("device status unavailable"),
        }

        if !watch {
            return Ok(());
        }
        tokio::time::sleep(shell.config().status_poll).await;
    }
}

pub async fn readings(shell: &mut Shell) -> Result<()> {
    let model = shell
        .dispatch(Event::Monitor(MonitorEvent::RefreshReadings))
        .await?;

    if model.sensor_readings.is_empty() {
        println!("no readings");
    }
    for reading in &model.sensor_readings {
        println!("{:<20} {:>12.2}", reading.sensor, reading.display_value());
    }
    Ok(())
}

/// Build the raw parameter input from positional arguments
pub fn parameter_form(values: &[String; 5]) -> ParameterForm {
    ParameterForm {
        device_address: values[0].clone(),
        function_code: values[1].clone(),
        register_address: values[2].clone(),
        multiplier: values[3].clone(),
        offset_address: values[4].clone(),
    }
}

fn print_page(model: &Model) {
    let state = &model.config;
    println!("{}", state.page);

    for binding in &state.bindings.bindings {
        if binding
            .group
            .as_ref()
            .is_some_and(|group| !state.form.is_group_visible(group))
        {
            continue;
        }

        let value = match (&binding.kind, state.form.value(&binding.field)) {
            (ControlKind::Password, Some(_)) => "********".to_string(),
            (ControlKind::Checkbox, Some(value)) if value.is_on() => "on".to_string(),
            (ControlKind::Checkbox, Some(_)) => "off".to_string(),
            (_, Some(value)) => value.as_text(),
            (_, None) => String::new(),
        };
        let marker = if state.form.is_disabled(&binding.field) {
            "  (disabled)"
        } else {
            ""
        };
        println!("  {:<20} {value}{marker}", binding.field);
    }

    for (field, value) in state.form.values.iter() {
        if !state.bindings.is_bound(field) {
            println!("  {field:<20} {}", value.as_text());
        }
    }
}

fn print_registry(model: &Model) {
    let registry = &model.modbus.registry;
    let serial = registry.serial();
    println!(
        "serial: {} baud, parity {:?}, {} data bits, {} stop bits, scan every {}s",
        serial.baudrate, serial.parity, serial.data_bits, serial.stop_bits, serial.scan_rate
    );

    if registry.is_empty() {
        println!("no parameters");
        return;
    }

    println!(
        "  {:<16} {:>6} {:>4} {:>8} {:>10} {:>7}",
        "name", "device", "fc", "register", "multiplier", "offset"
    );
    for name in registry.names() {
        let Some(param) = registry.parameter(name) else {
            continue;
        };
        let marker = if registry.selected() == Some(name.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(
            "{marker} {name:<16} {:>6} {:>4} {:>8} {:>10} {:>7}",
            param.device_address,
            param.function_code,
            param.register_address,
            param.multiplier,
            param.offset_address
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_splits_on_first_equals() {
        let (field, value) = parse_assignment("endpoint=http://host/?a=b").unwrap();

        assert_eq!(field, "endpoint");
        assert_eq!(value, FieldValue::text("http://host/?a=b"));
    }

    #[test]
    fn assignment_allows_empty_value() {
        let (field, value) = parse_assignment("ipDNS=").unwrap();

        assert_eq!(field, "ipDNS");
        assert_eq!(value, FieldValue::text(""));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignment("loggerMode").is_err());
        assert!(parse_assignment("=on").is_err());
    }

    #[test]
    fn parameter_form_keeps_raw_input() {
        let values = ["1", "3", "100", "0.1", "-2"].map(String::from);

        let form = parameter_form(&values);

        assert_eq!(form.register_address, "100");
        assert_eq!(form.offset_address, "-2");
        assert_eq!(form.parse().map(|p| p.offset_address), Ok(-2));
    }
}
