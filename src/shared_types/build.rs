use anyhow::Result;
use crux_core::typegen::TypeGen;
use iocontrol_ui_core::{
    events::{ConfigEvent, FirmwareEvent, ModbusEvent, MonitorEvent, UiEvent},
    types::{
        ConfigPage, ControlKind, EnablementRule, FieldValue, ImageKind, Parity, SaveOutcome,
        SyncState, UploadFailure, UploadState,
    },
    App,
};
use std::path::PathBuf;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=../app");

    let mut gen = TypeGen::new();

    gen.register_app::<App>()?;

    // Explicitly register domain event enums to ensure all variants are traced
    gen.register_type::<ConfigEvent>()?;
    gen.register_type::<ModbusEvent>()?;
    gen.register_type::<FirmwareEvent>()?;
    gen.register_type::<MonitorEvent>()?;
    gen.register_type::<UiEvent>()?;

    // Explicitly register other enums to ensure all variants are traced
    gen.register_type::<ConfigPage>()?;
    gen.register_type::<FieldValue>()?;
    gen.register_type::<ControlKind>()?;
    gen.register_type::<EnablementRule>()?;
    gen.register_type::<SyncState>()?;
    gen.register_type::<SaveOutcome>()?;
    gen.register_type::<Parity>()?;
    gen.register_type::<ImageKind>()?;
    gen.register_type::<UploadFailure>()?;
    gen.register_type::<UploadState>()?;

    let output_root = PathBuf::from("./generated");

    gen.typescript("shared_types", output_root.join("typescript"))?;

    Ok(())
}
