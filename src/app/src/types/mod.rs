//! Domain-based type organization
//!
//! Types are organized by domain to match the structure in `update/`:
//! - common: Sync outcomes and shared UI state
//! - form: Snapshots, field bindings and enablement rules
//! - modbus: Modbus parameter registry
//! - monitor: Device status, live readings and clock
//! - page: Configuration pages and their bindings
//! - upload: Firmware upload session

pub mod common;
pub mod form;
pub mod modbus;
pub mod monitor;
pub mod page;
pub mod upload;

pub use common::*;
pub use form::*;
pub use modbus::*;
pub use monitor::*;
pub use page::*;
pub use upload::*;
