use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_valid::Validate;
use std::collections::BTreeMap;
use thiserror::Error;

const NAMES_KEY: &str = "nameData";
const RESERVED_KEYS: [&str; 6] = [
    "baudrate", "parity", "stopBit", "dataBit", "scanRate", NAMES_KEY,
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("parameter {0} not found")]
    NotFound(String),
    #[error("parameter {0} already exists")]
    DuplicateName(String),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("invalid registry document: {0}")]
    InvalidDocument(String),
}

impl RegistryError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl std::str::FromStr for Parity {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "None" => Ok(Self::None),
            "Even" => Ok(Self::Even),
            "Odd" => Ok(Self::Odd),
            other => Err(RegistryError::invalid(
                "parity",
                format!("unknown parity {other}"),
            )),
        }
    }
}

/// Serial line settings of the Modbus master
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SerialConfig {
    #[validate(minimum = 1)]
    pub baudrate: u32,
    pub parity: Parity,
    #[serde(rename = "stopBit")]
    #[validate(minimum = 1)]
    #[validate(maximum = 2)]
    pub stop_bits: u8,
    #[serde(rename = "dataBit")]
    #[validate(minimum = 5)]
    #[validate(maximum = 8)]
    pub data_bits: u8,
    /// Seconds between two reads of the parameter table
    #[validate(exclusive_minimum = 0.0)]
    pub scan_rate: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            parity: Parity::None,
            stop_bits: 1,
            data_bits: 8,
            scan_rate: 1.0,
        }
    }
}

/// Register-read attributes of one named parameter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ModbusParameter {
    pub device_address: u8,
    pub function_code: u8,
    pub register_address: u16,
    pub multiplier: f64,
    pub offset_address: i32,
}

impl ModbusParameter {
    fn from_tuple(value: &Value) -> Option<Self> {
        let items = value.as_array().filter(|a| a.len() == 5)?;
        Some(Self {
            device_address: u8::try_from(lenient_int(&items[0])?).ok()?,
            function_code: u8::try_from(lenient_int(&items[1])?).ok()?,
            register_address: u16::try_from(lenient_int(&items[2])?).ok()?,
            multiplier: lenient_float(&items[3])?,
            offset_address: i32::try_from(lenient_int(&items[4])?).ok()?,
        })
    }

    fn to_tuple(self) -> Value {
        serde_json::json!([
            self.device_address,
            self.function_code,
            self.register_address,
            self.multiplier,
            self.offset_address,
        ])
    }
}

/// Raw user input for one parameter, as typed into the page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterForm {
    pub device_address: String,
    pub function_code: String,
    pub register_address: String,
    pub multiplier: String,
    pub offset_address: String,
}

impl ParameterForm {
    pub fn parse(&self) -> Result<ModbusParameter, RegistryError> {
        fn int<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, RegistryError> {
            raw.trim()
                .parse()
                .map_err(|_| RegistryError::invalid(field, format!("'{raw}' is not a valid integer")))
        }

        let multiplier: f64 = self.multiplier.trim().parse().map_err(|_| {
            RegistryError::invalid(
                "multiplier",
                format!("'{}' is not a valid number", self.multiplier),
            )
        })?;
        if !multiplier.is_finite() {
            return Err(RegistryError::invalid("multiplier", "must be finite"));
        }

        Ok(ModbusParameter {
            device_address: int("deviceAddress", &self.device_address)?,
            function_code: int("functionCode", &self.function_code)?,
            register_address: int("registerAddress", &self.register_address)?,
            multiplier,
            offset_address: int("offsetAddress", &self.offset_address)?,
        })
    }
}

impl From<&ModbusParameter> for ParameterForm {
    fn from(param: &ModbusParameter) -> Self {
        Self {
            device_address: param.device_address.to_string(),
            function_code: param.function_code.to_string(),
            register_address: param.register_address.to_string(),
            multiplier: param.multiplier.to_string(),
            offset_address: param.offset_address.to_string(),
        }
    }
}

fn lenient_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Named Modbus parameters plus the serial configuration they are read with.
///
/// `names` and `parameters` always hold the same set of keys; every operation
/// either applies completely or leaves the registry untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterRegistry {
    serial: SerialConfig,
    names: Vec<String>,
    parameters: BTreeMap<String, ModbusParameter>,
    selected: Option<String>,
}

impl ParameterRegistry {
    pub fn serial(&self) -> &SerialConfig {
        &self.serial
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn parameter(&self, name: &str) -> Option<&ModbusParameter> {
        self.parameters.get(name)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn select(&mut self, name: &str) -> Result<&ModbusParameter, RegistryError> {
        let param = self
            .parameters
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        self.selected = Some(name.to_string());
        Ok(param)
    }

    /// Move a parameter to a new name; the new name is appended to the display order
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), RegistryError> {
        if from == to {
            return if self.parameters.contains_key(from) {
                Ok(())
            } else {
                Err(RegistryError::NotFound(from.to_string()))
            };
        }
        validate_name(to)?;
        let Some(index) = self.names.iter().position(|n| n == from) else {
            return Err(RegistryError::NotFound(from.to_string()));
        };
        if self.parameters.contains_key(to) {
            return Err(RegistryError::DuplicateName(to.to_string()));
        }
        let Some(param) = self.parameters.remove(from) else {
            return Err(RegistryError::NotFound(from.to_string()));
        };

        self.names.remove(index);
        self.names.push(to.to_string());
        self.parameters.insert(to.to_string(), param);
        if self.selected.as_deref() == Some(from) {
            self.selected = Some(to.to_string());
        }
        Ok(())
    }

    /// Create or overwrite a parameter from raw input and select it
    pub fn upsert(&mut self, name: &str, form: &ParameterForm) -> Result<(), RegistryError> {
        validate_name(name)?;
        let param = form.parse()?;

        if !self.parameters.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.parameters.insert(name.to_string(), param);
        self.selected = Some(name.to_string());
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.parameters.remove(name).is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.names.retain(|n| n != name);
        if self.selected.as_deref() == Some(name) {
            self.selected = self.names.first().cloned();
        }
        Ok(())
    }

    /// Rename (if the name changed) and update a parameter as one operation
    pub fn save_parameter(
        &mut self,
        original: &str,
        name: &str,
        form: &ParameterForm,
    ) -> Result<(), RegistryError> {
        let param = form.parse()?;
        let mut next = self.clone();
        next.rename(original, name)?;
        next.parameters.insert(name.to_string(), param);
        next.selected = Some(name.to_string());
        *self = next;
        Ok(())
    }

    pub fn update_serial_config(&mut self, serial: SerialConfig) -> Result<(), RegistryError> {
        serial
            .validate()
            .map_err(|e| RegistryError::invalid("serialConfig", e.to_string()))?;
        self.serial = serial;
        Ok(())
    }

    /// Build a registry from the `/modbusLoad` document.
    ///
    /// Missing serial fields fall back to their defaults. Duplicate names and
    /// names without a valid tuple are dropped.
    pub fn from_document(doc: &Value) -> Result<Self, RegistryError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| RegistryError::InvalidDocument("expected a JSON object".into()))?;

        let defaults = SerialConfig::default();
        let int_or = |key: &str, default: i64| obj.get(key).and_then(lenient_int).unwrap_or(default);
        let serial = SerialConfig {
            baudrate: u32::try_from(int_or("baudrate", defaults.baudrate.into()))
                .unwrap_or(defaults.baudrate),
            parity: obj
                .get("parity")
                .and_then(Value::as_str)
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.parity),
            stop_bits: u8::try_from(int_or("stopBit", defaults.stop_bits.into()))
                .unwrap_or(defaults.stop_bits),
            data_bits: u8::try_from(int_or("dataBit", defaults.data_bits.into()))
                .unwrap_or(defaults.data_bits),
            scan_rate: obj
                .get("scanRate")
                .and_then(lenient_float)
                .unwrap_or(defaults.scan_rate),
        };

        let mut registry = Self {
            serial,
            ..Default::default()
        };

        let names = obj
            .get(NAMES_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for name in names {
            let Some(name) = name.as_str() else {
                log::warn!("skipping non-string parameter name {name}");
                continue;
            };
            if registry.parameters.contains_key(name) {
                log::warn!("skipping duplicate parameter {name}");
                continue;
            }
            match obj.get(name).and_then(ModbusParameter::from_tuple) {
                Some(param) => {
                    registry.names.push(name.to_string());
                    registry.parameters.insert(name.to_string(), param);
                }
                None => log::warn!("skipping parameter {name} without a valid tuple"),
            }
        }

        registry.selected = registry.names.first().cloned();
        Ok(registry)
    }

    /// Serialize the whole registry as the document the device stores
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("baudrate".into(), self.serial.baudrate.into());
        doc.insert(
            "parity".into(),
            serde_json::to_value(self.serial.parity).unwrap_or(Value::Null),
        );
        doc.insert("stopBit".into(), self.serial.stop_bits.into());
        doc.insert("dataBit".into(), self.serial.data_bits.into());
        doc.insert("scanRate".into(), self.serial.scan_rate.into());
        doc.insert(NAMES_KEY.into(), self.names.clone().into());
        for name in &self.names {
            if let Some(param) = self.parameters.get(name) {
                doc.insert(name.clone(), param.to_tuple());
            }
        }
        Value::Object(doc)
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::invalid("name", "must not be empty"));
    }
    if RESERVED_KEYS.contains(&name) {
        return Err(RegistryError::invalid("name", format!("{name} is reserved")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(da: &str, fc: &str, ra: &str, mult: &str, off: &str) -> ParameterForm {
        ParameterForm {
            device_address: da.into(),
            function_code: fc.into(),
            register_address: ra.into(),
            multiplier: mult.into(),
            offset_address: off.into(),
        }
    }

    fn two_inputs() -> ParameterRegistry {
        ParameterRegistry::from_document(&json!({
            "baudrate": 19200, "parity": "Even", "stopBit": 1, "dataBit": 8, "scanRate": 0.5,
            "nameData": ["AI1", "AI2"],
            "AI1": [1, 3, 100, 1.0, 0],
            "AI2": [2, 3, 101, 1.0, 0]
        }))
        .unwrap()
    }

    #[test]
    fn load_selects_first_parameter() {
        let registry = two_inputs();

        assert_eq!(registry.names(), ["AI1", "AI2"]);
        assert_eq!(registry.selected(), Some("AI1"));
        assert_eq!(registry.serial().baudrate, 19200);
        assert_eq!(registry.serial().parity, Parity::Even);
    }

    #[test]
    fn rename_moves_tuple_and_appends_name() {
        let mut registry = two_inputs();
        let before = *registry.parameter("AI1").unwrap();

        registry.rename("AI1", "Temp1").unwrap();

        assert_eq!(registry.names(), ["AI2", "Temp1"]);
        assert!(registry.parameter("AI1").is_none());
        assert_eq!(registry.parameter("Temp1"), Some(&before));
        assert_eq!(registry.selected(), Some("Temp1"));
        assert_eq!(
            registry.to_document(),
            json!({
                "baudrate": 19200, "parity": "Even", "stopBit": 1, "dataBit": 8, "scanRate": 0.5,
                "nameData": ["AI2", "Temp1"],
                "AI2": [2, 3, 101, 1.0, 0],
                "Temp1": [1, 3, 100, 1.0, 0]
            })
        );
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut registry = two_inputs();
        let before = registry.clone();

        registry.rename("AI2", "AI2").unwrap();

        assert_eq!(registry, before);
    }

    #[test]
    fn rename_rejects_duplicates_and_unknown_names() {
        let mut registry = two_inputs();
        let before = registry.clone();

        assert_eq!(
            registry.rename("AI1", "AI2"),
            Err(RegistryError::DuplicateName("AI2".into()))
        );
        assert_eq!(
            registry.rename("AI9", "X"),
            Err(RegistryError::NotFound("AI9".into()))
        );
        assert!(matches!(
            registry.rename("AI1", " "),
            Err(RegistryError::InvalidValue { .. })
        ));
        assert_eq!(registry, before);
    }

    #[test]
    fn names_never_repeat() {
        let mut registry = two_inputs();
        let f = form("3", "4", "7", "0.1", "0");

        registry.upsert("AI3", &f).unwrap();
        registry.upsert("AI3", &f).unwrap();
        let _ = registry.rename("AI3", "AI1");
        registry.rename("AI3", "AI4").unwrap();
        registry.upsert("AI3", &f).unwrap();

        let mut sorted = registry.names().to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), registry.len());
        assert_eq!(registry.names(), ["AI1", "AI2", "AI4", "AI3"]);
    }

    #[test]
    fn upsert_with_bad_number_leaves_registry_unchanged() {
        let mut registry = two_inputs();
        let before = registry.clone();

        let result = registry.upsert("X", &form("1", "3", "abc", "1.0", "0"));

        assert!(matches!(
            result,
            Err(RegistryError::InvalidValue { ref field, .. }) if field == "registerAddress"
        ));
        assert_eq!(registry, before);
    }

    #[test]
    fn upsert_overwrites_existing_tuple_in_place() {
        let mut registry = two_inputs();

        registry
            .upsert("AI1", &form("9", "4", "200", "0.5", "-1"))
            .unwrap();

        assert_eq!(registry.names(), ["AI1", "AI2"]);
        assert_eq!(registry.parameter("AI1").unwrap().register_address, 200);
        assert_eq!(registry.parameter("AI1").unwrap().offset_address, -1);
    }

    #[test]
    fn deleting_selected_moves_selection_to_first() {
        let mut registry = two_inputs();
        registry.select("AI2").unwrap();

        registry.delete("AI2").unwrap();
        assert_eq!(registry.selected(), Some("AI1"));

        registry.delete("AI1").unwrap();
        assert_eq!(registry.selected(), None);
        assert!(registry.is_empty());
        assert_eq!(
            registry.delete("AI1"),
            Err(RegistryError::NotFound("AI1".into()))
        );
    }

    #[test]
    fn deleting_other_keeps_selection() {
        let mut registry = two_inputs();
        registry.select("AI2").unwrap();

        registry.delete("AI1").unwrap();

        assert_eq!(registry.selected(), Some("AI2"));
    }

    #[test]
    fn select_unknown_fails() {
        let mut registry = two_inputs();
        assert_eq!(
            registry.select("nope").err(),
            Some(RegistryError::NotFound("nope".into()))
        );
        assert_eq!(registry.selected(), Some("AI1"));
    }

    #[test]
    fn save_parameter_renames_and_updates_atomically() {
        let mut registry = two_inputs();

        registry
            .save_parameter("AI1", "Flow", &form("5", "3", "300", "2", "0"))
            .unwrap();
        assert_eq!(registry.names(), ["AI2", "Flow"]);
        assert_eq!(registry.parameter("Flow").unwrap().device_address, 5);

        let before = registry.clone();
        assert_eq!(
            registry.save_parameter("Flow", "AI2", &form("5", "3", "300", "2", "0")),
            Err(RegistryError::DuplicateName("AI2".into()))
        );
        assert!(registry
            .save_parameter("Flow", "Flow2", &form("5", "3", "300", "x", "0"))
            .is_err());
        assert_eq!(registry, before);
    }

    #[test]
    fn load_is_lenient_and_restores_invariants() {
        let registry = ParameterRegistry::from_document(&json!({
            "nameData": ["A", "B", "A", "C", 4],
            "A": ["1", "3", "10", "1.5", "0"],
            "B": [1, 3],
            "C": [1, 300, 10, 1.0, 0]
        }))
        .unwrap();

        assert_eq!(registry.names(), ["A"]);
        assert_eq!(registry.parameter("A").unwrap().multiplier, 1.5);
        assert_eq!(registry.serial(), &SerialConfig::default());
    }

    #[test]
    fn load_rejects_non_object_document() {
        assert!(matches!(
            ParameterRegistry::from_document(&json!([1, 2])),
            Err(RegistryError::InvalidDocument(_))
        ));
    }

    #[test]
    fn serial_config_is_validated() {
        let mut registry = two_inputs();

        let bad = SerialConfig {
            scan_rate: 0.0,
            ..SerialConfig::default()
        };
        assert!(registry.update_serial_config(bad).is_err());
        assert_eq!(registry.serial().baudrate, 19200);

        let good = SerialConfig {
            baudrate: 115200,
            parity: Parity::Odd,
            stop_bits: 2,
            data_bits: 7,
            scan_rate: 2.0,
        };
        registry.update_serial_config(good.clone()).unwrap();
        assert_eq!(registry.serial(), &good);
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut registry = two_inputs();
        assert!(registry
            .upsert("nameData", &form("1", "3", "1", "1", "0"))
            .is_err());
    }
}
