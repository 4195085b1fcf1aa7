use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::types::common::{Encoding, SyncError};

/// Validate IPv4 address format
pub fn is_valid_ipv4(ip: &str) -> bool {
    if ip.is_empty() {
        return true; // Empty is considered valid (for optional fields)
    }

    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() != 4 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 3
            && part.chars().all(|c| c.is_ascii_digit())
            && part.parse::<u32>().is_ok_and(|num| num <= 255)
    })
}

/// A scalar configuration value as it travels between device and controls.
///
/// Numbers keep their textual JSON representation so that a value loaded from
/// the device is written back byte-for-byte when the user did not touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldValue {
    Flag(bool),
    Number(String),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a number value, returns `None` if `value` is not a JSON number
    pub fn number(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        value
            .trim()
            .parse::<serde_json::Number>()
            .ok()
            .map(|n| Self::Number(n.to_string()))
    }

    /// Convert a JSON scalar. Arrays, objects and `null` have no field representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Flag(*b)),
            serde_json::Value::Number(n) => Some(Self::Number(n.to_string())),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Flag(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => n
                .parse::<serde_json::Number>()
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(n.clone())),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Interpretation used by toggle controls
    pub fn is_on(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Number(n) => n.parse::<f64>().is_ok_and(|v| v != 0.0),
            Self::Text(s) => matches!(s.as_str(), "on" | "true" | "1"),
        }
    }

    /// Interpretation used by mode selectors and text controls
    pub fn as_text(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Number(n) | Self::Text(n) => n.clone(),
        }
    }
}

/// Flat point-in-time configuration document loaded from or sent to the device
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSnapshot(BTreeMap<String, FieldValue>);

/// Values collected from the controls of a page, ready to be persisted
pub type FormPayload = ConfigSnapshot;

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a device response body.
    ///
    /// The body must be a JSON object; non-scalar members are dropped.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, SyncError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| SyncError::InvalidPayload(format!("JSON parse error: {e}")))?;

        let serde_json::Value::Object(map) = value else {
            return Err(SyncError::InvalidPayload("expected a JSON object".to_string()));
        };

        let mut snapshot = Self::new();
        for (key, value) in &map {
            match FieldValue::from_json(value) {
                Some(field) => {
                    snapshot.insert(key.clone(), field);
                }
                None => log::debug!("skipping non-scalar snapshot field {key}"),
            }
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Encode as `application/x-www-form-urlencoded`.
    ///
    /// Flags follow checkbox semantics: checked fields are sent as `on`,
    /// unchecked fields are omitted.
    pub fn to_urlencoded(&self) -> Result<String, serde_urlencoded::ser::Error> {
        let pairs: Vec<(&str, &str)> = self
            .0
            .iter()
            .filter_map(|(key, value)| match value {
                FieldValue::Flag(true) => Some((key.as_str(), "on")),
                FieldValue::Flag(false) => None,
                FieldValue::Number(v) | FieldValue::Text(v) => Some((key.as_str(), v.as_str())),
            })
            .collect();
        serde_urlencoded::to_string(pairs)
    }

    /// Encode as request body for the given encoding
    pub fn encode(&self, encoding: Encoding) -> Result<String, SyncError> {
        match encoding {
            Encoding::Urlencoded => self
                .to_urlencoded()
                .map_err(|e| SyncError::InvalidPayload(e.to_string())),
            Encoding::Json => serde_json::to_string(&self.to_json())
                .map_err(|e| SyncError::InvalidPayload(e.to_string())),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for ConfigSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Kind of interactive control a field is bound to, with its native constraints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Password,
    Number { min: Option<i64>, max: Option<i64> },
    Checkbox,
    Select { options: Vec<String> },
    IpAddress,
    ReadOnly,
}

/// Association between a snapshot field and a control
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Binding {
    pub field: String,
    pub kind: ControlKind,
    /// Value used when the snapshot does not carry the field
    pub default: FieldValue,
    /// Visibility group, governed by a choice rule
    pub group: Option<String>,
}

impl Binding {
    pub fn new(field: impl Into<String>, kind: ControlKind, default: FieldValue) -> Self {
        Self {
            field: field.into(),
            kind,
            default,
            group: None,
        }
    }

    pub fn text(field: impl Into<String>) -> Self {
        Self::new(field, ControlKind::Text, FieldValue::text(""))
    }

    pub fn password(field: impl Into<String>) -> Self {
        Self::new(field, ControlKind::Password, FieldValue::text(""))
    }

    pub fn ip_address(field: impl Into<String>) -> Self {
        Self::new(field, ControlKind::IpAddress, FieldValue::text(""))
    }

    pub fn checkbox(field: impl Into<String>) -> Self {
        Self::new(field, ControlKind::Checkbox, FieldValue::Flag(false))
    }

    pub fn read_only(field: impl Into<String>) -> Self {
        Self::new(field, ControlKind::ReadOnly, FieldValue::text("-"))
    }

    pub fn number(field: impl Into<String>, default: i64) -> Self {
        Self::new(
            field,
            ControlKind::Number {
                min: None,
                max: None,
            },
            FieldValue::Number(default.to_string()),
        )
    }

    pub fn select(field: impl Into<String>, options: &[&str]) -> Self {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let default = FieldValue::text(options.first().cloned().unwrap_or_default());
        Self::new(field, ControlKind::Select { options }, default)
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = default;
        self
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        if let ControlKind::Number { .. } = self.kind {
            self.kind = ControlKind::Number {
                min: Some(min),
                max: Some(max),
            };
        }
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// One row of a mode table: what a given mode shows and what it disables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeEntry {
    /// Mode value; a trailing `*` matches any value with that prefix
    pub mode: String,
    pub visible_groups: Vec<String>,
    pub disabled: Vec<String>,
}

impl ModeEntry {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            visible_groups: Vec::new(),
            disabled: Vec::new(),
        }
    }

    pub fn showing(mut self, groups: &[&str]) -> Self {
        self.visible_groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn disabling(mut self, controls: &[&str]) -> Self {
        self.disabled = controls.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn matches(&self, value: &str) -> bool {
        match self.mode.strip_suffix('*') {
            Some(prefix) => value.starts_with(prefix),
            None => value == self.mode,
        }
    }
}

/// Rule deriving enablement and visibility from the value of a governing control
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnablementRule {
    /// Dependents are disabled while the governing toggle is off
    Toggle {
        governor: String,
        dependents: Vec<String>,
    },
    /// A multi-valued mode picks exactly one row of a static table
    Choice {
        governor: String,
        table: Vec<ModeEntry>,
    },
}

impl EnablementRule {
    pub fn toggle(governor: impl Into<String>, dependents: &[&str]) -> Self {
        Self::Toggle {
            governor: governor.into(),
            dependents: dependents.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn choice(governor: impl Into<String>, table: Vec<ModeEntry>) -> Self {
        Self::Choice {
            governor: governor.into(),
            table,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {0} is not editable")]
    Disabled(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Current state of the controls of one page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormState {
    pub values: ConfigSnapshot,
    pub original: ConfigSnapshot,
    pub disabled: BTreeSet<String>,
    pub visible_groups: BTreeSet<String>,
    pub errors: BTreeMap<String, String>,
    /// Bound fields the snapshot did not carry and the user has not edited
    pub defaulted: BTreeSet<String>,
}

impl FormState {
    pub fn is_disabled(&self, control: &str) -> bool {
        self.disabled.contains(control)
    }

    pub fn is_group_visible(&self, group: &str) -> bool {
        self.visible_groups.contains(group)
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.original
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Accept the current values as the device state (after a successful save)
    pub fn mark_saved(&mut self) {
        self.original = self.values.clone();
    }
}

/// Declarative set of bindings and enablement rules for one page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldBindingSet {
    pub bindings: Vec<Binding>,
    pub rules: Vec<EnablementRule>,
}

impl FieldBindingSet {
    pub fn new(bindings: Vec<Binding>, rules: Vec<EnablementRule>) -> Self {
        Self { bindings, rules }
    }

    pub fn binding(&self, field: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.field == field)
    }

    pub fn is_bound(&self, field: &str) -> bool {
        self.binding(field).is_some()
    }

    /// Write a snapshot into fresh controls and evaluate all rules.
    ///
    /// Snapshot members without a binding are carried along unchanged.
    pub fn populate(&self, snapshot: &ConfigSnapshot) -> FormState {
        let mut values = snapshot.clone();
        let mut defaulted = BTreeSet::new();
        for binding in &self.bindings {
            if !values.contains(&binding.field) {
                values.insert(binding.field.clone(), binding.default.clone());
                defaulted.insert(binding.field.clone());
            }
        }

        let mut form = FormState {
            original: values.clone(),
            values,
            defaulted,
            ..Default::default()
        };
        self.evaluate(&mut form);
        form
    }

    /// Read the current control values into a flat payload.
    ///
    /// Defaults shown for fields the device did not send are left out until edited.
    pub fn collect(&self, form: &FormState) -> FormPayload {
        let mut payload = form.values.clone();
        payload.retain(|field| !form.defaulted.contains(field));
        payload
    }

    /// Apply a user edit, then re-evaluate every rule.
    ///
    /// Input a native control would refuse fails without touching the form;
    /// pattern and range violations are stored and reported per field.
    pub fn edit(
        &self,
        form: &mut FormState,
        field: &str,
        value: FieldValue,
    ) -> Result<(), FormError> {
        let binding = self
            .binding(field)
            .ok_or_else(|| FormError::UnknownField(field.to_string()))?;

        if form.is_disabled(field) || binding.kind == ControlKind::ReadOnly {
            return Err(FormError::Disabled(field.to_string()));
        }

        let invalid = |reason: &str| FormError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let (value, error) = match &binding.kind {
            ControlKind::Checkbox => {
                let flag = match &value {
                    FieldValue::Flag(b) => *b,
                    FieldValue::Text(s) if matches!(s.as_str(), "on" | "true" | "1") => true,
                    FieldValue::Text(s) if matches!(s.as_str(), "off" | "false" | "0" | "") => {
                        false
                    }
                    _ => return Err(invalid("expected on/off")),
                };
                (FieldValue::Flag(flag), None)
            }
            ControlKind::Number { min, max } => {
                let number = FieldValue::number(value.as_text())
                    .ok_or_else(|| invalid("expected a number"))?;
                let parsed = number.as_text().parse::<f64>().unwrap_or_default();
                let out_of_range = min.is_some_and(|m| parsed < m as f64)
                    || max.is_some_and(|m| parsed > m as f64);
                let error = out_of_range.then(|| match (min, max) {
                    (Some(lo), Some(hi)) => format!("must be between {lo} and {hi}"),
                    (Some(lo), None) => format!("must be at least {lo}"),
                    (None, Some(hi)) => format!("must be at most {hi}"),
                    (None, None) => unreachable!(),
                });
                (number, error)
            }
            ControlKind::Select { options } => {
                let text = value.as_text();
                if !options.contains(&text) {
                    return Err(invalid("not one of the available options"));
                }
                (FieldValue::Text(text), None)
            }
            ControlKind::IpAddress => {
                let text = value.as_text();
                let error = (!is_valid_ipv4(&text)).then(|| "Invalid IPv4-Address".to_string());
                (FieldValue::Text(text), error)
            }
            ControlKind::Text | ControlKind::Password => (FieldValue::Text(value.as_text()), None),
            ControlKind::ReadOnly => unreachable!("read-only controls are rejected above"),
        };

        form.values.insert(field, value);
        form.defaulted.remove(field);
        match error {
            Some(e) => form.errors.insert(field.to_string(), e),
            None => form.errors.remove(field),
        };
        self.evaluate(form);
        Ok(())
    }

    /// Recompute disabled controls and visible groups from the current values.
    ///
    /// A control is disabled iff at least one rule disables it. A group is
    /// visible iff no choice rule governs it, or the active mode lists it.
    pub fn evaluate(&self, form: &mut FormState) {
        let mut disabled: BTreeSet<String> = self
            .bindings
            .iter()
            .filter(|b| b.kind == ControlKind::ReadOnly)
            .map(|b| b.field.clone())
            .collect();

        let mut governed = BTreeSet::new();
        let mut shown = BTreeSet::new();

        for rule in &self.rules {
            match rule {
                EnablementRule::Toggle {
                    governor,
                    dependents,
                } => {
                    let on = form.values.get(governor).is_some_and(FieldValue::is_on);
                    if !on {
                        disabled.extend(dependents.iter().cloned());
                    }
                }
                EnablementRule::Choice { governor, table } => {
                    governed.extend(table.iter().flat_map(|e| e.visible_groups.iter().cloned()));

                    let mode = form
                        .values
                        .get(governor)
                        .map(FieldValue::as_text)
                        .unwrap_or_default();

                    if let Some(entry) = table.iter().find(|e| e.matches(&mode)) {
                        shown.extend(entry.visible_groups.iter().cloned());
                        disabled.extend(entry.disabled.iter().cloned());
                    }
                }
            }
        }

        let ungoverned: Vec<String> = self
            .bindings
            .iter()
            .filter_map(|b| b.group.clone())
            .filter(|g| !governed.contains(g))
            .collect();
        shown.extend(ungoverned);
        form.visible_groups = shown;
        form.disabled = disabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: &str) -> FieldValue {
        FieldValue::number(v).unwrap()
    }

    fn sample_bindings() -> FieldBindingSet {
        FieldBindingSet::new(
            vec![
                Binding::checkbox("scaling"),
                Binding::number("lowLimit", 0),
                Binding::number("highLimit", 100),
                Binding::select("taskMode", &["Normal", "Pulse Mode"]),
                Binding::number("intervalTime", 0).in_group("interval"),
                Binding::checkbox("inputInversion").in_group("inversion"),
                Binding::ip_address("ipAddress"),
                Binding::number("sdInterval", 5).with_range(1, 1440),
            ],
            vec![
                EnablementRule::toggle("scaling", &["lowLimit", "highLimit"]),
                EnablementRule::choice(
                    "taskMode",
                    vec![
                        ModeEntry::new("Normal").showing(&["inversion"]),
                        ModeEntry::new("Pulse Mode")
                            .showing(&["interval"])
                            .disabling(&["resetValue"]),
                    ],
                ),
            ],
        )
    }

    fn sample_snapshot() -> ConfigSnapshot {
        ConfigSnapshot::from_json_slice(
            br#"{"scaling":false,"lowLimit":4,"highLimit":20.5,"taskMode":"Normal",
                "intervalTime":0,"inputInversion":true,"ipAddress":"192.168.1.10",
                "sdInterval":5,"firmwareVersion":"1.2.0"}"#,
        )
        .unwrap()
    }

    #[test]
    fn collect_after_populate_returns_the_snapshot() {
        let bindings = sample_bindings();
        let snapshot = sample_snapshot();

        let form = bindings.populate(&snapshot);

        assert_eq!(bindings.collect(&form), snapshot);
        assert!(!form.is_dirty());
    }

    #[test]
    fn populate_fills_missing_fields_with_defaults() {
        let bindings = sample_bindings();

        let form = bindings.populate(&ConfigSnapshot::new());

        assert_eq!(form.value("highLimit"), Some(&num("100")));
        assert_eq!(form.value("taskMode"), Some(&FieldValue::text("Normal")));
        assert_eq!(form.value("scaling"), Some(&FieldValue::Flag(false)));
    }

    #[test]
    fn partial_snapshot_round_trips_until_defaults_are_edited() {
        let bindings = sample_bindings();
        let snapshot = ConfigSnapshot::from_json_slice(br#"{"scaling":true,"lowLimit":4}"#)
            .unwrap();
        let mut form = bindings.populate(&snapshot);

        assert_eq!(form.value("highLimit"), Some(&num("100")));
        assert_eq!(bindings.collect(&form), snapshot);

        bindings
            .edit(&mut form, "highLimit", FieldValue::text("20"))
            .unwrap();

        let payload = bindings.collect(&form);
        assert_eq!(payload.get("highLimit"), Some(&num("20")));
        assert!(!payload.contains("taskMode"));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn toggle_off_disables_dependents_but_keeps_their_values() {
        let bindings = sample_bindings();
        let form = bindings.populate(&sample_snapshot());

        assert!(form.is_disabled("lowLimit"));
        assert!(form.is_disabled("highLimit"));
        assert_eq!(bindings.collect(&form).get("lowLimit"), Some(&num("4")));
    }

    #[test]
    fn toggling_governor_reevaluates_rules() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        bindings
            .edit(&mut form, "scaling", FieldValue::Flag(true))
            .unwrap();
        assert!(!form.is_disabled("lowLimit"));

        bindings
            .edit(&mut form, "scaling", FieldValue::text("off"))
            .unwrap();
        assert!(form.is_disabled("lowLimit"));
    }

    #[test]
    fn editing_disabled_control_is_rejected() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        let result = bindings.edit(&mut form, "lowLimit", num("7"));

        assert_eq!(result, Err(FormError::Disabled("lowLimit".to_string())));
        assert_eq!(form.value("lowLimit"), Some(&num("4")));
    }

    #[test]
    fn choice_rule_shows_exactly_the_mode_groups() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        assert!(form.is_group_visible("inversion"));
        assert!(!form.is_group_visible("interval"));
        assert!(!form.is_disabled("resetValue"));

        bindings
            .edit(&mut form, "taskMode", FieldValue::text("Pulse Mode"))
            .unwrap();

        assert!(!form.is_group_visible("inversion"));
        assert!(form.is_group_visible("interval"));
        assert!(form.is_disabled("resetValue"));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());
        let before = form.clone();

        bindings.evaluate(&mut form);
        bindings.evaluate(&mut form);

        assert_eq!(form, before);
    }

    #[test]
    fn unknown_mode_hides_governed_groups() {
        let bindings = sample_bindings();
        let mut snapshot = sample_snapshot();
        snapshot.insert("taskMode", FieldValue::text("Legacy"));

        let form = bindings.populate(&snapshot);

        assert!(!form.is_group_visible("inversion"));
        assert!(!form.is_group_visible("interval"));
    }

    #[test]
    fn wildcard_mode_matches_prefix() {
        let entry = ModeEntry::new("Rising Edge*");
        assert!(entry.matches("Rising Edge DI1"));
        assert!(!entry.matches("Time/interval"));
        assert!(ModeEntry::new("HTTP").matches("HTTP"));
        assert!(!ModeEntry::new("HTTP").matches("HTTPS"));
    }

    #[test]
    fn invalid_ip_is_stored_with_error() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        bindings
            .edit(&mut form, "ipAddress", FieldValue::text("192.168.1"))
            .unwrap();
        assert_eq!(
            form.errors.get("ipAddress").map(String::as_str),
            Some("Invalid IPv4-Address")
        );

        bindings
            .edit(&mut form, "ipAddress", FieldValue::text("10.0.0.1"))
            .unwrap();
        assert!(!form.has_errors());
    }

    #[test]
    fn number_outside_range_is_reported() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        bindings
            .edit(&mut form, "sdInterval", FieldValue::text("2000"))
            .unwrap();

        assert_eq!(
            form.errors.get("sdInterval").map(String::as_str),
            Some("must be between 1 and 1440")
        );
        assert_eq!(form.value("sdInterval"), Some(&num("2000")));
    }

    #[test]
    fn non_numeric_input_leaves_form_untouched() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());
        let before = form.clone();

        let result = bindings.edit(&mut form, "sdInterval", FieldValue::text("soon"));

        assert!(matches!(result, Err(FormError::InvalidValue { .. })));
        assert_eq!(form, before);
    }

    #[test]
    fn unknown_field_and_select_option_are_rejected() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        assert_eq!(
            bindings.edit(&mut form, "nope", FieldValue::text("x")),
            Err(FormError::UnknownField("nope".to_string()))
        );
        assert!(bindings
            .edit(&mut form, "taskMode", FieldValue::text("Turbo"))
            .is_err());
    }

    #[test]
    fn edit_marks_form_dirty_until_saved() {
        let bindings = sample_bindings();
        let mut form = bindings.populate(&sample_snapshot());

        bindings
            .edit(&mut form, "ipAddress", FieldValue::text("10.0.0.2"))
            .unwrap();
        assert!(form.is_dirty());

        form.mark_saved();
        assert!(!form.is_dirty());
    }

    #[test]
    fn snapshot_drops_non_scalar_members() {
        let snapshot =
            ConfigSnapshot::from_json_slice(br#"{"a":1,"b":[1,2],"c":{"d":true},"e":null}"#)
                .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("a"), Some(&num("1")));
    }

    #[test]
    fn snapshot_rejects_non_object_bodies() {
        assert!(ConfigSnapshot::from_json_slice(b"[1,2]").is_err());
        assert!(ConfigSnapshot::from_json_slice(b"<html>").is_err());
    }

    #[test]
    fn urlencoded_payload_uses_checkbox_semantics() {
        let payload: FormPayload = [
            ("loggerMode", FieldValue::Flag(true)),
            ("modbusMode", FieldValue::Flag(false)),
            ("port", num("1883")),
            ("endpoint", FieldValue::text("broker.local/a b")),
        ]
        .into_iter()
        .collect();

        let encoded = payload.to_urlencoded().unwrap();

        assert_eq!(
            encoded,
            "endpoint=broker.local%2Fa+b&loggerMode=on&port=1883"
        );
    }

    #[test]
    fn json_payload_keeps_number_representation() {
        let payload: FormPayload = [("scanRate", num("0.5")), ("port", num("502"))]
            .into_iter()
            .collect();

        assert_eq!(
            payload.to_json(),
            serde_json::json!({"scanRate": 0.5, "port": 502})
        );
    }

    #[test]
    fn ipv4_validation() {
        assert!(is_valid_ipv4(""));
        assert!(is_valid_ipv4("192.168.0.1"));
        assert!(!is_valid_ipv4("192.168.0.256"));
        assert!(!is_valid_ipv4("192.168.0"));
        assert!(!is_valid_ipv4("a.b.c.d"));
        assert!(!is_valid_ipv4("1..2.3"));
    }
}
