use serde::{Deserialize, Serialize};

/// Memory and flash figures reported by `/updateStatus`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub free_heap: u64,
    #[serde(default)]
    pub sketch_size: u64,
    #[serde(default)]
    pub free_sketch_space: u64,
    /// Flashing state as seen by the device, when reported
    pub status: Option<String>,
    pub progress: Option<u8>,
    pub size: Option<u64>,
    pub error: Option<String>,
}

/// One live value from `/getValue`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    #[serde(rename = "KodeSensor")]
    pub sensor: String,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl SensorReading {
    /// Value rounded to two decimals for display
    pub fn display_value(&self) -> f64 {
        (self.value * 100.0).round() / 100.0
    }
}

/// Device clock from `/getTime`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceTime {
    pub datetime: String,
}

/// Human readable byte count using binary multiples
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_uses_binary_units() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
    }

    #[test]
    fn status_tolerates_missing_fields() {
        let status: DeviceStatus =
            serde_json::from_str(r#"{"freeHeap":20480,"status":"idle"}"#).unwrap();

        assert_eq!(status.free_heap, 20480);
        assert_eq!(status.sketch_size, 0);
        assert_eq!(status.status.as_deref(), Some("idle"));
        assert_eq!(status.error, None);
    }

    #[test]
    fn readings_use_device_field_names() {
        let readings: Vec<SensorReading> =
            serde_json::from_str(r#"[{"KodeSensor":"AI1","Value":3.14159}]"#).unwrap();

        assert_eq!(readings[0].sensor, "AI1");
        assert_eq!(readings[0].display_value(), 3.14);
    }
}
