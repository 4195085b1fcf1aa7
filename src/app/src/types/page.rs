use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::common::Encoding;
use crate::types::form::{
    Binding, ConfigSnapshot, ControlKind, EnablementRule, FieldBindingSet, FieldValue, ModeEntry,
};

/// Number of analog and digital inputs on the controller
pub const INPUT_COUNT: u8 = 4;

const ROOT_ENDPOINT: &str = "/";

/// Configuration pages served by the device
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConfigPage {
    #[default]
    Home,
    Network,
    Erp,
    AnalogInput(u8),
    DigitalInput(u8),
    SystemSettings,
}

impl fmt::Display for ConfigPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "Home"),
            Self::Network => write!(f, "Network settings"),
            Self::Erp => write!(f, "ERP settings"),
            Self::AnalogInput(n) => write!(f, "Analog input {n}"),
            Self::DigitalInput(n) => write!(f, "Digital input {n}"),
            Self::SystemSettings => write!(f, "System settings"),
        }
    }
}

impl FromStr for ConfigPage {
    type Err = String;

    /// Accepts `home`, `network`, `erp`, `analog<n>`, `digital<n>` and `settings`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let input = |prefix: &str| s.strip_prefix(prefix).and_then(|n| n.parse::<u8>().ok());

        let page = match s.as_str() {
            "home" => Self::Home,
            "network" => Self::Network,
            "erp" => Self::Erp,
            "settings" | "system" => Self::SystemSettings,
            _ => {
                if let Some(n) = input("analog") {
                    Self::AnalogInput(n)
                } else if let Some(n) = input("digital") {
                    Self::DigitalInput(n)
                } else {
                    return Err(format!("unknown page: {s}"));
                }
            }
        };
        page.validate()?;
        Ok(page)
    }
}

impl ConfigPage {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::AnalogInput(n) | Self::DigitalInput(n) if !(1..=INPUT_COUNT).contains(n) => {
                Err(format!("input must be between 1 and {INPUT_COUNT}, got {n}"))
            }
            _ => Ok(()),
        }
    }

    pub fn load_endpoint(&self) -> String {
        match self {
            Self::Home => "/homeLoad".to_string(),
            Self::Network | Self::Erp => "/networkLoad".to_string(),
            Self::AnalogInput(n) => format!("/analogLoad?input={n}"),
            Self::DigitalInput(n) => format!("/digitalLoad?input={n}"),
            Self::SystemSettings => "/settingsLoad".to_string(),
        }
    }

    /// `None` for pages that only display device state
    pub fn save_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::Home => None,
            _ => Some(ROOT_ENDPOINT),
        }
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::Urlencoded
    }

    /// Shape the raw device document into the snapshot this page edits.
    ///
    /// The device shares `/networkLoad` between two forms and routes submits on
    /// the presence of their leading fields, so those pages keep only their own
    /// fields. Input pages gain the pin identifier the device routes on.
    pub fn prepare_snapshot(&self, mut raw: ConfigSnapshot) -> ConfigSnapshot {
        let bindings = self.bindings();
        match self {
            Self::Network | Self::Erp | Self::Home => {
                raw.retain(|field| bindings.is_bound(field));
            }
            Self::AnalogInput(n) => {
                raw.insert("inputPin", FieldValue::text(format!("AI{n}")));
            }
            Self::DigitalInput(n) => {
                if let Some(inverted) = raw.remove("invDI") {
                    if !raw.contains("inputInversion") {
                        raw.insert("inputInversion", FieldValue::Flag(inverted.is_on()));
                    }
                }
                raw.insert("inputPin", FieldValue::text(format!("DI{n}")));
            }
            Self::SystemSettings => {}
        }
        raw
    }

    pub fn bindings(&self) -> FieldBindingSet {
        match self {
            Self::Home => home_bindings(),
            Self::Network => network_bindings(),
            Self::Erp => erp_bindings(),
            Self::AnalogInput(n) => analog_bindings(*n),
            Self::DigitalInput(n) => digital_bindings(*n),
            Self::SystemSettings => settings_bindings(),
        }
    }
}

fn pin_binding(pin: String) -> Binding {
    Binding::new("inputPin", ControlKind::ReadOnly, FieldValue::Text(pin))
}

fn home_bindings() -> FieldBindingSet {
    let fields = [
        "networkMode",
        "ssid",
        "ipAddress",
        "macAddress",
        "sendInterval",
        "protocolMode",
        "endpoint",
        "connStatus",
        "jobNumber",
    ];
    FieldBindingSet::new(fields.into_iter().map(Binding::read_only).collect(), vec![])
}

fn network_bindings() -> FieldBindingSet {
    let bindings = vec![
        Binding::select("networkMode", &["Ethernet", "WiFi"]),
        Binding::text("ssid"),
        Binding::password("password"),
        Binding::text("apSsid"),
        Binding::password("apPassword"),
        Binding::select("dhcpMode", &["DHCP", "Static"]),
        Binding::ip_address("ipAddress"),
        Binding::ip_address("subnet"),
        Binding::ip_address("ipGateway"),
        Binding::ip_address("ipDNS"),
        Binding::checkbox("loggerMode"),
        Binding::text("sendTrig").with_default(FieldValue::text("Time/interval")),
        Binding::number("sendInterval", 1),
        Binding::select("protocolMode", &["HTTP", "MQTT"]),
        Binding::text("endpoint"),
        Binding::number("port", 80),
        Binding::text("pubTopic"),
        Binding::text("subTopic"),
        Binding::text("mqttUsername"),
        Binding::password("mqttPass"),
        Binding::checkbox("modbusMode"),
        Binding::select(
            "protocolMode2",
            &["Modbus RTU", "Modbus TCP/IP", "Modbus RTU + TCP/IP"],
        ),
        Binding::number("modbusSlaveID", 1).with_range(1, 247),
        Binding::number("modbusPort", 502).with_range(1, 65535),
    ];

    let rules = vec![
        EnablementRule::toggle(
            "loggerMode",
            &[
                "protocolMode",
                "endpoint",
                "port",
                "pubTopic",
                "subTopic",
                "mqttUsername",
                "mqttPass",
                "sendInterval",
            ],
        ),
        EnablementRule::toggle("modbusMode", &["protocolMode2", "modbusSlaveID", "modbusPort"]),
        EnablementRule::choice(
            "networkMode",
            vec![
                ModeEntry::new("Ethernet").disabling(&["ssid", "password"]),
                ModeEntry::new("WiFi"),
            ],
        ),
        EnablementRule::choice(
            "dhcpMode",
            vec![
                ModeEntry::new("DHCP").disabling(&["ipAddress", "subnet", "ipGateway", "ipDNS"]),
                ModeEntry::new("Static"),
            ],
        ),
        EnablementRule::choice(
            "protocolMode",
            vec![
                ModeEntry::new("HTTP").disabling(&["pubTopic", "subTopic"]),
                ModeEntry::new("MQTT"),
            ],
        ),
        EnablementRule::choice(
            "sendTrig",
            vec![
                ModeEntry::new("Rising Edge*").disabling(&["sendInterval"]),
                ModeEntry::new("Time/interval"),
            ],
        ),
    ];

    FieldBindingSet::new(bindings, rules)
}

fn erp_bindings() -> FieldBindingSet {
    FieldBindingSet::new(
        vec![
            Binding::text("erpUrl"),
            Binding::text("erpUsername"),
            Binding::password("erpPassword"),
        ],
        vec![],
    )
}

fn analog_bindings(n: u8) -> FieldBindingSet {
    let bindings = vec![
        pin_binding(format!("AI{n}")),
        Binding::text("name"),
        Binding::text("inputType").with_default(FieldValue::text("4-20 mA")),
        Binding::checkbox("filter"),
        Binding::number("filterPeriod", 0),
        Binding::checkbox("scaling"),
        Binding::number("lowLimit", 0),
        Binding::number("highLimit", 0),
        Binding::checkbox("calibration"),
        Binding::number("mValue", 1),
        Binding::number("cValue", 0),
    ];

    let rules = vec![
        EnablementRule::toggle("filter", &["filterPeriod"]),
        EnablementRule::toggle("scaling", &["lowLimit", "highLimit"]),
        EnablementRule::toggle("calibration", &["mValue", "cValue"]),
    ];

    FieldBindingSet::new(bindings, rules)
}

fn digital_bindings(n: u8) -> FieldBindingSet {
    let bindings = vec![
        pin_binding(format!("DI{n}")),
        Binding::text("nameDI"),
        Binding::select(
            "taskMode",
            &["Normal", "Cycle Time", "Counting", "Run Time", "Pulse Mode"],
        ),
        Binding::checkbox("inputInversion").in_group("inversion"),
        Binding::select("inputState", &["High", "Low"]).in_group("state"),
        Binding::number("intervalTime", 0).in_group("interval"),
        Binding::number("conversionFactor", 1).in_group("conversion"),
    ];

    let rules = vec![EnablementRule::choice(
        "taskMode",
        vec![
            ModeEntry::new("Normal").showing(&["inversion", "state"]),
            ModeEntry::new("Cycle Time").disabling(&["resetValue"]),
            ModeEntry::new("Counting"),
            ModeEntry::new("Run Time").showing(&["state"]),
            ModeEntry::new("Pulse Mode").showing(&["interval", "conversion"]),
        ],
    )];

    FieldBindingSet::new(bindings, rules)
}

fn settings_bindings() -> FieldBindingSet {
    FieldBindingSet::new(
        vec![
            Binding::text("username"),
            Binding::password("password"),
            Binding::number("sdInterval", 5).with_range(1, 1440),
            Binding::text("datetime"),
        ],
        vec![],
    )
}

/// Control on the digital input page that resets the counter or timer
pub const RESET_CONTROL: &str = "resetValue";

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(json: &str) -> ConfigSnapshot {
        ConfigSnapshot::from_json_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn endpoints_select_sub_resource() {
        assert_eq!(ConfigPage::AnalogInput(2).load_endpoint(), "/analogLoad?input=2");
        assert_eq!(ConfigPage::DigitalInput(4).load_endpoint(), "/digitalLoad?input=4");
        assert_eq!(ConfigPage::Erp.load_endpoint(), "/networkLoad");
        assert_eq!(ConfigPage::Home.save_endpoint(), None);
        assert_eq!(ConfigPage::SystemSettings.save_endpoint(), Some("/"));
    }

    #[test]
    fn page_names_parse() {
        assert_eq!("analog3".parse::<ConfigPage>(), Ok(ConfigPage::AnalogInput(3)));
        assert_eq!("Digital1".parse::<ConfigPage>(), Ok(ConfigPage::DigitalInput(1)));
        assert_eq!("settings".parse::<ConfigPage>(), Ok(ConfigPage::SystemSettings));
        assert!("analog5".parse::<ConfigPage>().is_err());
        assert!("digital0".parse::<ConfigPage>().is_err());
        assert!("modbus".parse::<ConfigPage>().is_err());
    }

    #[test]
    fn digital_snapshot_maps_inversion_and_pin() {
        let page = ConfigPage::DigitalInput(2);

        let prepared =
            page.prepare_snapshot(snapshot(r#"{"nameDI":"Door","invDI":1,"taskMode":"Counting"}"#));

        assert_eq!(prepared.get("inputInversion"), Some(&FieldValue::Flag(true)));
        assert_eq!(prepared.get("inputPin"), Some(&FieldValue::text("DI2")));
        assert!(!prepared.contains("invDI"));
    }

    #[test]
    fn digital_task_mode_table() {
        let page = ConfigPage::DigitalInput(1);
        let bindings = page.bindings();
        let mut form = bindings.populate(&page.prepare_snapshot(ConfigSnapshot::new()));

        assert_eq!(form.value("taskMode"), Some(&FieldValue::text("Normal")));
        assert_eq!(form.visible_groups, ["inversion", "state"].map(String::from).into());

        let expected: [(&str, &[&str], bool); 5] = [
            ("Cycle Time", &[], true),
            ("Counting", &[], false),
            ("Run Time", &["state"], false),
            ("Pulse Mode", &["conversion", "interval"], false),
            ("Normal", &["inversion", "state"], false),
        ];
        for (mode, groups, reset_disabled) in expected {
            bindings
                .edit(&mut form, "taskMode", FieldValue::text(mode))
                .unwrap();
            let visible: Vec<&str> = form.visible_groups.iter().map(String::as_str).collect();
            assert_eq!(visible, groups, "groups for {mode}");
            assert_eq!(form.is_disabled(RESET_CONTROL), reset_disabled, "reset for {mode}");
        }
    }

    #[test]
    fn erp_page_only_submits_erp_fields() {
        let raw = snapshot(r#"{"networkMode":"WiFi","ssid":"lab","erpUrl":"http://erp","erpUsername":"u"}"#);

        let prepared = ConfigPage::Erp.prepare_snapshot(raw);

        assert!(!prepared.contains("networkMode"));
        assert_eq!(prepared.get("erpUrl"), Some(&FieldValue::text("http://erp")));
    }

    #[test]
    fn network_rules_combine_toggle_and_choice() {
        let page = ConfigPage::Network;
        let bindings = page.bindings();
        let raw = snapshot(
            r#"{"networkMode":"Ethernet","dhcpMode":"DHCP","loggerMode":true,
                "sendTrig":"Rising Edge DI1","protocolMode":"MQTT","modbusMode":false}"#,
        );

        let mut form = bindings.populate(&page.prepare_snapshot(raw));

        assert!(form.is_disabled("ssid"));
        assert!(form.is_disabled("ipAddress"));
        assert!(form.is_disabled("sendInterval"));
        assert!(!form.is_disabled("pubTopic"));
        assert!(form.is_disabled("modbusPort"));

        bindings
            .edit(&mut form, "sendTrig", FieldValue::text("Time/interval"))
            .unwrap();
        assert!(!form.is_disabled("sendInterval"));

        bindings
            .edit(&mut form, "loggerMode", FieldValue::Flag(false))
            .unwrap();
        assert!(form.is_disabled("sendInterval"));
    }

    #[test]
    fn home_page_is_read_only() {
        let page = ConfigPage::Home;
        let bindings = page.bindings();
        let mut form = bindings.populate(&page.prepare_snapshot(snapshot(
            r#"{"ssid":"lab","DI":{"value":[1,0,0,0]},"connStatus":"Connected"}"#,
        )));

        assert_eq!(form.value("connStatus"), Some(&FieldValue::text("Connected")));
        assert_eq!(form.value("jobNumber"), Some(&FieldValue::text("-")));
        assert!(bindings
            .edit(&mut form, "ssid", FieldValue::text("x"))
            .is_err());
    }
}
