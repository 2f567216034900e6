// MIT License - Copyright (c) 2021 TJForc
// Device inventory of an installation (the "multizone" device listing)

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::devices::group::MAX_GROUP;
use crate::locale::Locale;

/// Product families used in event codes.
pub mod family {
    pub const CAMERA: i64 = -1;
    pub const CENTRAL_ALT: i64 = 1;
    pub const SENSOR: i64 = 2;
    pub const COMMAND: i64 = 3;
    pub const TRANSMITTER: i64 = 5;
    pub const CENTRAL: i64 = 6;
    pub const ALARM: i64 = 17;
    pub const GENERIC: i64 = 24;
}

/// Product number the wired central reports under families 1 and 6.
pub const WIRED_CENTRAL_NUMBER: i64 = 81;

/// One learnt device. Only the label matters here; every other attribute is
/// kept as-is in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub custom_label: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Devices learnt by the central.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningZone {
    #[serde(default)]
    pub sensors: Vec<Option<Device>>,
    #[serde(default)]
    pub commands: Vec<Option<Device>>,
    #[serde(default)]
    pub alarms: Vec<Option<Device>>,
    #[serde(default)]
    pub transmitters: Vec<Option<Device>>,
    /// Group display names, keyed by the id used in status replies
    #[serde(default, deserialize_with = "indexed_names")]
    pub group_names: BTreeMap<usize, String>,
}

/// Central settings; only presence arming is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsZone {
    /// One flag per group telling whether it is part of presence arming
    #[serde(rename = "groupesMarchePresence", default)]
    pub presence_groups: Value,
}

/// Cached device inventory of the selected installation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInventory {
    #[serde(default)]
    pub central_learning_zone: LearningZone,
    #[serde(default)]
    pub central_settings_zone: SettingsZone,
}

impl DeviceInventory {
    /// Parse the payload of a finished inventory job.
    pub fn from_json_str(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Display name of a device referenced by an event.
    pub fn product_name(&self, locale: &dyn Locale, family_id: i64, number: i64) -> String {
        let t = |key: &str| locale.translate(key, None).unwrap_or_default();

        if (family_id == family::CENTRAL || family_id == family::CENTRAL_ALT)
            && number == WIRED_CENTRAL_NUMBER
        {
            return t("logbook.logMessages.wiredCentral");
        }

        let index = if number == 0 { 0 } else { number - 1 };
        let zone = &self.central_learning_zone;
        match family_id {
            family::CAMERA => format!("{} {}", t("defects.camera.label"), number),
            family::SENSOR => labelled(&zone.sensors, index, || t("defects.sensor.label")),
            family::COMMAND => labelled(&zone.commands, index, || t("defects.command.label")),
            family::CENTRAL => t("defects.central.label"),
            family::ALARM => labelled(&zone.alarms, index, || t("defects.alarm.label")),
            family::TRANSMITTER => {
                labelled(&zone.transmitters, index, || t("defects.transmitter.label"))
            }
            family::GENERIC => t(&format!("logbook.genericLogProduct.{}", family_id)),
            _ => format!("{} [{}]", family_id, number),
        }
    }

    /// Groups flagged for presence arming, ascending.
    ///
    /// A list is read as groups 1..N in order; an object is keyed by the
    /// group number itself.
    pub fn presence_groups(&self) -> Vec<u8> {
        let mut groups: Vec<u8> = match &self.central_settings_zone.presence_groups {
            Value::Array(flags) => flags
                .iter()
                .enumerate()
                .filter(|(_, flag)| truthy(flag))
                .filter_map(|(idx, _)| u8::try_from(idx + 1).ok())
                .collect(),
            Value::Object(flags) => flags
                .iter()
                .filter(|(_, flag)| truthy(flag))
                .filter_map(|(key, _)| key.parse::<u8>().ok())
                .collect(),
            _ => Vec::new(),
        };
        groups.retain(|g| (1..=MAX_GROUP).contains(g));
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// Display names of the given group ids. Unknown ids map to an empty name.
    pub fn group_names(&self, ids: &[u8]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.central_learning_zone
                    .group_names
                    .get(&usize::from(*id))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Custom label of the device at `index`, or the generic label followed by
/// the index.
fn labelled(devices: &[Option<Device>], index: i64, generic: impl Fn() -> String) -> String {
    let custom = usize::try_from(index)
        .ok()
        .and_then(|i| devices.get(i))
        .and_then(Option::as_ref)
        .and_then(|d| d.custom_label.as_deref())
        .filter(|label| !label.is_empty());
    match custom {
        Some(label) => label.to_string(),
        None => format!("{}{}", generic(), index),
    }
}

/// Truthiness of a loosely typed JSON flag.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Accept group names either as a list (indexed from 0) or as an object keyed
/// by number.
fn indexed_names<'de, D>(deserializer: D) -> Result<BTreeMap<usize, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Array(names) => Ok(names
            .into_iter()
            .enumerate()
            .filter_map(|(idx, name)| name.as_str().map(|s| (idx, s.to_string())))
            .collect()),
        Value::Object(names) => names
            .into_iter()
            .filter_map(|(key, name)| name.as_str().map(|s| (key, s.to_string())))
            .map(|(key, name)| {
                key.parse::<usize>()
                    .map(|id| (id, name))
                    .map_err(|_| <D::Error as de::Error>::custom(format!("invalid group id: {key}")))
            })
            .collect(),
        other => Err(<D::Error as de::Error>::custom(format!(
            "groupNames must be a list or an object, got {other}"
        ))),
    }
}
