use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Host-state snapshot supplied by the dashboard: entity id → entity state.
pub type StateMap = HashMap<String, EntityState>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

/// One scheduled connection, as published by the departures sensor.
///
/// Every field may be missing on the wire. The sensor mixes camelCase and
/// snake_case names, hence the explicit renames; polymorphic fields go
/// through lenient deserializers so a sloppy value degrades instead of
/// failing the whole entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Departure {
    pub train: Option<String>,
    #[serde(deserialize_with = "de_stringly")]
    pub train_number: Option<String>,
    pub destination: Option<String>,
    pub scheduled_departure: Option<String>,
    #[serde(rename = "departure_current")]
    pub departure_current: Option<String>,
    pub scheduled_platform: Option<String>,
    pub platform: Option<String>,
    #[serde(deserialize_with = "de_lenient_number")]
    pub delay_departure: Option<f64>,
    pub scheduled_arrival: Option<String>,
    #[serde(rename = "arrival_current")]
    pub arrival_current: Option<String>,
    #[serde(rename = "isCancelled", deserialize_with = "de_cancel_flag")]
    pub cancelled: Option<bool>,
    pub messages: Option<Messages>,
    pub route: Option<Vec<RouteStop>>,
}

impl Departure {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.unwrap_or(false)
    }

    /// Delay in minutes, 0 when absent or unusable.
    pub fn delay_minutes(&self) -> f64 {
        self.delay_departure.unwrap_or(0.0)
    }

    /// Actual platform, falling back to the scheduled one when unset.
    pub fn platform_display(&self) -> &str {
        self.platform
            .as_deref()
            .or(self.scheduled_platform.as_deref())
            .unwrap_or("")
    }

    pub fn delay_messages(&self) -> &[MessageEntry] {
        self.messages
            .as_ref()
            .and_then(|messages| messages.delay.as_deref())
            .unwrap_or(&[])
    }

    pub fn qos_messages(&self) -> &[MessageEntry] {
        self.messages
            .as_ref()
            .and_then(|messages| messages.qos.as_deref())
            .unwrap_or(&[])
    }

    /// Route stop names joined the way the sensor displays them.
    pub fn route_display(&self) -> String {
        self.route
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter_map(|stop| stop.name.as_deref())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub delay: Option<Vec<MessageEntry>>,
    #[serde(default)]
    pub qos: Option<Vec<MessageEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEntry {
    #[serde(default, deserialize_with = "de_timestamp")]
    pub timestamp: Option<TimeValue>,
    #[serde(default, deserialize_with = "de_stringly")]
    pub text: Option<String>,
}

impl MessageEntry {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteStop {
    #[serde(default)]
    pub name: Option<String>,
}

/// Message timestamp: a date string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimeValue {
    Text(String),
    Epoch(f64),
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<Option<TimeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(TimeValue::Text(text)),
        Value::Number(number) => number.as_f64().map(TimeValue::Epoch),
        _ => None,
    }))
}

/// Accept any JSON primitive where the sensor should send a string.
fn de_stringly<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }))
}

/// Cancellation flag: boolean as-is, numeric non-zero means cancelled,
/// anything else means not cancelled.
fn de_cancel_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }))
}

fn de_lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.as_f64()).filter(|v| v.is_finite()))
}
