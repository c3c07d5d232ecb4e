use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::CardError;

/// Fixed type discriminator carried by every canonical configuration.
pub const CARD_TYPE: &str = "custom:transit-messages-card";

pub(crate) const DEFAULT_COUNT: usize = 5;

/// Which departures the card shows: the first N, or a single externally
/// selected one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    List,
    Selected,
}

/// Canonical card configuration: user fields overlaid on the defaults.
///
/// Replaced wholesale on every configuration update and immutable within a
/// render pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(rename = "type", default = "default_card_type")]
    pub card_type: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub entity: String,
    #[serde(default = "default_departures_attribute")]
    pub departures_attribute: String,
    #[serde(default, deserialize_with = "de_mode")]
    pub mode: Mode,
    #[serde(default = "default_count", deserialize_with = "de_count")]
    pub count: f64,
    #[serde(default)]
    pub index_entity: Option<String>,
    #[serde(default)]
    pub train_number_filter_entity: Option<String>,
    #[serde(default = "default_true")]
    pub show_qos: bool,
    #[serde(default = "default_true")]
    pub show_platform: bool,
    #[serde(default)]
    pub show_arrival: bool,
    #[serde(default)]
    pub compact: bool,
    #[serde(default)]
    pub hide_when_empty: bool,
    #[serde(default = "default_true")]
    pub show_cancelled_section: bool,
    #[serde(default = "default_true")]
    pub include_cancelled_in_filter: bool,
    #[serde(default)]
    pub contains: Option<String>,
}

impl CardConfig {
    /// Normalize a raw configuration record. `entity` is mandatory; all
    /// other fields fall back to their defaults. Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self, CardError> {
        let mut config: CardConfig = serde_json::from_value(value)?;
        if config.entity.is_empty() {
            return Err(CardError::MissingEntity);
        }
        config.card_type = CARD_TYPE.to_string();
        Ok(config)
    }

    /// Number of items shown in list mode; invalid values fall back to 5.
    pub fn effective_count(&self) -> usize {
        if self.count.is_finite() && self.count >= 0.0 {
            self.count as usize
        } else {
            DEFAULT_COUNT
        }
    }

    /// Lower-cased substring needle, none when unset or blank.
    pub(crate) fn contains_needle(&self) -> Option<String> {
        self.contains
            .as_deref()
            .map(|needle| needle.trim().to_lowercase())
            .filter(|needle| !needle.is_empty())
    }

    /// Trimmed filter string as the user typed it, for the title suffix.
    pub(crate) fn contains_display(&self) -> Option<&str> {
        self.contains
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
    }
}

fn default_card_type() -> String {
    CARD_TYPE.to_string()
}

fn default_title() -> String {
    "Abfahrten".to_string()
}

fn default_departures_attribute() -> String {
    "next_departures".to_string()
}

fn default_count() -> f64 {
    DEFAULT_COUNT as f64
}

fn default_true() -> bool {
    true
}

// Only the literal "selected" switches modes; anything else reads as a list.
fn de_mode<'de, D>(deserializer: D) -> Result<Mode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(mode)) if mode == "selected" => Mode::Selected,
        _ => Mode::List,
    })
}

fn de_count<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|count| count.is_finite())
        .unwrap_or(DEFAULT_COUNT as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let config = CardConfig::from_value(json!({"entity": "sensor.hbf_departures"})).unwrap();

        assert_eq!(config.card_type, CARD_TYPE);
        assert_eq!(config.title, "Abfahrten");
        assert_eq!(config.departures_attribute, "next_departures");
        assert_eq!(config.mode, Mode::List);
        assert_eq!(config.effective_count(), 5);
        assert_eq!(config.index_entity, None);
        assert_eq!(config.train_number_filter_entity, None);
        assert!(config.show_qos);
        assert!(config.show_platform);
        assert!(!config.show_arrival);
        assert!(!config.compact);
        assert!(!config.hide_when_empty);
        assert!(config.show_cancelled_section);
        assert!(config.include_cancelled_in_filter);
        assert_eq!(config.contains, None);
    }

    #[test]
    fn test_missing_entity_is_rejected() {
        let error = CardConfig::from_value(json!({"title": "Abfahrten"})).unwrap_err();
        assert!(matches!(error, CardError::MissingEntity));

        let error = CardConfig::from_value(json!({"entity": ""})).unwrap_err();
        assert!(matches!(error, CardError::MissingEntity));
    }

    #[test]
    fn test_structurally_invalid_config_is_rejected() {
        let error = CardConfig::from_value(json!("not an object")).unwrap_err();
        assert!(matches!(error, CardError::InvalidConfig(_)));

        let error =
            CardConfig::from_value(json!({"entity": "sensor.x", "show_qos": "yes"})).unwrap_err();
        assert!(matches!(error, CardError::InvalidConfig(_)));
    }

    #[test]
    fn test_type_discriminator_is_forced() {
        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "type": "custom:other-card"}))
                .unwrap();
        assert_eq!(config.card_type, CARD_TYPE);
    }

    #[test]
    fn test_unknown_mode_behaves_as_list() {
        let config = CardConfig::from_value(json!({"entity": "sensor.x", "mode": "grid"})).unwrap();
        assert_eq!(config.mode, Mode::List);

        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "mode": "selected"})).unwrap();
        assert_eq!(config.mode, Mode::Selected);
    }

    #[test]
    fn test_invalid_count_falls_back() {
        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "count": "many"})).unwrap();
        assert_eq!(config.effective_count(), 5);

        let config = CardConfig::from_value(json!({"entity": "sensor.x", "count": -3})).unwrap();
        assert_eq!(config.effective_count(), 5);

        let config = CardConfig::from_value(json!({"entity": "sensor.x", "count": 2})).unwrap();
        assert_eq!(config.effective_count(), 2);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "theme": "dark"})).unwrap();
        assert_eq!(config.entity, "sensor.x");
    }

    #[test]
    fn test_contains_needle_trims_and_lowercases() {
        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "contains": "  Darmstadt  "}))
                .unwrap();
        assert_eq!(config.contains_needle().as_deref(), Some("darmstadt"));
        assert_eq!(config.contains_display(), Some("Darmstadt"));

        let config =
            CardConfig::from_value(json!({"entity": "sensor.x", "contains": "   "})).unwrap();
        assert_eq!(config.contains_needle(), None);
        assert_eq!(config.contains_display(), None);
    }
}
