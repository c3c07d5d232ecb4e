use serde_json::Value;

use crate::config::{CardConfig, Mode};
use crate::models::{Departure, EntityState, StateMap};

/// Cancelled-section display cap, regardless of source size.
pub(crate) const CANCELLED_CAP: usize = 20;

/// Result of one filter + selection pass over the departures array.
pub(crate) struct Selection<'a> {
    /// Non-cancelled items chosen for the main section.
    pub items: Vec<&'a Departure>,
    /// Cancelled-section source, already capped.
    pub cancelled: Vec<&'a Departure>,
}

/// Read the departures array off the entity. A missing or non-array
/// attribute is an empty list, not an error; entries that cannot be decoded
/// are skipped.
pub(crate) fn departures(entity: &EntityState, attribute: &str) -> Vec<Departure> {
    let Some(Value::Array(items)) = entity.attributes.get(attribute) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(departure) => Some(departure),
            Err(error) => {
                tracing::warn!("skipping malformed departure entry: {error}");
                None
            }
        })
        .collect()
}

pub(crate) fn select<'a>(
    config: &CardConfig,
    states: &StateMap,
    all: &'a [Departure],
) -> Selection<'a> {
    let needle = config.contains_needle();
    let number_filter = train_number_filter(config, states);

    let filtered: Vec<&Departure> = all
        .iter()
        .filter(|departure| {
            needle
                .as_deref()
                .is_none_or(|needle| matches_contains(departure, needle))
        })
        .filter(|departure| {
            number_filter.is_none_or(|number| matches_train_number(departure, number))
        })
        .collect();

    let not_cancelled: Vec<&Departure> = filtered
        .iter()
        .copied()
        .filter(|departure| !departure.is_cancelled())
        .collect();
    let cancelled_filtered: Vec<&Departure> = filtered
        .iter()
        .copied()
        .filter(|departure| departure.is_cancelled())
        .collect();
    // Tracked without the filters, for include_cancelled_in_filter: false.
    let cancelled_all: Vec<&Departure> = all
        .iter()
        .filter(|departure| departure.is_cancelled())
        .collect();

    let items = match config.mode {
        Mode::Selected => {
            let state = config
                .index_entity
                .as_deref()
                .map(|id| states.get(id).map(|entity| entity.state.as_str()).unwrap_or(""))
                .unwrap_or("0");
            let index = parse_int_prefix(state).filter(|index| *index >= 0).unwrap_or(0);
            match not_cancelled.get(index as usize) {
                Some(departure) => vec![*departure],
                None => Vec::new(),
            }
        }
        Mode::List => not_cancelled
            .into_iter()
            .take(config.effective_count())
            .collect(),
    };

    let source = if config.include_cancelled_in_filter {
        cancelled_filtered
    } else {
        cancelled_all
    };
    let cancelled = source.into_iter().take(CANCELLED_CAP).collect();

    Selection { items, cancelled }
}

fn matches_contains(departure: &Departure, needle: &str) -> bool {
    let destination = departure.destination.as_deref().unwrap_or("").to_lowercase();
    destination.contains(needle) || departure.route_display().to_lowercase().contains(needle)
}

/// Active train-number filter, resolved from the helper entity's state.
/// A parse failure or a negative value means "no filter".
fn train_number_filter(config: &CardConfig, states: &StateMap) -> Option<i64> {
    let entity_id = config.train_number_filter_entity.as_deref()?;
    let state = states.get(entity_id)?.state.as_str();
    parse_int_prefix(state).filter(|number| *number >= 0)
}

fn matches_train_number(departure: &Departure, number: i64) -> bool {
    departure
        .train_number
        .as_deref()
        .and_then(|raw| parse_int_prefix(raw.trim()))
        .is_some_and(|train_number| train_number == number)
}

/// Leading-integer parse: optional sign, then the longest digit prefix.
/// Handles helper states like "3.0" (→ 3) and "024524" (→ 24524).
pub(crate) fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|value| sign * value)
}
