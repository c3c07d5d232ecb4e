use std::fmt::Write as _;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::Serialize;

use crate::config::CardConfig;
use crate::models::{Departure, StateMap, TimeValue};
use crate::pipeline;

/// Result of one render pass. `html` is the full card fragment; a hidden
/// card carries no content at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub html: String,
    pub visible: bool,
}

// Inlined card styles, relying on the host dashboard's theme variables.
const STYLE: &str = "\
ha-card { padding: 12px 14px; }\n\
.header { font-weight: 600; font-size: 1.1rem; margin-bottom: 8px; }\n\
.section-title { margin: 8px 0 4px 0; font-weight: 600; font-size: 1.0rem; }\n\
.item { margin: 10px 0 14px 0; padding-bottom: 10px; border-bottom: 1px solid var(--divider-color, #e0e0e0); }\n\
.row { display: flex; gap: 10px; flex-wrap: wrap; color: var(--secondary-text-color); font-size: 0.95rem; }\n\
.small { font-size: 0.9rem; }\n\
.muted { color: var(--disabled-text-color); font-style: italic; }\n\
ul { margin: 6px 0 0 18px; padding: 0; }\n\
.pill { background: var(--primary-background-color); border: 1px solid var(--divider-color); border-radius: 8px; padding: 2px 8px; font-size: 0.85rem; }\n\
.pill.red { border-color: #b00020; color: #b00020; }\n\
.pill.amber { border-color: #f9a825; color: #f9a825; }\n\
.pill.green { border-color: #2e7d32; color: #2e7d32; }\n\
.cancelled { border-left: 4px solid #b00020; padding-left: 8px; }";

struct ItemOptions {
    cancelled: bool,
    compact: bool,
    show_platform: bool,
    show_qos: bool,
    show_arrival: bool,
}

/// One full render pass: pure transformation of (config, states) → markup.
pub fn render(config: &CardConfig, states: &StateMap) -> RenderOutput {
    let Some(entity) = states.get(&config.entity) else {
        let body = format!(
            "<div class=\"muted\">Entität '{}' nicht gefunden.</div>",
            escape(&config.entity)
        );
        return RenderOutput {
            html: card_html(&escape(&config.title), &body),
            visible: true,
        };
    };

    let all = pipeline::departures(entity, &config.departures_attribute);
    let selection = pipeline::select(config, states, &all);

    if config.hide_when_empty && selection.items.is_empty() && selection.cancelled.is_empty() {
        return RenderOutput {
            html: String::new(),
            visible: false,
        };
    }

    let mut body = String::new();
    for departure in &selection.items {
        body.push_str(&item_html(
            departure,
            &ItemOptions {
                cancelled: false,
                compact: config.compact,
                show_platform: config.show_platform,
                show_qos: config.show_qos,
                show_arrival: config.show_arrival,
            },
        ));
    }

    if config.show_cancelled_section && !selection.cancelled.is_empty() {
        body.push_str("<div class=\"section-title\">Stornierte Verbindungen</div>");
        for departure in &selection.cancelled {
            body.push_str(&item_html(
                departure,
                &ItemOptions {
                    cancelled: true,
                    compact: true,
                    show_platform: config.show_platform,
                    show_qos: false,
                    show_arrival: config.show_arrival,
                },
            ));
        }
    }

    if selection.items.is_empty() && selection.cancelled.is_empty() {
        body.push_str("<div class=\"muted\">No data</div>");
    }

    RenderOutput {
        html: card_html(&composed_title(config), &body),
        visible: true,
    }
}

fn card_html(header: &str, body: &str) -> String {
    format!(
        "<style>{STYLE}</style><ha-card><div class=\"header\">{header}</div>{body}</ha-card>"
    )
}

/// Escaped title, suffixed with the active filter in parentheses.
fn composed_title(config: &CardConfig) -> String {
    match config.contains_display() {
        Some(filter) => format!("{} ({})", escape(&config.title), escape(filter)),
        None => escape(&config.title),
    }
}

fn item_html(departure: &Departure, opts: &ItemOptions) -> String {
    let mut pills: Vec<String> = vec![
        format!(
            "<span class=\"pill\">{}</span>",
            escape(departure.train.as_deref().unwrap_or(""))
        ),
        format!(
            "→ <strong>{}</strong>",
            escape(departure.destination.as_deref().unwrap_or(""))
        ),
    ];
    let platform = departure.platform_display();
    if opts.show_platform && !platform.is_empty() {
        pills.push(format!("<span class=\"pill\">Gleis {}</span>", escape(platform)));
    }
    if let Some(badge) = delay_badge(departure.delay_minutes()) {
        pills.push(badge);
    }
    if opts.cancelled {
        pills.push("<span class=\"pill red\">Storniert</span>".to_string());
    }

    let mut item = String::new();
    let class = if opts.cancelled { " cancelled" } else { "" };
    let _ = write!(item, "<div class=\"item{class}\">");

    if let Some(train_number) = departure.train_number.as_deref().filter(|n| !n.is_empty()) {
        let _ = write!(
            item,
            "<div class=\"small muted\">#<strong>{}</strong></div>",
            escape(train_number)
        );
    }

    let _ = write!(item, "<div class=\"row\">{}</div>", pills.join(" "));

    let _ = write!(
        item,
        "<div class=\"small\" style=\"margin-top:4px;\">Geplante Abfahrt: <strong>{}</strong> · Aktuelle Abfahrt: <strong>{}</strong>",
        escape(departure.scheduled_departure.as_deref().unwrap_or("")),
        escape(departure.departure_current.as_deref().unwrap_or("—")),
    );
    if opts.show_arrival {
        let _ = write!(
            item,
            "<br/>Geplante Ankunft: <strong>{}</strong> · Aktuelle Ankunft: <strong>{}</strong>",
            escape(departure.scheduled_arrival.as_deref().unwrap_or("")),
            escape(departure.arrival_current.as_deref().unwrap_or("—")),
        );
    }
    item.push_str("</div>");

    if !opts.compact && !opts.cancelled {
        item.push_str("<div style=\"margin-top:8px;\">");

        let delays = departure.delay_messages();
        if delays.is_empty() {
            item.push_str("<div class=\"muted small\">(Keine Verspätungsmeldungen)</div>");
        } else {
            item.push_str("<div><strong>Verspätungs‑Meldungen:</strong></div><ul>");
            for entry in delays {
                let _ = write!(
                    item,
                    "<li>{} — {}</li>",
                    fmt_time(entry.timestamp.as_ref()),
                    escape(entry.text())
                );
            }
            item.push_str("</ul>");
        }

        let qos = departure.qos_messages();
        if opts.show_qos && !qos.is_empty() {
            item.push_str(
                "<div style=\"margin-top:6px;\"><strong>Qualitätsmeldungen:</strong></div><ul>",
            );
            for entry in qos {
                let _ = write!(
                    item,
                    "<li>{} {}</li>",
                    fmt_time(entry.timestamp.as_ref()),
                    escape(entry.text())
                );
            }
            item.push_str("</ul>");
        }

        item.push_str("</div>");
    }

    item.push_str("</div>");
    item
}

/// Delay badge with fixed severity thresholds at 5 and 10 minutes.
fn delay_badge(delay: f64) -> Option<String> {
    if delay <= 0.0 {
        return None;
    }
    let color = if delay >= 10.0 {
        "red"
    } else if delay >= 5.0 {
        "amber"
    } else {
        "green"
    };
    Some(format!(
        "<span class=\"pill {color}\">+{} min</span>",
        fmt_minutes(delay)
    ))
}

fn fmt_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as i64)
    } else {
        format!("{minutes}")
    }
}

/// Localized hour:minute. Absent, zero, empty or unparseable timestamps
/// render as the empty string.
pub(crate) fn fmt_time(timestamp: Option<&TimeValue>) -> String {
    let parsed: Option<DateTime<Local>> = match timestamp {
        None => None,
        Some(TimeValue::Epoch(millis)) if *millis == 0.0 => None,
        Some(TimeValue::Epoch(millis)) => DateTime::from_timestamp_millis(*millis as i64)
            .map(|datetime| datetime.with_timezone(&Local)),
        Some(TimeValue::Text(text)) => parse_time_text(text),
    };
    parsed
        .map(|datetime| datetime.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn parse_time_text(text: &str) -> Option<DateTime<Local>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
}

/// HTML-escape all free text before insertion; applied at every text
/// insertion point without exception.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
