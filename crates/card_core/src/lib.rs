mod config;
mod models;
mod pipeline;
mod render;

pub use crate::config::{CARD_TYPE, CardConfig, Mode};
pub use crate::models::{
    Departure, EntityState, MessageEntry, Messages, RouteStop, StateMap, TimeValue,
};
pub use crate::render::{RenderOutput, escape, render};

use thiserror::Error;

/// Hard configuration failures. Everything else the pipeline absorbs
/// locally: unknown entities, missing attributes and bad numerics degrade
/// to inline messages or defaults instead of propagating.
#[derive(Error, Debug)]
pub enum CardError {
    #[error("Konfiguration benötigt: 'entity' (z. B. sensor.<station>_departures)")]
    MissingEntity,
    #[error("Ungültige Kartenkonfiguration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
