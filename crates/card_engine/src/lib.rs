use card_core::{CardConfig, CardError, RenderOutput, StateMap, render};
use serde_json::Value;

/// Card implementation version, surfaced to the hosting dashboard.
pub const VERSION: &str = "1.0.1";

/// Fixed layout-size hint for the dashboard grid, in rows.
const CARD_SIZE: u32 = 6;

/// Stateful widget facade exposed to the hosting dashboard.
///
/// Holds the two external inputs and the last render output. Every setter
/// recomputes the output from scratch; nothing is patched in place between
/// passes. No custom config-editor UI is advertised.
#[derive(Debug, Default)]
pub struct TransitMessagesCard {
    config: Option<CardConfig>,
    states: Option<StateMap>,
    output: Option<RenderOutput>,
}

impl TransitMessagesCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration wholesale. Rejects records without an
    /// `entity` and leaves the previous configuration untouched on error.
    pub fn set_config(&mut self, value: Value) -> Result<(), CardError> {
        let config = CardConfig::from_value(value)?;
        self.config = Some(config);
        self.rerender();
        Ok(())
    }

    /// Replace the host-state snapshot and re-render. Does nothing visible
    /// until a configuration has been set.
    pub fn set_states(&mut self, states: StateMap) {
        self.states = Some(states);
        self.rerender();
    }

    pub fn config(&self) -> Option<&CardConfig> {
        self.config.as_ref()
    }

    pub fn output(&self) -> Option<&RenderOutput> {
        self.output.as_ref()
    }

    /// Current markup; empty while hidden, none before both inputs exist.
    pub fn html(&self) -> Option<&str> {
        self.output.as_ref().map(|output| output.html.as_str())
    }

    pub fn card_size(&self) -> u32 {
        CARD_SIZE
    }

    fn rerender(&mut self) {
        if let (Some(config), Some(states)) = (&self.config, &self.states) {
            self.output = Some(render(config, states));
        }
    }
}
