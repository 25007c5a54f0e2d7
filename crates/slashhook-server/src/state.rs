//! Shared application state.

use crate::commands;
use crate::config::Config;
use slashhook_core::{InteractionDispatcher, RegistryError};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub dispatcher: InteractionDispatcher,
    pub config: Config,
}

impl AppState {
    /// State serving the built-in commands, verified against `public_key`.
    pub fn new(config: Config, public_key: impl Into<String>) -> Result<Self, RegistryError> {
        let registry = commands::builtin_commands(&config.guild_ids)?;
        let dispatcher = InteractionDispatcher::new(Arc::new(registry), public_key)
            .with_max_response_time(config.max_response_time());

        Ok(Self { dispatcher, config })
    }

    /// State around an existing dispatcher.
    pub fn with_dispatcher(config: Config, dispatcher: InteractionDispatcher) -> Self {
        Self { dispatcher, config }
    }
}
