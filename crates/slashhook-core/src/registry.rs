//! Registered slash commands and their handlers.
//!
//! The registry is built once at startup and shared read-only between the
//! dispatcher (which looks handlers up by name) and the syncer (which treats
//! it as the desired remote state).

use crate::error::RegistryError;
use crate::Scope;
use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use slashhook_types::{ApplicationCommand, InteractionRequest, InteractionResponse};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

static COMMAND_NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]{1,32}$").unwrap());

/// What a handler produces. `Ok(None)` is treated by the dispatcher as a
/// missing response, not as success.
pub type HandlerResult = anyhow::Result<Option<InteractionResponse>>;

type AsyncHandlerFn = Arc<dyn Fn(InteractionRequest) -> BoxFuture<'static, HandlerResult> + Send + Sync>;
type BlockingHandlerFn = Arc<dyn Fn(InteractionRequest) -> HandlerResult + Send + Sync>;

/// The work done when a user invokes a command.
#[derive(Clone)]
pub enum CommandHandler {
    /// Runs as a task on the async runtime.
    Async(AsyncHandlerFn),
    /// Runs on the blocking thread pool.
    Blocking(BlockingHandlerFn),
}

impl CommandHandler {
    pub fn from_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(InteractionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        CommandHandler::Async(Arc::new(move |request| handler(request).boxed()))
    }

    pub fn from_blocking<F>(handler: F) -> Self
    where
        F: Fn(InteractionRequest) -> HandlerResult + Send + Sync + 'static,
    {
        CommandHandler::Blocking(Arc::new(handler))
    }

    /// Start the handler on its own task. Dropping the returned handle
    /// detaches the task; it is never aborted.
    pub(crate) fn spawn(&self, request: InteractionRequest) -> JoinHandle<HandlerResult> {
        match self {
            CommandHandler::Async(handler) => tokio::spawn(handler(request)),
            CommandHandler::Blocking(handler) => {
                let handler = Arc::clone(handler);
                tokio::task::spawn_blocking(move || handler(request))
            }
        }
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandHandler::Async(_) => f.write_str("CommandHandler::Async"),
            CommandHandler::Blocking(_) => f.write_str("CommandHandler::Blocking"),
        }
    }
}

/// A command definition together with its handler and the scopes it is
/// registered in.
#[derive(Debug, Clone)]
pub struct SlashCommand {
    /// Lowercased command name, the registry key.
    pub name: String,
    /// Definition sent to the platform on registration.
    pub command: ApplicationCommand,
    pub handler: CommandHandler,
    pub scopes: BTreeSet<Scope>,
}

impl SlashCommand {
    /// Create a command registered to `guild_ids`, plus the global scope when
    /// `global` is set. Blank guild ids are skipped.
    pub fn new<I, S>(
        mut command: ApplicationCommand,
        handler: CommandHandler,
        global: bool,
        guild_ids: I,
    ) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = command.name.to_lowercase();
        if !COMMAND_NAME_REGEX.is_match(&name) {
            return Err(RegistryError::InvalidName(command.name));
        }
        command.name = name.clone();

        let mut scopes: BTreeSet<Scope> = guild_ids
            .into_iter()
            .map(Into::<String>::into)
            .filter(|id| !id.trim().is_empty())
            .map(Scope::Guild)
            .collect();
        if global {
            scopes.insert(Scope::Global);
        }

        Ok(Self {
            name,
            command,
            handler,
            scopes,
        })
    }
}

/// Commands keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, SlashCommand>,
}

impl CommandRegistry {
    /// Build a registry. A later command with the same name replaces an
    /// earlier one.
    pub fn new(commands: impl IntoIterator<Item = SlashCommand>) -> Self {
        let mut map = HashMap::new();
        for command in commands {
            if let Some(previous) = map.insert(command.name.clone(), command) {
                tracing::warn!(target: "slashhook::registry", "Command /{} registered twice; keeping the last", previous.name);
            }
        }
        Self { commands: map }
    }

    /// Look a command up by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&SlashCommand> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlashCommand> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every scope referenced by any command.
    pub fn scopes(&self) -> BTreeSet<Scope> {
        self.commands
            .values()
            .flat_map(|command| command.scopes.iter().cloned())
            .collect()
    }
}

impl FromIterator<SlashCommand> for CommandRegistry {
    fn from_iter<T: IntoIterator<Item = SlashCommand>>(iter: T) -> Self {
        Self::new(iter)
    }
}
