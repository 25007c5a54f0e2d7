//! Command reconciliation.
//!
//! Converges the commands registered with the platform to the local
//! [`CommandRegistry`]. The API has no update call, so a pass deletes every
//! remote command in every relevant scope and then recreates the desired
//! ones. Nothing is cached between passes.

use crate::client::CommandApi;
use crate::error::{SyncError, SyncPhase};
use crate::registry::CommandRegistry;
use crate::Scope;
use std::collections::HashSet;
use tracing::{info, warn};

/// A remote command scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UnregisterTarget {
    scope: Scope,
    command_id: String,
    name: String,
}

/// Reconciles remote commands against a registry.
#[derive(Debug)]
pub struct Syncer<A> {
    api: A,
}

impl<A: CommandApi> Syncer<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Run one reconciliation pass.
    ///
    /// Sweeps the global scope, `extra_guild_ids`, and every scope referenced
    /// by `desired`. Never stops early: every failed list, delete and create
    /// is returned, in that order.
    pub async fn sync(&self, desired: &CommandRegistry, extra_guild_ids: &[String]) -> Vec<SyncError> {
        let scopes = collect_scopes(desired, extra_guild_ids);

        let (targets, mut errors) = self.collect_unregister_targets(&scopes).await;
        errors.extend(self.unregister(&targets).await);
        errors.extend(self.register(desired).await);

        if errors.is_empty() {
            info!(target: "slashhook::sync", "Sync complete: {} scopes, {} commands", scopes.len(), desired.len());
        } else {
            warn!(target: "slashhook::sync", "Sync finished with {} errors", errors.len());
        }
        errors
    }

    async fn collect_unregister_targets(
        &self,
        scopes: &HashSet<Scope>,
    ) -> (Vec<UnregisterTarget>, Vec<SyncError>) {
        info!(target: "slashhook::sync", "Collecting outdated commands...");
        let mut targets = Vec::new();
        let mut errors = Vec::new();

        for scope in scopes {
            match self.api.list(scope).await {
                Ok(commands) => {
                    info!(target: "slashhook::sync", "Scope {}: {} registered commands", scope, commands.len());
                    targets.extend(commands.into_iter().map(|command| UnregisterTarget {
                        scope: scope.clone(),
                        command_id: command.id,
                        name: command.name,
                    }));
                }
                Err(source) => {
                    warn!(target: "slashhook::sync", "Scope {}: list failed: {}", scope, source);
                    errors.push(SyncError {
                        phase: SyncPhase::List,
                        scope: scope.clone(),
                        command: None,
                        source,
                    });
                }
            }
        }

        (targets, errors)
    }

    async fn unregister(&self, targets: &[UnregisterTarget]) -> Vec<SyncError> {
        info!(target: "slashhook::sync", "Unregistering {} outdated commands...", targets.len());
        let mut errors = Vec::new();

        for target in targets {
            match self.api.delete(&target.scope, &target.command_id).await {
                Ok(()) => {
                    info!(target: "slashhook::sync", "Scope {}: unregistered /{}", target.scope, target.name);
                }
                Err(source) => {
                    warn!(target: "slashhook::sync", "Scope {}: unregister /{} failed: {}", target.scope, target.name, source);
                    errors.push(SyncError {
                        phase: SyncPhase::Delete,
                        scope: target.scope.clone(),
                        command: Some(target.name.clone()),
                        source,
                    });
                }
            }
        }

        errors
    }

    async fn register(&self, desired: &CommandRegistry) -> Vec<SyncError> {
        info!(target: "slashhook::sync", "Registering {} commands...", desired.len());
        let mut errors = Vec::new();

        for command in desired.iter() {
            for scope in &command.scopes {
                match self.api.create(scope, &command.command).await {
                    Ok(()) => {
                        info!(target: "slashhook::sync", "Scope {}: registered /{}", scope, command.name);
                    }
                    Err(source) => {
                        warn!(target: "slashhook::sync", "Scope {}: register /{} failed: {}", scope, command.name, source);
                        errors.push(SyncError {
                            phase: SyncPhase::Create,
                            scope: scope.clone(),
                            command: Some(command.name.clone()),
                            source,
                        });
                    }
                }
            }
        }

        errors
    }
}

/// Global, plus the non-blank extra guilds, plus every scope a desired
/// command uses.
fn collect_scopes(desired: &CommandRegistry, extra_guild_ids: &[String]) -> HashSet<Scope> {
    let mut scopes = HashSet::from([Scope::Global]);
    scopes.extend(
        extra_guild_ids
            .iter()
            .filter(|id| !id.trim().is_empty())
            .map(|id| Scope::Guild(id.clone())),
    );
    scopes.extend(desired.scopes());
    scopes
}
