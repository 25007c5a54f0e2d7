//! Interaction dispatcher.
//!
//! Turns a signed webhook body into a response:
//! verify -> parse -> classify -> (pong | run handler) -> response.
//! The first failure is terminal and maps to a fixed HTTP status via
//! [`DispatchError::status_code`].
//!
//! Handlers run on their own task and race a deadline measured from when the
//! request was received. When the deadline wins the dispatcher stops waiting
//! and reports [`DispatchError::DeadlineExceeded`]. The handler task is not
//! cancelled: it keeps running in the background and its result is dropped.
//! Handlers that must stop early have to watch the clock themselves.

use crate::error::DispatchError;
use crate::registry::CommandRegistry;
use crate::verify::verify;
use serde::de::DeserializeOwned;
use serde_json::Value;
use slashhook_types::{
    ApplicationCommandOption, ApplicationCommandOptionType, InteractionDataOption,
    InteractionRequest, InteractionResponse, InteractionType, OptionValue,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The platform drops interactions not answered within this window.
pub const MAX_RESPONSE_TIME: Duration = Duration::from_secs(3);

/// Verifies, routes and executes interaction requests.
#[derive(Debug, Clone)]
pub struct InteractionDispatcher {
    registry: Arc<CommandRegistry>,
    public_key: String,
    max_response_time: Duration,
}

impl InteractionDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, public_key: impl Into<String>) -> Self {
        Self {
            registry,
            public_key: public_key.into(),
            max_response_time: MAX_RESPONSE_TIME,
        }
    }

    /// Override the handler deadline.
    pub fn with_max_response_time(mut self, max_response_time: Duration) -> Self {
        self.max_response_time = max_response_time;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Handle one webhook request.
    ///
    /// `signature` and `timestamp` are the raw header values, empty when the
    /// header was missing. `received_at` anchors the handler deadline.
    pub async fn dispatch(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: &str,
        received_at: Instant,
    ) -> Result<InteractionResponse, DispatchError> {
        let deadline = received_at + self.max_response_time;
        let request = self.resolve(raw_body, signature, timestamp)?;
        self.triage(request, deadline).await
    }

    fn resolve(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: &str,
    ) -> Result<InteractionRequest, DispatchError> {
        if !verify(raw_body, signature, timestamp, &self.public_key) {
            return Err(DispatchError::Unauthorized);
        }
        self.parse(raw_body)
    }

    /// Decode the body and, for command interactions, decode option values
    /// against the registered command's schema.
    fn parse(&self, raw_body: &[u8]) -> Result<InteractionRequest, DispatchError> {
        let mut request: InteractionRequest = serde_json::from_slice(raw_body)?;

        if let Some(data) = request.data.as_mut() {
            let command = self
                .registry
                .get(&data.name)
                .ok_or_else(|| DispatchError::NotImplemented(data.name.clone()))?;
            decode_options(&command.command.options, &mut data.options);
        }

        Ok(request)
    }

    async fn triage(
        &self,
        request: InteractionRequest,
        deadline: Instant,
    ) -> Result<InteractionResponse, DispatchError> {
        match request.kind {
            InteractionType::Ping => {
                debug!(target: "slashhook::dispatch", "Ping received");
                Ok(InteractionResponse::pong())
            }
            InteractionType::ApplicationCommand => self.execute(request, deadline).await,
            InteractionType::Unknown(kind) => Err(DispatchError::InvalidInteractionType(kind)),
        }
    }

    async fn execute(
        &self,
        request: InteractionRequest,
        deadline: Instant,
    ) -> Result<InteractionResponse, DispatchError> {
        let name = request
            .command_name()
            .ok_or(DispatchError::MissingCommandData)?
            .to_string();
        let command = self
            .registry
            .get(&name)
            .ok_or_else(|| DispatchError::NotImplemented(name.clone()))?;

        info!(target: "slashhook::dispatch", "Executing /{} (interaction {})", command.name, request.id);
        let task = command.handler.spawn(request);

        let outcome =
            tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), task).await;
        match outcome {
            Err(_) => {
                warn!(
                    target: "slashhook::dispatch",
                    "/{} did not respond within {:?}; abandoning the response",
                    name, self.max_response_time
                );
                Err(DispatchError::DeadlineExceeded(self.max_response_time))
            }
            Ok(Err(join_error)) => Err(DispatchError::HandlerPanicked(join_error.to_string())),
            Ok(Ok(Err(error))) => Err(DispatchError::Handler(error)),
            Ok(Ok(Ok(None))) => Err(DispatchError::NilInteractionResponse),
            Ok(Ok(Ok(Some(response)))) => {
                if response.kind.is_deprecated() {
                    warn!(target: "slashhook::dispatch", "/{} answered with deprecated response type {:?}", name, response.kind);
                }
                Ok(response)
            }
        }
    }
}

/// Match received options to declared options by name and decode each value.
///
/// Best effort: failures are logged and leave `typed` as `None`.
fn decode_options(declared: &[ApplicationCommandOption], received: &mut [InteractionDataOption]) {
    for option in received.iter_mut() {
        let Some(schema) = declared
            .iter()
            .find(|schema| schema.name.eq_ignore_ascii_case(&option.name))
        else {
            debug!(target: "slashhook::dispatch", "Option {} is not declared; leaving it undecoded", option.name);
            continue;
        };

        option.typed = decode_value(schema.kind, option);

        if matches!(
            schema.kind,
            ApplicationCommandOptionType::SubCommand | ApplicationCommandOptionType::SubCommandGroup
        ) {
            decode_options(&schema.options, &mut option.options);
        }
    }
}

fn decode_value(kind: ApplicationCommandOptionType, option: &InteractionDataOption) -> Option<OptionValue> {
    let raw = option.value.as_ref();
    let decoded = match kind {
        ApplicationCommandOptionType::String => decode::<String>(raw).map(OptionValue::String),
        ApplicationCommandOptionType::Integer => decode::<i64>(raw).map(OptionValue::Integer),
        ApplicationCommandOptionType::Boolean => decode::<bool>(raw).map(OptionValue::Boolean),
        ApplicationCommandOptionType::User => decode::<String>(raw).map(OptionValue::User),
        ApplicationCommandOptionType::Role => decode::<String>(raw).map(OptionValue::Role),
        // Sub-commands usually carry no value; the option name is the selection.
        ApplicationCommandOptionType::SubCommand => match raw {
            Some(_) => decode::<String>(raw).map(OptionValue::SubCommand),
            None => Ok(OptionValue::SubCommand(option.name.clone())),
        },
        ApplicationCommandOptionType::SubCommandGroup => match raw {
            Some(_) => decode::<String>(raw).map(OptionValue::SubCommandGroup),
            None => Ok(OptionValue::SubCommandGroup(option.name.clone())),
        },
        ApplicationCommandOptionType::Channel | ApplicationCommandOptionType::Other(_) => return None,
    };

    match decoded {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                target: "slashhook::dispatch",
                "Could not decode option {} as {:?}: {}",
                option.name, kind, error
            );
            None
        }
    }
}

fn decode<T: DeserializeOwned>(raw: Option<&Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(raw.cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CommandHandler, SlashCommand};
    use ed25519_dalek::{Signer, SigningKey};
    use slashhook_types::{ApplicationCommand, InteractionResponseType};
    use std::sync::atomic::{AtomicBool, Ordering};

    const TIMESTAMP: &str = "1700000000";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[3u8; 32])
    }

    fn sign(body: &str) -> String {
        let message = format!("{}{}", TIMESTAMP, body);
        hex::encode(signing_key().sign(message.as_bytes()).to_bytes())
    }

    fn dispatcher(commands: Vec<SlashCommand>) -> InteractionDispatcher {
        let public_key = hex::encode(signing_key().verifying_key().to_bytes());
        InteractionDispatcher::new(Arc::new(CommandRegistry::new(commands)), public_key)
    }

    fn command(name: &str, handler: CommandHandler) -> SlashCommand {
        let spec = ApplicationCommand::new(name, "test command")
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::String, "text", "t"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::Integer, "count", "c"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::Boolean, "loud", "l"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::User, "who", "w"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::Channel, "where", "c"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::Role, "team", "r"))
            .option(ApplicationCommandOption::new(ApplicationCommandOptionType::Role, "squad", "r"));
        SlashCommand::new(spec, handler, true, Vec::<String>::new()).unwrap()
    }

    fn echo() -> CommandHandler {
        CommandHandler::from_async(|request: InteractionRequest| async move {
            let text = request.option_str("text").unwrap_or("nothing").to_string();
            Ok(Some(InteractionResponse::message(text)))
        })
    }

    async fn run(dispatcher: &InteractionDispatcher, body: &str) -> Result<InteractionResponse, DispatchError> {
        dispatcher
            .dispatch(body.as_bytes(), &sign(body), TIMESTAMP, Instant::now())
            .await
    }

    #[tokio::test]
    async fn test_ping_pongs() {
        let dispatcher = dispatcher(vec![]);
        let response = run(&dispatcher, r#"{"type":1}"#).await.unwrap();
        assert_eq!(response.kind, InteractionResponseType::Pong);
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let dispatcher = dispatcher(vec![]);
        let body = r#"{"type":1}"#;
        let err = dispatcher
            .dispatch(body.as_bytes(), &sign(r#"{"type":2}"#), TIMESTAMP, Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized));
        assert_eq!(err.status_code(), 401);

        let err = dispatcher
            .dispatch(body.as_bytes(), "", "", Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized));
    }

    #[tokio::test]
    async fn test_unknown_type_is_bad_request() {
        let dispatcher = dispatcher(vec![]);
        let err = run(&dispatcher, r#"{"type":7}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidInteractionType(7)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_out_of_range_or_missing_type_is_bad_request() {
        let dispatcher = dispatcher(vec![]);
        for (body, kind) in [(r#"{"type":256}"#, 256), (r#"{"type":-1}"#, -1), ("{}", 0)] {
            let err = run(&dispatcher, body).await.unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidInteractionType(k) if k == kind),
                "{} -> {:?}",
                body,
                err
            );
            assert_eq!(err.status_code(), 400);
        }
    }

    #[tokio::test]
    async fn test_unregistered_command_is_not_implemented() {
        let dispatcher = dispatcher(vec![command("echo", echo())]);
        let err = run(&dispatcher, r#"{"type":2,"data":{"id":"1","name":"nope"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotImplemented(ref name) if name == "nope"));
        assert_eq!(err.status_code(), 501);
    }

    #[tokio::test]
    async fn test_command_without_data() {
        let dispatcher = dispatcher(vec![]);
        let err = run(&dispatcher, r#"{"type":2}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingCommandData));
    }

    #[tokio::test]
    async fn test_invalid_json_is_internal() {
        let dispatcher = dispatcher(vec![]);
        let err = run(&dispatcher, "{not json").await.unwrap_err();
        assert!(matches!(err, DispatchError::Json(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_command_executes_with_decoded_options() {
        let dispatcher = dispatcher(vec![command("echo", echo())]);
        let body = r#"{"type":2,"data":{"id":"1","name":"ECHO","options":[{"name":"text","value":"hi there"}]}}"#;
        let response = run(&dispatcher, body).await.unwrap();
        assert_eq!(response, InteractionResponse::message("hi there"));
    }

    #[test]
    fn test_option_decoding_is_best_effort() {
        let dispatcher = dispatcher(vec![command("echo", echo())]);
        let body = r#"{"type":2,"data":{"name":"echo","options":[
            {"name":"text","value":5},
            {"name":"count","value":12},
            {"name":"loud","value":true},
            {"name":"who","value":"80351110224678912"},
            {"name":"where","value":"41771983423143937"},
            {"name":"team","value":"41771983423143938"},
            {"name":"squad","value":false},
            {"name":"extra","value":"x"}
        ]}}"#;
        let request = dispatcher.parse(body.as_bytes()).unwrap();

        // Wrong JSON type for a string option: left undecoded, not fatal
        assert!(request.option("text").unwrap().typed.is_none());
        assert_eq!(request.option_i64("count"), Some(12));
        assert_eq!(request.option_bool("loud"), Some(true));
        assert_eq!(
            request.option("who").unwrap().typed,
            Some(OptionValue::User("80351110224678912".into()))
        );
        assert_eq!(
            request.option("team").unwrap().typed,
            Some(OptionValue::Role("41771983423143938".into()))
        );
        assert!(request.option("squad").unwrap().typed.is_none());
        // Channel options are not decoded
        assert!(request.option("where").unwrap().typed.is_none());
        assert!(request.option("extra").unwrap().typed.is_none());
    }

    #[test]
    fn test_sub_command_options_decode_recursively() {
        let spec = ApplicationCommand::new("config", "configure").option(
            ApplicationCommandOption {
                options: vec![ApplicationCommandOption::new(
                    ApplicationCommandOptionType::Integer,
                    "limit",
                    "l",
                )],
                ..ApplicationCommandOption::new(ApplicationCommandOptionType::SubCommand, "set", "s")
            },
        );
        let dispatcher = dispatcher(vec![
            SlashCommand::new(spec, echo(), true, Vec::<String>::new()).unwrap(),
        ]);
        let body = r#"{"type":2,"data":{"name":"config","options":[{"name":"set","options":[{"name":"limit","value":3}]}]}}"#;
        let request = dispatcher.parse(body.as_bytes()).unwrap();

        let set = request.option("set").unwrap();
        assert_eq!(set.typed, Some(OptionValue::SubCommand("set".into())));
        assert_eq!(set.options[0].typed, Some(OptionValue::Integer(3)));
    }

    #[test]
    fn test_sub_command_group_decodes_two_levels() {
        let add = ApplicationCommandOption {
            options: vec![ApplicationCommandOption::new(
                ApplicationCommandOptionType::Role,
                "role",
                "r",
            )],
            ..ApplicationCommandOption::new(ApplicationCommandOptionType::SubCommand, "add", "a")
        };
        let spec = ApplicationCommand::new("perms", "permissions").option(ApplicationCommandOption {
            options: vec![add],
            ..ApplicationCommandOption::new(ApplicationCommandOptionType::SubCommandGroup, "roles", "g")
        });
        let dispatcher = dispatcher(vec![
            SlashCommand::new(spec, echo(), true, Vec::<String>::new()).unwrap(),
        ]);
        let body = r#"{"type":2,"data":{"name":"perms","options":[{"name":"roles","options":[{"name":"add","options":[{"name":"role","value":"99"}]}]}]}}"#;
        let request = dispatcher.parse(body.as_bytes()).unwrap();

        let group = request.option("roles").unwrap();
        assert_eq!(group.typed, Some(OptionValue::SubCommandGroup("roles".into())));
        let add = &group.options[0];
        assert_eq!(add.typed, Some(OptionValue::SubCommand("add".into())));
        assert_eq!(add.options[0].typed, Some(OptionValue::Role("99".into())));
    }

    #[tokio::test]
    async fn test_nil_response() {
        let handler = CommandHandler::from_blocking(|_| Ok(None));
        let dispatcher = dispatcher(vec![command("empty", handler)]);
        let err = run(&dispatcher, r#"{"type":2,"data":{"name":"empty"}}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::NilInteractionResponse));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_handler_error() {
        let handler = CommandHandler::from_blocking(|_| Err(anyhow::anyhow!("database down")));
        let dispatcher = dispatcher(vec![command("fail", handler)]);
        let err = run(&dispatcher, r#"{"type":2,"data":{"name":"fail"}}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let handler = CommandHandler::from_blocking(|_| panic!("boom"));
        let dispatcher = dispatcher(vec![command("panic", handler)]);
        let err = run(&dispatcher, r#"{"type":2,"data":{"name":"panic"}}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerPanicked(_)));
    }

    #[tokio::test]
    async fn test_slow_handler_exceeds_deadline_but_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let handler = CommandHandler::from_async(move |_| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(Some(InteractionResponse::message("late")))
            }
        });
        let dispatcher = dispatcher(vec![command("slow", handler)])
            .with_max_response_time(Duration::from_millis(50));

        let started = Instant::now();
        let err = run(&dispatcher, r#"{"type":2,"data":{"name":"slow"}}"#).await.unwrap_err();
        assert!(matches!(err, DispatchError::DeadlineExceeded(_)));
        assert!(err.to_string().contains("took too long"));
        assert_eq!(err.status_code(), 500);
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(!finished.load(Ordering::SeqCst));

        // Cancellation is advisory: the handler still completes
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_deadline_counts_from_receipt() {
        let handler = CommandHandler::from_async(|_| async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok(Some(InteractionResponse::message("ok")))
        });
        let dispatcher = dispatcher(vec![command("wait", handler)])
            .with_max_response_time(Duration::from_millis(100));
        let body = r#"{"type":2,"data":{"name":"wait"}}"#;

        // Received 80ms ago: only 20ms of budget left
        let received_at = Instant::now() - Duration::from_millis(80);
        let err = dispatcher
            .dispatch(body.as_bytes(), &sign(body), TIMESTAMP, received_at)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DeadlineExceeded(_)));
    }
}
