//! Commands served by this binary.

use slashhook_core::{CommandHandler, CommandRegistry, HandlerResult, RegistryError, SlashCommand};
use slashhook_types::{
    ApplicationCommand, ApplicationCommandOption, ApplicationCommandOptionType,
    InteractionRequest, InteractionResponse,
};

/// The built-in command set, registered globally and in each of `guild_ids`.
pub fn builtin_commands(guild_ids: &[String]) -> Result<CommandRegistry, RegistryError> {
    let hello = SlashCommand::new(
        ApplicationCommand::new("hello", "Say hello").option(ApplicationCommandOption::new(
            ApplicationCommandOptionType::String,
            "name",
            "Who to greet",
        )),
        CommandHandler::from_async(hello),
        true,
        guild_ids.iter().cloned(),
    )?;

    Ok(CommandRegistry::new([hello]))
}

/// `/hello [name]` greets the given name, or the invoking user.
async fn hello(request: InteractionRequest) -> HandlerResult {
    let name = request
        .option_str("name")
        .filter(|name| !name.is_empty())
        .or_else(|| {
            request
                .member
                .as_ref()
                .and_then(|member| member.display_name())
                .filter(|name| !name.is_empty())
        })
        .or_else(|| {
            request
                .invoker()
                .map(|user| user.username.as_str())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or("stranger");

    Ok(Some(InteractionResponse::message(format!("Hello {}!", name))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slashhook_core::Scope;
    use slashhook_types::{GuildMember, InteractionCallbackData, InteractionDataOption, OptionValue, User};

    fn request(name_option: Option<&str>, member: Option<GuildMember>) -> InteractionRequest {
        let mut request: InteractionRequest = serde_json::from_value(serde_json::json!({
            "id": "1",
            "type": 2,
            "data": { "id": "2", "name": "hello" }
        }))
        .unwrap();
        request.member = member;
        if let (Some(data), Some(value)) = (request.data.as_mut(), name_option) {
            data.options.push(InteractionDataOption {
                name: "name".into(),
                value: Some(value.into()),
                options: Vec::new(),
                typed: Some(OptionValue::String(value.into())),
            });
        }
        request
    }

    fn content(result: HandlerResult) -> String {
        match result.unwrap().unwrap().data {
            Some(InteractionCallbackData {
                content: Some(content),
                ..
            }) => content,
            other => panic!("expected message content, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_scopes() {
        let registry = builtin_commands(&["42".to_string()]).unwrap();
        let hello = registry.get("hello").unwrap();
        assert!(hello.scopes.contains(&Scope::Global));
        assert!(hello.scopes.contains(&Scope::Guild("42".into())));
        assert_eq!(hello.command.options.len(), 1);
    }

    #[tokio::test]
    async fn test_hello_with_name() {
        assert_eq!(content(hello(request(Some("Ana"), None)).await), "Hello Ana!");
    }

    #[tokio::test]
    async fn test_hello_falls_back_to_member() {
        let member = GuildMember {
            user: Some(User {
                id: "7".into(),
                username: "ana_b".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(content(hello(request(None, Some(member))).await), "Hello ana_b!");
    }

    #[tokio::test]
    async fn test_hello_empty_name_falls_back_to_member() {
        let member = GuildMember {
            nick: Some("Bee".into()),
            ..Default::default()
        };
        assert_eq!(content(hello(request(Some(""), Some(member))).await), "Hello Bee!");
    }

    #[tokio::test]
    async fn test_hello_stranger() {
        assert_eq!(content(hello(request(None, None)).await), "Hello stranger!");
    }
}
