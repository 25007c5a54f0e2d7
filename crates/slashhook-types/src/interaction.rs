//! Interaction webhook envelopes.
//!
//! An interaction is what the platform POSTs to the webhook: either a `Ping`
//! liveness check or a user invoking an application command. The response
//! envelope goes back in the HTTP body.

use crate::{GuildMember, InteractionCallbackData, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of inbound interaction.
///
/// Unknown discriminants are kept so the dispatcher can reject them with a
/// typed error instead of a decode failure. A missing `type` is `Unknown(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    Unknown(i64),
}

impl Default for InteractionType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl From<i64> for InteractionType {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            other => Self::Unknown(other),
        }
    }
}

impl From<InteractionType> for i64 {
    fn from(value: InteractionType) -> Self {
        match value {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::Unknown(other) => other,
        }
    }
}

/// Inbound interaction request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRequest {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: InteractionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ApplicationCommandInteractionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Invoking member, present for guild invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<GuildMember>,
    /// Invoking user, present for direct-message invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub version: u8,
}

impl InteractionRequest {
    /// Name of the invoked command, if this is a command interaction.
    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.name.as_str())
    }

    /// The invoking user, whether the interaction came from a guild or a DM.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Top-level option by name (case-insensitive).
    pub fn option(&self, name: &str) -> Option<&InteractionDataOption> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|option| option.name.eq_ignore_ascii_case(name))
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        match self.option(name)?.typed.as_ref()? {
            OptionValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn option_i64(&self, name: &str) -> Option<i64> {
        match self.option(name)?.typed.as_ref()? {
            OptionValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        match self.option(name)?.typed.as_ref()? {
            OptionValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

/// Command payload of an application-command interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationCommandInteractionData {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
}

/// A parameter value supplied by the invoking user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionDataOption {
    pub name: String,
    /// Raw value as received on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
    /// Value decoded against the registered command's option schema.
    /// `None` when the declared type is not decoded or decoding failed.
    #[serde(skip)]
    pub typed: Option<OptionValue>,
}

/// Decoded option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Snowflake id of the selected user.
    User(String),
    /// Snowflake id of the selected role.
    Role(String),
    SubCommand(String),
    SubCommandGroup(String),
}

/// Kind of outbound interaction response.
///
/// `Acknowledge`, `ChannelMessage` and `AcknowledgeWithSource` are deprecated
/// by the platform. They still decode, but the constructors below never
/// produce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InteractionResponseType {
    Pong,
    Acknowledge,
    ChannelMessage,
    ChannelMessageWithSource,
    AcknowledgeWithSource,
}

impl InteractionResponseType {
    pub fn is_deprecated(self) -> bool {
        matches!(
            self,
            Self::Acknowledge | Self::ChannelMessage | Self::AcknowledgeWithSource
        )
    }
}

impl TryFrom<u8> for InteractionResponseType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Pong),
            2 => Ok(Self::Acknowledge),
            3 => Ok(Self::ChannelMessage),
            4 => Ok(Self::ChannelMessageWithSource),
            5 => Ok(Self::AcknowledgeWithSource),
            other => Err(format!("unknown interaction response type {}", other)),
        }
    }
}

impl From<InteractionResponseType> for u8 {
    fn from(value: InteractionResponseType) -> Self {
        match value {
            InteractionResponseType::Pong => 1,
            InteractionResponseType::Acknowledge => 2,
            InteractionResponseType::ChannelMessage => 3,
            InteractionResponseType::ChannelMessageWithSource => 4,
            InteractionResponseType::AcknowledgeWithSource => 5,
        }
    }
}

/// Outbound interaction response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: InteractionResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionCallbackData>,
}

impl InteractionResponse {
    /// Acknowledge a `Ping`.
    pub fn pong() -> Self {
        Self {
            kind: InteractionResponseType::Pong,
            data: None,
        }
    }

    /// Reply in the channel, showing the invoking command alongside.
    pub fn message(content: impl Into<String>) -> Self {
        Self::with_data(InteractionCallbackData {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    pub fn with_data(data: InteractionCallbackData) -> Self {
        Self {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_request_decodes() {
        let request: InteractionRequest = serde_json::from_str(r#"{"type":1}"#).unwrap();
        assert_eq!(request.kind, InteractionType::Ping);
        assert!(request.data.is_none());
        assert!(request.command_name().is_none());
    }

    #[test]
    fn test_unknown_interaction_type_is_preserved() {
        let request: InteractionRequest = serde_json::from_str(r#"{"type":9}"#).unwrap();
        assert_eq!(request.kind, InteractionType::Unknown(9));
    }

    #[test]
    fn test_out_of_range_and_missing_types_decode_as_unknown() {
        let wide: InteractionRequest = serde_json::from_str(r#"{"type":256}"#).unwrap();
        assert_eq!(wide.kind, InteractionType::Unknown(256));

        let negative: InteractionRequest = serde_json::from_str(r#"{"type":-1}"#).unwrap();
        assert_eq!(negative.kind, InteractionType::Unknown(-1));

        let missing: InteractionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.kind, InteractionType::Unknown(0));
    }

    #[test]
    fn test_command_request_decodes_raw_options() {
        let body = r#"{
            "id": "1",
            "type": 2,
            "guild_id": "42",
            "data": {"id": "7", "name": "hello", "options": [{"name": "name", "value": "Ada"}]}
        }"#;
        let request: InteractionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.command_name(), Some("hello"));
        let option = request.option("NAME").unwrap();
        assert_eq!(option.value, Some(Value::String("Ada".into())));
        // Not decoded until matched against a registered schema
        assert!(option.typed.is_none());
        assert!(request.option_str("name").is_none());
    }

    #[test]
    fn test_pong_serializes_without_data() {
        let json = serde_json::to_string(&InteractionResponse::pong()).unwrap();
        assert_eq!(json, r#"{"type":1}"#);
    }

    #[test]
    fn test_message_response_shape() {
        let json = serde_json::to_value(InteractionResponse::message("hi")).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["content"], "hi");
    }

    #[test]
    fn test_deprecated_response_types_still_decode() {
        for raw in [2u8, 3, 5] {
            let response: InteractionResponse =
                serde_json::from_str(&format!(r#"{{"type":{}}}"#, raw)).unwrap();
            assert!(response.kind.is_deprecated());
        }
        assert!(serde_json::from_str::<InteractionResponse>(r#"{"type":6}"#).is_err());
    }

    #[test]
    fn test_invoker_prefers_member_user() {
        let body = r#"{"type":2,"member":{"user":{"id":"1","username":"guildy"}},"user":{"id":"2","username":"dm"}}"#;
        let request: InteractionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.invoker().unwrap().username, "guildy");
    }
}
