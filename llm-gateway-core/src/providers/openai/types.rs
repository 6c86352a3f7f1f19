//! OpenAI wire response types
//!
//! Only the fields the gateway reads are modeled; everything else in the
//! payload is ignored on decode.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry of `choices` in a chat completion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message of a chat completion choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub role: Option<String>,
    /// Usually a string; `null` when the turn only carries tool calls
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub call_type: Option<String>,
    pub function: WireFunction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFunction {
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: Value,
}

/// `function_call` item of a Responses API `output`
#[derive(Debug, Clone, Deserialize)]
pub struct WireFunctionCallItem {
    pub id: String,
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub role: Option<String>,
}

/// `message` item of a Responses API `output`
#[derive(Debug, Clone, Deserialize)]
pub struct WireMessageItem {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choice_with_null_content_and_tool_calls() {
        let choice: WireChoice = serde_json::from_value(json!({
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"location\":\"Singapore\"}"}
                }]
            },
            "finish_reason": "tool_calls"
        }))
        .unwrap();

        assert_eq!(choice.message.content, None);
        assert_eq!(choice.message.tool_calls.len(), 1);
        assert_eq!(choice.message.tool_calls[0].function.name, "get_weather");
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_null_tool_calls() {
        let message: WireMessage =
            serde_json::from_value(json!({"role": "assistant", "content": "hi", "tool_calls": null}))
                .unwrap();
        assert!(message.tool_calls.is_empty());
    }
}
