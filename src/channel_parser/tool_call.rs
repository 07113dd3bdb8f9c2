use std::collections::HashSet;

use serde_json::Value;

use crate::channel_parser::{
    errors::{ChannelParserError, ChannelParserResult},
    types::ToolRequest,
};

/// Namespace prefix providers put in front of function names
const FUNCTIONS_NAMESPACE: &str = "functions.";

/// Wrapper keys that nest a tool call one level deeper, in priority order
const NESTED_CALL_KEYS: [&str; 4] = ["function", "tool_call", "tool_calls", "function_call"];

/// Turns raw tool-call payloads into [`ToolRequest`]s.
///
/// Providers nest calls differently inside the same wrapper, so objects are
/// unwrapped recursively and arrays fan out into one request per element.
#[derive(Debug, Clone, Default)]
pub struct ToolCallNormalizer {
    known_tools: HashSet<String>,
}

impl ToolCallNormalizer {
    pub fn new<I, S>(known_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_tools: known_tools.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a raw JSON payload into zero or more tool requests.
    pub fn parse_payload(&self, raw: &str) -> ChannelParserResult<Vec<ToolRequest>> {
        let value: Value = serde_json::from_str(raw.trim())?;
        let mut requests = Vec::new();
        self.collect_requests(&value, &mut requests)?;
        Ok(requests)
    }

    /// Build a request from an already split name and raw argument text.
    ///
    /// Blank arguments become `{}`; anything else must be valid JSON.
    pub fn from_parts(
        &self,
        raw_name: &str,
        raw_arguments: &str,
    ) -> ChannelParserResult<ToolRequest> {
        let name = self.resolve_tool_name(raw_name);
        if name.is_empty() {
            return Err(ChannelParserError::MissingToolName);
        }

        let raw_arguments = raw_arguments.trim();
        let arguments = if raw_arguments.is_empty() {
            "{}".to_string()
        } else {
            let value: Value = serde_json::from_str(raw_arguments)?;
            serialize_arguments(&value)?
        };

        Ok(ToolRequest::new(name, arguments))
    }

    /// Normalize a tool name against the known tool identifiers.
    ///
    /// `functions.search` resolves to `search`. A qualified `search.query`
    /// resolves to `search` only when `search` is a known tool.
    pub fn resolve_tool_name(&self, raw: &str) -> String {
        let raw = raw.trim();
        let name = raw.strip_prefix(FUNCTIONS_NAMESPACE).unwrap_or(raw);

        if self.known_tools.contains(name) {
            return name.to_string();
        }
        if let Some((prefix, _)) = name.split_once('.') {
            if self.known_tools.contains(prefix) {
                return prefix.to_string();
            }
        }
        name.to_string()
    }

    fn collect_requests(
        &self,
        value: &Value,
        out: &mut Vec<ToolRequest>,
    ) -> ChannelParserResult<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.collect_requests(item, out)?;
                }
                Ok(())
            }
            Value::Object(obj) => {
                if let Some(name) = obj.get("name").and_then(Value::as_str) {
                    let name = self.resolve_tool_name(name);
                    if name.is_empty() {
                        return Err(ChannelParserError::MissingToolName);
                    }
                    // Some providers emit "parameters" instead of "arguments"
                    let arguments = obj
                        .get("arguments")
                        .or_else(|| obj.get("parameters"))
                        .map(serialize_arguments)
                        .transpose()?
                        .unwrap_or_else(|| "{}".to_string());
                    out.push(ToolRequest::new(name, arguments));
                    return Ok(());
                }

                match NESTED_CALL_KEYS.iter().find_map(|key| obj.get(*key)) {
                    Some(nested) => self.collect_requests(nested, out),
                    None => Err(ChannelParserError::MissingToolName),
                }
            }
            other => Err(ChannelParserError::UnsupportedPayload(
                json_kind(other).to_string(),
            )),
        }
    }
}

/// Compact JSON for structured arguments; strings are already encoded and
/// pass through untouched.
fn serialize_arguments(value: &Value) -> ChannelParserResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok("{}".to_string()),
        other => Ok(serde_json::to_string(other)?),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
