use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel_parser::{
    errors::ChannelParserError,
    identity::{ChannelIdCache, ChannelSignature},
};

/// Semantic kind of a parsed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Hidden reasoning text
    Analysis,
    /// Visible intermediate narration
    Commentary,
    /// The user-facing answer
    Final,
    /// A structured tool invocation request
    Tool,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Analysis => "analysis",
            ChannelType::Commentary => "commentary",
            ChannelType::Final => "final",
            ChannelType::Tool => "tool",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured tool request carried by a `Tool` channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Normalized tool name
    pub name: String,
    /// Arguments as a compact JSON string
    pub arguments: String,
    /// Target the request was addressed to, e.g. `functions.search`
    pub recipient: String,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        let name = name.into();
        let recipient = format!("functions.{}", name);
        Self {
            name,
            arguments: arguments.into(),
            recipient,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }
}

/// One semantic unit of model output.
///
/// Messages are rebuilt from scratch on every parse. Only `id` carries over
/// between parses, through the turn's [`ChannelIdCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub content: String,
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_request: Option<ToolRequest>,
}

impl ChannelMessage {
    pub fn signature(&self) -> ChannelSignature {
        ChannelSignature::new(self.channel_type, self.order, self.recipient.as_deref())
    }

    /// True when a tool executor may dispatch this message.
    pub fn is_dispatchable(&self) -> bool {
        self.channel_type == ChannelType::Tool && self.tool_request.is_some()
    }
}

/// Tagging dialect selected by the caller from the model's chat template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFormat {
    #[default]
    ChatMl,
    Harmony,
    Kimi,
}

impl ChannelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFormat::ChatMl => "chatml",
            ChannelFormat::Harmony => "harmony",
            ChannelFormat::Kimi => "kimi",
        }
    }
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelFormat {
    type Err = ChannelParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatml" | "qwen" | "hermes" => Ok(ChannelFormat::ChatMl),
            "harmony" | "gpt-oss" | "gpt_oss" => Ok(ChannelFormat::Harmony),
            "kimi" | "kimi_k2" | "kimi-k2" => Ok(ChannelFormat::Kimi),
            other => Err(ChannelParserError::UnknownFormat(other.to_string())),
        }
    }
}

/// Appends channels in discovery order, assigning `order` and resolving ids.
pub(crate) struct ChannelCollector<'a> {
    cache: &'a ChannelIdCache,
    messages: Vec<ChannelMessage>,
}

impl<'a> ChannelCollector<'a> {
    pub(crate) fn new(cache: &'a ChannelIdCache) -> Self {
        Self {
            cache,
            messages: Vec::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        channel_type: ChannelType,
        content: impl Into<String>,
        recipient: Option<String>,
        tool_request: Option<ToolRequest>,
    ) {
        let order = self.messages.len();
        let signature = ChannelSignature::new(channel_type, order, recipient.as_deref());
        let id = self.cache.get_or_create_channel_id(&signature);
        self.messages.push(ChannelMessage {
            id,
            channel_type,
            content: content.into(),
            order,
            recipient,
            tool_request,
        });
    }

    pub(crate) fn push_text(&mut self, channel_type: ChannelType, content: impl Into<String>) {
        self.push(channel_type, content, None, None);
    }

    pub(crate) fn finish(self) -> Vec<ChannelMessage> {
        self.messages
    }
}
