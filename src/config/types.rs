use serde::{Deserialize, Serialize};

use super::{ConfigResult, ConfigValidator};
use crate::channel_parser::ChannelType;

/// Start/end tag pair delimiting a block, e.g. `<think>` / `</think>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub start: String,
    pub end: String,
}

impl TagPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Harmony channel names mapped onto channel types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLabels {
    pub analysis: String,
    pub commentary: String,
    #[serde(rename = "final")]
    pub final_answer: String,
}

impl Default for ChannelLabels {
    fn default() -> Self {
        Self {
            analysis: "analysis".to_string(),
            commentary: "commentary".to_string(),
            final_answer: "final".to_string(),
        }
    }
}

impl ChannelLabels {
    /// Map a channel name to its type. Unrecognized names are `Final`.
    pub fn channel_type(&self, name: &str) -> ChannelType {
        let name = name.trim();
        if name.eq_ignore_ascii_case(&self.analysis) {
            ChannelType::Analysis
        } else if name.eq_ignore_ascii_case(&self.commentary) {
            ChannelType::Commentary
        } else {
            ChannelType::Final
        }
    }
}

/// Parser configuration shared by every dialect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelParserConfig {
    /// Tags around reasoning text (ChatML)
    pub thinking_tags: TagPair,
    /// Tags around visible commentary text (ChatML)
    pub commentary_tags: Option<TagPair>,
    /// The chat template already opened the reasoning block, so the start tag
    /// never shows up in the output (DeepSeek-R1 and Qwen thinking models)
    pub assume_reasoning: bool,
    /// Label removed from the final answer (ChatML)
    pub end_label: Option<String>,
    /// Harmony channel names
    pub channel_labels: ChannelLabels,
    /// Tool identifiers used to normalize qualified tool names
    pub known_tools: Vec<String>,
}

impl Default for ChannelParserConfig {
    fn default() -> Self {
        Self {
            thinking_tags: TagPair::new("<think>", "</think>"),
            commentary_tags: None,
            assume_reasoning: false,
            end_label: Some("<|im_end|>".to_string()),
            channel_labels: ChannelLabels::default(),
            known_tools: Vec::new(),
        }
    }
}

impl ChannelParserConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate(self)
    }
}
