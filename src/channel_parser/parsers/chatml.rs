// ChatML-style channel parser.
// Reasoning and commentary live in configurable tag pairs; tool calls are
// JSON payloads wrapped in <tool_call>...</tool_call>.

use std::borrow::Cow;

use crate::{
    channel_parser::{
        identity::ChannelIdCache,
        tags::{self, TaggedContent},
        tool_call::ToolCallNormalizer,
        types::{ChannelCollector, ChannelMessage, ChannelType},
    },
    config::{ChannelParserConfig, TagPair},
};

const TOOL_CALL_START: &str = "<tool_call>";
const TOOL_CALL_END: &str = "</tool_call>";

/// ChatML format parser
///
/// Handles output shaped like:
/// `<think>reasoning</think>answer<tool_call>{"name": "f", "arguments": {...}}</tool_call>`
///
/// Channels are emitted in phase order (analysis, commentary, tools, final)
/// rather than by their position in the text.
#[derive(Debug, Clone)]
pub struct ChatMlParser {
    thinking_tags: TagPair,
    commentary_tags: Option<TagPair>,
    assume_reasoning: bool,
    end_label: Option<String>,
    normalizer: ToolCallNormalizer,
}

impl ChatMlParser {
    pub fn new(config: &ChannelParserConfig) -> Self {
        Self {
            thinking_tags: config.thinking_tags.clone(),
            commentary_tags: config.commentary_tags.clone(),
            assume_reasoning: config.assume_reasoning,
            end_label: config.end_label.clone(),
            normalizer: ToolCallNormalizer::new(config.known_tools.iter().cloned()),
        }
    }

    /// Check if text contains any markup this parser understands
    pub fn has_markup(&self, text: &str) -> bool {
        text.contains(&self.thinking_tags.start)
            || text.contains(&self.thinking_tags.end)
            || text.contains(TOOL_CALL_START)
            || self
                .commentary_tags
                .as_ref()
                .is_some_and(|tags| text.contains(&tags.start))
    }

    pub fn parse(&self, text: &str, cache: &ChannelIdCache) -> Vec<ChannelMessage> {
        let text = self.with_implicit_reasoning_start(text);
        let mut collector = ChannelCollector::new(cache);

        // Phase 1: reasoning
        if let Some(TaggedContent { content, .. }) = tags::extract_progressive_tagged_content(
            &text,
            &self.thinking_tags.start,
            &self.thinking_tags.end,
        ) {
            let content = content.trim();
            if !content.is_empty() {
                collector.push_text(ChannelType::Analysis, content);
            }
        }

        // Phase 2: commentary
        if let Some(commentary) = &self.commentary_tags {
            if let Some(TaggedContent { content, .. }) =
                tags::extract_progressive_tagged_content(&text, &commentary.start, &commentary.end)
            {
                let content = content.trim();
                if !content.is_empty() {
                    collector.push_text(ChannelType::Commentary, content);
                }
            }
        }

        // Phase 3: complete tool calls
        for block in complete_tool_call_blocks(&text) {
            match self.normalizer.parse_payload(block) {
                Ok(requests) => {
                    for request in requests {
                        let recipient = request.recipient.clone();
                        collector.push(
                            ChannelType::Tool,
                            block.trim(),
                            Some(recipient),
                            Some(request),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropping malformed tool call block: {}", e);
                }
            }
        }

        // Phase 4: whatever is left is the answer
        let final_text = self.final_content(&text);
        if !final_text.is_empty() {
            collector.push_text(ChannelType::Final, final_text);
        }

        collector.finish()
    }

    /// Prepend the thinking start tag when the template opened the block
    fn with_implicit_reasoning_start<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.assume_reasoning && !text.contains(&self.thinking_tags.start) {
            Cow::Owned(format!("{}{}", self.thinking_tags.start, text))
        } else {
            Cow::Borrowed(text)
        }
    }

    fn final_content(&self, text: &str) -> String {
        // Each removal also truncates at a block that is still streaming
        let mut remaining = tags::remove_all_tagged_blocks(
            text,
            &self.thinking_tags.start,
            &self.thinking_tags.end,
        );
        if let Some(commentary) = &self.commentary_tags {
            remaining =
                tags::remove_all_tagged_blocks(&remaining, &commentary.start, &commentary.end);
            remaining = remaining.replace(commentary.end.as_str(), "");
        }
        remaining = tags::remove_all_tagged_blocks(&remaining, TOOL_CALL_START, TOOL_CALL_END);

        // Closing tags without an opening one
        remaining = remaining
            .replace(self.thinking_tags.end.as_str(), "")
            .replace(TOOL_CALL_END, "");
        if let Some(end_label) = &self.end_label {
            remaining = remaining.replace(end_label.as_str(), "");
        }

        let mut markers = vec![
            TOOL_CALL_START,
            self.thinking_tags.start.as_str(),
            self.thinking_tags.end.as_str(),
        ];
        if let Some(end_label) = &self.end_label {
            markers.push(end_label.as_str());
        }
        if let Some(commentary) = &self.commentary_tags {
            markers.push(commentary.start.as_str());
        }

        tags::trim_dangling_suffix(&remaining, &markers)
            .trim()
            .to_string()
    }
}

impl Default for ChatMlParser {
    fn default() -> Self {
        Self::new(&ChannelParserConfig::default())
    }
}

/// Interiors of every complete `<tool_call>` block, in order
fn complete_tool_call_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(start) = text[cursor..].find(TOOL_CALL_START) {
        let content_start = cursor + start + TOOL_CALL_START.len();
        let Some(end) = text[content_start..].find(TOOL_CALL_END) else {
            break;
        };
        blocks.push(&text[content_start..content_start + end]);
        cursor = content_start + end + TOOL_CALL_END.len();
    }
    blocks
}
