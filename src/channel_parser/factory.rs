// Dispatch over the supported dialects.

use crate::{
    channel_parser::{
        identity::ChannelIdCache,
        parsers::{ChatMlParser, HarmonyParser, KimiParser},
        types::{ChannelFormat, ChannelMessage},
    },
    config::ChannelParserConfig,
};

/// Parser for one dialect, selected by the caller.
#[derive(Debug, Clone)]
pub enum ChannelParser {
    ChatMl(ChatMlParser),
    Harmony(HarmonyParser),
    Kimi(KimiParser),
}

impl ChannelParser {
    /// Create a parser for `format` with the given configuration
    pub fn new(format: ChannelFormat, config: &ChannelParserConfig) -> Self {
        match format {
            ChannelFormat::ChatMl => ChannelParser::ChatMl(ChatMlParser::new(config)),
            ChannelFormat::Harmony => ChannelParser::Harmony(HarmonyParser::new(config)),
            ChannelFormat::Kimi => ChannelParser::Kimi(KimiParser::new(config)),
        }
    }

    pub fn format(&self) -> ChannelFormat {
        match self {
            ChannelParser::ChatMl(_) => ChannelFormat::ChatMl,
            ChannelParser::Harmony(_) => ChannelFormat::Harmony,
            ChannelParser::Kimi(_) => ChannelFormat::Kimi,
        }
    }

    /// Check if text contains markup of this parser's dialect
    pub fn has_markup(&self, text: &str) -> bool {
        match self {
            ChannelParser::ChatMl(p) => p.has_markup(text),
            ChannelParser::Harmony(p) => p.has_markup(text),
            ChannelParser::Kimi(p) => p.has_markup(text),
        }
    }

    /// Split the full text received so far into ordered channels.
    ///
    /// Call again with the grown text and the same `cache` as the stream
    /// advances; channels keep their ids between calls. Never fails: every
    /// dialect turns text without its markup into a single final channel.
    pub fn parse(&self, text: &str, cache: &ChannelIdCache) -> Vec<ChannelMessage> {
        let messages = match self {
            ChannelParser::ChatMl(p) => p.parse(text, cache),
            ChannelParser::Harmony(p) => p.parse(text, cache),
            ChannelParser::Kimi(p) => p.parse(text, cache),
        };

        tracing::trace!(
            format = %self.format(),
            text_len = text.len(),
            channels = messages.len(),
            "Parsed channels"
        );
        messages
    }
}

impl Default for ChannelParser {
    fn default() -> Self {
        Self::new(ChannelFormat::default(), &ChannelParserConfig::default())
    }
}

/// Parse `text` in `format` with the default configuration
pub fn parse_channels(
    text: &str,
    format: ChannelFormat,
    cache: &ChannelIdCache,
) -> Vec<ChannelMessage> {
    ChannelParser::new(format, &ChannelParserConfig::default()).parse(text, cache)
}
