use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    channel_parser::{
        errors::{ChannelParserError, ChannelParserResult},
        identity::ChannelIdCache,
        tags,
        tool_call::ToolCallNormalizer,
        types::{ChannelCollector, ChannelMessage, ChannelType, ToolRequest},
    },
    config::ChannelParserConfig,
};

const SECTION_BEGIN: &str = "<|tool_calls_section_begin|>";
const SECTION_END: &str = "<|tool_calls_section_end|>";
const TOOL_CALL_BEGIN: &str = "<|tool_call_begin|>";

/// Complete tool call entries inside a section
static TOOL_CALL_EXTRACTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<\|tool_call_begin\|>\s*(?P<tool_call_id>[^\s<]+)\s*<\|tool_call_argument_begin\|>(?P<function_arguments>.*?)<\|tool_call_end\|>")
        .expect("Valid regex pattern")
});

/// Ids like "functions.search:0" or fallback "search:0"
static TOOL_CALL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:functions\.)?(?P<name>[\w\.\-]+):(?P<index>\d+)$")
        .expect("Valid regex pattern")
});

/// Tool results echoed back as `## Return of functions.x:0` followed by the
/// result lines, up to the next blank line
static RETURN_ECHO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^## Return of [^\n]*\n?(?:[^\n]+\n?)*").expect("Valid regex pattern")
});

/// Kimi K2 format parser
///
/// Handles output shaped like:
/// `text<|tool_calls_section_begin|><|tool_call_begin|>functions.{name}:{index}<|tool_call_argument_begin|>{json_args}<|tool_call_end|><|tool_calls_section_end|>answer`
///
/// Text before the section is commentary, each entry is a tool channel and
/// text after the section is the final answer.
#[derive(Debug, Clone)]
pub struct KimiParser {
    normalizer: ToolCallNormalizer,
}

impl KimiParser {
    pub fn new(config: &ChannelParserConfig) -> Self {
        Self {
            normalizer: ToolCallNormalizer::new(config.known_tools.iter().cloned()),
        }
    }

    /// Check if text contains a tool call section
    pub fn has_markup(&self, text: &str) -> bool {
        text.contains(SECTION_BEGIN)
    }

    pub fn parse(&self, text: &str, cache: &ChannelIdCache) -> Vec<ChannelMessage> {
        let mut collector = ChannelCollector::new(cache);

        let Some(begin) = text.find(SECTION_BEGIN) else {
            let remaining = remove_return_echoes(text);
            let content =
                tags::trim_dangling_suffix(&remaining, &[SECTION_BEGIN, TOOL_CALL_BEGIN]).trim();
            if !content.is_empty() {
                collector.push_text(ChannelType::Final, content);
            }
            return collector.finish();
        };

        let commentary = text[..begin].trim();
        if !commentary.is_empty() {
            collector.push_text(ChannelType::Commentary, commentary);
        }

        let section_start = begin + SECTION_BEGIN.len();
        let (section, after) = match text[section_start..].find(SECTION_END) {
            Some(end) => (
                &text[section_start..section_start + end],
                Some(&text[section_start + end + SECTION_END.len()..]),
            ),
            // Still streaming: only complete entries are emitted and there is
            // no final text yet
            None => (&text[section_start..], None),
        };

        for captures in TOOL_CALL_EXTRACTOR.captures_iter(section) {
            let (Some(id_match), Some(args_match)) = (
                captures.name("tool_call_id"),
                captures.name("function_arguments"),
            ) else {
                continue;
            };

            let function_args = args_match.as_str().trim();
            match self.parse_entry(id_match.as_str(), function_args) {
                Ok((recipient, request)) => {
                    collector.push(
                        ChannelType::Tool,
                        function_args,
                        Some(recipient),
                        Some(request),
                    );
                }
                Err(e) => {
                    tracing::warn!("Dropping kimi tool call {}: {}", id_match.as_str(), e);
                }
            }
        }

        if let Some(after) = after {
            let remaining = tags::remove_all_tagged_blocks(
                &remove_return_echoes(after),
                SECTION_BEGIN,
                SECTION_END,
            );
            let content = tags::trim_dangling_suffix(&remaining, &[SECTION_BEGIN]).trim();
            if !content.is_empty() {
                collector.push_text(ChannelType::Final, content);
            }
        }

        collector.finish()
    }

    fn parse_entry(
        &self,
        function_id: &str,
        function_args: &str,
    ) -> ChannelParserResult<(String, ToolRequest)> {
        let (name, _index) = parse_function_id(function_id)
            .ok_or_else(|| ChannelParserError::InvalidToolCallId(function_id.to_string()))?;
        let recipient = format!("functions.{}", name);
        let request = self
            .normalizer
            .from_parts(&name, function_args)?
            .with_recipient(recipient.clone());
        Ok((recipient, request))
    }
}

impl Default for KimiParser {
    fn default() -> Self {
        Self::new(&ChannelParserConfig::default())
    }
}

/// Parse function ID to extract name and index
fn parse_function_id(id: &str) -> Option<(String, usize)> {
    let captures = TOOL_CALL_ID.captures(id.trim())?;
    let name = captures.name("name")?.as_str().to_string();
    let index = captures.name("index")?.as_str().parse::<usize>().ok()?;
    Some((name, index))
}

fn remove_return_echoes(text: &str) -> String {
    RETURN_ECHO.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<ChannelMessage> {
        KimiParser::default().parse(text, &ChannelIdCache::new())
    }

    #[test]
    fn test_commentary_tools_final() {
        let input = r#"Let me help you with that.
<|tool_calls_section_begin|>
<|tool_call_begin|>functions.get_weather:0<|tool_call_argument_begin|>{"location": "Tokyo", "units": "celsius"}<|tool_call_end|>
<|tool_calls_section_end|>
The weather in Tokyo is..."#;

        let messages = parse(input);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].channel_type, ChannelType::Commentary);
        assert_eq!(messages[0].content, "Let me help you with that.");
        assert_eq!(messages[0].order, 0);

        let tool = &messages[1];
        assert_eq!(tool.channel_type, ChannelType::Tool);
        assert_eq!(tool.recipient.as_deref(), Some("functions.get_weather"));
        let request = tool.tool_request.as_ref().unwrap();
        assert_eq!(request.name, "get_weather");
        let args: serde_json::Value = serde_json::from_str(&request.arguments).unwrap();
        assert_eq!(args["location"], "Tokyo");

        assert_eq!(messages[2].channel_type, ChannelType::Final);
        assert_eq!(messages[2].content, "The weather in Tokyo is...");
    }

    #[test]
    fn test_multiple_entries_in_order() {
        let input = r#"<|tool_calls_section_begin|>
<|tool_call_begin|>functions.search:0<|tool_call_argument_begin|>{"query": "rust tutorials"}<|tool_call_end|>
<|tool_call_begin|>translate:1<|tool_call_argument_begin|>{"text": "Hello", "to": "ja"}<|tool_call_end|>
<|tool_calls_section_end|>"#;

        let messages = parse(input);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].recipient.as_deref(), Some("functions.search"));
        assert_eq!(messages[1].recipient.as_deref(), Some("functions.translate"));
        assert_eq!(messages[0].order, 0);
        assert_eq!(messages[1].order, 1);
    }

    #[test]
    fn test_open_section_emits_only_complete_entries() {
        let input = "Working on it<|tool_calls_section_begin|><|tool_call_begin|>functions.a:0<|tool_call_argument_begin|>{}<|tool_call_end|><|tool_call_begin|>functions.b:1<|tool_call_argument_begin|>{\"x\": ";
        let messages = parse(input);
        let types: Vec<_> = messages.iter().map(|m| m.channel_type).collect();
        assert_eq!(types, vec![ChannelType::Commentary, ChannelType::Tool]);
        assert_eq!(messages[1].recipient.as_deref(), Some("functions.a"));
    }

    #[test]
    fn test_partial_section_marker_withheld() {
        let messages = parse("Let me search <|tool_calls_sect");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel_type, ChannelType::Final);
        assert_eq!(messages[0].content, "Let me search");
    }

    #[test]
    fn test_malformed_arguments_dropped() {
        let input = "<|tool_calls_section_begin|><|tool_call_begin|>functions.a:0<|tool_call_argument_begin|>{oops}<|tool_call_end|><|tool_call_begin|>functions.b:1<|tool_call_argument_begin|>{}<|tool_call_end|><|tool_calls_section_end|>";
        let messages = parse(input);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipient.as_deref(), Some("functions.b"));
        assert_eq!(messages[0].order, 0);
    }

    #[test]
    fn test_invalid_id_dropped() {
        let input = "<|tool_calls_section_begin|><|tool_call_begin|>no_index<|tool_call_argument_begin|>{}<|tool_call_end|><|tool_calls_section_end|>";
        assert!(parse(input).is_empty());
    }

    #[test]
    fn test_return_echo_removed() {
        let input = "<|tool_calls_section_begin|><|tool_call_begin|>functions.search:0<|tool_call_argument_begin|>{}<|tool_call_end|><|tool_calls_section_end|>\n## Return of functions.search:0\n{\"hits\": 3}\n\nThere are three hits.";
        let messages = parse(input);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "There are three hits.");
    }

    #[test]
    fn test_plain_text_is_final() {
        let messages = parse("Hello there");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel_type, ChannelType::Final);
    }

    #[test]
    fn test_parse_function_id() {
        assert_eq!(
            parse_function_id("functions.search:0"),
            Some(("search".to_string(), 0))
        );
        assert_eq!(
            parse_function_id("get_weather:12"),
            Some(("get_weather".to_string(), 12))
        );
        assert_eq!(
            parse_function_id("functions.web.fetch:3"),
            Some(("web.fetch".to_string(), 3))
        );
        assert_eq!(parse_function_id("search"), None);
    }
}
