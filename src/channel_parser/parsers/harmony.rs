// Harmony-style channel parser.
//
// Grammar: <|channel|>NAME<|message|>BODY[<|recipient|>R]TERMINATOR where the
// terminator is one of <|end|>, <|return|> or <|call|>. The text is scanned by
// hand, one <|channel|> segment at a time, so a body can never run into the
// next channel.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    channel_parser::{
        identity::ChannelIdCache,
        tags,
        tool_call::ToolCallNormalizer,
        types::{ChannelCollector, ChannelMessage, ChannelType},
    },
    config::{ChannelLabels, ChannelParserConfig},
};

const START: &str = "<|start|>";
const CHANNEL: &str = "<|channel|>";
const MESSAGE: &str = "<|message|>";
const RECIPIENT: &str = "<|recipient|>";
const CONSTRAIN: &str = "<|constrain|>";
const TERMINATORS: [&str; 3] = ["<|end|>", "<|return|>", "<|call|>"];

/// `to=functions.NAME` addressing, either in the header or before the channel tag
static RECIPIENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"to=([^\s<]+)").expect("Valid regex pattern"));

/// One `<|channel|>` segment, split into its parts
#[derive(Debug)]
struct Segment<'a> {
    header: &'a str,
    body: &'a str,
    recipient: Option<&'a str>,
    /// Bytes consumed from the segment start through the terminator; `None`
    /// while the channel is still streaming
    consumed: Option<usize>,
}

/// Harmony format parser
///
/// Handles output shaped like:
/// `<|channel|>analysis<|message|>...<|end|><|start|>assistant<|channel|>final<|message|>...<|return|>`
///
/// Channels are emitted in order of appearance. Complete channels come first;
/// a trailing channel without a terminator is emitted as the one currently
/// streaming.
#[derive(Debug, Clone)]
pub struct HarmonyParser {
    labels: ChannelLabels,
    normalizer: ToolCallNormalizer,
}

impl HarmonyParser {
    pub fn new(config: &ChannelParserConfig) -> Self {
        Self {
            labels: config.channel_labels.clone(),
            normalizer: ToolCallNormalizer::new(config.known_tools.iter().cloned()),
        }
    }

    /// Check if text contains Harmony markers
    pub fn has_markup(&self, text: &str) -> bool {
        [START, CHANNEL, MESSAGE].iter().any(|m| text.contains(m))
    }

    pub fn parse(&self, text: &str, cache: &ChannelIdCache) -> Vec<ChannelMessage> {
        let mut collector = ChannelCollector::new(cache);

        let positions: Vec<usize> = text.match_indices(CHANNEL).map(|(i, _)| i).collect();
        if positions.is_empty() {
            let content = unframed_text(text);
            if !content.is_empty() {
                collector.push_text(ChannelType::Final, &content);
            }
            return collector.finish();
        }

        let mut preamble_start = 0;

        for (i, &pos) in positions.iter().enumerate() {
            let segment_start = pos + CHANNEL.len();
            let segment_end = positions.get(i + 1).copied().unwrap_or(text.len());
            let is_last = i + 1 == positions.len();
            let preamble = &text[preamble_start.min(pos)..pos];

            let Some(segment) = split_segment(&text[segment_start..segment_end]) else {
                // Header still arriving
                preamble_start = segment_end;
                continue;
            };

            match segment.consumed {
                Some(consumed) => {
                    self.emit_complete(&mut collector, &segment, preamble);
                    preamble_start = segment_start + consumed;
                }
                None if is_last => self.emit_streaming(&mut collector, &segment, preamble),
                None => {
                    tracing::debug!(
                        "Skipping unterminated harmony channel at byte {} followed by another channel",
                        pos
                    );
                    preamble_start = segment_end;
                }
            }
        }

        collector.finish()
    }

    fn emit_complete(
        &self,
        collector: &mut ChannelCollector<'_>,
        segment: &Segment<'_>,
        preamble: &str,
    ) {
        let (name, header_recipient) = parse_header(segment.header);
        let recipient = segment
            .recipient
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or(header_recipient)
            .or_else(|| preamble_recipient(preamble));
        let body = segment.body.trim();

        match recipient {
            Some(recipient) => match self.normalizer.from_parts(recipient, body) {
                Ok(request) => {
                    let request = request.with_recipient(recipient);
                    collector.push(
                        ChannelType::Tool,
                        body,
                        Some(recipient.to_string()),
                        Some(request),
                    );
                }
                Err(e) => {
                    tracing::warn!("Dropping tool channel for {}: {}", recipient, e);
                }
            },
            None => {
                if !body.is_empty() {
                    collector.push_text(self.labels.channel_type(name), body);
                }
            }
        }
    }

    fn emit_streaming(
        &self,
        collector: &mut ChannelCollector<'_>,
        segment: &Segment<'_>,
        preamble: &str,
    ) {
        let (name, header_recipient) = parse_header(segment.header);
        let recipient = header_recipient.or_else(|| preamble_recipient(preamble));

        let mut markers = vec![RECIPIENT, CHANNEL];
        markers.extend(TERMINATORS);
        let body = tags::trim_dangling_suffix(segment.body, &markers).trim();

        match recipient {
            Some(recipient) => {
                // Arguments are usually incomplete JSON until the terminator lands
                let request = self
                    .normalizer
                    .from_parts(recipient, body)
                    .ok()
                    .map(|r| r.with_recipient(recipient));
                collector.push(ChannelType::Tool, body, Some(recipient.to_string()), request);
            }
            None => {
                if !body.is_empty() {
                    collector.push_text(self.labels.channel_type(name), body);
                }
            }
        }
    }
}

impl Default for HarmonyParser {
    fn default() -> Self {
        Self::new(&ChannelParserConfig::default())
    }
}

/// Split the text following a `<|channel|>` tag. Returns `None` until the
/// `<|message|>` tag has arrived.
fn split_segment(segment: &str) -> Option<Segment<'_>> {
    let msg = segment.find(MESSAGE)?;
    let header = &segment[..msg];
    let after_start = msg + MESSAGE.len();
    let after = &segment[after_start..];

    let terminator = TERMINATORS
        .iter()
        .filter_map(|t| after.find(t).map(|idx| (idx, t.len())))
        .min_by_key(|(idx, _)| *idx);

    let (region, consumed) = match terminator {
        Some((idx, len)) => (&after[..idx], Some(after_start + idx + len)),
        None => (after, None),
    };

    let (body, recipient) = match region.find(RECIPIENT) {
        Some(idx) => (&region[..idx], Some(&region[idx + RECIPIENT.len()..])),
        None => (region, None),
    };

    Some(Segment {
        header,
        body,
        // A recipient is only trusted once the terminator closes it
        recipient: recipient.filter(|_| consumed.is_some()),
        consumed,
    })
}

/// Channel name and optional `to=` recipient from a channel header such as
/// `commentary to=functions.get_weather <|constrain|>json`
fn parse_header(header: &str) -> (&str, Option<&str>) {
    let header = header.split(CONSTRAIN).next().unwrap_or_default();
    let mut name = "";
    let mut recipient = None;
    for token in header.split_whitespace() {
        match token.strip_prefix("to=") {
            Some(r) if !r.is_empty() => recipient = Some(r),
            Some(_) => {}
            None if name.is_empty() => name = token,
            None => {}
        }
    }
    (name, recipient)
}

/// Text without any `<|channel|>` segment, minus `<|start|>ROLE<|message|>`
/// headers, stray message tags and terminators
fn unframed_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(START) {
        out.push_str(&rest[..start]);
        let after = &rest[start + START.len()..];
        match after.find(MESSAGE) {
            Some(msg) => rest = &after[msg + MESSAGE.len()..],
            // Role header still arriving
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);

    let mut out = out.replace(MESSAGE, "");
    for terminator in TERMINATORS {
        out = out.replace(terminator, "\n");
    }

    let mut markers = vec![START, CHANNEL, MESSAGE];
    markers.extend(TERMINATORS);
    tags::trim_dangling_suffix(&out, &markers).trim().to_string()
}

fn preamble_recipient(preamble: &str) -> Option<&str> {
    RECIPIENT_MARKER
        .captures_iter(preamble)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
