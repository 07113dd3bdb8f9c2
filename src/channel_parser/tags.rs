// Dialect-agnostic helpers for pulling content out of start/end tag pairs
// in a buffer that may still be growing.

/// How many trailing characters are inspected for a dangling `<`.
pub const MAX_PARTIAL_TAG_LOOKBACK: usize = 20;

/// Content found between a start tag and (possibly) its end tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedContent<'a> {
    pub content: &'a str,
    /// False while the end tag has not arrived yet
    pub is_complete: bool,
}

/// Extract the content following the first `start_tag`.
///
/// When `end_tag` follows, the interior is returned as complete. Otherwise the
/// rest of the buffer is returned as incomplete, minus any dangling partial tag
/// at its end so a half-received `</thi` is never surfaced.
pub fn extract_progressive_tagged_content<'a>(
    text: &'a str,
    start_tag: &str,
    end_tag: &str,
) -> Option<TaggedContent<'a>> {
    if start_tag.is_empty() {
        return None;
    }
    let start = text.find(start_tag)? + start_tag.len();
    let rest = &text[start..];

    if !end_tag.is_empty() {
        if let Some(end) = rest.find(end_tag) {
            return Some(TaggedContent {
                content: &rest[..end],
                is_complete: true,
            });
        }
    }

    Some(TaggedContent {
        content: trim_dangling_suffix(rest, &[end_tag]),
        is_complete: false,
    })
}

/// Remove the first `start_tag`..`end_tag` block (inclusive).
///
/// An unterminated block is removed through the end of the buffer.
pub fn remove_tagged_block(text: &str, start_tag: &str, end_tag: &str) -> String {
    if start_tag.is_empty() {
        return text.to_string();
    }
    let Some(start) = text.find(start_tag) else {
        return text.to_string();
    };

    let after_start = start + start_tag.len();
    match (!end_tag.is_empty())
        .then(|| text[after_start..].find(end_tag))
        .flatten()
    {
        Some(end) => {
            let block_end = after_start + end + end_tag.len();
            let mut result = String::with_capacity(text.len() - (block_end - start));
            result.push_str(&text[..start]);
            result.push_str(&text[block_end..]);
            result
        }
        None => text[..start].to_string(),
    }
}

/// Remove every block delimited by the tag pair, truncating at an
/// unterminated trailing one.
pub fn remove_all_tagged_blocks(text: &str, start_tag: &str, end_tag: &str) -> String {
    let mut current = text.to_string();
    while !start_tag.is_empty() && current.contains(start_tag) {
        let next = remove_tagged_block(&current, start_tag, end_tag);
        if next.len() == current.len() {
            break;
        }
        current = next;
    }
    current
}

/// Number of trailing bytes to withhold because they look like a tag that
/// has not finished arriving (a `<` with no `>` after it).
///
/// Only the last [`MAX_PARTIAL_TAG_LOOKBACK`] characters are inspected, so the
/// cost does not grow with the buffer. A `<` followed by whitespace is plain
/// text, not a tag.
pub fn has_incomplete_tag_suffix(text: &str) -> Option<usize> {
    let window_start = text
        .char_indices()
        .rev()
        .take(MAX_PARTIAL_TAG_LOOKBACK)
        .last()
        .map(|(idx, _)| idx)?;
    let window = &text[window_start..];

    let lt = window.rfind('<')?;
    let fragment = &window[lt + 1..];
    if fragment.contains('>') || fragment.chars().any(char::is_whitespace) {
        return None;
    }
    Some(window.len() - lt)
}

/// Check if a buffer ends with a partial occurrence of a token
pub fn ends_with_partial_token(buffer: &str, token: &str) -> bool {
    partial_token_suffix_len(buffer, token) > 0
}

fn partial_token_suffix_len(buffer: &str, token: &str) -> usize {
    if buffer.is_empty() || token.is_empty() {
        return 0;
    }

    // Longest proper prefix of `token` that the buffer ends with
    (1..token.len())
        .rev()
        .filter_map(|i| token.get(..i))
        .find(|prefix| buffer.ends_with(prefix))
        .map_or(0, str::len)
}

/// Drop a trailing partial tag from `text`.
///
/// Covers both the generic dangling `<` check and proper prefixes of the
/// given markers, which matters for markers longer than the lookback window.
pub fn trim_dangling_suffix<'a>(text: &'a str, markers: &[&str]) -> &'a str {
    let generic = has_incomplete_tag_suffix(text).unwrap_or(0);
    let marker = markers
        .iter()
        .map(|m| partial_token_suffix_len(text, m))
        .max()
        .unwrap_or(0);
    &text[..text.len() - generic.max(marker)]
}
