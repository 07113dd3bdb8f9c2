//! Kimi K2 Channel Parser Integration Tests

use channel_parser_rs::{parse_channels, ChannelFormat, ChannelIdCache, ChannelType};

#[test]
fn test_kimi_two_entries() {
    let cache = ChannelIdCache::new();
    let input = r#"<|tool_calls_section_begin|>
<|tool_call_begin|>functions.search:0<|tool_call_argument_begin|>{"query": "rust programming"}<|tool_call_end|>
<|tool_call_begin|>functions.calculate:1<|tool_call_argument_begin|>{"expression": "2 + 2"}<|tool_call_end|>
<|tool_calls_section_end|>"#;
    let messages = parse_channels(input, ChannelFormat::Kimi, &cache);

    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.channel_type == ChannelType::Tool));
    assert_eq!(messages[0].recipient.as_deref(), Some("functions.search"));
    assert_eq!(messages[1].recipient.as_deref(), Some("functions.calculate"));
    assert_ne!(messages[0].id, messages[1].id);

    let args: serde_json::Value =
        serde_json::from_str(&messages[1].tool_request.as_ref().unwrap().arguments).unwrap();
    assert_eq!(args["expression"], "2 + 2");
}

#[test]
fn test_kimi_commentary_tools_final() {
    let cache = ChannelIdCache::new();
    let input = r#"I'll check the weather.
<|tool_calls_section_begin|>
<|tool_call_begin|>functions.get_weather:0<|tool_call_argument_begin|>{"location": "Tokyo"}<|tool_call_end|>
<|tool_calls_section_end|>
It is sunny in Tokyo."#;
    let messages = parse_channels(input, ChannelFormat::Kimi, &cache);

    let types: Vec<_> = messages.iter().map(|m| m.channel_type).collect();
    assert_eq!(
        types,
        vec![ChannelType::Commentary, ChannelType::Tool, ChannelType::Final]
    );
    assert_eq!(messages[0].content, "I'll check the weather.");
    assert_eq!(messages[2].content, "It is sunny in Tokyo.");
}

#[test]
fn test_kimi_streaming_section() {
    let cache = ChannelIdCache::new();
    let complete_entry = r#"<|tool_call_begin|>functions.search:0<|tool_call_argument_begin|>{"q": "a"}<|tool_call_end|>"#;

    let partial = format!("Searching<|tool_calls_section_begin|>{}<|tool_call_begin|>functions.sea", complete_entry);
    let messages = parse_channels(&partial, ChannelFormat::Kimi, &cache);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].channel_type, ChannelType::Tool);
    let first_id = messages[1].id;

    let closed = format!(
        "Searching<|tool_calls_section_begin|>{}<|tool_calls_section_end|>",
        complete_entry
    );
    let messages = parse_channels(&closed, ChannelFormat::Kimi, &cache);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].id, first_id);
}

#[test]
fn test_kimi_malformed_entry_dropped() {
    let cache = ChannelIdCache::new();
    let input = "<|tool_calls_section_begin|><|tool_call_begin|>functions.f:0<|tool_call_argument_begin|>{nope<|tool_call_end|><|tool_calls_section_end|>Sorry.";
    let messages = parse_channels(input, ChannelFormat::Kimi, &cache);

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel_type, ChannelType::Final);
    assert_eq!(messages[0].content, "Sorry.");
}

#[test]
fn test_kimi_plain_text() {
    let cache = ChannelIdCache::new();
    let messages = parse_channels("Just text.", ChannelFormat::Kimi, &cache);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel_type, ChannelType::Final);
}
