//! ChatML Channel Parser Integration Tests

use channel_parser_rs::{
    channel_parser::ChatMlParser, parse_channels, ChannelFormat, ChannelIdCache, ChannelParser,
    ChannelParserConfigBuilder, ChannelType,
};

#[test]
fn test_chatml_think_then_answer() {
    let cache = ChannelIdCache::new();
    let messages = parse_channels("<think>Hello</think>World", ChannelFormat::ChatMl, &cache);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].channel_type, ChannelType::Analysis);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[0].order, 0);
    assert_eq!(messages[1].channel_type, ChannelType::Final);
    assert_eq!(messages[1].content, "World");
    assert_eq!(messages[1].order, 1);
}

#[test]
fn test_chatml_tool_call() {
    let cache = ChannelIdCache::new();
    let input = r#"<tool_call>{"name":"search","arguments":{"q":"x"}}</tool_call>"#;
    let messages = parse_channels(input, ChannelFormat::ChatMl, &cache);

    assert_eq!(messages.len(), 1);
    let tool = &messages[0];
    assert_eq!(tool.channel_type, ChannelType::Tool);
    assert_eq!(tool.recipient.as_deref(), Some("functions.search"));
    assert!(tool.is_dispatchable());

    let request = tool.tool_request.as_ref().unwrap();
    assert_eq!(request.name, "search");
    assert_eq!(request.arguments, r#"{"q":"x"}"#);
}

#[test]
fn test_chatml_pretty_arguments_are_compacted() {
    let cache = ChannelIdCache::new();
    let input = "<tool_call>\n{\n  \"name\": \"get_weather\",\n  \"arguments\": {\n    \"city\": \"Paris\",\n    \"days\": 3\n  }\n}\n</tool_call>";
    let messages = parse_channels(input, ChannelFormat::ChatMl, &cache);

    let request = messages[0].tool_request.as_ref().unwrap();
    let args: serde_json::Value = serde_json::from_str(&request.arguments).unwrap();
    assert_eq!(args["city"], "Paris");
    assert_eq!(args["days"], 3);
    assert!(!request.arguments.contains('\n'));
}

#[test]
fn test_chatml_multiple_tool_calls() {
    let cache = ChannelIdCache::new();
    let input = r#"<think>Two lookups needed</think>
<tool_call>{"name": "get_weather", "arguments": {"city": "Tokyo"}}</tool_call>
<tool_call>{"name": "functions.get_time", "parameters": {"tz": "JST"}}</tool_call>"#;
    let messages = parse_channels(input, ChannelFormat::ChatMl, &cache);

    let types: Vec<_> = messages.iter().map(|m| m.channel_type).collect();
    assert_eq!(
        types,
        vec![ChannelType::Analysis, ChannelType::Tool, ChannelType::Tool]
    );
    assert_eq!(messages[1].recipient.as_deref(), Some("functions.get_weather"));
    assert_eq!(messages[2].recipient.as_deref(), Some("functions.get_time"));
    assert_eq!(
        messages[2].tool_request.as_ref().unwrap().arguments,
        r#"{"tz":"JST"}"#
    );
}

#[test]
fn test_chatml_malformed_tool_json_dropped() {
    let cache = ChannelIdCache::new();
    let messages = parse_channels(
        "<tool_call>{not json}</tool_call>",
        ChannelFormat::ChatMl,
        &cache,
    );
    assert!(messages.iter().all(|m| m.channel_type != ChannelType::Tool));

    // A good block next to a bad one survives
    let messages = parse_channels(
        r#"<tool_call>{not json}</tool_call><tool_call>{"name":"ok","arguments":{}}</tool_call>"#,
        ChannelFormat::ChatMl,
        &cache,
    );
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].tool_request.as_ref().unwrap().name, "ok");
}

#[test]
fn test_chatml_streaming_sequence() {
    let parser = ChannelParser::new(ChannelFormat::ChatMl, &Default::default());
    let cache = ChannelIdCache::new();

    let messages = parser.parse("<think>Let me", &cache);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Let me");

    let messages = parser.parse("<think>Let me think</", &cache);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Let me think");

    let messages = parser.parse("<think>Let me think</think>The ans", &cache);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "The ans");

    let messages = parser.parse("<think>Let me think</think>The answer.<|im_end|>", &cache);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "The answer.");
}

#[test]
fn test_chatml_custom_tags() {
    let config = ChannelParserConfigBuilder::new()
        .thinking_tags("<reasoning>", "</reasoning>")
        .commentary_tags("<preamble>", "</preamble>")
        .build()
        .unwrap();
    let parser = ChatMlParser::new(&config);
    let messages = parser.parse(
        "<reasoning>plan</reasoning><preamble>Checking the docs</preamble>Done.",
        &ChannelIdCache::new(),
    );

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].channel_type, ChannelType::Analysis);
    assert_eq!(messages[0].content, "plan");
    assert_eq!(messages[1].channel_type, ChannelType::Commentary);
    assert_eq!(messages[1].content, "Checking the docs");
    assert_eq!(messages[2].channel_type, ChannelType::Final);
    assert_eq!(messages[2].content, "Done.");
}

#[test]
fn test_chatml_messages_serialize() {
    let cache = ChannelIdCache::new();
    let messages = parse_channels(
        r#"<think>hmm</think><tool_call>{"name":"search","arguments":{"q":"x"}}</tool_call>"#,
        ChannelFormat::ChatMl,
        &cache,
    );
    let json = serde_json::to_value(&messages).unwrap();

    assert_eq!(json[0]["type"], "analysis");
    assert!(json[0].get("recipient").is_none());
    assert_eq!(json[1]["type"], "tool");
    assert_eq!(json[1]["recipient"], "functions.search");
    assert_eq!(json[1]["tool_request"]["arguments"], r#"{"q":"x"}"#);
    assert_eq!(json[1]["id"], messages[1].id.to_string());
}
