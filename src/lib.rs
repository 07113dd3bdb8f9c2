//! Streaming-safe parser that splits raw model output into channels.
//!
//! Supports ChatML-style think/tool_call tags, Harmony `<|channel|>` markup
//! and Kimi K2 tool call sections. Callers re-parse the whole accumulated
//! text on every update and hold one [`ChannelIdCache`] per turn so each
//! channel keeps its id while its content grows.

pub mod channel_parser;
pub mod config;
pub mod logging;

pub use channel_parser::{
    parse_channels, ChannelFormat, ChannelIdCache, ChannelMessage, ChannelParser, ChannelType,
    ToolRequest,
};
pub use config::{ChannelParserConfig, ChannelParserConfigBuilder};
