//! Channel parser module for splitting raw model output into channels
//!
//! Re-parses the full accumulated text on every call and keeps channel ids
//! stable through a turn-scoped identity cache.

pub mod errors;
pub mod factory;
pub mod identity;
pub mod parsers;
pub mod tags;
pub mod tool_call;
pub mod types;

// Re-export commonly used types
pub use errors::{ChannelParserError, ChannelParserResult};
pub use factory::{parse_channels, ChannelParser};
pub use identity::{ChannelIdCache, ChannelSignature};
pub use parsers::{ChatMlParser, HarmonyParser, KimiParser};
pub use tool_call::ToolCallNormalizer;
pub use types::{ChannelFormat, ChannelMessage, ChannelType, ToolRequest};
