use super::{ChannelLabels, ChannelParserConfig, ConfigResult, TagPair};

/// Builder for ChannelParserConfig that wraps the config itself
#[derive(Debug, Clone, Default)]
pub struct ChannelParserConfigBuilder {
    config: ChannelParserConfig,
}

impl ChannelParserConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing configuration (takes ownership)
    pub fn from_config(config: ChannelParserConfig) -> Self {
        Self { config }
    }

    pub fn thinking_tags(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.config.thinking_tags = TagPair::new(start, end);
        self
    }

    pub fn commentary_tags(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.config.commentary_tags = Some(TagPair::new(start, end));
        self
    }

    pub fn assume_reasoning(mut self, enable: bool) -> Self {
        self.config.assume_reasoning = enable;
        self
    }

    pub fn end_label(mut self, label: impl Into<String>) -> Self {
        self.config.end_label = Some(label.into());
        self
    }

    pub fn no_end_label(mut self) -> Self {
        self.config.end_label = None;
        self
    }

    pub fn channel_labels(mut self, labels: ChannelLabels) -> Self {
        self.config.channel_labels = labels;
        self
    }

    pub fn known_tool(mut self, name: impl Into<String>) -> Self {
        self.config.known_tools.push(name.into());
        self
    }

    pub fn known_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .known_tools
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<ChannelParserConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Return the configuration without validating it
    pub fn build_unchecked(self) -> ChannelParserConfig {
        self.config
    }
}
