use std::collections::HashSet;

use super::*;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &ChannelParserConfig) -> ConfigResult<()> {
        Self::validate_tag_pair("thinking_tags", &config.thinking_tags)?;

        if let Some(commentary) = &config.commentary_tags {
            Self::validate_tag_pair("commentary_tags", commentary)?;
            if commentary.start == config.thinking_tags.start {
                return Err(ConfigError::ValidationFailed {
                    reason: "commentary_tags must differ from thinking_tags".to_string(),
                });
            }
        }

        if let Some(end_label) = &config.end_label {
            if end_label.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "end_label".to_string(),
                    value: String::new(),
                    reason: "Must not be empty; omit it instead".to_string(),
                });
            }
        }

        Self::validate_channel_labels(&config.channel_labels)?;
        Self::validate_known_tools(&config.known_tools)?;

        Ok(())
    }

    fn validate_tag_pair(field: &str, tags: &TagPair) -> ConfigResult<()> {
        if tags.start.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: format!("{}.start", field),
            });
        }
        if tags.end.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: format!("{}.end", field),
            });
        }
        if tags.start == tags.end {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: tags.start.clone(),
                reason: "Start and end tags must differ".to_string(),
            });
        }
        Ok(())
    }

    fn validate_channel_labels(labels: &ChannelLabels) -> ConfigResult<()> {
        let entries = [
            ("channel_labels.analysis", &labels.analysis),
            ("channel_labels.commentary", &labels.commentary),
            ("channel_labels.final", &labels.final_answer),
        ];

        let mut seen = HashSet::new();
        for (field, label) in entries {
            if label.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: field.to_string(),
                });
            }
            if !seen.insert(label.to_ascii_lowercase()) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: label.clone(),
                    reason: "Channel labels must be unique".to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_known_tools(tools: &[String]) -> ConfigResult<()> {
        if let Some(idx) = tools.iter().position(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("known_tools[{}]", idx),
                value: tools[idx].clone(),
                reason: "Tool names must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
