//! Configuration types for OneBot message encoding.
//!
//! This module defines the message section of the adapter configuration.
//!
//! # Example Configuration
//!
//! ```yaml
//! adapters:
//!   onebot:
//!     message:
//!       # "array" (segment list) or "string" (CQ code)
//!       message_format: array
//!       # Defaults applied to image segments built from configuration
//!       image:
//!         cache: true
//!         proxy: false
//!         timeout: 30
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageResult;
use crate::file::FileSource;
use crate::model::{ImageOptions, OneBotMessage, Segment};

/// Encoding used when handing messages to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// JSON array of segments.
    #[default]
    Array,
    /// CQ-coded string.
    String,
}

/// Message encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Outbound message format.
    pub message_format: MessageFormat,

    /// Defaults for image segments.
    pub image: ImageOptions,
}

impl MessageConfig {
    /// Encodes a message in the configured format.
    pub fn encode(&self, message: &OneBotMessage) -> MessageResult<Value> {
        match self.message_format {
            MessageFormat::Array => Ok(serde_json::to_value(message)?),
            MessageFormat::String => Ok(Value::String(message.to_cq_string())),
        }
    }

    /// Builds an image segment using the configured image defaults.
    pub fn image(&self, file: impl Into<FileSource>) -> MessageResult<Segment> {
        Segment::image_with(file, self.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
message_format: string
image:
  cache: false
  timeout: 30
"#;

        let config: MessageConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.message_format, MessageFormat::String);
        assert_eq!(config.image.cache, Some(false));
        // Unspecified fields keep their defaults
        assert_eq!(config.image.proxy, Some(true));
        assert_eq!(config.image.image_type, None);
        assert_eq!(config.image.timeout, Some(30));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: MessageConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, MessageConfig::default());
        assert_eq!(config.message_format, MessageFormat::Array);
        assert_eq!(config.image, ImageOptions::default());
    }

    #[test]
    fn test_explicit_null_clears_flag() {
        let yaml = "image:\n  cache: null\n";
        let config: MessageConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.image.cache, None);

        let segment = config.image("abc.image").unwrap();
        assert_eq!(
            serde_json::to_value(&segment).unwrap()["data"],
            json!({
                "file": "abc.image",
                "type": null,
                "cache": null,
                "proxy": "true",
                "timeout": null,
            })
        );
    }

    #[test]
    fn test_encode_formats() {
        let message = OneBotMessage::new([Segment::reply(1), Segment::text("[hi]")]);

        let config = MessageConfig::default();
        assert_eq!(
            config.encode(&message).unwrap(),
            json!([
                {"type": "reply", "data": {"id": "1"}},
                {"type": "text", "data": {"text": "[hi]"}},
            ])
        );

        let config = MessageConfig {
            message_format: MessageFormat::String,
            ..Default::default()
        };
        assert_eq!(
            config.encode(&message).unwrap(),
            json!("[CQ:reply,id=1]&#91;hi&#93;")
        );
    }
}
