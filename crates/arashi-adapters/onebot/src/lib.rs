//! # Arashi Adapter for OneBot v11
//!
//! Message representation for connecting the Arashi bot framework to
//! OneBot v11 implementations.
//!
//! ## Overview
//!
//! OneBot v11 describes chat content as an array of typed segments:
//!
//! ```json
//! [
//!   {"type": "reply", "data": {"id": "42"}},
//!   {"type": "at", "data": {"qq": 10001000, "name": ""}},
//!   {"type": "text", "data": {"text": " hello"}}
//! ]
//! ```
//!
//! This crate models those shapes:
//!
//! - [`Segment`]: one typed segment, with [`Segment::Raw`] for anything
//!   without a typed representation
//! - [`OneBotMessage`]: an ordered, frozen sequence of segments
//! - [`file`]: helpers that turn booleans, bytes and paths into wire values
//! - [`MessageConfig`]: configurable encoding defaults
//!
//! Sending and receiving is left to the transport layer.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arashi_adapter_onebot::{OneBotMessage, Segment};
//!
//! let msg = OneBotMessage::new([
//!     Segment::reply(42),
//!     Segment::text("Here you go: "),
//!     Segment::image(std::path::Path::new("./cat.png"))?,
//! ]);
//!
//! let payload = serde_json::to_value(&msg)?;
//! ```
//!
//! ## Formats
//!
//! Messages serialize as segment arrays. Both arrays and legacy CQ code
//! strings are accepted when deserializing; see [`parse_cq_string`].

pub mod config;
pub mod error;
pub mod file;
pub mod model;

pub use config::{MessageConfig, MessageFormat};
pub use error::{MessageError, MessageResult};
pub use file::{FileSource, base64_uri, bool_to_string, file_to_uri, path_to_file_uri};

// Re-export segment types
pub use model::segment::{
    AtData,
    AtTarget,
    ImageData,
    ImageOptions,
    JsonData,
    PokeData,
    RawSegment,
    ReplyData,
    Segment,
    TextData,
    XmlData,
    // CQ code utilities
    escape_cq_text,
    escape_cq_value,
    unescape_cq_text,
    unescape_cq_value,
};

// Re-export message type
pub use model::message::{MessageBuilder, OneBotMessage, parse_cq_string};
