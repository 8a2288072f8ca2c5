//! Data models for the OneBot v11 protocol.
//!
//! This module contains the message structures exchanged with OneBot v11
//! implementations.

pub mod message;
pub mod segment;

pub use message::{MessageBuilder, OneBotMessage, parse_cq_string};
pub use segment::{
    AtData, AtTarget, ImageData, ImageOptions, JsonData, PokeData, RawSegment, ReplyData, Segment,
    TextData, XmlData,
};
