//! # Arashi Core
//!
//! Protocol-agnostic building blocks shared by every Arashi adapter.
//!
//! Adapters describe chat content in their own wire vocabulary. This crate
//! defines the two traits those vocabularies plug into, so that code above the
//! adapter layer can inspect a message without knowing which protocol it came
//! from:
//!
//! - [`MessageSegment`]: a single unit of content (text, image, mention, ...)
//! - [`Message`]: an ordered sequence of segments
//!
//! ## Example
//!
//! ```rust,ignore
//! use arashi_core::{Message, MessageSegment};
//!
//! fn log_message<M: Message>(msg: &M) {
//!     for segment in msg.iter() {
//!         println!("{}: {}", segment.segment_type(), segment.display());
//!     }
//!     println!("plain text: {}", msg.extract_plain_text());
//! }
//! ```

pub mod message;

pub use message::{Message, MessageSegment};

/// Prelude for common imports.
pub mod prelude {
    pub use super::message::{Message, MessageSegment};
}
