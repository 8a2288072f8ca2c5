//! # Arashi
//!
//! A multi-protocol, type-safe chat bot framework for Rust.
//!
//! ## Overview
//!
//! Each chat protocol is handled by an adapter that owns the protocol's wire
//! vocabulary. The core crate defines the traits shared by all adapters so
//! that protocol-independent code can inspect any message:
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────────┐
//! │   arashi-core    │◀────│  arashi-adapter-onebot   │
//! │ Message traits   │     │  OneBot v11 segments     │
//! └──────────────────┘     └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arashi::prelude::*;
//! use arashi::onebot::{OneBotMessage, Segment};
//!
//! let msg = OneBotMessage::new([Segment::at(10001000), Segment::text(" hi")]);
//! assert_eq!(msg.extract_plain_text(), " hi");
//! ```
//!
//! ## Features
//!
//! - `adapter-onebot`: Enable the OneBot v11 adapter (default)

pub use arashi_core as core;

#[cfg(feature = "adapter-onebot")]
pub use arashi_adapter_onebot as onebot;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use arashi_core::prelude::*;

    #[cfg(feature = "adapter-onebot")]
    pub use arashi_adapter_onebot::{
        FileSource, ImageOptions, MessageError, MessageResult, OneBotMessage, Segment,
    };
}

#[cfg(all(test, feature = "adapter-onebot"))]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_exposes_core_traits() {
        let msg = OneBotMessage::new([Segment::at(10001000), Segment::text(" hi")]);
        assert_eq!(msg.extract_plain_text(), " hi");
        assert_eq!(msg.iter().next().map(|s| s.segment_type()), Some("at"));
    }
}
