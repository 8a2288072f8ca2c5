//! Message traits for the Arashi framework.
//!
//! # Architecture
//!
//! The message system is built around two core abstractions:
//! - [`MessageSegment`]: A single unit of content (text, image, etc.)
//! - [`Message`]: An ordered collection of segments forming a complete message
//!
//! Protocol adapters implement these traits for their own segment and message
//! types. Order is meaningful: it is the order in which content is displayed
//! and sent.

use std::fmt::Debug;

// ============================================================================
// Message Segment Trait
// ============================================================================

/// A single segment of a message.
///
/// A segment is the smallest unit of content in a message: plain text, an
/// image, a mention, and so on. Every segment carries a type tag taken from
/// the protocol's vocabulary.
///
/// # Example
///
/// ```rust,ignore
/// use arashi_core::MessageSegment;
///
/// fn describe<S: MessageSegment>(segment: &S) {
///     println!("Segment type: {}", segment.segment_type());
///     if segment.is_text() {
///         println!("Text content: {:?}", segment.as_text());
///     }
/// }
/// ```
pub trait MessageSegment: Debug + Clone + Send + Sync + 'static {
    /// Returns the type tag of this segment (e.g., "text", "image", "at").
    fn segment_type(&self) -> &str;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.segment_type() == "text"
    }

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;

    /// Returns a string representation suitable for display.
    fn display(&self) -> String;
}

// ============================================================================
// Message Trait
// ============================================================================

/// A complete message composed of segments.
pub trait Message: Debug + Clone + Send + Sync + 'static {
    /// The segment type used by this message.
    type Segment: MessageSegment;

    /// Returns an iterator over the message segments, in order.
    fn iter(&self) -> impl Iterator<Item = &Self::Segment>;

    /// Returns the number of segments in the message.
    fn len(&self) -> usize;

    /// Returns true if the message has no segments.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extracts all plain text content from the message.
    ///
    /// Concatenates the text of every text segment in order. Non-text
    /// segments contribute nothing, not even a separator.
    fn extract_plain_text(&self) -> String {
        self.iter().filter_map(|seg| seg.as_text()).collect()
    }

    /// Returns a display string representation of the entire message.
    fn display(&self) -> String {
        self.iter().map(MessageSegment::display).collect()
    }

    /// Returns the segments as a slice.
    fn as_slice(&self) -> &[Self::Segment];
}
