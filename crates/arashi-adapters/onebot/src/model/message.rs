//! OneBot v11 Message type.
//!
//! This module provides the [`OneBotMessage`] type that implements
//! the [`arashi_core::Message`] trait, representing a complete message
//! composed of multiple segments.
//!
//! A message is frozen once built: segments keep the order they were given
//! in, and there is no API to add or remove segments afterwards. Use
//! [`MessageBuilder`] to assemble one step by step.
//!
//! # Message Formats
//!
//! OneBot v11 supports two message formats:
//! - **Array format**: A JSON array of message segments (recommended)
//! - **String format**: CQ-coded string (legacy, for compatibility)
//!
//! Messages always serialize as arrays and deserialize from either format.
//!
//! # Example
//!
//! ```rust,ignore
//! use arashi_adapter_onebot::OneBotMessage;
//!
//! let msg = OneBotMessage::builder()
//!     .text("Hello, ")
//!     .at(10001000)
//!     .text("! Check this out: ")
//!     .image("http://example.com/image.jpg")?
//!     .build();
//!
//! assert_eq!(msg.plain_text(), "Hello, ! Check this out: ");
//! ```

use arashi_core::{Message as MessageTrait, MessageSegment as MessageSegmentTrait};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::segment::{
    AtData, AtTarget, ImageData, JsonData, PokeData, ReplyData, Segment, XmlData, unescape_cq_text,
    unescape_cq_value,
};
use crate::error::MessageResult;
use crate::file::FileSource;

// ============================================================================
// OneBotMessage - The main message type
// ============================================================================

/// A OneBot v11 message composed of multiple segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OneBotMessage {
    segments: Vec<Segment>,
}

impl MessageTrait for OneBotMessage {
    type Segment = Segment;

    fn iter(&self) -> impl Iterator<Item = &Self::Segment> {
        self.segments.iter()
    }

    fn len(&self) -> usize {
        self.segments.len()
    }

    fn as_slice(&self) -> &[Self::Segment] {
        &self.segments
    }
}

// ============================================================================
// Serialization / Deserialization
// ============================================================================

impl Serialize for OneBotMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Always serialize as array format
        self.segments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OneBotMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MessageFormat {
            Array(Vec<Segment>),
            String(String),
        }

        match MessageFormat::deserialize(deserializer)? {
            MessageFormat::Array(segments) => Ok(OneBotMessage { segments }),
            MessageFormat::String(cq_string) => Ok(OneBotMessage::from_cq_string(&cq_string)),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl OneBotMessage {
    /// Creates a message from segments, keeping their order.
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Creates a message containing only plain text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::text(text)],
        }
    }

    /// Creates a message from a CQ code string.
    pub fn from_cq_string(cq_string: &str) -> Self {
        Self {
            segments: parse_cq_string(cq_string),
        }
    }

    /// Starts building a message segment by segment.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }
}

// ============================================================================
// Accessors and Queries
// ============================================================================

impl OneBotMessage {
    /// Returns the segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Converts the message into a vector of segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Concatenates the text of every text segment, in order.
    pub fn plain_text(&self) -> String {
        self.extract_plain_text()
    }

    /// Converts the message to CQ code string format.
    pub fn to_cq_string(&self) -> String {
        self.segments.iter().map(Segment::to_cq_code).collect()
    }

    /// Returns the first text segment's content, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.segments
            .iter()
            .find_map(|seg| MessageSegmentTrait::as_text(seg))
    }

    /// Checks if the message contains only text segments.
    pub fn is_plain_text(&self) -> bool {
        self.segments.iter().all(Segment::is_text)
    }

    /// Returns all @mention QQ numbers in the message.
    pub fn mentioned_users(&self) -> Vec<i64> {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                Segment::At(data) => data.qq.user_id(),
                _ => None,
            })
            .collect()
    }

    /// Checks if the message contains @all.
    pub fn mentions_all(&self) -> bool {
        self.segments
            .iter()
            .any(|seg| matches!(seg, Segment::At(data) if data.qq == AtTarget::All))
    }

    /// Gets the reply message ID if this is a reply.
    pub fn reply_to(&self) -> Option<&str> {
        self.segments.iter().find_map(|seg| match seg {
            Segment::Reply(data) => Some(data.id.as_str()),
            _ => None,
        })
    }
}

// ============================================================================
// MessageBuilder
// ============================================================================

/// Builder for [`OneBotMessage`].
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    segments: Vec<Segment>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text segment.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.segment(Segment::text(text))
    }

    /// Adds an @mention segment.
    pub fn at(self, qq: i64) -> Self {
        self.segment(Segment::at(qq))
    }

    /// Adds an @all segment.
    pub fn at_all(self) -> Self {
        self.segment(Segment::at_all())
    }

    /// Adds an image segment with default options.
    pub fn image(self, file: impl Into<FileSource>) -> MessageResult<Self> {
        Ok(self.segment(Segment::image(file)?))
    }

    /// Adds a poke segment.
    pub fn poke(self, qq: i64) -> Self {
        self.segment(Segment::poke(qq))
    }

    /// Adds an XML message segment.
    pub fn xml(self, data: impl Into<String>) -> Self {
        self.segment(Segment::xml(data))
    }

    /// Adds a JSON message segment.
    pub fn json(self, data: &Value) -> Self {
        self.segment(Segment::json(data))
    }

    /// Adds a reply segment.
    pub fn reply(self, id: i64) -> Self {
        self.segment(Segment::reply(id))
    }

    /// Adds a prebuilt segment.
    pub fn segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Appends multiple segments.
    pub fn extend(mut self, segments: impl IntoIterator<Item = Segment>) -> Self {
        self.segments.extend(segments);
        self
    }

    /// Freezes the collected segments into a message.
    pub fn build(self) -> OneBotMessage {
        OneBotMessage {
            segments: self.segments,
        }
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<Vec<Segment>> for OneBotMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<Segment> for OneBotMessage {
    fn from(segment: Segment) -> Self {
        Self {
            segments: vec![segment],
        }
    }
}

impl From<&str> for OneBotMessage {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for OneBotMessage {
    fn from(text: String) -> Self {
        Self::from_text(text)
    }
}

impl FromIterator<Segment> for OneBotMessage {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl IntoIterator for OneBotMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a OneBotMessage {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

// ============================================================================
// CQ Code Parsing
// ============================================================================

/// Parses a CQ code string into a vector of segments.
///
/// This handles the string format where text and CQ codes are mixed:
/// ```text
/// Hello [CQ:at,qq=10001000] World [CQ:face,id=178]
/// ```
///
/// Parsing never fails. CQ codes of unknown kinds, or with parameters that do
/// not fit the kind's schema, become [`Segment::Raw`] with string values. A
/// parameter without `=` is kept with an empty value.
pub fn parse_cq_string(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let at_code = |pos: usize| pos + 4 <= len && chars[pos..pos + 4] == ['[', 'C', 'Q', ':'];

    while pos < len {
        if at_code(pos) {
            pos += 4; // Skip [CQ:

            // Kind runs up to , or ]
            let kind_start = pos;
            while pos < len && chars[pos] != ',' && chars[pos] != ']' {
                pos += 1;
            }
            let kind: String = chars[kind_start..pos].iter().collect();

            let mut params = CqParams::default();
            while pos < len && chars[pos] == ',' {
                pos += 1; // Skip ,

                let key_start = pos;
                while pos < len && chars[pos] != '=' && chars[pos] != ']' {
                    pos += 1;
                }
                let key: String = chars[key_start..pos].iter().collect();

                let mut value = String::new();
                if pos < len && chars[pos] == '=' {
                    pos += 1; // Skip =

                    let value_start = pos;
                    while pos < len && chars[pos] != ',' && chars[pos] != ']' {
                        pos += 1;
                    }
                    let raw: String = chars[value_start..pos].iter().collect();
                    value = unescape_cq_value(&raw);
                }
                params.0.push((key, value));
            }

            // Skip the closing ]
            if pos < len && chars[pos] == ']' {
                pos += 1;
            }

            segments.push(params.into_segment(kind));
        } else {
            // Regular text - collect until the next CQ code or end
            let start = pos;
            while pos < len && !at_code(pos) {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let text = unescape_cq_text(&text);
            if !text.is_empty() {
                segments.push(Segment::text(text));
            }
        }
    }

    segments
}

/// Parameters of one parsed CQ code, in source order.
#[derive(Default)]
struct CqParams(Vec<(String, String)>);

impl CqParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Succeeds only if every parameter is one of `keys`.
    fn only(&self, keys: &[&str]) -> Option<()> {
        self.0
            .iter()
            .all(|(k, _)| keys.contains(&k.as_str()))
            .then_some(())
    }

    fn into_segment(self, kind: String) -> Segment {
        match self.typed(&kind) {
            Some(segment) => segment,
            None => {
                let data: Map<String, Value> = self
                    .0
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                Segment::raw(kind, data)
            }
        }
    }

    fn typed(&self, kind: &str) -> Option<Segment> {
        let present = |key: &str| self.get(key).map(|v| Some(v.to_string()));
        let segment = match kind {
            "at" => {
                self.only(&["qq", "name"])?;
                Segment::At(AtData {
                    qq: self.get("qq")?.parse().ok()?,
                    name: self.get("name").unwrap_or_default().to_string(),
                })
            }
            "image" => {
                self.only(&["file", "type", "url", "cache", "proxy", "timeout"])?;
                let timeout = match self.get("timeout") {
                    Some(t) => Some(Some(t.parse().ok()?)),
                    None => None,
                };
                Segment::Image(ImageData {
                    file: self.get("file")?.to_string(),
                    image_type: present("type"),
                    cache: present("cache"),
                    proxy: present("proxy"),
                    timeout,
                    url: self.get("url").map(ToString::to_string),
                })
            }
            "poke" => {
                self.only(&["qq"])?;
                Segment::Poke(PokeData {
                    qq: self.get("qq")?.to_string(),
                })
            }
            "xml" => {
                self.only(&["data"])?;
                Segment::Xml(XmlData {
                    data: self.get("data")?.to_string(),
                })
            }
            "json" => {
                self.only(&["data"])?;
                Segment::Json(JsonData {
                    data: self.get("data")?.to_string(),
                })
            }
            "reply" => {
                self.only(&["id"])?;
                Segment::Reply(ReplyData {
                    id: self.get("id")?.to_string(),
                })
            }
            _ => return None,
        };
        Some(segment)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::segment::TextData;
    use super::*;

    #[test]
    fn test_plain_text_of_single_text() {
        for content in ["", "Hello", "你好, [world] & more"] {
            let msg = OneBotMessage::new([Segment::text(content)]);
            assert_eq!(msg.plain_text(), content);
        }
    }

    #[test]
    fn test_plain_text_skips_non_text() {
        let msg = OneBotMessage::new([
            Segment::text("Hello, "),
            Segment::at(10001000),
            Segment::reply(1),
            Segment::text("world"),
            Segment::poke(2),
        ]);
        assert_eq!(msg.plain_text(), "Hello, world");

        let msg = OneBotMessage::new([Segment::at(1), Segment::xml("<a/>")]);
        assert_eq!(msg.plain_text(), "");
        assert_eq!(OneBotMessage::default().plain_text(), "");
    }

    #[test]
    fn test_segments_keep_order() {
        let a = Segment::text("A");
        let b = Segment::at(2);
        let msg = OneBotMessage::new([a.clone(), b.clone()]);
        assert_eq!(msg.segments(), &[a.clone(), b.clone()]);
        assert_ne!(msg.segments(), &[b, a]);
    }

    #[test]
    fn test_message_builder() {
        let msg = OneBotMessage::builder()
            .reply(99)
            .text("Hello, ")
            .at(10001000)
            .image("abc.image")
            .unwrap()
            .text("!")
            .build();

        assert_eq!(msg.len(), 5);
        assert_eq!(msg.plain_text(), "Hello, !");
        assert_eq!(msg.reply_to(), Some("99"));
    }

    #[test]
    fn test_message_serialize_array() {
        let msg = OneBotMessage::new([Segment::text("Hello"), Segment::reply(178)]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"text","data":{"text":"Hello"}},{"type":"reply","data":{"id":"178"}}]"#
        );
    }

    #[test]
    fn test_message_deserialize_array() {
        let json =
            r#"[{"type":"text","data":{"text":"Hello"}},{"type":"at","data":{"qq":"10001000"}}]"#;
        let msg: OneBotMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.len(), 2);
        assert_eq!(msg.plain_text(), "Hello");
        assert_eq!(msg.mentioned_users(), vec![10001000]);
    }

    #[test]
    fn test_message_deserialize_string() {
        let json = r#""Hello [CQ:face,id=178] World""#;
        let msg: OneBotMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.plain_text(), "Hello  World");
    }

    #[test]
    fn test_unknown_segments_survive_message_round_trip() {
        let wire = json!([
            {"type": "text", "data": {"text": "look "}},
            {"type": "mface", "data": {"emoji_id": "abc", "summary": "[smile]"}},
        ]);
        let msg: OneBotMessage = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(serde_json::to_value(&msg).unwrap(), wire);
    }

    #[test]
    fn test_parse_cq_string() {
        let segments = parse_cq_string("Hello [CQ:face,id=178] World");
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[0], Segment::Text(TextData { text }) if text == "Hello "));
        assert!(matches!(&segments[1], Segment::Raw(raw) if raw.kind == "face"));
        assert!(matches!(&segments[2], Segment::Text(TextData { text }) if text == " World"));
    }

    #[test]
    fn test_parse_cq_string_typed() {
        let segments = parse_cq_string(
            "[CQ:reply,id=7][CQ:at,qq=10001000]你好[CQ:image,file=123.jpg,timeout=5][CQ:poke,qq=3]",
        );
        assert_eq!(
            segments,
            vec![
                Segment::reply(7),
                Segment::at(10001000),
                Segment::text("你好"),
                Segment::Image(ImageData {
                    file: "123.jpg".to_string(),
                    image_type: None,
                    cache: None,
                    proxy: None,
                    timeout: Some(Some(5)),
                    url: None,
                }),
                Segment::poke(3),
            ]
        );
    }

    #[test]
    fn test_parse_cq_string_malformed_is_raw() {
        let segments = parse_cq_string("[CQ:image,timeout=soon][CQ:reply]");
        assert_eq!(segments.len(), 2);

        let mut data = Map::new();
        data.insert("timeout".to_string(), json!("soon"));
        assert_eq!(segments[0], Segment::raw("image", data));
        assert_eq!(segments[1], Segment::raw("reply", Map::new()));
    }

    #[test]
    fn test_parse_cq_string_extra_params_are_raw() {
        let segments = parse_cq_string("[CQ:image,file=a.jpg,subType=1][CQ:at,qq=all,extra=x]");

        let mut image = Map::new();
        image.insert("file".to_string(), json!("a.jpg"));
        image.insert("subType".to_string(), json!("1"));
        let mut at = Map::new();
        at.insert("qq".to_string(), json!("all"));
        at.insert("extra".to_string(), json!("x"));
        assert_eq!(segments, vec![Segment::raw("image", image), Segment::raw("at", at)]);
        assert_eq!(segments[0].to_cq_code(), "[CQ:image,file=a.jpg,subType=1]");
    }

    #[test]
    fn test_parse_cq_string_keeps_bare_params() {
        let segments = parse_cq_string("[CQ:face,id][CQ:shake,a=1,b]");

        let mut face = Map::new();
        face.insert("id".to_string(), json!(""));
        let mut shake = Map::new();
        shake.insert("a".to_string(), json!("1"));
        shake.insert("b".to_string(), json!(""));
        assert_eq!(segments, vec![Segment::raw("face", face), Segment::raw("shake", shake)]);
    }

    #[test]
    fn test_cq_string_round_trip() {
        let msg = OneBotMessage::new([
            Segment::text("a [b] & c"),
            Segment::at_named(1, "x,y"),
            Segment::json(&json!({"k": [1, 2]})),
            Segment::reply(5),
        ]);
        let cq = msg.to_cq_string();
        assert_eq!(OneBotMessage::from_cq_string(&cq), msg);
    }

    #[test]
    fn test_to_cq_string() {
        let msg = OneBotMessage::new([
            Segment::text("Hello "),
            Segment::at(178),
            Segment::text(" World"),
        ]);
        assert_eq!(msg.to_cq_string(), "Hello [CQ:at,qq=178] World");
    }

    #[test]
    fn test_mentioned_users() {
        let msg = OneBotMessage::builder()
            .at(10001000)
            .text(" and ")
            .at(10001001)
            .at_all()
            .build();

        assert_eq!(msg.mentioned_users(), vec![10001000, 10001001]);
        assert!(msg.mentions_all());
        assert!(!msg.is_plain_text());
        assert_eq!(msg.first_text(), Some(" and "));
    }

    #[test]
    fn test_message_trait() {
        let msg = OneBotMessage::new([
            Segment::text("Hello"),
            Segment::image("test.jpg").unwrap(),
            Segment::text(" World"),
        ]);

        assert_eq!(msg.len(), 3);
        assert!(!msg.is_empty());
        assert_eq!(msg.extract_plain_text(), "Hello World");
        assert_eq!(msg.as_slice().len(), 3);
        assert_eq!(msg.display(), "Hello[图片:test.jpg] World");
    }

    #[test]
    fn test_from_implementations() {
        let msg: OneBotMessage = "Hello".into();
        assert_eq!(msg.plain_text(), "Hello");
        assert!(msg.is_plain_text());

        let msg: OneBotMessage = String::from("World").into();
        assert_eq!(msg.plain_text(), "World");

        let msg: OneBotMessage = Segment::poke(178).into();
        assert_eq!(msg.len(), 1);

        let msg: OneBotMessage = vec![Segment::text("A"), Segment::text("B")].into();
        assert_eq!(msg.len(), 2);

        let msg: OneBotMessage = (1..=3).map(Segment::reply).collect();
        let ids: Vec<_> = msg.into_iter().map(|s| s.to_cq_code()).collect();
        assert_eq!(ids, ["[CQ:reply,id=1]", "[CQ:reply,id=2]", "[CQ:reply,id=3]"]);
    }

    #[test]
    fn test_cq_escaping() {
        let segments = parse_cq_string("&#91;escaped&#93; &amp; test");
        assert_eq!(segments.len(), 1);
        assert!(
            matches!(&segments[0], Segment::Text(TextData { text }) if text == "[escaped] & test")
        );
    }
}
