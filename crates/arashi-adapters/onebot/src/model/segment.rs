//! OneBot v11 Message Segment types.
//!
//! A message segment is a single unit of content in a message, such as plain
//! text, an image or a mention. On the wire every segment has the shape
//! `{"type": <tag>, "data": {...}}`, where the fields of `data` are fixed by
//! the tag.
//!
//! Segment kinds this crate knows get a strongly typed variant. Everything
//! else, including known tags whose `data` does not fit the schema or carries
//! keys the schema does not name, is kept as [`Segment::Raw`] so that
//! unfamiliar wire data survives a deserialize/serialize cycle unchanged.
//!
//! # CQ Code Mapping
//!
//! Each segment also has a CQ code form used by the legacy string format:
//! - `text` → plain text (escaped, no CQ code)
//! - `at` → `[CQ:at,qq=10001000]`
//! - `image` → `[CQ:image,file=xxx,cache=true,proxy=true]`
//! - etc.
//!
//! # Example
//!
//! ```rust,ignore
//! use arashi_adapter_onebot::{ImageOptions, Segment};
//!
//! let text = Segment::text("Hello, ");
//! let at = Segment::at(10001000);
//! let image = Segment::image(std::fs::read("cat.png")?)?;
//! let quoted = Segment::reply(42);
//! ```

use std::fmt;
use std::io::Read;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use arashi_core::MessageSegment as MessageSegmentTrait;

use crate::error::MessageResult;
use crate::file::{FileSource, bool_to_string};

// ============================================================================
// Segment Enum - The main message segment type
// ============================================================================

/// A OneBot v11 message segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text content.
    Text(TextData),
    /// @mention someone.
    At(AtData),
    /// Image.
    Image(ImageData),
    /// Poke message.
    Poke(PokeData),
    /// XML message.
    Xml(XmlData),
    /// JSON message.
    Json(JsonData),
    /// Reply to a message.
    Reply(ReplyData),
    /// Any segment without a typed representation, kept verbatim.
    Raw(RawSegment),
}

impl Segment {
    /// Returns the wire tag of this segment.
    pub fn kind(&self) -> &str {
        match self {
            Segment::Text(_) => "text",
            Segment::At(_) => "at",
            Segment::Image(_) => "image",
            Segment::Poke(_) => "poke",
            Segment::Xml(_) => "xml",
            Segment::Json(_) => "json",
            Segment::Reply(_) => "reply",
            Segment::Raw(raw) => &raw.kind,
        }
    }

    /// Builds a segment from its wire tag and `data` mapping.
    ///
    /// Known tags are parsed into their typed variant. Unknown tags, and known
    /// tags whose data does not match the schema, become [`Segment::Raw`].
    pub fn from_parts(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        let kind = kind.into();
        let value = Value::Object(data);

        let parsed = match kind.as_str() {
            "text" => Some(TextData::deserialize(&value).map(Segment::Text)),
            "at" => Some(AtData::deserialize(&value).map(Segment::At)),
            "image" => Some(ImageData::deserialize(&value).map(Segment::Image)),
            "poke" => Some(PokeData::deserialize(&value).map(Segment::Poke)),
            "xml" => Some(XmlData::deserialize(&value).map(Segment::Xml)),
            "json" => Some(JsonData::deserialize(&value).map(Segment::Json)),
            "reply" => Some(ReplyData::deserialize(&value).map(Segment::Reply)),
            _ => None,
        };

        match parsed {
            Some(Ok(segment)) => segment,
            Some(Err(err)) => {
                debug!(kind = %kind, error = %err, "segment data does not match schema, keeping it raw");
                Segment::Raw(RawSegment::from_value(kind, value))
            }
            None => Segment::Raw(RawSegment::from_value(kind, value)),
        }
    }
}

// ============================================================================
// Wire encoding
// ============================================================================

impl Serialize for Segment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Segment", 2)?;
        state.serialize_field("type", self.kind())?;
        match self {
            Segment::Text(data) => state.serialize_field("data", data)?,
            Segment::At(data) => state.serialize_field("data", data)?,
            Segment::Image(data) => state.serialize_field("data", data)?,
            Segment::Poke(data) => state.serialize_field("data", data)?,
            Segment::Xml(data) => state.serialize_field("data", data)?,
            Segment::Json(data) => state.serialize_field("data", data)?,
            Segment::Reply(data) => state.serialize_field("data", data)?,
            Segment::Raw(raw) => state.serialize_field("data", &raw.data)?,
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct WireSegment {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            data: Option<Map<String, Value>>,
        }

        let wire = WireSegment::deserialize(deserializer)?;
        Ok(Segment::from_parts(wire.kind, wire.data.unwrap_or_default()))
    }
}

/// Keeps an explicit `null` apart from an absent field.
///
/// Used with `#[serde(default)]`: absent stays `None`, `null` becomes
/// `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Accepts an id that implementations send either as a string or an integer.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or an integer, found {other}"
        ))),
    }
}

// ============================================================================
// Display and core trait
// ============================================================================

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(data) => write!(f, "{}", data.text),
            Segment::At(data) => match data.qq {
                AtTarget::All => write!(f, "@全体成员"),
                AtTarget::User(id) if data.name.is_empty() => write!(f, "@{id}"),
                AtTarget::User(_) => write!(f, "@{}", data.name),
            },
            Segment::Image(data) => {
                if data.file.starts_with(crate::file::BASE64_SCHEME) {
                    write!(f, "[图片]")
                } else {
                    write!(f, "[图片:{}]", data.file)
                }
            }
            Segment::Poke(data) => write!(f, "[戳一戳:{}]", data.qq),
            Segment::Xml(_) => write!(f, "[XML消息]"),
            Segment::Json(_) => write!(f, "[JSON消息]"),
            Segment::Reply(data) => write!(f, "[回复:{}]", data.id),
            Segment::Raw(raw) => write!(f, "[{}]", raw.kind),
        }
    }
}

impl MessageSegmentTrait for Segment {
    fn segment_type(&self) -> &str {
        self.kind()
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Segment Builder Methods
// ============================================================================

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(TextData { text: text.into() })
    }

    // --------------------------------
    // At
    // --------------------------------

    /// Creates an @mention segment for a specific user.
    pub fn at(qq: i64) -> Self {
        Self::at_named(qq, "")
    }

    /// Creates an @mention segment with a display name.
    ///
    /// The name is used by implementations when the user is not a member of
    /// the target group.
    pub fn at_named(qq: i64, name: impl Into<String>) -> Self {
        Segment::At(AtData {
            qq: AtTarget::User(qq),
            name: name.into(),
        })
    }

    /// Creates an @all segment to mention everyone.
    pub fn at_all() -> Self {
        Segment::At(AtData {
            qq: AtTarget::All,
            name: String::new(),
        })
    }

    // --------------------------------
    // Image
    // --------------------------------

    /// Creates an image segment with default options (cached, proxied).
    ///
    /// Bytes are inlined as `base64://`, paths become `file://` URIs and
    /// strings are sent as-is.
    pub fn image(file: impl Into<FileSource>) -> MessageResult<Self> {
        Self::image_with(file, ImageOptions::default())
    }

    /// Creates an image segment with explicit options.
    pub fn image_with(file: impl Into<FileSource>, options: ImageOptions) -> MessageResult<Self> {
        let file = file.into().into_uri()?;
        Ok(Segment::Image(ImageData {
            file,
            image_type: Some(options.image_type),
            cache: Some(bool_to_string(options.cache)),
            proxy: Some(bool_to_string(options.proxy)),
            timeout: Some(options.timeout),
            url: None,
        }))
    }

    /// Creates an image segment from a byte stream.
    ///
    /// The stream is read to the end and its content inlined as base64.
    pub fn image_from_reader(reader: impl Read, options: ImageOptions) -> MessageResult<Self> {
        Self::image_with(FileSource::from_reader(reader)?, options)
    }

    /// Creates a flash image segment.
    pub fn flash_image(file: impl Into<FileSource>) -> MessageResult<Self> {
        Self::image_with(file, ImageOptions::flash())
    }

    // --------------------------------
    // Poke
    // --------------------------------

    /// Creates a poke segment targeting a user.
    pub fn poke(qq: i64) -> Self {
        Segment::Poke(PokeData { qq: qq.to_string() })
    }

    // --------------------------------
    // Reply
    // --------------------------------

    /// Creates a reply segment referencing another message.
    pub fn reply(id: i64) -> Self {
        Segment::Reply(ReplyData { id: id.to_string() })
    }

    // --------------------------------
    // XML/JSON
    // --------------------------------

    /// Creates an XML message segment.
    pub fn xml(data: impl Into<String>) -> Self {
        Segment::Xml(XmlData { data: data.into() })
    }

    /// Creates a JSON message segment.
    ///
    /// The payload is embedded as JSON *text* in the `data` field, not as a
    /// nested object. Implementations parse it a second time.
    ///
    /// The text is compact and keeps non-ASCII characters and `/` unescaped,
    /// so it may differ byte-wise from other encoders while decoding to the
    /// same value.
    pub fn json(data: &Value) -> Self {
        Segment::Json(JsonData {
            data: data.to_string(),
        })
    }

    /// Creates a JSON message segment from any serializable payload.
    pub fn json_from<T>(data: &T) -> MessageResult<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Segment::Json(JsonData {
            data: serde_json::to_string(data)?,
        }))
    }

    // --------------------------------
    // Raw
    // --------------------------------

    /// Creates a segment of an arbitrary kind, kept verbatim.
    ///
    /// Unlike [`Segment::from_parts`], the data is never interpreted, even
    /// when `kind` is a tag this crate knows.
    pub fn raw(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Segment::Raw(RawSegment {
            kind: kind.into(),
            data,
        })
    }
}

// ============================================================================
// Image options
// ============================================================================

/// Sending options for image segments.
///
/// `None` leaves the choice to the implementation's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Image type: "flash" for flash image, None for normal.
    #[serde(rename = "type")]
    pub image_type: Option<String>,
    /// Whether the implementation may use a cached copy.
    pub cache: Option<bool>,
    /// Whether the implementation downloads through its proxy.
    pub proxy: Option<bool>,
    /// Download timeout in seconds.
    pub timeout: Option<u64>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            image_type: None,
            cache: Some(true),
            proxy: Some(true),
            timeout: None,
        }
    }
}

impl ImageOptions {
    /// Options for a flash image.
    pub fn flash() -> Self {
        Self {
            image_type: Some("flash".to_string()),
            ..Default::default()
        }
    }

    /// Sets the image type.
    pub fn image_type(mut self, image_type: impl Into<String>) -> Self {
        self.image_type = Some(image_type.into());
        self
    }

    /// Sets the cache flag.
    pub fn cache(mut self, cache: Option<bool>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the proxy flag.
    pub fn proxy(mut self, proxy: Option<bool>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Sets the download timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }
}

// ============================================================================
// Segment Data Types
// ============================================================================

/// Plain text segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextData {
    /// The text content.
    pub text: String,
}

/// Who an @mention targets.
///
/// Sent as a JSON integer for a user and as `"all"` for everyone. Decimal
/// strings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtTarget {
    /// A single user, by QQ number.
    User(i64),
    /// Everyone in the group.
    All,
}

impl AtTarget {
    /// Returns the QQ number, unless this is @all.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            AtTarget::User(id) => Some(*id),
            AtTarget::All => None,
        }
    }
}

impl fmt::Display for AtTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtTarget::User(id) => write!(f, "{id}"),
            AtTarget::All => f.write_str("all"),
        }
    }
}

impl FromStr for AtTarget {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(AtTarget::All)
        } else {
            s.parse().map(AtTarget::User)
        }
    }
}

impl Serialize for AtTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AtTarget::User(id) => serializer.serialize_i64(*id),
            AtTarget::All => serializer.serialize_str("all"),
        }
    }
}

impl<'de> Deserialize<'de> for AtTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(D::Error::custom),
            Value::Number(n) => n
                .as_i64()
                .map(AtTarget::User)
                .ok_or_else(|| D::Error::custom(format!("QQ number out of range: {n}"))),
            other => Err(D::Error::custom(format!(
                "expected a QQ number or \"all\", found {other}"
            ))),
        }
    }
}

/// @mention segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtData {
    /// The mentioned user, or everyone.
    pub qq: AtTarget,
    /// Display name used when the user cannot be resolved.
    #[serde(default)]
    pub name: String,
}

/// Image segment data.
///
/// The outer `Option` of the sending options records whether the field was
/// present at all: `None` is left out of the output, `Some(None)` is written
/// as `null`. Segments built by [`Segment::image_with`] set every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageData {
    /// Image file name, `file://` URI, URL, or `base64://` payload.
    pub file: String,
    /// Image type: "flash" for flash image, null for normal.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_type: Option<Option<String>>,
    /// "true"/"false": whether to use a cached file (send only).
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub cache: Option<Option<String>>,
    /// "true"/"false": whether to download through the proxy (send only).
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Option<String>>,
    /// Download timeout in seconds (send only).
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Option<u64>>,
    /// Image URL (receive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ImageData {
    /// Returns the image type, if set.
    pub fn image_type(&self) -> Option<&str> {
        self.image_type.as_ref()?.as_deref()
    }

    /// Returns the cache flag, if set.
    pub fn cache(&self) -> Option<&str> {
        self.cache.as_ref()?.as_deref()
    }

    /// Returns the proxy flag, if set.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_ref()?.as_deref()
    }

    /// Returns the download timeout, if set.
    pub fn timeout(&self) -> Option<u64> {
        self.timeout.flatten()
    }
}

/// Poke segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PokeData {
    /// QQ number of the poked user.
    #[serde(deserialize_with = "string_or_number")]
    pub qq: String,
}

/// XML message segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XmlData {
    /// XML content.
    pub data: String,
}

/// JSON message segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonData {
    /// JSON content, as text.
    pub data: String,
}

impl JsonData {
    /// Parses the embedded JSON text.
    pub fn parse(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.data)
    }
}

/// Reply segment data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyData {
    /// Message ID to reply to, in decimal.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// A segment kept exactly as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    /// The segment's `type` tag.
    pub kind: String,
    /// The segment's `data` mapping.
    pub data: Map<String, Value>,
}

impl RawSegment {
    fn from_value(kind: String, value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { kind, data }
    }

    /// Returns a field of the raw data.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

// ============================================================================
// CQ Code Conversion
// ============================================================================

/// Incremental writer for a single `[CQ:kind,key=value,...]` code.
struct CqCode(String);

impl CqCode {
    fn new(kind: &str) -> Self {
        Self(format!("[CQ:{kind}"))
    }

    fn param(mut self, key: &str, value: &str) -> Self {
        self.0.push(',');
        self.0.push_str(key);
        self.0.push('=');
        self.0.push_str(&escape_cq_value(value));
        self
    }

    fn opt_param(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    fn finish(mut self) -> String {
        self.0.push(']');
        self.0
    }
}

impl Segment {
    /// Converts this segment to a CQ code string.
    ///
    /// Text segments are returned as plain text (with escaping).
    /// Other segments are formatted as `[CQ:type,key=value,...]`; unset
    /// fields are left out.
    pub fn to_cq_code(&self) -> String {
        match self {
            Segment::Text(data) => escape_cq_text(&data.text),
            Segment::At(data) => {
                let name = (!data.name.is_empty()).then_some(data.name.as_str());
                CqCode::new("at")
                    .param("qq", &data.qq.to_string())
                    .opt_param("name", name)
                    .finish()
            }
            Segment::Image(data) => {
                let timeout = data.timeout().map(|t| t.to_string());
                CqCode::new("image")
                    .param("file", &data.file)
                    .opt_param("type", data.image_type())
                    .opt_param("url", data.url.as_deref())
                    .opt_param("cache", data.cache())
                    .opt_param("proxy", data.proxy())
                    .opt_param("timeout", timeout.as_deref())
                    .finish()
            }
            Segment::Poke(data) => CqCode::new("poke").param("qq", &data.qq).finish(),
            Segment::Xml(data) => CqCode::new("xml").param("data", &data.data).finish(),
            Segment::Json(data) => CqCode::new("json").param("data", &data.data).finish(),
            Segment::Reply(data) => CqCode::new("reply").param("id", &data.id).finish(),
            Segment::Raw(raw) => {
                let mut cq = CqCode::new(&raw.kind);
                for (key, value) in &raw.data {
                    cq = match value {
                        Value::Null => cq,
                        Value::String(s) => cq.param(key, s),
                        other => cq.param(key, &other.to_string()),
                    };
                }
                cq.finish()
            }
        }
    }
}

// ============================================================================
// CQ Code Escaping Utilities
// ============================================================================

/// Escapes special characters in plain text for CQ code format.
///
/// Escapes: `&` → `&amp;`, `[` → `&#91;`, `]` → `&#93;`
pub fn escape_cq_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Unescapes CQ code special characters back to plain text.
pub fn unescape_cq_text(text: &str) -> String {
    text.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

/// Escapes special characters in CQ code parameter values.
///
/// Escapes: `&` → `&amp;`, `[` → `&#91;`, `]` → `&#93;`, `,` → `&#44;`
pub fn escape_cq_value(value: &str) -> String {
    escape_cq_text(value).replace(',', "&#44;")
}

/// Unescapes CQ code parameter value special characters.
pub fn unescape_cq_value(value: &str) -> String {
    unescape_cq_text(value)
}

// ============================================================================
// Tests
// ============================================================================
