//! Field kinds and descriptors.
//!
//! A mapped struct field is described by the kind of Rust value it holds plus
//! its tag settings. The dialect turns that pair into a column type.

use crate::db::types::Hstore;
use crate::models::tags::TagSettings;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use serde::Serialize;

/// Classification of a field's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Text,
    Timestamp,
    Hstore,
    Bytes,
    ByteArray(usize),
    Uuid,
    Unsupported(&'static str),
}

impl FieldKind {
    /// Short kind name used in error messages and CLI output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Hstore => "hstore",
            Self::Bytes => "bytes",
            Self::ByteArray(_) => "byte_array",
            Self::Uuid => "uuid",
            Self::Unsupported(_) => "unsupported",
        }
    }

    /// Parse a kind name as printed by [`FieldKind::kind_name`].
    ///
    /// `byte_array` takes its length after a colon (`byte_array:16`). Unknown
    /// names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        let kind = match lower.as_str() {
            "bool" => Self::Bool,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "isize" => Self::Isize,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "usize" => Self::Usize,
            "f32" => Self::F32,
            "f64" => Self::F64,
            "text" | "string" => Self::Text,
            "timestamp" => Self::Timestamp,
            "hstore" => Self::Hstore,
            "bytes" => Self::Bytes,
            "uuid" => Self::Uuid,
            other => {
                let len = other.strip_prefix("byte_array:")?.parse().ok()?;
                Self::ByteArray(len)
            }
        };
        Some(kind)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByteArray(len) => write!(f, "[u8; {}]", len),
            Self::Unsupported(name) => write!(f, "{}", name),
            other => write!(f, "{}", other.kind_name()),
        }
    }
}

/// Types the ORM knows how to store in a column.
///
/// Types without an implementation cannot be described at all; use
/// [`FieldKind::Unsupported`] to describe them dynamically.
pub trait HasFieldKind {
    const KIND: FieldKind;
}

macro_rules! impl_field_kind {
    ($($ty:ty => $kind:expr),+ $(,)?) => {
        $(
            impl HasFieldKind for $ty {
                const KIND: FieldKind = $kind;
            }
        )+
    };
}

impl_field_kind!(
    bool => FieldKind::Bool,
    i8 => FieldKind::I8,
    i16 => FieldKind::I16,
    i32 => FieldKind::I32,
    i64 => FieldKind::I64,
    isize => FieldKind::Isize,
    u8 => FieldKind::U8,
    u16 => FieldKind::U16,
    u32 => FieldKind::U32,
    u64 => FieldKind::U64,
    usize => FieldKind::Usize,
    f32 => FieldKind::F32,
    f64 => FieldKind::F64,
    String => FieldKind::Text,
    &str => FieldKind::Text,
    NaiveDateTime => FieldKind::Timestamp,
    Hstore => FieldKind::Hstore,
    Vec<u8> => FieldKind::Bytes,
    uuid::Uuid => FieldKind::Uuid,
    serde_json::Value => FieldKind::Unsupported("serde_json::Value"),
);

impl<Tz: TimeZone> HasFieldKind for DateTime<Tz> {
    const KIND: FieldKind = FieldKind::Timestamp;
}

impl<const N: usize> HasFieldKind for [u8; N] {
    const KIND: FieldKind = FieldKind::ByteArray(N);
}

impl<T: HasFieldKind> HasFieldKind for Option<T> {
    const KIND: FieldKind = T::KIND;
}

/// A mapped struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub tags: TagSettings,
}

impl FieldDescriptor {
    /// Create a field descriptor with no tags.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: TagSettings::new(),
        }
    }

    /// Describe a field by its Rust type.
    pub fn of<T: HasFieldKind>(name: impl Into<String>) -> Self {
        Self::new(name, T::KIND)
    }

    /// Attach a tag string (`size:64;not null`).
    pub fn with_tags(mut self, tag: &str) -> Self {
        self.tags = TagSettings::parse(tag);
        self
    }

    /// Column name: the `COLUMN` tag, otherwise the field name in snake_case.
    pub fn column_name(&self) -> String {
        self.tags
            .column_name()
            .map(String::from)
            .unwrap_or_else(|| to_snake_case(&self.name))
    }

    /// Whether the column ends up as `hstore`, i.e. the extension must exist.
    pub fn needs_hstore(&self) -> bool {
        match self.tags.sql_type() {
            Some(sql_type) => sql_type.trim().eq_ignore_ascii_case("hstore"),
            None => self.kind == FieldKind::Hstore,
        }
    }
}

/// Convert a field name to snake_case, keeping acronyms together
/// (`UserID` -> `user_id`, `HTTPServer` -> `http_server`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}
