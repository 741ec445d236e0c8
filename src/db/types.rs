//! PostgreSQL `hstore` support.
//!
//! [`Hstore`] maps the extension's key/value column onto an ordered map whose
//! values may be NULL. Both wire formats are understood when decoding; encoding
//! always uses the binary format.
//!
//! # Null handling
//!
//! - An empty map is written as SQL NULL, not as an empty hstore.
//! - SQL NULL and an empty hstore both read back as an empty map. Decoding into
//!   `Option<Hstore>` still yields `None` for NULL.
//! - NULL values inside the hstore are kept as `None`.

use crate::error::{DialectError, DialectResult};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type, ValueRef};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Key/value mapping stored in an `hstore` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hstore(pub BTreeMap<String, Option<String>>);

impl Hstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse a nullable column value into a map.
    pub fn from_nullable(value: Option<Hstore>) -> Self {
        value.unwrap_or_default()
    }

    /// Encode as the binary `hstore_send` representation.
    ///
    /// Returns `None` for an empty map, which is stored as SQL NULL.
    pub fn to_binary(&self) -> DialectResult<Option<Vec<u8>>> {
        if self.0.is_empty() {
            return Ok(None);
        }

        let mut buf = Vec::new();
        write_len(&mut buf, self.0.len())?;
        for (key, value) in &self.0 {
            write_len(&mut buf, key.len())?;
            buf.extend_from_slice(key.as_bytes());
            match value {
                Some(v) => {
                    write_len(&mut buf, v.len())?;
                    buf.extend_from_slice(v.as_bytes());
                }
                None => buf.extend_from_slice(&(-1i32).to_be_bytes()),
            }
        }
        Ok(Some(buf))
    }

    /// Decode the binary `hstore_recv` representation.
    pub fn from_binary(bytes: &[u8]) -> DialectResult<Self> {
        let mut reader = BinaryReader { bytes, pos: 0 };
        let count = reader.read_i32()?;
        if count < 0 {
            return Err(DialectError::hstore(format!("negative pair count {}", count)));
        }

        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = reader
                .read_string()?
                .ok_or_else(|| DialectError::hstore("null key"))?;
            let value = reader.read_string()?;
            map.insert(key, value);
        }

        if reader.pos != bytes.len() {
            return Err(DialectError::hstore(format!(
                "{} trailing bytes",
                bytes.len() - reader.pos
            )));
        }
        Ok(Self(map))
    }
}

impl Deref for Hstore {
    type Target = BTreeMap<String, Option<String>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Hstore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<BTreeMap<String, Option<String>>> for Hstore {
    fn from(map: BTreeMap<String, Option<String>>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Hstore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

impl IntoIterator for Hstore {
    type Item = (String, Option<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> DialectResult<()> {
    let len = i32::try_from(len)
        .map_err(|_| DialectError::hstore(format!("length {} exceeds i32", len)))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

struct BinaryReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl BinaryReader<'_> {
    fn take(&mut self, n: usize) -> DialectResult<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                DialectError::hstore(format!(
                    "unexpected end of data at byte {} (wanted {})",
                    self.pos, n
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_i32(&mut self) -> DialectResult<i32> {
        let raw = self.take(4)?;
        Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Length-prefixed string; a length of -1 is NULL.
    fn read_string(&mut self) -> DialectResult<Option<String>> {
        let len = self.read_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let len = usize::try_from(len)
            .map_err(|_| DialectError::hstore(format!("invalid length {}", len)))?;
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw)
            .map_err(|e| DialectError::hstore(format!("invalid UTF-8: {}", e)))?;
        Ok(Some(s.to_string()))
    }
}

// =============================================================================
// Text Format
// =============================================================================

impl fmt::Display for Hstore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, key)?;
            f.write_str("=>")?;
            match value {
                Some(v) => write_quoted(f, v)?,
                None => f.write_str("NULL")?,
            }
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

impl FromStr for Hstore {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextParser::new(s).parse()
    }
}

struct TextParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
}

/// A parsed token and whether it was quoted.
struct Token {
    text: String,
    quoted: bool,
}

impl<'a> TextParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            input,
        }
    }

    fn parse(mut self) -> DialectResult<Hstore> {
        let mut map = BTreeMap::new();

        loop {
            self.skip_whitespace();
            if self.chars.peek().is_none() {
                break;
            }

            let key = self.token()?;
            self.skip_whitespace();
            self.expect_arrow()?;
            self.skip_whitespace();
            let value = self.token()?;
            let value = if !value.quoted && value.text.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(value.text)
            };
            map.insert(key.text, value);

            self.skip_whitespace();
            match self.chars.next() {
                None => break,
                Some((_, ',')) => continue,
                Some((pos, c)) => {
                    return Err(self.error(pos, &format!("expected ',' but found '{}'", c)));
                }
            }
        }

        Ok(Hstore(map))
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect_arrow(&mut self) -> DialectResult<()> {
        match (self.chars.next(), self.chars.next()) {
            (Some((_, '=')), Some((_, '>'))) => Ok(()),
            (Some((pos, _)), _) => Err(self.error(pos, "expected '=>'")),
            (None, _) => Err(self.error(self.input.len(), "expected '=>'")),
        }
    }

    fn token(&mut self) -> DialectResult<Token> {
        match self.chars.peek().copied() {
            Some((_, '"')) => {
                self.chars.next();
                self.quoted()
            }
            Some(_) => self.unquoted(),
            None => Err(self.error(self.input.len(), "unexpected end of input")),
        }
    }

    fn quoted(&mut self) -> DialectResult<Token> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token { text, quoted: true }),
                Some((pos, '\\')) => match self.chars.next() {
                    Some((_, c)) => text.push(c),
                    None => return Err(self.error(pos, "dangling escape")),
                },
                Some((_, c)) => text.push(c),
                None => return Err(self.error(self.input.len(), "unterminated quoted string")),
            }
        }
    }

    fn unquoted(&mut self) -> DialectResult<Token> {
        let mut text = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| !c.is_whitespace() && *c != ',' && *c != '=' && *c != '"')
        {
            if c == '\\' {
                if let Some((_, escaped)) = self.chars.next() {
                    text.push(escaped);
                }
                continue;
            }
            text.push(c);
        }

        if text.is_empty() {
            let pos = self.chars.peek().map_or(self.input.len(), |(p, _)| *p);
            return Err(self.error(pos, "expected key or value"));
        }
        Ok(Token {
            text,
            quoted: false,
        })
    }

    fn error(&self, pos: usize, message: &str) -> DialectError {
        DialectError::hstore(format!("{} at position {}", message, pos))
    }
}

// =============================================================================
// sqlx Integration
// =============================================================================

impl Type<Postgres> for Hstore {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("hstore")
    }
}

impl Encode<'_, Postgres> for Hstore {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        match self.to_binary()? {
            Some(bytes) => {
                buf.extend_from_slice(&bytes);
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }
}

impl<'r> Decode<'r, Postgres> for Hstore {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        if value.is_null() {
            return Ok(Hstore::new());
        }
        let hstore = match value.format() {
            PgValueFormat::Binary => Hstore::from_binary(value.as_bytes()?)?,
            PgValueFormat::Text => value.as_str()?.parse()?,
        };
        Ok(hstore)
    }
}
