//! Placeholder rewriting.
//!
//! ORM code writes queries with `?` placeholders. PostgreSQL wants numbered
//! `$n` parameters, so every `?` that is outside a literal, quoted identifier,
//! dollar-quoted body or comment is replaced by the dialect's bind variable.
//!
//! The jsonb `?` operator cannot be told apart from a placeholder; queries that
//! need it should call `jsonb_exists` instead.

/// Rewrite `?` placeholders, numbering them from 1.
pub fn rebind_with<F>(sql: &str, mut bind_var: F) -> String
where
    F: FnMut(usize) -> String,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut pos = 0;
    let mut copied = 0;

    while pos < bytes.len() {
        let skip_to = match bytes[pos] {
            b'\'' => Some(skip_single_quoted(bytes, pos, is_escape_string(bytes, pos))),
            b'"' => Some(skip_double_quoted(bytes, pos)),
            b'-' if bytes.get(pos + 1) == Some(&b'-') => Some(skip_line_comment(bytes, pos)),
            b'/' if bytes.get(pos + 1) == Some(&b'*') => Some(skip_block_comment(bytes, pos)),
            b'$' => dollar_tag(bytes, pos).map(|tag| skip_dollar_quoted(bytes, pos, tag)),
            b'?' => {
                index += 1;
                out.push_str(&sql[copied..pos]);
                out.push_str(&bind_var(index));
                copied = pos + 1;
                None
            }
            _ => None,
        };

        pos = match skip_to {
            Some(end) => end,
            None => pos + 1,
        };
    }

    out.push_str(&sql[copied..]);
    out
}

/// Count the placeholders [`rebind_with`] would replace.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    rebind_with(sql, |i| {
        count = i;
        String::new()
    });
    count
}

/// `E'...'` strings treat backslash as an escape character.
fn is_escape_string(bytes: &[u8], quote: usize) -> bool {
    if quote == 0 || !bytes[quote - 1].eq_ignore_ascii_case(&b'e') {
        return false;
    }
    quote < 2 || !is_ident_byte(bytes[quote - 2])
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn skip_single_quoted(bytes: &[u8], start: usize, backslash_escapes: bool) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if backslash_escapes => pos += 2,
            b'\'' if bytes.get(pos + 1) == Some(&b'\'') => pos += 2,
            b'\'' => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn skip_double_quoted(bytes: &[u8], start: usize) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' if bytes.get(pos + 1) == Some(&b'"') => pos += 2,
            b'"' => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |off| start + off + 1)
}

/// Block comments nest in PostgreSQL.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut pos = start;
    while pos + 1 < bytes.len() {
        match (bytes[pos], bytes[pos + 1]) {
            (b'/', b'*') => {
                depth += 1;
                pos += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                pos += 2;
                if depth == 0 {
                    return pos;
                }
            }
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Return the `$tag$` opener at `start`, if there is one.
///
/// `$1` style parameters and identifiers containing `$` are not openers.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<&[u8]> {
    if start > 0 && is_ident_byte(bytes[start - 1]) {
        return None;
    }
    let rest = &bytes[start + 1..];
    let len = rest.iter().position(|&b| b == b'$')?;
    let tag = &rest[..len];
    let valid = tag.first().is_none_or(|b| !b.is_ascii_digit())
        && tag.iter().all(|&b| is_ident_byte(b));
    valid.then(|| &bytes[start..start + len + 2])
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag: &[u8]) -> usize {
    let body = start + tag.len();
    bytes[body..]
        .windows(tag.len())
        .position(|w| w == tag)
        .map_or(bytes.len(), |off| body + off + tag.len())
}
