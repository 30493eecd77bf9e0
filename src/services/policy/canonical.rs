//! Request path canonicalization.
//!
//! Policy patterns are matched against the decoded, canonical form of a request path only.
//! Anything that a backend could resolve to a different path than the one checked is refused:
//! - `.` / `..` segments (raw or percent-encoded)
//! - empty segments (`//`); a single trailing `/` is kept as-is
//! - malformed `%` escapes or escapes that do not decode to UTF-8
//! - segments decoding to `/`, `\`, `%`, `;` or a control character
//!
//! The canonical form contains no `%`, so canonicalizing it again yields the same string.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("request path must start with '/'")]
    MissingLeadingSlash,
    #[error("empty path segment")]
    EmptySegment,
    #[error("dot segment in request path")]
    DotSegment,
    #[error("malformed percent-encoding in request path")]
    InvalidEncoding,
    #[error("forbidden character in request path")]
    ForbiddenCharacter,
}

pub fn canonicalize(raw: &str) -> Result<String, PathError> {
    let body = raw.strip_prefix('/').ok_or(PathError::MissingLeadingSlash)?;
    let parts: Vec<&str> = body.split('/').collect();
    let last = parts.len() - 1;

    let mut out = String::with_capacity(raw.len());
    for (i, part) in parts.iter().enumerate() {
        out.push('/');
        if part.is_empty() {
            if i == last {
                continue;
            }
            return Err(PathError::EmptySegment);
        }
        out.push_str(&decode_segment(part)?);
    }
    Ok(out)
}

fn decode_segment(raw: &str) -> Result<String, PathError> {
    check_escapes(raw.as_bytes())?;
    let decoded = urlencoding::decode(raw).map_err(|_| PathError::InvalidEncoding)?;

    if decoded == "." || decoded == ".." {
        return Err(PathError::DotSegment);
    }
    if decoded
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '%' | ';') || c.is_control())
    {
        return Err(PathError::ForbiddenCharacter);
    }
    Ok(decoded.into_owned())
}

/// Every `%` must introduce two hex digits; the decoder itself passes bad escapes through.
fn check_escapes(bytes: &[u8]) -> Result<(), PathError> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(PathError::InvalidEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
