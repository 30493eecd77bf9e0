//! Glob-style request path patterns.
//!
//! Patterns are matched segment by segment (split on `/`):
//! - `?` matches one character inside a segment
//! - `*` matches zero or more characters inside a segment
//! - `{name}` matches exactly one non-empty segment
//! - `**` / `{*name}` as the final segment matches zero or more remaining segments
//!
//! Examples: `/actuator/**`, `/api/users/{id}`, `/static/*.css`
//!
//! Patterns are compiled once at config load; matching allocates nothing.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("path pattern must not be empty")]
    Empty,
    #[error("path pattern must start with '/': {0}")]
    MissingLeadingSlash(String),
    #[error("'**' is only allowed as the last segment: {0}")]
    RestNotLast(String),
    #[error("unbalanced '{{' / '}}' in path pattern: {0}")]
    UnbalancedBraces(String),
    #[error("capture constraints ('{{name:regex}}') are not supported: {0}")]
    UnsupportedCapture(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard(String),
    Capture,
}

impl Segment {
    fn parse(raw: &str, pattern: &str) -> Result<Self, PatternError> {
        if raw.starts_with('{') && raw.ends_with('}') && raw.len() >= 2 {
            let inner = &raw[1..raw.len() - 1];
            if inner.contains(['{', '}']) {
                return Err(PatternError::UnbalancedBraces(pattern.to_string()));
            }
            if inner.contains(':') {
                return Err(PatternError::UnsupportedCapture(pattern.to_string()));
            }
            return Ok(Self::Capture);
        }
        if raw.contains(['{', '}']) {
            return Err(PatternError::UnbalancedBraces(pattern.to_string()));
        }
        if raw.contains(['*', '?']) {
            Ok(Self::Wildcard(raw.to_string()))
        } else {
            Ok(Self::Literal(raw.to_string()))
        }
    }

    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == segment,
            Self::Wildcard(glob) => wildcard_match(glob.as_bytes(), segment.as_bytes()),
            Self::Capture => !segment.is_empty(),
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    // trailing `**` / `{*name}`
    rest: bool,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let Some(body) = pattern.strip_prefix('/') else {
            return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
        };

        let raw: Vec<&str> = body.split('/').collect();
        let last = raw.len() - 1;

        let mut segments = Vec::with_capacity(raw.len());
        let mut rest = false;
        for (i, seg) in raw.iter().enumerate() {
            if is_rest(seg) {
                if i != last {
                    return Err(PatternError::RestNotLast(pattern.to_string()));
                }
                rest = true;
                continue;
            }
            segments.push(Segment::parse(seg, pattern)?);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            rest,
        })
    }

    /// `path` is expected in canonical form (see [`super::canonical::canonicalize`]).
    pub fn matches(&self, path: &str) -> bool {
        let body = path.strip_prefix('/').unwrap_or(path);
        let mut parts = body.split('/');

        for segment in &self.segments {
            match parts.next() {
                Some(part) if segment.matches(part) => {}
                _ => return false,
            }
        }

        self.rest || parts.next().is_none()
    }

    /// True when every path matched by `other` is also matched by `self`.
    ///
    /// Conservative: only recognises identical patterns and a `prefix/**` pattern whose prefix
    /// segments are literal-equal to (or more general than) the start of `other`.
    pub fn covers(&self, other: &PathPattern) -> bool {
        if self.source == other.source {
            return true;
        }
        if !self.rest || other.segments.len() < self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(&other.segments)
            .all(|(mine, theirs)| match (mine, theirs) {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Wildcard(glob), Segment::Literal(lit)) => {
                    wildcard_match(glob.as_bytes(), lit.as_bytes())
                }
                (Segment::Wildcard(glob), _) => glob.bytes().all(|b| b == b'*'),
                (Segment::Capture, Segment::Literal(lit)) => !lit.is_empty(),
                (Segment::Capture, Segment::Capture) => true,
                _ => false,
            })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_rest(segment: &str) -> bool {
    segment == "**"
        || (segment.starts_with("{*")
            && segment.ends_with('}')
            && segment.len() > 3
            && !segment.contains(':'))
}

/// `*` / `?` match over a whole string; `/` is an ordinary character here.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    wildcard_match(pattern.as_bytes(), text.as_bytes())
}

/// Two-pointer wildcard match over a single segment (no `/` involved).
fn wildcard_match(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while t < text.len() {
        match pattern.get(p).copied() {
            Some(b'?') => {
                p += 1;
                t += 1;
            }
            Some(b'*') => {
                star = Some(p);
                p += 1;
                mark = t;
            }
            Some(c) if c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some(s) => {
                    p = s + 1;
                    mark += 1;
                    t = mark;
                }
                None => return false,
            },
        }
    }

    while pattern.get(p).copied() == Some(b'*') {
        p += 1;
    }
    p == pattern.len()
}
