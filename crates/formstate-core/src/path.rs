#![forbid(unsafe_code)]

//! Field-access expressions for addressing values inside a state record.
//!
//! A [`FieldPath`] is parsed from the dot/bracket notation used by form
//! libraries: `user.name`, `items[0].label`, `items.0.label`,
//! `meta["display name"]`. The first segment always names a top-level field.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// A single step in a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key access.
    Key(String),
    /// Array index access (`[n]`).
    Index(usize),
}

impl Seg {
    /// Key form of this segment; indices render as decimal strings.
    #[must_use]
    pub fn to_key(&self) -> Cow<'_, str> {
        match self {
            Seg::Key(k) => Cow::Borrowed(k),
            Seg::Index(i) => Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, ".{k}"),
            Seg::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A parsed field-access expression.
///
/// ```
/// use formstate_core::{FieldPath, Seg};
///
/// let path = FieldPath::parse("items[2].label").unwrap();
/// assert_eq!(path.root_key(), Some("items"));
/// assert_eq!(path.segments()[1], Seg::Index(2));
/// assert_eq!(path.to_string(), "items[2].label");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<Seg>);

impl FieldPath {
    /// A path naming a single top-level field.
    #[must_use]
    pub fn key(k: impl Into<String>) -> Self {
        Self(vec![Seg::Key(k.into())])
    }

    /// Build from raw segments.
    #[must_use]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Append a segment (builder style).
    #[must_use]
    pub fn join(mut self, seg: impl Into<Seg>) -> Self {
        self.0.push(seg.into());
        self
    }

    #[must_use]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The top-level field this path starts at, if the first segment is a key.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        match self.0.first() {
            Some(Seg::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Parse dot/bracket notation.
    ///
    /// Bracketed contents are an index when numeric, otherwise a key; keys in
    /// brackets may be quoted with `"` or `'`. Dotted segments are always keys
    /// (numeric keys still address array elements during resolution).
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut chars = input.char_indices().peekable();
        let mut current = String::new();
        // True right after a `]`, where only `.`, `[` or the end may follow.
        let mut after_bracket = false;

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '.' => {
                    if current.is_empty() && !after_bracket {
                        return Err(PathError::EmptySegment { position: pos });
                    }
                    if !current.is_empty() {
                        segments.push(Seg::Key(std::mem::take(&mut current)));
                    }
                    after_bracket = false;
                    if chars.peek().is_none() {
                        return Err(PathError::EmptySegment { position: pos + 1 });
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(Seg::Key(std::mem::take(&mut current)));
                    } else if segments.is_empty() {
                        return Err(PathError::EmptySegment { position: pos });
                    }
                    let mut inner = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(PathError::UnclosedBracket { position: pos });
                    }
                    segments.push(bracket_segment(&inner, pos)?);
                    after_bracket = true;
                }
                ']' => return Err(PathError::UnexpectedChar { ch, position: pos }),
                _ => {
                    if after_bracket {
                        return Err(PathError::UnexpectedChar { ch, position: pos });
                    }
                    current.push(ch);
                }
            }
        }

        if !current.is_empty() {
            segments.push(Seg::Key(current));
        }
        Ok(Self(segments))
    }
}

fn bracket_segment(inner: &str, position: usize) -> Result<Seg, PathError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(PathError::EmptySegment { position });
    }
    for quote in ['"', '\''] {
        if let Some(quoted) = inner
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(Seg::Key(quoted.to_owned()));
        }
    }
    Ok(match inner.parse::<usize>() {
        Ok(i) => Seg::Index(i),
        Err(_) => Seg::Key(inner.to_owned()),
    })
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Seg::Key(k) if i == 0 => write!(f, "{k}")?,
                seg => write!(f, "{seg}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(raw: &str) -> Vec<Seg> {
        FieldPath::parse(raw).unwrap().segments().to_vec()
    }

    #[test]
    fn parses_dotted_keys() {
        assert_eq!(segs("a.b.c"), vec![Seg::from("a"), Seg::from("b"), Seg::from("c")]);
    }

    #[test]
    fn parses_brackets() {
        assert_eq!(
            segs("items[3].label"),
            vec![Seg::from("items"), Seg::Index(3), Seg::from("label")]
        );
        assert_eq!(segs("grid[1][2]"), vec![Seg::from("grid"), Seg::Index(1), Seg::Index(2)]);
    }

    #[test]
    fn dotted_numbers_stay_keys() {
        assert_eq!(segs("items.0"), vec![Seg::from("items"), Seg::from("0")]);
    }

    #[test]
    fn quoted_bracket_keys() {
        assert_eq!(
            segs("meta[\"display name\"]"),
            vec![Seg::from("meta"), Seg::from("display name")]
        );
        assert_eq!(segs("meta['x.y']"), vec![Seg::from("meta"), Seg::from("x.y")]);
        assert_eq!(segs("meta[key]"), vec![Seg::from("meta"), Seg::from("key")]);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(FieldPath::parse(""), Err(PathError::Empty));
        assert_eq!(FieldPath::parse("   "), Err(PathError::Empty));
        assert!(matches!(FieldPath::parse("a..b"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse(".a"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse("a."), Err(PathError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse("a[0"), Err(PathError::UnclosedBracket { .. })));
        assert!(matches!(FieldPath::parse("a[]"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse("[0]"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(FieldPath::parse("a]"), Err(PathError::UnexpectedChar { ch: ']', .. })));
        assert!(matches!(FieldPath::parse("a[0]b"), Err(PathError::UnexpectedChar { ch: 'b', .. })));
    }

    #[test]
    fn root_key_and_display() {
        let path = FieldPath::key("user").join("emails").join(0usize);
        assert_eq!(path.root_key(), Some("user"));
        assert_eq!(path.to_string(), "user.emails[0]");
        assert_eq!("user.emails[0]".parse::<FieldPath>().unwrap(), path);
    }
}
