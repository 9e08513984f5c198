//! Paths into a metadata tree
//!
//! A [`TreePath`] is a sequence of [`PathSegment`]s. Each segment names an
//! attribute key and optionally an index into that attribute's repeated
//! values. A missing index addresses element 0, which is how single
//! attributes are stored.
//!
//! # Path Syntax
//!
//! | Syntax | Meaning | Example |
//! |--------|---------|---------|
//! | `key` | Attribute, element 0 | `title` |
//! | `key[n]` | Attribute, element n | `keywords[2]` |
//! | `a.b` | Nested attribute inside sub-tree `a` | `contact.email` |
//! | `a[n].b` | Nested attribute inside element n of `a` | `fields[1].alias` |
//! | (empty) | Root | `` |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum path length in segments
pub const MAX_PATH_LENGTH: usize = 64;

/// Error type for path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid element index
    #[error("invalid index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Path has too many segments
    #[error("path length {0} exceeds maximum segment count")]
    TooLong(usize),
}

/// One step of a [`TreePath`]: an attribute key plus optional element index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    /// Attribute key
    pub key: String,
    /// Element index, `None` meaning element 0
    pub index: Option<usize>,
}

impl PathSegment {
    /// Segment addressing element 0 of `key`
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment {
            key: key.into(),
            index: None,
        }
    }

    /// Segment addressing element `index` of `key`
    pub fn indexed(key: impl Into<String>, index: usize) -> Self {
        PathSegment {
            key: key.into(),
            index: Some(index),
        }
    }

    /// The effective element index
    pub fn position(&self) -> usize {
        self.index.unwrap_or(0)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.key, i),
            None => write!(f, "{}", self.key),
        }
    }
}

/// A path into a [`MetadataTree`](crate::tree::MetadataTree)
///
/// # Examples
///
/// ```
/// use metalayer_core::path::TreePath;
///
/// let path = TreePath::root().key("fields").index(1).key("alias");
/// assert_eq!(path.to_string(), "fields[1].alias");
///
/// let parsed: TreePath = "fields[1].alias".parse().unwrap();
/// assert_eq!(parsed, path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TreePath {
    segments: Vec<PathSegment>,
}

impl TreePath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        TreePath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        TreePath { segments }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::key(key));
        self
    }

    /// Set the index of the last segment (builder pattern)
    ///
    /// On the root path this is a no-op; an index needs a key to apply to.
    pub fn index(mut self, idx: usize) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.index = Some(idx);
        }
        self
    }

    /// Push a segment (mutating)
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Get the parent path (None if root)
    pub fn parent(&self) -> Option<TreePath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }

    /// Get the last segment (None if root)
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Split into intermediate segments and the final segment
    pub fn split_last(&self) -> Option<(&PathSegment, &[PathSegment])> {
        self.segments.split_last()
    }

    /// Top-level attribute key this path starts with
    pub fn top_key(&self) -> Option<&str> {
        self.segments.first().map(|s| s.key.as_str())
    }
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == ':'
}

impl FromStr for TreePath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(TreePath::root());
        }

        let chars: Vec<char> = s.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        loop {
            let key_start = i;
            while i < chars.len() && is_key_char(chars[i]) {
                i += 1;
            }
            if i == key_start {
                return match chars.get(i) {
                    None | Some('.') => Err(PathParseError::EmptyKey(i)),
                    Some(&c) => Err(PathParseError::UnexpectedChar(c, i)),
                };
            }
            let key: String = chars[key_start..i].iter().collect();

            let mut index = None;
            if i < chars.len() && chars[i] == '[' {
                let open = i;
                i += 1;
                let idx_start = i;
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(PathParseError::UnclosedBracket(open));
                }
                let idx_str: String = chars[idx_start..i].iter().collect();
                let idx = idx_str
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;
                index = Some(idx);
                i += 1;
            }
            segments.push(PathSegment { key, index });

            match chars.get(i) {
                None => break,
                Some('.') => i += 1,
                Some(&c) => return Err(PathParseError::UnexpectedChar(c, i)),
            }
        }

        if segments.len() > MAX_PATH_LENGTH {
            return Err(PathParseError::TooLong(segments.len()));
        }
        Ok(TreePath { segments })
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}
