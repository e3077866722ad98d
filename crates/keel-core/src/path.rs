//! Dotted field paths over JSON documents.
//!
//! A path is a sequence of object keys separated by `.`; a key suffixed with
//! `[]` descends into every element of the list stored under it. For example
//! `Origins.Items[].DomainName` addresses the `DomainName` of every origin.

use crate::error::PathError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Descend into an object key.
    Key(String),
    /// Descend into every element of a list.
    Each,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path expression such as `CacheBehaviors.Items[].ViewerProtocolPolicy`.
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in expr.split('.') {
            let mut key = part;
            let mut each = 0usize;
            while let Some(stripped) = key.strip_suffix("[]") {
                key = stripped;
                each += 1;
            }

            if key.is_empty() && each == 0 {
                return Err(PathError::EmptySegment {
                    path: expr.to_string(),
                });
            }
            if key.contains('[') || key.contains(']') {
                return Err(PathError::MalformedSegment {
                    path: expr.to_string(),
                    segment: part.to_string(),
                });
            }

            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            segments.extend(std::iter::repeat_n(Segment::Each, each));
        }

        Ok(Self { segments })
    }

    /// Build a path from a single top-level key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Key(key.into())],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Return every value addressed by this path. Branches that do not exist
    /// are dropped silently.
    pub fn select<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    Segment::Key(key) => {
                        if let Some(child) = value.get(key.as_str()) {
                            next.push(child);
                        }
                    }
                    Segment::Each => {
                        if let Some(items) = value.as_array() {
                            next.extend(items.iter());
                        }
                    }
                }
            }
            current = next;
        }
        current
    }

    /// Call `f` on every value addressed by this path, mutably.
    pub fn visit_mut(&self, document: &mut Value, f: &mut dyn FnMut(&mut Value)) {
        visit_segments_mut(document, &self.segments, f);
    }

    /// Split into the path of the containing value and the final segment.
    pub fn split_last(&self) -> Option<(FieldPath, &Segment)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            FieldPath {
                segments: parent.to_vec(),
            },
            last,
        ))
    }
}

fn visit_segments_mut(value: &mut Value, segments: &[Segment], f: &mut dyn FnMut(&mut Value)) {
    let Some((first, rest)) = segments.split_first() else {
        f(value);
        return;
    };

    match first {
        Segment::Key(key) => {
            if let Some(child) = value.as_object_mut().and_then(|map| map.get_mut(key)) {
                visit_segments_mut(child, rest, f);
            }
        }
        Segment::Each => {
            if let Some(items) = value.as_array_mut() {
                for item in items {
                    visit_segments_mut(item, rest, f);
                }
            }
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Segment::Each => write!(f, "[]")?,
            }
            first = false;
        }
        Ok(())
    }
}
