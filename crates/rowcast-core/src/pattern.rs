//! Dotted path patterns for key renaming
//!
//! A pattern such as `a_*.a_child.noot` is split on `.` into segments.
//! A segment is either a literal key or a wildcard: some literal text
//! followed by a trailing `*`, matching any single key that starts with
//! that text. A bare `*` matches any key. A pattern holds at most one
//! wildcard segment.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    // any key starting with `prefix`
    Wildcard { prefix: String },
}

/// How specific a pattern is; a greater value wins a tie-break
///
/// Fully literal patterns outrank every wildcard pattern. Wildcard
/// patterns are ranked by the length of the text written before their `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Specificity {
    /// Pattern with a wildcard segment
    Wildcard {
        /// Characters of pattern text preceding the `*`
        prefix_len: usize,
    },
    /// Pattern without a wildcard segment
    Literal,
}

/// A compiled dotted path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    text: String,
    segments: Vec<Segment>,
    case_insensitive: bool,
}

impl PathPattern {
    /// Compile pattern text; the error is a human-readable reason
    pub fn compile(text: &str, case_insensitive: bool) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut wildcards = 0;

        for part in text.split('.') {
            if part.is_empty() {
                return Err("empty path segment".to_string());
            }
            match part.find('*') {
                None => segments.push(Segment::Literal(part.to_string())),
                Some(idx) if idx == part.len() - 1 => {
                    wildcards += 1;
                    segments.push(Segment::Wildcard {
                        prefix: part[..idx].to_string(),
                    });
                }
                Some(_) => {
                    return Err(format!("'*' must end its segment, found in '{part}'"));
                }
            }
        }

        if wildcards > 1 {
            return Err("at most one wildcard segment is allowed".to_string());
        }

        Ok(Self {
            text: text.to_string(),
            segments,
            case_insensitive,
        })
    }

    /// Pattern text as configured
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the pattern matches a concrete key path of the same length
    pub fn matches(&self, path: &[&str]) -> bool {
        self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, key)| self.segment_matches(segment, key))
    }

    fn segment_matches(&self, segment: &Segment, key: &str) -> bool {
        match segment {
            Segment::Literal(literal) => eq_folded(literal, key, self.case_insensitive),
            Segment::Wildcard { prefix } => starts_with_folded(key, prefix, self.case_insensitive),
        }
    }

    /// Tie-break rank of this pattern
    ///
    /// The prefix length counts the whole pattern text before the `*`,
    /// earlier segments and their dots included. `ab.c*.e` (4) therefore
    /// outranks `a*.cd.e` (1) even though its wildcard segment is later.
    pub fn specificity(&self) -> Specificity {
        match self.text.find('*') {
            Some(idx) => Specificity::Wildcard {
                prefix_len: self.text[..idx].chars().count(),
            },
            None => Specificity::Literal,
        }
    }

    /// Whether some concrete path could be matched by both patterns
    pub fn overlaps(&self, other: &PathPattern) -> bool {
        let ci = self.case_insensitive || other.case_insensitive;
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => eq_folded(a, b, ci),
                    (Segment::Literal(lit), Segment::Wildcard { prefix })
                    | (Segment::Wildcard { prefix }, Segment::Literal(lit)) => {
                        starts_with_folded(lit, prefix, ci)
                    }
                    (Segment::Wildcard { prefix: a }, Segment::Wildcard { prefix: b }) => {
                        starts_with_folded(a, b, ci) || starts_with_folded(b, a, ci)
                    }
                })
    }

    /// Order two patterns by specificity, most specific first
    pub fn rank(&self, other: &PathPattern) -> Ordering {
        other.specificity().cmp(&self.specificity())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// String equality, ignoring ASCII case when asked
pub(crate) fn eq_folded(a: &str, b: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Prefix test, ignoring ASCII case when asked
pub(crate) fn starts_with_folded(text: &str, prefix: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        text.len() >= prefix.len()
            && text.is_char_boundary(prefix.len())
            && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    } else {
        text.starts_with(prefix)
    }
}
