//! Segment file selection by structured filename matching.
//!
//! Filenames are split on a delimiter and matched field by field against a
//! [`Grammar`]. Literal fields must belong to a caller-supplied accepted set,
//! integer fields may be constrained to an inclusive range.

mod grammar;

pub use grammar::{Grammar, Token};

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// A segment file whose name matched a [`PatternFilter`], with its parsed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    path: PathBuf,
    delimiter: String,
    fields: Vec<String>,
    literals: Vec<String>,
    date_key: Option<i64>,
}

impl SegmentDescriptor {
    /// Path of the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All delimiter-separated fields of the basename.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Values of the literal-match fields, in grammar order.
    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Value of the first integer field, if it parsed.
    pub const fn date_key(&self) -> Option<i64> {
        self.date_key
    }

    /// Fields identifying the station: everything but the trailing date key
    /// and extension, joined by the delimiter.
    pub fn station_stem(&self) -> String {
        let keep = self.fields.len().saturating_sub(2).max(1);
        self.fields[..keep.min(self.fields.len())].join(&self.delimiter)
    }

    /// Last field of the basename.
    pub fn extension(&self) -> &str {
        self.fields.last().map_or("", String::as_str)
    }
}

/// Filename filter built from a delimiter, a grammar and accepted-value sets.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    delimiter: String,
    grammar: Grammar,
    accepted: Vec<HashSet<String>>,
    range: Option<RangeInclusive<i64>>,
}

impl PatternFilter {
    /// Build a filter.
    ///
    /// `accepted` holds one set per literal-match token, in order. A count
    /// mismatch is a grammar error.
    pub fn new<S: AsRef<str>>(delimiter: &str, grammar: &str, accepted: &[Vec<S>]) -> Result<Self> {
        let grammar = Grammar::parse(grammar, delimiter)?;

        if accepted.len() != grammar.literal_count() {
            return Err(Error::Grammar {
                message: format!(
                    "grammar has {} literal field(s) but {} accepted set(s) were given",
                    grammar.literal_count(),
                    accepted.len()
                ),
            });
        }

        let accepted = accepted
            .iter()
            .map(|set| set.iter().map(|v| v.as_ref().to_string()).collect())
            .collect();

        Ok(Self {
            delimiter: delimiter.to_string(),
            grammar,
            accepted,
            range: None,
        })
    }

    /// Restrict integer fields to an inclusive range.
    pub fn with_range(mut self, range: RangeInclusive<i64>) -> Result<Self> {
        if self.grammar.integer_count() == 0 {
            return Err(Error::Grammar {
                message: "an integer range was given but the grammar has no integer field"
                    .to_string(),
            });
        }
        self.range = Some(range);
        Ok(self)
    }

    /// Parse `path` if its basename matches; `None` otherwise.
    pub fn describe(&self, path: &Path) -> Option<SegmentDescriptor> {
        let name = path.file_name()?.to_str()?;
        let fields: Vec<&str> = name.split(self.delimiter.as_str()).collect();
        if fields.len() != self.grammar.len() {
            return None;
        }

        let mut literals = Vec::with_capacity(self.accepted.len());
        let mut date_key = None;
        for (field, token) in fields.iter().zip(self.grammar.tokens()) {
            match token {
                Token::Literal => {
                    let set = &self.accepted[literals.len()];
                    if !set.contains(*field) {
                        return None;
                    }
                    literals.push((*field).to_string());
                }
                Token::Integer => {
                    let value = field.parse::<i64>().ok();
                    if let Some(range) = &self.range
                        && !value.is_some_and(|v| range.contains(&v))
                    {
                        return None;
                    }
                    date_key = date_key.or(value);
                }
                Token::Ignored => {}
            }
        }

        Some(SegmentDescriptor {
            path: path.to_path_buf(),
            delimiter: self.delimiter.clone(),
            fields: fields.into_iter().map(str::to_string).collect(),
            literals,
            date_key,
        })
    }

    /// Whether a filename matches.
    pub fn matches(&self, name: &str) -> bool {
        self.describe(Path::new(name)).is_some()
    }

    /// Descriptors of all matching paths, in input order.
    pub fn select<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<SegmentDescriptor> {
        paths
            .iter()
            .filter_map(|p| self.describe(p.as_ref()))
            .collect()
    }
}

/// Subsequence of `names` matching the grammar, accepted sets and optional range.
///
/// # Examples
///
/// ```
/// use sacmerge::filter::filter_filenames;
///
/// let names = ["STA1.junk.5", "STA2.junk.9", "STA3.junk.1"];
/// let kept = filter_filenames(&names, ".", "s.x.i", &[vec!["STA1", "STA2"]], Some(0..=8)).unwrap();
/// assert_eq!(kept, vec!["STA1.junk.5".to_string()]);
/// ```
pub fn filter_filenames<N: AsRef<str>, S: AsRef<str>>(
    names: &[N],
    delimiter: &str,
    grammar: &str,
    accepted: &[Vec<S>],
    range: Option<RangeInclusive<i64>>,
) -> Result<Vec<String>> {
    let mut filter = PatternFilter::new(delimiter, grammar, accepted)?;
    if let Some(range) = range {
        filter = filter.with_range(range)?;
    }
    Ok(names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| filter.matches(name))
        .map(str::to_string)
        .collect())
}
