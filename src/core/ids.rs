//! Short sequential identifiers (`U001`, `U002`, ...).
//!
//! The allocator holds no counter. Each allocation scans the identifiers that
//! currently exist, so rows inserted or deleted behind the worker's back are
//! always respected and a restart never reuses or skips differently.
//!
//! Width is a padding floor, not a ceiling on the counter: after `U999` comes
//! `U1000`. Ordering always goes through [`ShortIdAllocator::numeric_part`],
//! never through string comparison, so longer ids still sort after shorter
//! ones.

use crate::core::error::RosterError;
use regex::Regex;
use std::cmp::Ordering;

pub const DEFAULT_PREFIX: &str = "U";
pub const DEFAULT_WIDTH: usize = 3;

#[derive(Debug, Clone)]
pub struct ShortIdAllocator {
    prefix: String,
    width: usize,
    pattern: Regex,
}

impl ShortIdAllocator {
    pub fn new(prefix: &str, width: usize) -> Result<Self, RosterError> {
        if prefix.is_empty() {
            return Err(RosterError::ConfigError(
                "id prefix must not be empty".to_string(),
            ));
        }
        if prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err(RosterError::ConfigError(format!(
                "id prefix '{prefix}' must not contain digits"
            )));
        }
        if width == 0 {
            return Err(RosterError::ConfigError(
                "id width must be at least 1".to_string(),
            ));
        }
        let pattern = Regex::new(&format!("^{}([0-9]+)$", regex::escape(prefix)))
            .map_err(|e| RosterError::ConfigError(e.to_string()))?;
        Ok(Self {
            prefix: prefix.to_string(),
            width,
            pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// An example id for help text, e.g. `U001`.
    pub fn example(&self) -> String {
        self.format(1)
    }

    /// Numeric part of `id` when it has the `prefix` + digits shape.
    pub fn numeric_part(&self, id: &str) -> Option<u64> {
        self.pattern
            .captures(id)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    }

    /// Next identifier given everything currently in the store.
    pub fn next_id<'a, I>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing
            .into_iter()
            .filter_map(|id| self.numeric_part(id))
            .max()
            .unwrap_or(0);
        self.format(max.saturating_add(1))
    }

    /// Total order for listing: matching ids by number, then everything else
    /// by raw text.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.numeric_part(a), self.numeric_part(b)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    fn format(&self, n: u64) -> String {
        format!("{}{:0width$}", self.prefix, n, width = self.width)
    }
}

impl Default for ShortIdAllocator {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            width: DEFAULT_WIDTH,
            pattern: Regex::new("^U([0-9]+)$").expect("static regex"),
        }
    }
}
