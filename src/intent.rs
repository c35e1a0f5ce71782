//! Keyword-driven intent classification.
//!
//! Matching is a lower-cased substring test against fixed vocabularies. The
//! order of checks is part of the external contract:
//!
//! 1. aggregation keywords
//! 2. filter keywords, or an explicit comparison such as `> 150`
//! 3. an explicit ranking phrase (`top 5`, `3 highest`, `10 best`)
//! 4. groupby keywords
//! 5. top_n keywords
//! 6. otherwise `general`
//!
//! A query mentioning both "sum" and "top 3" is therefore an aggregation. The
//! ranking phrase sits ahead of the groupby words because in "top 1 region by
//! revenue" the word "by" names the sort column rather than a grouping.
//!
//! `Comparison` and `Trend` are never produced here; no vocabulary maps to them.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

pub const AGGREGATION_KEYWORDS: &[&str] = &[
    "sum", "total", "average", "mean", "count", "max", "min", "highest", "lowest",
];
pub const FILTER_KEYWORDS: &[&str] = &[
    "show", "find", "filter", "where", "above", "below", "greater", "less", "equal",
];
pub const GROUPBY_KEYWORDS: &[&str] = &["by", "group", "each", "per", "for each", "grouped by"];
pub const TOP_N_KEYWORDS: &[&str] = &["top", "highest", "best", "leading"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Aggregation,
    Filter,
    GroupBy,
    TopN,
    Comparison,
    Trend,
    General,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Intent::Aggregation,
        Intent::Filter,
        Intent::GroupBy,
        Intent::TopN,
        Intent::Comparison,
        Intent::Trend,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Aggregation => "aggregation",
            Intent::Filter => "filter",
            Intent::GroupBy => "groupby",
            Intent::TopN => "top_n",
            Intent::Comparison => "comparison",
            Intent::Trend => "trend",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn comparison_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[<>=]\s*\d").expect("valid comparison pattern"))
}

fn ranking_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"top\s+\d+|\d+\s+highest|\d+\s+best").expect("valid ranking pattern")
    })
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn classify(query: &str) -> Intent {
    let lowered = query.to_lowercase();
    if contains_any(&lowered, AGGREGATION_KEYWORDS) {
        Intent::Aggregation
    } else if contains_any(&lowered, FILTER_KEYWORDS) || comparison_pattern().is_match(&lowered) {
        Intent::Filter
    } else if ranking_pattern().is_match(&lowered) {
        Intent::TopN
    } else if contains_any(&lowered, GROUPBY_KEYWORDS) {
        Intent::GroupBy
    } else if contains_any(&lowered, TOP_N_KEYWORDS) {
        Intent::TopN
    } else {
        Intent::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_phrase_is_detected_with_digits_only() {
        assert!(ranking_pattern().is_match("top 10 products"));
        assert!(ranking_pattern().is_match("the 3 best months"));
        assert!(!ranking_pattern().is_match("top products"));
    }

    #[test]
    fn comparison_pattern_needs_a_number() {
        assert!(comparison_pattern().is_match("revenue >= 10"));
        assert!(!comparison_pattern().is_match("a => b"));
    }
}
