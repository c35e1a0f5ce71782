//! Reference extraction: independent passes that pull column references,
//! numeric literals, comparison conditions, calendar filters and the
//! aggregation kind out of free text.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    filter::ComparisonOperator,
    intent::contains_any,
    plan::{AggregationKind, Condition, NumericLiteral, TimeFilter},
};

/// Synonym key → phrases that refer to it. A phrase hit selects every column
/// whose name contains the key.
pub const COLUMN_SYNONYMS: &[(&str, &[&str])] = &[
    ("revenue", &["sales", "income", "earnings"]),
    ("profit", &["margin", "gain", "earnings"]),
    ("cost", &["expense", "expenditure"]),
    ("date", &["time", "period", "month", "year"]),
    ("product", &["item", "goods", "merchandise"]),
    ("customer", &["client", "buyer", "user"]),
];

pub const QUARTERS: &[(&str, u8)] = &[("q1", 1), ("q2", 2), ("q3", 3), ("q4", 4)];

pub const MONTHS: &[(&str, u8)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const SUM_WORDS: &[&str] = &["sum", "total", "add"];
const MEAN_WORDS: &[&str] = &["average", "mean", "avg"];
const COUNT_WORDS: &[&str] = &["count", "number"];
const MAX_WORDS: &[&str] = &["max", "highest", "maximum"];
const MIN_WORDS: &[&str] = &["min", "lowest", "minimum"];

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"))
}

fn condition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(>=|<=|>|<|=)\s*(\d+(?:\.\d+)?)").expect("valid condition pattern")
    })
}

/// Direct (case-insensitive substring) matches in declared order, then
/// synonym matches; deduplicated, first-seen order.
pub fn extract_columns<S: AsRef<str>>(query: &str, column_names: &[S]) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut columns: Vec<String> = Vec::new();

    for name in column_names {
        let name = name.as_ref();
        if !name.is_empty()
            && lowered.contains(&name.to_lowercase())
            && !columns.iter().any(|c| c == name)
        {
            columns.push(name.to_string());
        }
    }

    for (key, phrases) in COLUMN_SYNONYMS {
        if !contains_any(&lowered, phrases) {
            continue;
        }
        for name in column_names {
            let name = name.as_ref();
            if name.to_lowercase().contains(key) && !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }

    columns
}

pub fn parse_literal(token: &str) -> Option<NumericLiteral> {
    if token.contains('.') {
        token.parse::<f64>().ok().map(NumericLiteral::Float)
    } else {
        token
            .parse::<i64>()
            .map(NumericLiteral::Integer)
            .or_else(|_| token.parse::<f64>().map(NumericLiteral::Float))
            .ok()
    }
}

pub fn extract_literals(query: &str) -> Vec<NumericLiteral> {
    number_pattern()
        .find_iter(query)
        .filter_map(|m| parse_literal(m.as_str()))
        .collect()
}

/// Left-to-right, non-overlapping: `>= 5` yields one `>=` condition only.
pub fn extract_conditions(query: &str) -> Vec<Condition> {
    condition_pattern()
        .captures_iter(query)
        .filter_map(|caps| {
            let operator = match &caps[1] {
                ">=" => ComparisonOperator::Ge,
                "<=" => ComparisonOperator::Le,
                ">" => ComparisonOperator::Gt,
                "<" => ComparisonOperator::Lt,
                _ => ComparisonOperator::Eq,
            };
            let value = parse_literal(&caps[2])?.as_f64();
            Some(Condition { operator, value })
        })
        .collect()
}

/// Later vocabulary entries overwrite earlier ones of the same kind.
pub fn extract_time_filter(query: &str) -> TimeFilter {
    let lowered = query.to_lowercase();
    let mut filter = TimeFilter::default();
    for (token, quarter) in QUARTERS {
        if lowered.contains(token) {
            filter.quarter = Some(*quarter);
        }
    }
    for (token, month) in MONTHS {
        if lowered.contains(token) {
            filter.month = Some(*month);
        }
    }
    filter
}

pub fn extract_aggregation_kind(query: &str) -> AggregationKind {
    let lowered = query.to_lowercase();
    if contains_any(&lowered, SUM_WORDS) {
        AggregationKind::Sum
    } else if contains_any(&lowered, MEAN_WORDS) {
        AggregationKind::Mean
    } else if contains_any(&lowered, COUNT_WORDS) {
        AggregationKind::Count
    } else if contains_any(&lowered, MAX_WORDS) {
        AggregationKind::Max
    } else if contains_any(&lowered, MIN_WORDS) {
        AggregationKind::Min
    } else {
        AggregationKind::Sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_integer_literal_falls_back_to_float() {
        assert!(matches!(
            parse_literal("99999999999999999999"),
            Some(NumericLiteral::Float(_))
        ));
    }
}
