//! The structured query plan built from free text and a table schema.

use std::{fmt, str::FromStr};

use log::debug;
use serde::{Serialize, Serializer};

use crate::{
    error::AnalystError,
    extract,
    filter::ComparisonOperator,
    intent::{self, Intent},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericLiteral {
    Integer(i64),
    Float(f64),
}

impl NumericLiteral {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumericLiteral::Integer(i) => *i as f64,
            NumericLiteral::Float(f) => *f,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            NumericLiteral::Integer(i) => Some(*i),
            NumericLiteral::Float(_) => None,
        }
    }
}

impl Serialize for NumericLiteral {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            NumericLiteral::Integer(i) => serializer.serialize_i64(*i),
            NumericLiteral::Float(f) => serializer.serialize_f64(*f),
        }
    }
}

/// A numeric comparison found in the query text, e.g. `> 150`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Condition {
    pub operator: ComparisonOperator,
    pub value: f64,
}

impl Condition {
    pub fn matches(&self, value: f64) -> bool {
        self.operator.compare_numbers(value, self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u8>,
}

impl TimeFilter {
    pub fn is_empty(&self) -> bool {
        self.quarter.is_none() && self.month.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Sum,
    Mean,
    Count,
    Max,
    Min,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "sum",
            AggregationKind::Mean => "mean",
            AggregationKind::Count => "count",
            AggregationKind::Max => "max",
            AggregationKind::Min => "min",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AggregationKind::Sum => "Sum",
            AggregationKind::Mean => "Mean",
            AggregationKind::Count => "Count",
            AggregationKind::Max => "Max",
            AggregationKind::Min => "Min",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationKind {
    type Err = AnalystError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationKind::Sum),
            "mean" | "average" | "avg" => Ok(AggregationKind::Mean),
            "count" => Ok(AggregationKind::Count),
            "max" => Ok(AggregationKind::Max),
            "min" => Ok(AggregationKind::Min),
            other => Err(AnalystError::unsupported("aggregation", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub intent: Intent,
    pub query: String,
    pub columns: Vec<String>,
    pub literals: Vec<NumericLiteral>,
    pub conditions: Vec<Condition>,
    pub time_filter: TimeFilter,
    pub aggregation: AggregationKind,
}

impl QueryPlan {
    pub fn build(query: &str, table: &Table) -> Self {
        let plan = QueryPlan {
            intent: intent::classify(query),
            query: query.to_string(),
            columns: extract::extract_columns(query, &table.column_names()),
            literals: extract::extract_literals(query),
            conditions: extract::extract_conditions(query),
            time_filter: extract::extract_time_filter(query),
            aggregation: extract::extract_aggregation_kind(query),
        };
        debug!(
            "Planned '{}' as {} (columns {:?}, {} condition(s), time filter {:?}, aggregation {})",
            plan.query,
            plan.intent,
            plan.columns,
            plan.conditions.len(),
            plan.time_filter,
            plan.aggregation
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_kind_parses_aliases() {
        assert_eq!("AVG".parse::<AggregationKind>().unwrap(), AggregationKind::Mean);
        assert!(matches!(
            "median".parse::<AggregationKind>(),
            Err(AnalystError::Unsupported { .. })
        ));
    }

    #[test]
    fn condition_matches_numbers() {
        let condition = Condition {
            operator: ComparisonOperator::Ge,
            value: 10.0,
        };
        assert!(condition.matches(10.0));
        assert!(!condition.matches(9.5));
    }
}
