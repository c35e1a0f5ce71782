//! Spreadsheet formula suggestions from a free-text request.

use std::fmt;

use serde::Serialize;

use crate::intent::contains_any;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaCategory {
    Sum,
    Average,
    Count,
    Lookup,
    Conditional,
    Date,
    Text,
    Financial,
    General,
}

struct CategoryInfo {
    category: FormulaCategory,
    keywords: &'static [&'static str],
    examples: &'static [&'static str],
    tips: &'static [&'static str],
}

/// Checked in order; the first category with a keyword hit wins.
const CATEGORIES: &[CategoryInfo] = &[
    CategoryInfo {
        category: FormulaCategory::Sum,
        keywords: &["sum", "total", "add", "calculate total"],
        examples: &[
            "=SUM(A2:A100)",
            "=SUMIF(A2:A100, \">0\", B2:B100)",
            "=SUMIFS(C2:C100, A2:A100, \"Product A\", B2:B100, \">100\")",
        ],
        tips: &[
            "Use SUMIF for conditional summing",
            "Use SUMIFS for multiple conditions",
            "SUM ignores text and empty cells",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Average,
        keywords: &["average", "mean", "avg"],
        examples: &[
            "=AVERAGE(A2:A100)",
            "=AVERAGEIF(A2:A100, \">0\")",
            "=AVERAGEIFS(C2:C100, A2:A100, \"Product A\")",
        ],
        tips: &[
            "AVERAGE ignores empty cells",
            "Use AVERAGEIF for conditional averaging",
            "Consider using MEDIAN for skewed data",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Count,
        keywords: &["count", "number of", "how many"],
        examples: &[
            "=COUNT(A2:A100)",
            "=COUNTIF(A2:A100, \"Product A\")",
            "=COUNTIFS(A2:A100, \"Product A\", B2:B100, \">100\")",
        ],
        tips: &[
            "COUNT only counts numbers; COUNTA counts any non-empty cell",
            "Use COUNTIF for a single condition",
            "Use COUNTIFS for multiple conditions",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Lookup,
        keywords: &["lookup", "find", "vlookup", "hlookup", "index match"],
        examples: &[
            "=VLOOKUP(A2, B2:D100, 3, FALSE)",
            "=INDEX(C2:C100, MATCH(A2, B2:B100, 0))",
            "=HLOOKUP(A2, B2:D10, 3, FALSE)",
        ],
        tips: &[
            "VLOOKUP searches left to right only",
            "INDEX-MATCH is more flexible",
            "Always use FALSE for exact matches in VLOOKUP",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Conditional,
        keywords: &["if", "conditional", "when", "based on"],
        examples: &[
            "=IF(A2>100, \"High\", \"Low\")",
            "=IFS(A2>100, \"High\", A2>50, \"Medium\", TRUE, \"Low\")",
            "=SWITCH(A2, 1, \"One\", 2, \"Two\", \"Other\")",
        ],
        tips: &[
            "Nest IF functions for complex logic",
            "Use IFS for multiple conditions (Excel 2019+)",
            "Consider SWITCH for multiple values",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Date,
        keywords: &["date", "time", "month", "year", "quarter"],
        examples: &[
            "=MONTH(A2)",
            "=YEAR(A2)",
            "=ROUNDUP(MONTH(A2)/3, 0)",
            "=DATEDIF(A2, B2, \"D\")",
            "=EOMONTH(A2, 0)",
        ],
        tips: &[
            "Excel stores dates as numbers",
            "Use DATE function to create dates",
            "DATEDIF calculates date differences",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Text,
        keywords: &["text", "string", "concatenate", "join"],
        examples: &[
            "=CONCATENATE(A2, \" \", B2)",
            "=A2&\" \"&B2",
            "=LEFT(A2, 5)",
            "=RIGHT(A2, 3)",
            "=MID(A2, 2, 4)",
            "=UPPER(A2)",
            "=LOWER(A2)",
            "=PROPER(A2)",
        ],
        tips: &[
            "Use & operator for simple concatenation",
            "TRIM removes extra spaces",
            "SUBSTITUTE replaces text",
        ],
    },
    CategoryInfo {
        category: FormulaCategory::Financial,
        keywords: &["profit", "margin", "percentage", "rate", "interest"],
        examples: &[
            "=A2/B2",
            "=(A2-B2)/A2",
            "=PMT(rate/12, nper*12, pv)",
            "=FV(rate, nper, pmt, pv)",
            "=PV(rate, nper, pmt, fv)",
        ],
        tips: &[
            "Use absolute references ($) for constants",
            "PMT calculates loan payments",
            "FV calculates future value",
        ],
    },
];

const GENERAL_TIPS: &[&str] = &[
    "Test your formula with sample data",
    "Use F9 to evaluate parts of formulas",
];

impl FormulaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaCategory::Sum => "sum",
            FormulaCategory::Average => "average",
            FormulaCategory::Count => "count",
            FormulaCategory::Lookup => "lookup",
            FormulaCategory::Conditional => "conditional",
            FormulaCategory::Date => "date",
            FormulaCategory::Text => "text",
            FormulaCategory::Financial => "financial",
            FormulaCategory::General => "general",
        }
    }

    fn info(&self) -> Option<&'static CategoryInfo> {
        CATEGORIES.iter().find(|info| info.category == *self)
    }
}

impl fmt::Display for FormulaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaSuggestion {
    pub formula: &'static str,
    pub explanation: &'static str,
    pub category: FormulaCategory,
    pub examples: Vec<&'static str>,
    pub usage_tips: Vec<&'static str>,
}

pub fn categorize(request: &str) -> FormulaCategory {
    let lowered = request.to_lowercase();
    CATEGORIES
        .iter()
        .find(|info| contains_any(&lowered, info.keywords))
        .map(|info| info.category)
        .unwrap_or(FormulaCategory::General)
}

fn primary_formula(category: FormulaCategory, lowered: &str) -> (&'static str, &'static str) {
    let has = |word: &str| lowered.contains(word);
    match category {
        FormulaCategory::Sum if has("ifs") => (
            "=SUMIFS(sum_range, criteria_range1, criteria1, criteria_range2, criteria2)",
            "SUMIFS adds values in a range that meet multiple criteria",
        ),
        FormulaCategory::Sum if has("if") => (
            "=SUMIF(range, criteria, sum_range)",
            "SUMIF adds values in a range that meet a single criterion",
        ),
        FormulaCategory::Sum => ("=SUM(range)", "SUM adds all numbers in a range"),
        FormulaCategory::Average if has("if") => (
            "=AVERAGEIF(range, criteria)",
            "AVERAGEIF calculates the average of values that meet a criterion",
        ),
        FormulaCategory::Average => (
            "=AVERAGE(range)",
            "AVERAGE calculates the arithmetic mean of values",
        ),
        FormulaCategory::Count if has("if") => (
            "=COUNTIF(range, criteria)",
            "COUNTIF counts the cells in a range that meet a criterion",
        ),
        FormulaCategory::Count => ("=COUNT(range)", "COUNT counts the numeric cells in a range"),
        FormulaCategory::Lookup if has("vlookup") => (
            "=VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])",
            "VLOOKUP searches for a value in the first column of a table and returns a value in the same row from another column",
        ),
        FormulaCategory::Lookup if has("index") && has("match") => (
            "=INDEX(return_range, MATCH(lookup_value, lookup_range, 0))",
            "INDEX-MATCH is more flexible than VLOOKUP and can search in any column",
        ),
        FormulaCategory::Lookup => (
            "=VLOOKUP(lookup_value, table_array, col_index_num, FALSE)",
            "VLOOKUP for exact match (recommended)",
        ),
        FormulaCategory::Conditional if has("multiple") || has("several") => (
            "=IFS(condition1, result1, condition2, result2, ...)",
            "IFS evaluates multiple conditions and returns the first TRUE result",
        ),
        FormulaCategory::Conditional => (
            "=IF(condition, value_if_true, value_if_false)",
            "IF performs a logical test and returns one value if TRUE, another if FALSE",
        ),
        FormulaCategory::Date if has("month") => (
            "=MONTH(date)",
            "MONTH extracts the month number (1-12) from a date",
        ),
        FormulaCategory::Date if has("year") => ("=YEAR(date)", "YEAR extracts the year from a date"),
        FormulaCategory::Date if has("quarter") => (
            "=ROUNDUP(MONTH(date)/3, 0)",
            "Calculates quarter (1-4) from a date",
        ),
        FormulaCategory::Date => ("=TODAY()", "TODAY returns the current date"),
        FormulaCategory::Text if has("join") || has("concatenate") => (
            "=CONCATENATE(text1, text2, ...) or =A1&\" \"&B1",
            "Concatenates multiple text strings into one",
        ),
        FormulaCategory::Text if has("upper") => ("=UPPER(text)", "Converts text to uppercase"),
        FormulaCategory::Text if has("lower") => ("=LOWER(text)", "Converts text to lowercase"),
        FormulaCategory::Text => (
            "=LEFT(text, num_chars)",
            "LEFT extracts characters from the beginning of a text string",
        ),
        FormulaCategory::Financial if has("margin") => (
            "=(revenue - cost) / revenue",
            "Profit margin = (Revenue - Cost) / Revenue",
        ),
        FormulaCategory::Financial if has("percentage") => {
            ("=part / total", "Percentage = Part / Total")
        }
        FormulaCategory::Financial => ("=A2/B2", "Basic division for financial calculations"),
        FormulaCategory::General => ("=SUM(A2:A100)", "Basic SUM formula - modify as needed"),
    }
}

pub fn suggest(request: &str) -> FormulaSuggestion {
    let lowered = request.to_lowercase();
    let category = categorize(request);
    let (formula, explanation) = primary_formula(category, &lowered);
    let info = category.info();
    FormulaSuggestion {
        formula,
        explanation,
        category,
        examples: info.map(|i| i.examples.to_vec()).unwrap_or_default(),
        usage_tips: info
            .map(|i| i.tips.to_vec())
            .unwrap_or_else(|| GENERAL_TIPS.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_variants_pick_the_narrowest_function() {
        assert_eq!(suggest("total sales").formula, "=SUM(range)");
        assert!(suggest("sum if region is east").formula.starts_with("=SUMIF("));
        assert!(suggest("sumifs across two criteria").formula.starts_with("=SUMIFS("));
    }

    #[test]
    fn categories_follow_keyword_order() {
        assert_eq!(categorize("how many orders"), FormulaCategory::Count);
        assert_eq!(categorize("vlookup the customer"), FormulaCategory::Lookup);
        assert_eq!(categorize("profit margin"), FormulaCategory::Financial);
        assert_eq!(categorize("hello"), FormulaCategory::General);
    }

    #[test]
    fn general_has_generic_tips_and_no_examples() {
        let suggestion = suggest("hello");
        assert!(suggestion.examples.is_empty());
        assert_eq!(suggestion.usage_tips.len(), 2);
    }
}
