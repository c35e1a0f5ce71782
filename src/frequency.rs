use std::collections::HashMap;

use serde::Serialize;

use crate::{data::Value, table::Column};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Counts non-null values of a column by their display form.
#[derive(Debug, Default)]
pub struct FrequencyAccumulator {
    total: usize,
    counts: HashMap<String, usize>,
}

impl FrequencyAccumulator {
    pub fn from_column(column: &Column) -> Self {
        let mut accumulator = Self::default();
        for value in column.cells.iter().flatten() {
            accumulator.ingest(value);
        }
        accumulator
    }

    pub fn ingest(&mut self, value: &Value) {
        self.total += 1;
        *self.counts.entry(value.as_display()).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Most frequent first; ties by value ascending. `top == 0` keeps all.
    pub fn most_common(&self, top: usize) -> Vec<ValueCount> {
        let mut items = self
            .counts
            .iter()
            .map(|(value, count)| ValueCount {
                value: value.clone(),
                count: *count,
            })
            .collect::<Vec<_>>();
        items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        if top > 0 && items.len() > top {
            items.truncate(top);
        }
        items
    }

    /// The most frequent value; ties resolve to the smallest value.
    pub fn mode(&self) -> Option<String> {
        self.most_common(1).into_iter().next().map(|item| item.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnKind;

    fn text_column(values: &[Option<&str>]) -> Column {
        Column::new(
            "c",
            ColumnKind::Text,
            values
                .iter()
                .map(|v| v.map(|s| Value::Text(s.to_string())))
                .collect(),
        )
    }

    #[test]
    fn most_common_orders_by_count_then_value() {
        let column = text_column(&[Some("b"), Some("a"), Some("b"), None, Some("c"), Some("a")]);
        let freq = FrequencyAccumulator::from_column(&column);
        assert_eq!(freq.total(), 5);
        let top = freq.most_common(2);
        assert_eq!(top[0], ValueCount { value: "a".into(), count: 2 });
        assert_eq!(top[1], ValueCount { value: "b".into(), count: 2 });
        assert_eq!(freq.mode(), Some("a".to_string()));
    }

    #[test]
    fn mode_of_all_null_column_is_none() {
        let freq = FrequencyAccumulator::from_column(&text_column(&[None, None]));
        assert_eq!(freq.mode(), None);
        assert_eq!(freq.distinct(), 0);
    }
}
