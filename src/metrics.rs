use serde::{Deserialize, Serialize};

use crate::table::Table;

/// How many numeric columns get Avg/Max cards
const SUMMARIZED_COLUMNS: usize = 2;

/// Accent color of a metric card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Blue,
    Green,
    Red,
}

impl ColorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorTag::Blue => "blue",
            ColorTag::Green => "green",
            ColorTag::Red => "red",
        }
    }
}

/// One tile on the trends dashboard, with its value already formatted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub icon: String,
    pub color: ColorTag,
}

impl MetricCard {
    fn new(title: String, value: String, icon: &str, color: ColorTag) -> Self {
        MetricCard {
            title,
            value,
            icon: icon.to_string(),
            color,
        }
    }
}

/// Summarize a table as metric cards
///
/// Always starts with a "Total Records" card. Each of the first two numeric
/// columns then adds an "Avg" and a "Max" card, both to two decimal places.
/// Missing cells are skipped. Never fails: a table without numeric columns
/// only yields the record count.
///
/// # Examples
/// ```
/// use dashboard::decoder::decode;
/// use dashboard::metrics::summarize;
///
/// let table = decode("data.csv", b"a\n1\n4\n").unwrap();
/// let cards = summarize(&table);
/// assert_eq!(cards[1].title, "Avg a");
/// assert_eq!(cards[1].value, "2.50");
/// ```
pub fn summarize(table: &Table) -> Vec<MetricCard> {
    let mut cards = vec![MetricCard::new(
        "Total Records".to_string(),
        table.row_count().to_string(),
        "📊",
        ColorTag::Blue,
    )];

    for column in table.numeric_columns().take(SUMMARIZED_COLUMNS) {
        let (count, sum, max) = column.numbers().fold(
            (0usize, 0.0f64, f64::NEG_INFINITY),
            |(count, sum, max), v| (count + 1, sum + v, max.max(v)),
        );
        // Numeric columns always hold at least one value
        if count == 0 {
            continue;
        }
        let mean = sum / count as f64;

        cards.push(MetricCard::new(
            format!("Avg {}", column.name),
            format!("{:.2}", mean),
            "📈",
            ColorTag::Green,
        ));
        cards.push(MetricCard::new(
            format!("Max {}", column.name),
            format!("{:.2}", max),
            "⬆️",
            ColorTag::Red,
        ));
    }

    cards
}
