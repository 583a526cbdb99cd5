use serde::{Deserialize, Serialize};

/// Tokens a standard tabular decoder reads as a missing value
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell of a decoded table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text shown for this cell in the raw grid
    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Missing => String::new(),
        }
    }
}

/// Inferred type of a whole column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<CellValue>,
}

/// A raw cell as produced by a format reader, before column inference
#[derive(Clone, Debug, PartialEq)]
pub enum RawCell {
    /// A number, with the text it was read from
    Number { value: f64, source: String },
    Text(String),
    Missing,
}

impl RawCell {
    /// Classifies delimited-text input: missing token, number or text.
    pub fn from_text(field: &str) -> Self {
        let trimmed = field.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return RawCell::Missing;
        }
        match parse_number(trimmed) {
            Some(value) => RawCell::Number {
                value,
                source: field.to_string(),
            },
            None => RawCell::Text(field.to_string()),
        }
    }

    /// Classifies a string that must stay text unless it is a missing token.
    pub fn from_string(field: &str) -> Self {
        if MISSING_TOKENS.contains(&field.trim()) {
            RawCell::Missing
        } else {
            RawCell::Text(field.to_string())
        }
    }

    pub fn from_number(value: f64) -> Self {
        RawCell::Number {
            value,
            source: format_number(value),
        }
    }
}

impl Column {
    /// Builds a column, inferring its kind from every cell.
    ///
    /// The column is numeric when every non-missing cell is a number and
    /// at least one cell is present; otherwise every cell falls back to text.
    pub fn infer(name: impl Into<String>, raw: Vec<RawCell>) -> Self {
        let any_present = raw.iter().any(|c| !matches!(c, RawCell::Missing));
        let all_numeric = raw.iter().all(|c| !matches!(c, RawCell::Text(_)));

        if any_present && all_numeric {
            let cells = raw
                .into_iter()
                .map(|c| match c {
                    RawCell::Number { value, .. } => CellValue::Number(value),
                    _ => CellValue::Missing,
                })
                .collect();
            return Column {
                name: name.into(),
                kind: ColumnKind::Numeric,
                cells,
            };
        }

        let cells = raw
            .into_iter()
            .map(|c| match c {
                RawCell::Number { source, .. } => CellValue::Text(source),
                RawCell::Text(s) => CellValue::Text(s),
                RawCell::Missing => CellValue::Missing,
            })
            .collect();
        Column {
            name: name.into(),
            kind: ColumnKind::Text,
            cells,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Present numeric values, skipping missing cells
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().filter_map(CellValue::as_number)
    }
}

/// An ordered set of named columns of equal length
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table from a header line and row-major raw cells.
    ///
    /// Short rows are padded with missing cells. Header names are made
    /// unique the way a standard tabular decoder does.
    pub fn from_rows(header: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        let names = normalize_headers(header);
        let row_count = rows.len();
        let mut raw_columns: Vec<Vec<RawCell>> = names
            .iter()
            .map(|_| Vec::with_capacity(row_count))
            .collect();

        for row in rows {
            let mut fields = row.into_iter();
            for column in raw_columns.iter_mut() {
                column.push(fields.next().unwrap_or(RawCell::Missing));
            }
        }

        let columns = names
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| Column::infer(name, raw))
            .collect();

        Table {
            columns,
            rows: row_count,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Numeric columns in table order
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// Cells of one row, in column order
    pub fn row(&self, index: usize) -> Option<Vec<&CellValue>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[index]).collect())
    }
}

/// Formats a number the way the raw grid shows it: integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn parse_number(s: &str) -> Option<f64> {
    // Rust also accepts inf/nan spellings after an optional sign; only digits count here.
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let first = unsigned.chars().next()?;
    if !(first.is_ascii_digit() || first == '.') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize_headers(header: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(header.len());
    for (index, name) in header.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.push(candidate);
    }
    seen
}
