//! Generic record tables over JSON documents.
//!
//! Any array of JSON objects can be viewed as a table: the columns are the
//! union of the record keys in first-seen order. Tables sort stably by one
//! column and render to a plain HTML `<table>`.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no value at JSON pointer {0:?}")]
    MissingPointer(String),
    #[error("expected an array of records, found {0}")]
    NotAnArray(&'static str),
    #[error("row {index} is {found}, not a record")]
    NotARecord { index: usize, found: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `asc` / `desc`, case-insensitive. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Ascending),
            "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Current sort, echoed into header links so a click toggles direction.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions<'a> {
    /// Base href for header links, e.g. `/tables/data/projections/steamer.json`.
    pub base_href: &'a str,
    pub pointer: &'a str,
    pub sorted_by: Option<(&'a str, SortOrder)>,
}

impl Table {
    /// Table from an array of objects.
    pub fn from_value(value: &Value) -> Result<Self, TableError> {
        let items = value.as_array().ok_or(TableError::NotAnArray(kind(value)))?;
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let record = item
                .as_object()
                .ok_or(TableError::NotARecord { index, found: kind(item) })?;
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
            rows.push(record.clone());
        }
        Ok(Self { columns, rows })
    }

    /// Table from the array found at `pointer` (RFC 6901) inside `document`.
    /// An empty pointer addresses the document itself.
    pub fn from_document(document: &Value, pointer: &str) -> Result<Self, TableError> {
        let target = document
            .pointer(pointer)
            .ok_or_else(|| TableError::MissingPointer(pointer.to_owned()))?;
        Self::from_value(target)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable sort by `column`. Rows lacking the column (or holding null) stay
    /// at the bottom whichever way the table is sorted.
    pub fn sort_by(&mut self, column: &str, order: SortOrder) {
        self.rows.sort_by(|a, b| {
            match (present(a.get(column)), present(b.get(column))) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y);
                    match order {
                        SortOrder::Ascending => ord,
                        SortOrder::Descending => ord.reverse(),
                    }
                }
            }
        });
    }

    pub fn to_html(&self, options: &RenderOptions<'_>) -> String {
        let mut html = String::from("<table>\n<thead>\n<tr>");
        for column in &self.columns {
            let next = match options.sorted_by {
                Some((current, order)) if current == column => order.toggle(),
                _ => SortOrder::Ascending,
            };
            let _ = write!(
                html,
                "<th><a href=\"{}?pointer={}&amp;sort={}&amp;dir={}\">{}</a></th>",
                escape(options.base_href),
                urlencoding::encode(options.pointer),
                urlencoding::encode(column),
                next.as_str(),
                escape(column),
            );
        }
        html.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &self.rows {
            html.push_str("<tr>");
            for column in &self.columns {
                let text = row.get(column).map(cell_text).unwrap_or_default();
                let _ = write!(html, "<td>{}</td>", escape(&text));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");
        html
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Numbers before everything else, then text; within a kind, natural order.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| cell_text(a).cmp(&cell_text(b))),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        _ => 3,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
