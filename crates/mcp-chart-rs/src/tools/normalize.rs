use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    tools::chart::ChartKind,
};

pub const MAX_TITLE_CHARS: usize = 100;

/// A tool argument that may arrive either as a JSON array or as one
/// delimited string such as `"a, b; c"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delimited<T> {
    List(Vec<T>),
    Text(String),
}

impl<T> Delimited<T> {
    /// Returns the list form unchanged, or splits the text form on runs of
    /// `is_separator` and keeps every non-empty piece `parse` accepts.
    pub fn normalize<F>(self, is_separator: fn(char) -> bool, mut parse: F) -> Vec<T>
    where
        F: FnMut(&str) -> Option<T>,
    {
        match self {
            Delimited::List(items) => items,
            Delimited::Text(text) => text
                .split(is_separator)
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .filter_map(|piece| parse(piece))
                .collect(),
        }
    }
}

fn is_label_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '|')
}

fn is_data_separator(c: char) -> bool {
    is_label_separator(c) || matches!(c, '[' | ']')
}

pub fn normalize_labels(raw: Delimited<String>) -> Vec<String> {
    raw.normalize(is_label_separator, |piece| Some(piece.to_string()))
}

/// Tokens that are not finite numbers are dropped, so the result can be
/// shorter than the input; the length check against the labels catches it.
pub fn normalize_data(raw: Delimited<Option<f64>>) -> Vec<Option<f64>> {
    raw.normalize(is_data_separator, |piece| match piece.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(Some(n)),
        _ => {
            tracing::warn!(token = piece, "Dropping non-numeric data token");
            None
        }
    })
}

/// Raw `generate_chart` arguments as they arrive from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartArgs {
    pub title: String,
    pub labels: Delimited<String>,
    #[serde(alias = "series")]
    pub data: Delimited<Option<f64>>,
    #[serde(default, rename = "chartType", alias = "chart_type", alias = "chartKind")]
    pub chart_type: ChartKind,
}

impl ChartArgs {
    /// Schema-level checks: field types, chart kind, title bounds.
    pub fn from_value(arguments: Value) -> Result<Self> {
        let args: ChartArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::InvalidParameters(format!("Invalid chart arguments: {e}")))?;

        if args.title.is_empty() {
            return Err(Error::InvalidParameters("title must not be empty".into()));
        }
        let title_len = args.title.chars().count();
        if title_len > MAX_TITLE_CHARS {
            return Err(Error::InvalidParameters(format!(
                "title must be at most {MAX_TITLE_CHARS} characters, got {title_len}"
            )));
        }
        Ok(args)
    }

    pub fn normalize(self) -> std::result::Result<ChartRequest, LengthMismatch> {
        let labels = normalize_labels(self.labels);
        let data = normalize_data(self.data);
        ChartRequest::new(self.title, labels, data, self.chart_type)
    }
}

/// Labels and data points disagree in count after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub labels: usize,
    pub data: usize,
}

impl fmt::Display for LengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The number of labels ({}) and data points ({}) must match.",
            self.labels, self.data
        )
    }
}

impl std::error::Error for LengthMismatch {}

/// A validated chart request: one label per data point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    title: String,
    labels: Vec<String>,
    data: Vec<Option<f64>>,
    kind: ChartKind,
}

impl ChartRequest {
    pub fn new(
        title: impl Into<String>,
        labels: Vec<String>,
        data: Vec<Option<f64>>,
        kind: ChartKind,
    ) -> std::result::Result<Self, LengthMismatch> {
        if labels.len() != data.len() {
            return Err(LengthMismatch {
                labels: labels.len(),
                data: data.len(),
            });
        }
        Ok(Self {
            title: title.into(),
            labels,
            data,
            kind,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn data(&self) -> &[Option<f64>] {
        &self.data
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_labels_from_delimited_string() {
        let labels = normalize_labels(Delimited::Text("a,b;c d".into()));
        assert_eq!(labels, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_labels_collapse_separator_runs() {
        let labels = normalize_labels(Delimited::Text(" Mon ,; Tue|| Wed\n".into()));
        assert_eq!(labels, vec!["Mon", "Tue", "Wed"]);
    }

    #[test]
    fn test_label_list_is_kept_verbatim() {
        let labels = normalize_labels(Delimited::List(vec!["New York".into(), "".into()]));
        assert_eq!(labels, vec!["New York", ""]);
    }

    #[test]
    fn test_data_from_delimited_string() {
        assert_eq!(
            normalize_data(Delimited::Text("1, 2, 3".into())),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
        assert_eq!(
            normalize_data(Delimited::Text("[20; 25.5 | -3]".into())),
            vec![Some(20.0), Some(25.5), Some(-3.0)]
        );
    }

    #[test]
    fn test_data_drops_malformed_tokens() {
        assert_eq!(
            normalize_data(Delimited::Text("1,x,3".into())),
            vec![Some(1.0), Some(3.0)]
        );
        assert_eq!(
            normalize_data(Delimited::Text("NaN, inf, 4".into())),
            vec![Some(4.0)]
        );
    }

    #[test]
    fn test_malformed_token_surfaces_as_mismatch() {
        let args = ChartArgs::from_value(json!({
            "title": "Sales",
            "labels": "a,b,c",
            "data": "1,x,3"
        }))
        .unwrap();
        let err = args.normalize().unwrap_err();
        assert_eq!(err, LengthMismatch { labels: 3, data: 2 });
        let message = err.to_string();
        assert!(message.contains("(3)"));
        assert!(message.contains("(2)"));
    }

    #[test]
    fn test_structured_args_with_nulls() {
        let request = ChartArgs::from_value(json!({
            "title": "Rain",
            "labels": ["Mon", "Tue", "Wed"],
            "data": [1.5, null, 2],
            "chartType": "bar"
        }))
        .unwrap()
        .normalize()
        .unwrap();
        assert_eq!(request.kind(), ChartKind::Bar);
        assert_eq!(request.data(), &[Some(1.5), None, Some(2.0)]);
        assert_eq!(request.labels().len(), 3);
    }

    #[test]
    fn test_chart_type_defaults_to_line() {
        let args = ChartArgs::from_value(json!({
            "title": "T",
            "labels": ["a"],
            "data": [1]
        }))
        .unwrap();
        assert_eq!(args.chart_type, ChartKind::Line);
    }

    #[test]
    fn test_unknown_chart_type_is_rejected() {
        let err = ChartArgs::from_value(json!({
            "title": "T",
            "labels": ["a"],
            "data": [1],
            "chartType": "scatter"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
        assert!(err.to_string().contains("scatter"));
    }

    #[test]
    fn test_title_bounds() {
        let empty = ChartArgs::from_value(json!({"title": "", "labels": [], "data": []}));
        assert!(matches!(empty, Err(Error::InvalidParameters(_))));
        assert!(ChartArgs::from_value(json!({"title": " ", "labels": [], "data": []})).is_ok());

        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        let too_long = ChartArgs::from_value(json!({"title": long, "labels": [], "data": []}));
        assert!(matches!(too_long, Err(Error::InvalidParameters(_))));

        let max = "é".repeat(MAX_TITLE_CHARS);
        assert!(ChartArgs::from_value(json!({"title": max, "labels": [], "data": []})).is_ok());
    }

    #[test]
    fn test_series_alias() {
        let request = ChartArgs::from_value(json!({
            "title": "T",
            "labels": "a b",
            "series": "4 5"
        }))
        .unwrap()
        .normalize()
        .unwrap();
        assert_eq!(request.data(), &[Some(4.0), Some(5.0)]);
    }
}
