use serde::{Deserialize, Serialize};

use crate::tools::normalize::ChartRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Pie,
    Radar,
}

/// Chart.js configuration understood by the rendering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    /// Gaps stay in place as `null`.
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTitle {
    pub display: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPlugins {
    pub title: ChartTitle,
}

/// The title is written in both the Chart.js 2 (`options.title`) and the
/// Chart.js 3+ (`options.plugins.title`) locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub title: ChartTitle,
    pub plugins: ChartPlugins,
}

impl ChartOptions {
    pub fn titled(text: &str) -> Self {
        let title = ChartTitle {
            display: true,
            text: text.to_string(),
        };
        Self {
            plugins: ChartPlugins {
                title: title.clone(),
            },
            title,
        }
    }
}

impl ChartConfig {
    /// Builds the configuration for a single-dataset chart. The request title
    /// is used both as chart title and as dataset label.
    pub fn from_request(request: &ChartRequest) -> Self {
        Self::with_dataset_label(request, request.title())
    }

    pub fn with_dataset_label(request: &ChartRequest, dataset_label: &str) -> Self {
        Self {
            kind: request.kind(),
            data: ChartData {
                labels: request.labels().to_vec(),
                datasets: vec![Dataset {
                    label: dataset_label.to_string(),
                    data: request.data().to_vec(),
                }],
            },
            options: ChartOptions::titled(request.title()),
        }
    }
}

/// Where a rendered chart can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutput {
    /// The rendering service draws the chart when the URL is fetched.
    Url(String),
    /// The image was rendered ahead of time and written to `path`.
    Stored { path: std::path::PathBuf, url: String },
}

impl ChartOutput {
    pub fn url(&self) -> &str {
        match self {
            ChartOutput::Url(url) => url,
            ChartOutput::Stored { url, .. } => url,
        }
    }
}
