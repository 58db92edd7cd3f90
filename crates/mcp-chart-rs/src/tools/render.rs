use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use urlencoding::encode;

use crate::{
    error::{Error, Result},
    tools::chart::{ChartConfig, ChartOutput},
};

pub const DEFAULT_CHART_BASE_URL: &str = "https://quickchart.io/chart";

/// Presentation defaults sent to the rendering service with every chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub base_url: String,
    pub width: u32,
    pub height: u32,
    pub background: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHART_BASE_URL.to_string(),
            width: 500,
            height: 300,
            background: "white".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, config: &ChartConfig) -> Result<ChartOutput>;
}

/// Embeds the configuration in the `c` query parameter of the rendering
/// service URL. No network call is made.
#[derive(Debug, Clone, Default)]
pub struct UrlRenderer {
    settings: RenderSettings,
}

impl UrlRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn chart_url(&self, config: &ChartConfig) -> Result<String> {
        let json = serde_json::to_string(config)?;
        let RenderSettings {
            base_url,
            width,
            height,
            background,
        } = &self.settings;
        Ok(format!(
            "{base_url}?c={}&w={width}&h={height}&bkg={}",
            encode(&json),
            encode(background)
        ))
    }
}

#[async_trait]
impl ChartRenderer for UrlRenderer {
    async fn render(&self, config: &ChartConfig) -> Result<ChartOutput> {
        self.chart_url(config).map(ChartOutput::Url)
    }
}

/// Asks the rendering service for PNG bytes and keeps them in `charts_dir`,
/// served back under `<public_base_url>/charts/`.
#[derive(Debug, Clone)]
pub struct StoredImageRenderer {
    client: Client,
    settings: RenderSettings,
    charts_dir: PathBuf,
    public_base_url: String,
}

impl StoredImageRenderer {
    pub fn new(
        client: Client,
        settings: RenderSettings,
        charts_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            settings,
            charts_dir: charts_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn file_name() -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("chart-{}.png", &id[..12])
    }
}

#[async_trait]
impl ChartRenderer for StoredImageRenderer {
    async fn render(&self, config: &ChartConfig) -> Result<ChartOutput> {
        let body = json!({
            "chart": config,
            "width": self.settings.width,
            "height": self.settings.height,
            "backgroundColor": self.settings.background,
            "format": "png",
        });

        let response = self
            .client
            .post(&self.settings.base_url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Render(format!(
                "rendering service returned {status}"
            )));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Render("rendering service returned no image".into()));
        }

        tokio::fs::create_dir_all(&self.charts_dir).await?;
        let file_name = Self::file_name();
        let path = self.charts_dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await?;

        let url = format!(
            "{}/charts/{file_name}",
            self.public_base_url.trim_end_matches('/')
        );
        tracing::debug!(path = %path.display(), %url, "Stored rendered chart");
        Ok(ChartOutput::Stored { path, url })
    }
}
