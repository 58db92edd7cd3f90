use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    core::{Tool, content::Content, protocol::capabilities::ServerCapabilities},
    error::{Error, Result},
    server::router::{CapabilitiesBuilder, Router},
    tools::{
        render::ChartRenderer,
        weather::{WeatherSource, fetch_trailing_window, temperature_chart, today_utc},
    },
};

pub const GET_WEATHER_CHART: &str = "get_weather_chart";

const MIN_CITY_CHARS: usize = 2;
const MAX_CITY_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

impl WeatherArgs {
    fn from_value(arguments: Value) -> Result<Self> {
        let args: WeatherArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::InvalidParameters(format!("Invalid weather arguments: {e}")))?;
        let len = args.city.chars().count();
        if !(MIN_CITY_CHARS..=MAX_CITY_CHARS).contains(&len) {
            return Err(Error::InvalidParameters(format!(
                "city must be {MIN_CITY_CHARS} to {MAX_CITY_CHARS} characters, got {len}"
            )));
        }
        Ok(args)
    }
}

/// Serves `get_weather_chart`: a city name in, a chart of its last five
/// daily average temperatures out.
#[derive(Clone)]
pub struct WeatherChartRouter {
    source: Arc<dyn WeatherSource>,
    renderer: Arc<dyn ChartRenderer>,
    today: Option<NaiveDate>,
}

impl WeatherChartRouter {
    pub fn new(source: Arc<dyn WeatherSource>, renderer: Arc<dyn ChartRenderer>) -> Self {
        Self {
            source,
            renderer,
            today: None,
        }
    }

    /// Pins the reference date instead of reading the UTC clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    async fn chart_url(&self, city: &str) -> Result<String> {
        let today = self.today.unwrap_or_else(today_utc);
        let samples = fetch_trailing_window(self.source.as_ref(), city, today).await?;
        let config = temperature_chart(city, &samples)?;
        let output = self.renderer.render(&config).await?;
        Ok(output.url().to_string())
    }

    async fn get_weather_chart(&self, arguments: Value) -> Result<String> {
        let WeatherArgs { city } = WeatherArgs::from_value(arguments)?;
        match self.chart_url(&city).await {
            Ok(url) => Ok(format!("Here is the temperature chart for \"{city}\":\n{url}")),
            Err(e) => {
                tracing::error!(%city, error = %e, "Weather chart failed");
                Ok(format!(
                    "Could not fetch temperature data for \"{city}\". Please check the city name."
                ))
            }
        }
    }
}

#[async_trait]
impl Router for WeatherChartRouter {
    fn name(&self) -> String {
        "weather-chart".to_string()
    }

    fn instructions(&self) -> String {
        "This server charts the average temperature of a city over the past five days."
            .to_string()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new().with_tools(false).build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        vec![Tool::new(
            GET_WEATHER_CHART,
            "Get a line chart of the past 5 days of average temperature for a city",
            json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "minLength": MIN_CITY_CHARS,
                        "maxLength": MAX_CITY_CHARS,
                        "description": "City name, e.g. London"
                    }
                },
                "required": ["city"]
            }),
        )]
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Vec<Content>> {
        match tool_name {
            GET_WEATHER_CHART => {
                let text = self.get_weather_chart(arguments).await?;
                Ok(vec![Content::text(text)])
            }
            _ => Err(Error::System(format!("Unknown tool: {}", tool_name))),
        }
    }
}
