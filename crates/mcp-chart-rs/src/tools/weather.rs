use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use futures::future::try_join_all;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    tools::{
        chart::{ChartConfig, ChartKind},
        normalize::ChartRequest,
    },
};

pub const DEFAULT_WEATHERAPI_BASE_URL: &str = "https://api.weatherapi.com/v1";
pub const WINDOW_DAYS: u64 = 5;

const AVG_TEMP_POINTER: &str = "/forecast/forecastday/0/day/avgtemp_c";

/// Average temperature for one calendar day, `None` when upstream had none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub date: NaiveDate,
    pub temp_c: Option<f64>,
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn daily_average(&self, city: &str, date: NaiveDate) -> Result<Option<f64>>;
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// The `WINDOW_DAYS` days strictly before `today`, oldest first.
pub fn trailing_window(today: NaiveDate) -> Vec<NaiveDate> {
    (1..=WINDOW_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

/// Two decimals, halves rounded toward positive infinity.
fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Reads one `history.json` body. An `error` object fails the lookup, a body
/// without the average temperature is a gap.
pub fn interpret_history(body: &Value) -> Result<Option<f64>> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::Upstream(message));
    }
    Ok(body
        .pointer(AVG_TEMP_POINTER)
        .and_then(Value::as_f64)
        .map(round2))
}

#[derive(Debug, Clone)]
pub struct WeatherApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl WeatherApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_WEATHERAPI_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Client for the weatherapi.com history endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    config: WeatherApiConfig,
}

impl WeatherApiClient {
    pub fn new(client: Client, config: WeatherApiConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn daily_average(&self, city: &str, date: NaiveDate) -> Result<Option<f64>> {
        let url = format!("{}/history.json", self.config.base_url.trim_end_matches('/'));
        let dt = date.to_string();
        tracing::debug!(%city, %dt, "Fetching weather history");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("q", city),
                ("dt", dt.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(Error::Upstream(format!("weather service returned {status}")));
            }
            Err(e) => return Err(e.into()),
        };

        let temp = interpret_history(&body)?;
        if !status.is_success() {
            return Err(Error::Upstream(format!("weather service returned {status}")));
        }
        Ok(temp)
    }
}

/// Looks up every day of the trailing window concurrently. Any failed lookup
/// fails the whole window.
pub async fn fetch_trailing_window<S>(
    source: &S,
    city: &str,
    today: NaiveDate,
) -> Result<Vec<WeatherSample>>
where
    S: WeatherSource + ?Sized,
{
    let lookups = trailing_window(today).into_iter().map(|date| async move {
        let temp_c = source.daily_average(city, date).await?;
        Ok::<_, Error>(WeatherSample { date, temp_c })
    });
    try_join_all(lookups).await
}

pub fn temperature_chart(city: &str, samples: &[WeatherSample]) -> Result<ChartConfig> {
    let labels = samples.iter().map(|s| s.date.to_string()).collect();
    let data = samples.iter().map(|s| s.temp_c).collect();
    let request = ChartRequest::new(
        format!("Temperature in {city} (°C)"),
        labels,
        data,
        ChartKind::Line,
    )
    .map_err(|e| Error::System(e.to_string()))?;
    Ok(ChartConfig::with_dataset_label(
        &request,
        &format!("Past 5 Days Temperature in {city}"),
    ))
}
