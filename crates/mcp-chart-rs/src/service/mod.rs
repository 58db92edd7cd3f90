pub mod chart;
pub mod weather;

pub use chart::ChartRouter;
pub use weather::WeatherChartRouter;
