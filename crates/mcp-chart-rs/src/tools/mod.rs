pub mod chart;
pub mod normalize;
pub mod render;
pub mod weather;
