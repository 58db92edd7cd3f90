use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    core::{Tool, content::Content, protocol::capabilities::ServerCapabilities},
    error::{Error, Result},
    server::router::{CapabilitiesBuilder, Router},
    tools::{
        chart::ChartConfig,
        normalize::{ChartArgs, MAX_TITLE_CHARS},
        render::ChartRenderer,
    },
};

pub const GENERATE_CHART: &str = "generate_chart";
pub const RENDER_FAILED: &str = "Could not generate chart image.";

/// Serves `generate_chart`: labeled numbers in, chart image URL out.
#[derive(Clone)]
pub struct ChartRouter {
    renderer: Arc<dyn ChartRenderer>,
}

impl ChartRouter {
    pub fn new(renderer: Arc<dyn ChartRenderer>) -> Self {
        Self { renderer }
    }

    async fn generate_chart(&self, arguments: Value) -> Result<String> {
        let args = ChartArgs::from_value(arguments)?;
        let request = match args.normalize() {
            Ok(request) => request,
            Err(mismatch) => {
                tracing::info!(%mismatch, "Rejected chart request");
                return Ok(mismatch.to_string());
            }
        };

        let config = ChartConfig::from_request(&request);
        match self.renderer.render(&config).await {
            Ok(output) => Ok(output.url().to_string()),
            Err(e) => {
                tracing::error!(error = %e, title = request.title(), "Chart rendering failed");
                Ok(RENDER_FAILED.to_string())
            }
        }
    }
}

fn generate_chart_tool() -> Tool {
    Tool::new(
        GENERATE_CHART,
        "Generate a chart image URL from labels and numeric data. Labels and data \
         may be arrays or delimited strings (whitespace, comma, semicolon or pipe).",
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": MAX_TITLE_CHARS,
                    "description": "Chart title"
                },
                "labels": {
                    "description": "X-axis labels",
                    "oneOf": [
                        { "type": "array", "items": { "type": "string" } },
                        { "type": "string" }
                    ]
                },
                "data": {
                    "description": "Data points, one per label",
                    "oneOf": [
                        { "type": "array", "items": { "type": ["number", "null"] } },
                        { "type": "string" }
                    ]
                },
                "chartType": {
                    "type": "string",
                    "enum": ["line", "bar", "pie", "radar"],
                    "default": "line"
                }
            },
            "required": ["title", "labels", "data"]
        }),
    )
}

#[async_trait]
impl Router for ChartRouter {
    fn name(&self) -> String {
        "chart".to_string()
    }

    fn instructions(&self) -> String {
        "This server turns labeled numeric data into chart image URLs.".to_string()
    }

    fn capabilities(&self) -> ServerCapabilities {
        CapabilitiesBuilder::new().with_tools(false).build()
    }

    fn list_tools(&self) -> Vec<Tool> {
        vec![generate_chart_tool()]
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Vec<Content>> {
        match tool_name {
            GENERATE_CHART => {
                let text = self.generate_chart(arguments).await?;
                Ok(vec![Content::text(text)])
            }
            _ => Err(Error::System(format!("Unknown tool: {}", tool_name))),
        }
    }
}
