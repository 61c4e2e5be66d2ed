//! Time tool - current UTC instant

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use crate::Result;
use super::Tool;

/// Format an instant as ISO-8601 with second precision and a `Z` suffix.
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Returns the current UTC time
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str { "get_current_time" }

    fn description(&self) -> &str {
        "Returns the current UTC time in ISO-8601 format, e.g. {\"utc\": \"2025-05-21T06:42:00Z\"}"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<Value> {
        Ok(json!({ "utc": format_utc(Utc::now()) }))
    }
}
