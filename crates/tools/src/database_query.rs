//! Database query tool — stub over a fixed in-process dataset.
//!
//! A host application would translate the request into SQL against its own
//! database. The stub matches table names mentioned in the query and returns
//! rows as JSON; a query that names no known table fails, which exercises the
//! orchestrator's failure isolation.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::{Tool, ToolContext, ToolMetadata};
use serde_json::{Value, json};

pub struct DatabaseQueryTool {
    tables: Vec<(&'static str, Value)>,
}

impl DatabaseQueryTool {
    pub fn new() -> Self {
        Self {
            tables: vec![
                (
                    "orders",
                    json!([
                        { "id": 1001, "customer": "acme", "status": "shipped", "total": 249.0 },
                        { "id": 1002, "customer": "globex", "status": "pending", "total": 87.5 },
                    ]),
                ),
                (
                    "products",
                    json!([
                        { "sku": "KB-01", "name": "Keyboard", "stock": 42 },
                        { "sku": "MS-07", "name": "Mouse", "stock": 0 },
                    ]),
                ),
            ],
        }
    }
}

impl Default for DatabaseQueryTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DatabaseQueryTool {
    fn name(&self) -> &str {
        "database_query"
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new("Look up records, rows and tables in the application database.")
            .with_keywords(["orders", "products", "stock", "sql", "records"])
    }

    async fn invoke(&self, query: &str, _context: &ToolContext) -> Result<String, ToolError> {
        let q = query.to_lowercase();
        let matched: serde_json::Map<String, Value> = self
            .tables
            .iter()
            .filter(|(name, _)| q.contains(name) || q.contains(name.trim_end_matches('s')))
            .map(|(name, rows)| (name.to_string(), rows.clone()))
            .collect();

        if matched.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: "query does not reference a known table".into(),
            });
        }

        serde_json::to_string_pretty(&matched).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}
