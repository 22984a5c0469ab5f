//! Metro de Santiago network status.
//!
//! The network is reported as a list of lines, each with a free-text status.
//! Any line whose status is not the operational token flags the whole network.

use async_trait::async_trait;
use serde_json::Map;

use swissknife_types::{FetchResult, Reading, SourceId};

use crate::{into_result, Fetcher, FetchError, HttpClient};

const DEFAULT_BASE_URL: &str = "https://www.metro.cl";
const PATH: &str = "/api/estado-red";

/// Status string the API uses for a line running normally.
pub const OPERATIONAL_TOKEN: &str = "Operativa";

/// Overall value when every line is operational.
pub const STATUS_OPERATIONAL: &str = "Operational";

/// Overall value when at least one line is not.
pub const STATUS_ISSUES: &str = "Issues";

/// Fetcher for the Metro network status.
#[derive(Debug, Clone)]
pub struct MetroStatusFetcher {
    client: HttpClient,
    id: SourceId,
    url: String,
}

impl MetroStatusFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            id: SourceId::transit_status(),
            url: format!("{}{}", DEFAULT_BASE_URL, PATH),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = format!("{}{}", base_url.trim_end_matches('/'), PATH);
        self
    }
}

#[async_trait]
impl Fetcher for MetroStatusFetcher {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> FetchResult {
        let outcome = match self.client.get_json(&self.url).await {
            Ok(body) => parse_network_status(&body),
            Err(e) => Err(e),
        };
        into_result(&self.id, outcome)
    }
}

/// Build the line map, skipping malformed entries.
///
/// Entries without a string `name` are dropped. A line with a missing or
/// non-string status is kept with a `null` status and counts as an issue.
pub(crate) fn parse_network_status(body: &serde_json::Value) -> Result<Reading, FetchError> {
    let lines = body
        .get("lines")
        .and_then(|l| l.as_array())
        .ok_or_else(|| FetchError::Parse("response has no `lines` array".to_string()))?;

    let mut statuses = Map::new();
    let mut issues = 0usize;

    for line in lines {
        let Some(name) = line.get("name").and_then(|n| n.as_str()) else {
            continue;
        };
        let status = line.get("status").cloned().unwrap_or(serde_json::Value::Null);
        if status.as_str() != Some(OPERATIONAL_TOKEN) {
            issues += 1;
        }
        statuses.insert(name.to_string(), status);
    }

    let overall = if issues > 0 {
        STATUS_ISSUES
    } else {
        STATUS_OPERATIONAL
    };

    Ok(Reading::new(overall)
        .with_attribute("lines", serde_json::Value::Object(statuses))
        .with_attribute("issues", issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use serde_json::json;
    use swissknife_types::{ErrorKind, Value};

    #[test]
    fn all_operational() {
        let body = json!({"lines": [
            {"name": "L1", "status": "Operativa"},
            {"name": "L2", "status": "Operativa"}
        ]});

        let reading = parse_network_status(&body).unwrap();
        assert_eq!(reading.value, Value::from(STATUS_OPERATIONAL));
        assert_eq!(reading.attributes["lines"]["L1"], "Operativa");
        assert_eq!(reading.attributes["issues"], 0);
    }

    #[test]
    fn any_other_status_flags_issues() {
        let body = json!({"lines": [
            {"name": "L1", "status": "Operativa"},
            {"name": "L4A", "status": "Cerrada"}
        ]});

        let reading = parse_network_status(&body).unwrap();
        assert_eq!(reading.value, Value::from(STATUS_ISSUES));
        assert_eq!(reading.attributes["lines"]["L4A"], "Cerrada");
        assert_eq!(reading.attributes["issues"], 1);
    }

    #[test]
    fn malformed_lines_yield_partial_map() {
        let body = json!({"lines": [
            {"name": "L1", "status": "Operativa"},
            {"status": "Operativa"},
            "garbage",
            {"name": "L5"}
        ]});

        let reading = parse_network_status(&body).unwrap();
        let lines = reading.attributes["lines"].as_object().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines["L5"].is_null());
        assert_eq!(reading.value, Value::from(STATUS_ISSUES));
    }

    #[test]
    fn empty_line_list_is_operational() {
        let reading = parse_network_status(&json!({"lines": []})).unwrap();
        assert_eq!(reading.value, Value::from(STATUS_OPERATIONAL));
    }

    #[test]
    fn missing_lines_is_parse_error() {
        let err = parse_network_status(&json!({"estado": "ok"})).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn fetches_over_http() {
        let base = test_server::serve(200, r#"{"lines":[{"name":"L1","status":"Operativa"}]}"#).await;
        let fetcher = MetroStatusFetcher::new(HttpClient::new().unwrap()).with_base_url(&base);

        let result = fetcher.fetch().await;
        assert_eq!(result.reading().unwrap().value, Value::from(STATUS_OPERATIONAL));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_network_failure() {
        let base = test_server::refused().await;
        let fetcher = MetroStatusFetcher::new(HttpClient::new().unwrap()).with_base_url(&base);

        let result = fetcher.fetch().await;
        assert_eq!(result.failure_ref().unwrap().kind, ErrorKind::Network);
    }
}
