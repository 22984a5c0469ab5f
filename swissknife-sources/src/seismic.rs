//! Latest seismic event in Chile.
//!
//! The upstream returns a newest-first array of events with Spanish field
//! names; only the first element is used.

use async_trait::async_trait;

use swissknife_types::{FetchResult, Reading, SourceId, Value};

use crate::{into_result, Fetcher, FetchError, HttpClient};

const DEFAULT_BASE_URL: &str = "https://api.gael.cl";
const PATH: &str = "/general/public/sismos";

/// Upstream field -> attribute name.
const ATTRIBUTE_FIELDS: [(&str, &str); 6] = [
    ("Magnitud", "magnitude"),
    ("Profundidad", "depth"),
    ("RefGeografica", "location"),
    ("Fecha", "date"),
    ("Latitud", "latitude"),
    ("Longitud", "longitude"),
];

/// Fetcher for the most recent earthquake report.
#[derive(Debug, Clone)]
pub struct SeismicFetcher {
    client: HttpClient,
    id: SourceId,
    url: String,
}

impl SeismicFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            id: SourceId::seismic(),
            url: format!("{}{}", DEFAULT_BASE_URL, PATH),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = format!("{}{}", base_url.trim_end_matches('/'), PATH);
        self
    }
}

#[async_trait]
impl Fetcher for SeismicFetcher {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> FetchResult {
        let outcome = match self.client.get_json(&self.url).await {
            Ok(body) => parse_latest_event(&body),
            Err(e) => Err(e),
        };
        into_result(&self.id, outcome)
    }
}

/// Read element 0. A missing magnitude is `Value::NoData`, not a failure.
pub(crate) fn parse_latest_event(body: &serde_json::Value) -> Result<Reading, FetchError> {
    let events = body
        .as_array()
        .ok_or_else(|| FetchError::Parse("seismic payload is not an array".to_string()))?;

    let latest = events
        .first()
        .ok_or_else(|| FetchError::Empty("no seismic events reported".to_string()))?;

    if !latest.is_object() {
        return Err(FetchError::Parse("seismic event is not an object".to_string()));
    }

    let mut reading = Reading::new(magnitude(latest.get("Magnitud")));
    for (field, attribute) in ATTRIBUTE_FIELDS {
        let value = latest.get(field).cloned().unwrap_or(serde_json::Value::Null);
        reading.attributes.insert(attribute.to_string(), value);
    }
    Ok(reading)
}

// The API has served magnitudes both as numbers and as numeric strings
fn magnitude(raw: Option<&serde_json::Value>) -> Value {
    match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().map_or(Value::NoData, Value::Number),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_or(Value::NoData, Value::Number),
        _ => Value::NoData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use serde_json::json;
    use swissknife_types::ErrorKind;

    #[test]
    fn reads_newest_event() {
        let body = json!([
            {
                "Fecha": "2024-01-01 12:00:00",
                "Profundidad": "35 km",
                "Magnitud": "4.1",
                "RefGeografica": "25 km al S de Ovalle",
                "Latitud": "-30.8",
                "Longitud": "-71.2"
            },
            {"Fecha": "2024-01-01 10:00:00", "Magnitud": "3.0"}
        ]);

        let reading = parse_latest_event(&body).unwrap();
        assert_eq!(reading.value, Value::Number(4.1));
        assert_eq!(reading.attributes["location"], "25 km al S de Ovalle");
        assert_eq!(reading.attributes["depth"], "35 km");
        assert_eq!(reading.attributes["date"], "2024-01-01 12:00:00");
        assert_eq!(reading.attributes["latitude"], "-30.8");
        assert_eq!(reading.attributes["longitude"], "-71.2");
    }

    #[test]
    fn numeric_magnitude_is_accepted() {
        let reading = parse_latest_event(&json!([{"Magnitud": 5.6}])).unwrap();
        assert_eq!(reading.value, Value::Number(5.6));
    }

    #[test]
    fn missing_magnitude_is_no_data() {
        let reading = parse_latest_event(&json!([{"Fecha": "2024-01-01"}])).unwrap();
        assert_eq!(reading.value, Value::NoData);
        assert_ne!(reading.value, Value::Number(0.0));
        assert!(reading.attributes["magnitude"].is_null());
    }

    #[test]
    fn empty_array_is_empty_result() {
        let err = parse_latest_event(&json!([])).unwrap_err();
        assert!(matches!(err, FetchError::Empty(_)));
    }

    #[test]
    fn object_payload_is_parse_error() {
        let err = parse_latest_event(&json!({"error": "rate limited"})).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn empty_array_over_http_is_failure_not_zero() {
        let base = test_server::serve(200, "[]").await;
        let fetcher = SeismicFetcher::new(HttpClient::new().unwrap()).with_base_url(&base);

        let result = fetcher.fetch().await;
        assert!(result.reading().is_none());
        assert_eq!(result.failure_ref().unwrap().kind, ErrorKind::EmptyResult);
    }
}
