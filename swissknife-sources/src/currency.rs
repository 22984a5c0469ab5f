//! Exchange rates from the mindicador.cl indicator API.
//!
//! Both the dollar and the UF endpoints return the same shape: indicator
//! metadata plus a newest-first `serie` of dated values.
//!
//! ```json
//! {"codigo":"dolar","nombre":"Dólar observado","unidad_medida":"Pesos",
//!  "serie":[{"fecha":"2024-01-01T03:00:00.000Z","valor":950.5}]}
//! ```

use async_trait::async_trait;

use swissknife_types::{FetchResult, Reading, SourceId};

use crate::{into_result, Fetcher, FetchError, HttpClient};

const DEFAULT_BASE_URL: &str = "https://mindicador.cl";

/// Which mindicador indicator to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// US dollar in Chilean pesos.
    Dollar,
    /// Unidad de Fomento in Chilean pesos.
    Uf,
}

impl Indicator {
    fn path(&self) -> &'static str {
        match self {
            Indicator::Dollar => "/api/dolar",
            Indicator::Uf => "/api/uf",
        }
    }

    fn source_id(&self) -> SourceId {
        match self {
            Indicator::Dollar => SourceId::currency_usd(),
            Indicator::Uf => SourceId::currency_uf(),
        }
    }
}

/// Fetcher for one mindicador exchange-rate series.
#[derive(Debug, Clone)]
pub struct CurrencyFetcher {
    client: HttpClient,
    indicator: Indicator,
    id: SourceId,
    url: String,
}

impl CurrencyFetcher {
    pub fn new(client: HttpClient, indicator: Indicator) -> Self {
        Self {
            client,
            indicator,
            id: indicator.source_id(),
            url: format!("{}{}", DEFAULT_BASE_URL, indicator.path()),
        }
    }

    /// USD to CLP.
    pub fn usd(client: HttpClient) -> Self {
        Self::new(client, Indicator::Dollar)
    }

    /// UF to CLP.
    pub fn uf(client: HttpClient) -> Self {
        Self::new(client, Indicator::Uf)
    }

    /// Point the fetcher at another host (e.g. a mirror or a test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.url = format!("{}{}", base_url.trim_end_matches('/'), self.indicator.path());
        self
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }
}

#[async_trait]
impl Fetcher for CurrencyFetcher {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> FetchResult {
        let outcome = match self.client.get_json(&self.url).await {
            Ok(body) => parse_indicator(body),
            Err(e) => Err(e),
        };
        into_result(&self.id, outcome)
    }
}

/// Take the newest rate of the series.
///
/// Only `serie[0]` is read; older points and malformed metadata are ignored.
pub(crate) fn parse_indicator(body: serde_json::Value) -> Result<Reading, FetchError> {
    let latest = body
        .get("serie")
        .and_then(|serie| serie.as_array())
        .and_then(|serie| serie.first())
        .ok_or_else(|| FetchError::Empty("indicator series is empty".to_string()))?;

    let rate = match latest.get("valor") {
        Some(valor) => valor
            .as_f64()
            .ok_or_else(|| FetchError::Parse(format!("latest `valor` is not a number: {}", valor)))?,
        None => return Err(FetchError::Parse("latest series point has no `valor`".to_string())),
    };

    let mut reading = Reading::new(rate);
    let text = |value: &serde_json::Value, key: &str| {
        value.get(key).and_then(|v| v.as_str()).map(str::to_string)
    };
    if let Some(date) = text(latest, "fecha") {
        reading = reading.with_attribute("date", date);
    }
    for (key, attribute) in [("codigo", "code"), ("nombre", "name"), ("unidad_medida", "unit")] {
        if let Some(value) = text(&body, key) {
            reading = reading.with_attribute(attribute, value);
        }
    }
    Ok(reading)
}
