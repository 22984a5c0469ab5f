//! Presentation metadata for each data point.
//!
//! The coordinator only knows source ids; names, icons and units live here.

use swissknife_types::ids;
use swissknife_types::SourceId;

/// How one source is shown to a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub name: String,
    /// Stable id used for exports and external integrations.
    pub unique_id: String,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
    // Display order: fixed feeds first, then stops by code
    rank: (u8, String),
}

impl Presentation {
    fn fixed(rank: u8, name: &str, unique_id: &str, icon: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            name: name.to_string(),
            unique_id: unique_id.to_string(),
            icon,
            unit,
            rank: (rank, String::new()),
        }
    }

    /// Sort key for table order.
    pub fn rank(&self) -> (u8, &str) {
        (self.rank.0, &self.rank.1)
    }
}

/// Presentation for a source id. Unknown ids get a generic entry.
pub fn presentation(id: &SourceId) -> Presentation {
    match id.as_str() {
        ids::CURRENCY_USD => Presentation::fixed(0, "USD to CLP", "usd_to_clp", "mdi:currency-usd", Some("CLP")),
        ids::CURRENCY_UF => Presentation::fixed(1, "UF to CLP", "uf_to_clp", "mdi:cash", Some("CLP")),
        ids::TRANSIT_STATUS => Presentation::fixed(2, "Metro de Santiago Status", "metro_status", "mdi:subway", None),
        ids::SEISMIC => Presentation::fixed(3, "Latest Earthquake", "latest_earthquake", "mdi:earthquake", None),
        other => match id.stop_id() {
            Some(stop) => Presentation {
                name: format!("Bus Stop {}", stop),
                unique_id: format!("bus_stop_{}", stop),
                icon: "mdi:bus",
                unit: None,
                rank: (4, stop.to_string()),
            },
            None => Presentation {
                name: other.to_string(),
                unique_id: other
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                    .collect(),
                icon: "mdi:help-circle-outline",
                unit: None,
                rank: (5, other.to_string()),
            },
        },
    }
}
