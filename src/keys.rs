//! Canonical column identity and its description schema.
//!
//! Every output column is identified by a five-part [`ColumnKey`]. The
//! [`ColumnKeySchema`] resolves keys into the human-readable descriptions
//! the downstream metadata generator publishes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one logical series column: variable, region, attribute,
/// source and source URL. Immutable once created; unique per frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub variable: String,
    pub region: String,
    pub attribute: String,
    pub source: String,
    pub url: String,
}

impl ColumnKey {
    pub fn new(
        variable: impl Into<String>,
        region: impl Into<String>,
        attribute: impl Into<String>,
        source: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            region: region.into(),
            attribute: attribute.into(),
            source: source.into(),
            url: url.into(),
        }
    }

    /// Flattened column label used in exported single-header files,
    /// e.g. `wind_DE-50hertz_generation`.
    pub fn field_name(&self) -> String {
        format!("{}_{}_{}", self.variable, self.region, self.attribute)
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.variable, self.region, self.attribute, self.source
        )
    }
}

/// Resolved, publishable description of one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub description: String,
    pub region: String,
    pub variable: String,
    pub attribute: String,
    pub source: String,
    pub web: String,
}

/// Names of the five key parts plus the description templates used to
/// publish column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnKeySchema {
    pub levels: [String; 5],
}

impl Default for ColumnKeySchema {
    fn default() -> Self {
        Self {
            levels: [
                "variable".to_string(),
                "region".to_string(),
                "attribute".to_string(),
                "source".to_string(),
                "web".to_string(),
            ],
        }
    }
}

impl ColumnKeySchema {
    /// Resolve a key into its publishable description. Unknown attributes
    /// yield a generic description rather than failing; the metadata
    /// document generator decides how to handle them.
    pub fn describe(&self, key: &ColumnKey) -> ColumnDescription {
        let geo = region_display_name(&key.region);
        let description = match key.attribute.as_str() {
            "load" => format!("Consumption in {geo} in MW"),
            "generation" | "actual" => {
                format!("Actual {} generation in {geo} in MW", key.variable)
            }
            "forecast" => format!("Forecasted {} generation in {geo} in MW", key.variable),
            "capacity" => format!("Electrical capacity of {} in {geo} in MW", key.variable),
            "profile" => format!("Share of {} capacity producing in {geo}", key.variable),
            "epex" | "elspot" => format!("Day-ahead spot price for {geo}"),
            other => format!("{} {other} in {geo}", key.variable),
        };
        ColumnDescription {
            name: key.field_name(),
            description,
            region: geo,
            variable: key.variable.clone(),
            attribute: key.attribute.clone(),
            source: key.source.clone(),
            web: key.url.clone(),
        }
    }
}

/// Display name for a region code: balancing areas keep their code spelled
/// out, two-letter codes map to country names.
pub fn region_display_name(region: &str) -> String {
    if region.len() > 2 {
        return format!("{region} balancing area");
    }
    let name = match region {
        "AT" => "Austria",
        "BA" => "Bosnia and Herzegovina",
        "BE" => "Belgium",
        "BG" => "Bulgaria",
        "CH" => "Switzerland",
        "CS" => "Serbia and Montenegro",
        "CZ" => "Czech Republic",
        "DE" => "Germany",
        "DK" => "Denmark",
        "EE" => "Estonia",
        "ES" => "Spain",
        "FI" => "Finland",
        "FR" => "France",
        "GB" => "United Kingdom",
        "GR" => "Greece",
        "HR" => "Croatia",
        "HU" => "Hungary",
        "IE" => "Ireland",
        "IT" => "Italy",
        "LT" => "Lithuania",
        "LU" => "Luxembourg",
        "LV" => "Latvia",
        "ME" => "Montenegro",
        "MK" => "North Macedonia",
        "NI" => "Northern Ireland",
        "NL" => "Netherlands",
        "NO" => "Norway",
        "PL" => "Poland",
        "PT" => "Portugal",
        "RO" => "Romania",
        "RS" => "Serbia",
        "SE" => "Sweden",
        "SI" => "Slovenia",
        "SK" => "Slovakia",
        "UA" => "Ukraine",
        other => other,
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_flattens_first_three_parts() {
        let key = ColumnKey::new("wind", "DE-50hertz", "generation", "50Hertz", "http://x");
        assert_eq!(key.field_name(), "wind_DE-50hertz_generation");
    }

    #[test]
    fn keys_hash_on_all_five_parts() {
        use std::collections::HashSet;
        let a = ColumnKey::new("solar", "DE", "capacity", "BNetzA", "u1");
        let b = ColumnKey::new("solar", "DE", "capacity", "BNetzA", "u2");
        let set: HashSet<_> = [a.clone(), b.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn describe_resolves_attribute_templates() {
        let schema = ColumnKeySchema::default();
        let gen = schema.describe(&ColumnKey::new("wind", "PL", "generation", "PSE", "u"));
        assert_eq!(gen.description, "Actual wind generation in Poland in MW");

        let price = schema.describe(&ColumnKey::new("price", "NO", "elspot", "Energinet.dk", "u"));
        assert_eq!(price.description, "Day-ahead spot price for Norway");
    }

    #[test]
    fn region_names_cover_balancing_areas_and_special_codes() {
        assert_eq!(region_display_name("DE-tennet"), "DE-tennet balancing area");
        assert_eq!(region_display_name("NI"), "Northern Ireland");
        assert_eq!(region_display_name("CS"), "Serbia and Montenegro");
        assert_eq!(region_display_name("CZ"), "Czech Republic");
    }
}
