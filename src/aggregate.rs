use crate::types::AppealRecord;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A region kept off the map, matched by ISO3 code and, for geometry, by
/// continent tag as well.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub iso3: String,
    #[serde(default)]
    pub continent: Option<String>,
}

/// The one list of excluded regions. It applies to the counted codes and to
/// the drawn shapes alike.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExclusionList(Vec<Exclusion>);

impl Default for ExclusionList {
    fn default() -> Self {
        Self(vec![Exclusion {
            iso3: "ATA".to_string(),
            continent: Some("Antarctica".to_string()),
        }])
    }
}

impl ExclusionList {
    pub fn new(exclusions: Vec<Exclusion>) -> Self {
        Self(exclusions)
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn excludes_iso3(&self, iso3: &str) -> bool {
        self.0.iter().any(|e| e.iso3.eq_ignore_ascii_case(iso3))
    }

    pub fn excludes_continent(&self, continent: &str) -> bool {
        self.0.iter().any(|e| {
            e.continent
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(continent))
        })
    }

    /// True if a shape with this code or continent tag must not be drawn.
    pub fn excludes_shape(&self, iso3: Option<&str>, continent: Option<&str>) -> bool {
        iso3.is_some_and(|code| self.excludes_iso3(code))
            || continent.is_some_and(|c| self.excludes_continent(c))
    }
}

/// Trimmed, upper-cased form every code is compared in. Blank codes are `None`.
pub fn normalize_iso3(code: &str) -> Option<String> {
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_ascii_uppercase())
}

/// Normalized ISO3 codes of the appeals that carry one, in input order.
pub fn collect_iso3(appeals: &[AppealRecord]) -> Vec<String> {
    appeals
        .iter()
        .filter_map(|a| a.country_iso3.as_deref())
        .filter_map(normalize_iso3)
        .collect()
}

/// Appeals per ISO3 code, with excluded codes dropped before counting.
pub fn count_by_iso3(appeals: &[AppealRecord], exclusions: &ExclusionList) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();

    for code in collect_iso3(appeals) {
        if exclusions.excludes_iso3(&code) {
            continue;
        }
        *counts.entry(code).or_insert(0) += 1;
    }

    counts
}
