use crate::fields::Fields;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Appeal type filter accepted by the `/appeal/` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AppealType {
    Dref,
    EmergencyAppeal,
}

impl AppealType {
    /// Numeric code used in the `atype` query parameter.
    pub fn code(self) -> u8 {
        match self {
            AppealType::Dref => 0,
            AppealType::EmergencyAppeal => 1,
        }
    }
}

impl fmt::Display for AppealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppealType::Dref => write!(f, "DREF"),
            AppealType::EmergencyAppeal => write!(f, "Emergency Appeal"),
        }
    }
}

/// A funding appeal as returned by `/api/v2/appeal/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppealRecord {
    pub aid: Option<String>,
    pub name: Option<String>,
    pub atype: Option<i64>,
    pub atype_display: Option<String>,
    pub status: Option<i64>,
    pub status_display: Option<String>,
    pub code: Option<String>,
    pub sector: Option<String>,
    pub num_beneficiaries: Option<i64>,
    pub amount_requested: Option<f64>,
    pub amount_funded: Option<f64>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub event: Option<i64>,
    pub dtype_name: Option<String>,
    pub country_iso3: Option<String>,
    pub country_society_name: Option<String>,
}

impl AppealRecord {
    pub fn from_json(value: &Value) -> Self {
        let fields = Fields::new(value);
        let country = fields.nested("country");

        Self {
            aid: fields.text("aid"),
            name: fields.text("name"),
            atype: fields.integer("atype"),
            atype_display: fields.text("atype_display"),
            status: fields.integer("status"),
            status_display: fields.text("status_display"),
            code: fields.text("code"),
            sector: fields.text("sector"),
            num_beneficiaries: fields.integer("num_beneficiaries"),
            amount_requested: fields.amount("amount_requested"),
            amount_funded: fields.amount("amount_funded"),
            start_date: fields.timestamp("start_date"),
            end_date: fields.timestamp("end_date"),
            created_at: fields.timestamp("created_at"),
            event: fields.integer("event"),
            dtype_name: fields.text("dtype_name"),
            country_iso3: country.text("iso3"),
            country_society_name: country.text("society_name"),
        }
    }
}

impl fmt::Display for AppealRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Appeal(aid={}, name={})",
            display_or_none(&self.aid),
            display_or_none(&self.name)
        )
    }
}

/// A surge (staffing) alert as returned by `/api/v2/surge_alert/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurgeAlertRecord {
    pub alert_id: Option<i64>,
    pub message: Option<String>,
    pub molnix_id: Option<i64>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub opens: Option<DateTime<FixedOffset>>,
    pub closes: Option<DateTime<FixedOffset>>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub region: Option<String>,
    pub modality: Option<String>,
    pub sector: Option<String>,
    pub scope: Option<String>,
    pub language: Option<String>,
    pub rotation: Option<String>,
    pub event_name: Option<String>,
    pub event_id: Option<i64>,
    pub country_code: Option<String>,
}

impl SurgeAlertRecord {
    pub fn from_json(value: &Value) -> Self {
        let fields = Fields::new(value);
        let event = fields.nested("event");
        let country = fields.nested("country");

        // region is a plain name in older payloads and an object in newer ones
        let region = fields
            .text("region")
            .or_else(|| fields.nested("region").text("name"));

        Self {
            alert_id: fields.integer("id"),
            message: fields.text("message"),
            molnix_id: fields.integer("molnix_id"),
            created_at: fields.timestamp("created_at"),
            opens: fields.timestamp("opens"),
            closes: fields.timestamp("closes"),
            start: fields.timestamp("start"),
            end: fields.timestamp("end"),
            region,
            modality: fields.text("modality"),
            sector: fields.text("sector"),
            scope: fields.text("scope"),
            language: fields.text("language"),
            rotation: fields.text("rotation"),
            event_name: event.text("name"),
            event_id: event.integer("id"),
            country_code: country.text("iso3"),
        }
    }
}

impl fmt::Display for SurgeAlertRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SurgeAlert(alert_id={}, message={})",
            display_or_none(&self.alert_id),
            display_or_none(&self.message)
        )
    }
}

fn display_or_none<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appeal_from_full_payload() {
        let value = json!({
            "aid": "4915",
            "name": "Mexico: Hurricane Otis",
            "atype": 0,
            "atype_display": "DREF",
            "status": 0,
            "status_display": "Active",
            "code": "MDRMX021",
            "sector": "",
            "num_beneficiaries": 30000,
            "amount_requested": 498632,
            "amount_funded": "0.00",
            "start_date": "2023-10-26T00:00:00Z",
            "end_date": "2024-04-30T00:00:00Z",
            "created_at": "2023-10-26T19:04:16.142611Z",
            "event": 6711,
            "dtype_name": "Cyclone",
            "country": { "iso3": "MEX", "society_name": "Mexican Red Cross", "id": 142 },
        });

        let appeal = AppealRecord::from_json(&value);

        assert_eq!(appeal.aid.as_deref(), Some("4915"));
        assert_eq!(appeal.atype, Some(0));
        assert_eq!(appeal.atype_display.as_deref(), Some("DREF"));
        assert_eq!(appeal.code.as_deref(), Some("MDRMX021"));
        assert_eq!(appeal.num_beneficiaries, Some(30000));
        assert_eq!(appeal.amount_requested, Some(498632.0));
        assert_eq!(appeal.amount_funded, Some(0.0));
        assert_eq!(appeal.event, Some(6711));
        assert_eq!(appeal.dtype_name.as_deref(), Some("Cyclone"));
        assert_eq!(appeal.country_iso3.as_deref(), Some("MEX"));
        assert_eq!(
            appeal.country_society_name.as_deref(),
            Some("Mexican Red Cross")
        );
        assert!(appeal.created_at.is_some());
    }

    #[test]
    fn test_appeal_from_empty_object_is_all_absent() {
        let appeal = AppealRecord::from_json(&json!({}));
        assert_eq!(appeal, AppealRecord::default());
    }

    #[test]
    fn test_appeal_without_country_object() {
        let appeal = AppealRecord::from_json(&json!({ "aid": 1, "country": null }));
        assert_eq!(appeal.aid.as_deref(), Some("1"));
        assert_eq!(appeal.country_iso3, None);
        assert_eq!(appeal.country_society_name, None);
    }

    #[test]
    fn test_surge_alert_mapping() {
        let value = json!({
            "id": 18540,
            "message": "Finance Officer, Hurricane Otis, Mexico.",
            "molnix_id": 3321,
            "created_at": "2023-10-30T09:00:00Z",
            "opens": "2023-10-30T09:00:00Z",
            "closes": "2023-11-06T09:00:00Z",
            "start": "2023-11-13",
            "end": "2024-01-13",
            "region": { "id": 1, "name": "Americas" },
            "modality": "In Person",
            "sector": "Finance",
            "scope": "Regional",
            "language": "Spanish",
            "rotation": "1st Rotation",
            "event": { "id": 6711, "name": "Mexico: Hurricane Otis" },
            "country": { "iso3": "MEX" },
        });

        let alert = SurgeAlertRecord::from_json(&value);

        assert_eq!(alert.alert_id, Some(18540));
        assert_eq!(alert.molnix_id, Some(3321));
        assert_eq!(alert.region.as_deref(), Some("Americas"));
        assert_eq!(alert.event_id, Some(6711));
        assert_eq!(alert.event_name.as_deref(), Some("Mexico: Hurricane Otis"));
        assert_eq!(alert.country_code.as_deref(), Some("MEX"));
        assert_eq!(
            alert.start.map(|d| d.to_rfc3339()).as_deref(),
            Some("2023-11-13T00:00:00+00:00")
        );
    }

    #[test]
    fn test_display() {
        let appeal = AppealRecord {
            aid: Some("18541".into()),
            name: Some("Middle East Crisis".into()),
            ..Default::default()
        };
        assert_eq!(
            appeal.to_string(),
            "Appeal(aid=18541, name=Middle East Crisis)"
        );

        let alert = SurgeAlertRecord::default();
        assert_eq!(alert.to_string(), "SurgeAlert(alert_id=None, message=None)");
    }

    #[test]
    fn test_appeal_type_codes() {
        assert_eq!(AppealType::Dref.code(), 0);
        assert_eq!(AppealType::EmergencyAppeal.code(), 1);
    }
}
