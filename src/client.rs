use crate::config::ApiConfig;
use crate::error::{FetchError, Result};
use crate::types::{AppealRecord, AppealType, SurgeAlertRecord};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const APPEAL_PATH: &str = "/api/v2/appeal/";
const SURGE_ALERT_PATH: &str = "/api/v2/surge_alert/";

/// Appeal endpoint, with `?atype=<code>` when filtering by type.
pub fn appeals_url(base_url: &str, type_filter: Option<AppealType>) -> String {
    let base = base_url.trim_end_matches('/');
    match type_filter {
        Some(appeal_type) => format!("{base}{APPEAL_PATH}?atype={}", appeal_type.code()),
        None => format!("{base}{APPEAL_PATH}"),
    }
}

pub fn surge_alerts_url(base_url: &str) -> String {
    format!("{}{SURGE_ALERT_PATH}", base_url.trim_end_matches('/'))
}

fn results<'a>(body: &'a Value, url: &str) -> Result<&'a Vec<Value>> {
    body.get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::MissingResults {
            url: url.to_string(),
        })
}

/// Maps the `results` array of an appeal response, keeping source order.
pub fn parse_appeals(body: &Value, url: &str) -> Result<Vec<AppealRecord>> {
    Ok(results(body, url)?
        .iter()
        .map(AppealRecord::from_json)
        .collect())
}

pub fn parse_surge_alerts(body: &Value, url: &str) -> Result<Vec<SurgeAlertRecord>> {
    Ok(results(body, url)?
        .iter()
        .map(SurgeAlertRecord::from_json)
        .collect())
}

/// Client for the IFRC GO API. Each call issues exactly one GET and reads
/// only the first page the endpoint returns.
pub struct GoClient {
    base_url: String,
    client: Client,
}

impl GoClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: config.base_url.clone(),
            client: builder.build()?,
        })
    }

    /// Latest appeals, optionally restricted to one appeal type.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_appeals(&self, type_filter: Option<AppealType>) -> Result<Vec<AppealRecord>> {
        let url = appeals_url(&self.base_url, type_filter);
        tracing::info!("Fetching appeals from {}", url);

        let body = self.get_json(&url).await?;
        let appeals = parse_appeals(&body, &url)?;

        tracing::info!("Fetched {} appeals", appeals.len());
        Ok(appeals)
    }

    /// Latest surge alerts.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_surge_alerts(&self) -> Result<Vec<SurgeAlertRecord>> {
        let url = surge_alerts_url(&self.base_url);
        tracing::info!("Fetching surge alerts from {}", url);

        let body = self.get_json(&url).await?;
        let alerts = parse_surge_alerts(&body, &url)?;

        tracing::info!("Fetched {} surge alerts", alerts.len());
        Ok(alerts)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text)?;
        tracing::debug!(url, response = %body, "Raw GO API response");

        Ok(body)
    }
}
