use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::ReputationSettings;
use crate::core::errors::AppError;

const ABSENT: &str = "n/a";

/// Trust signals for one IP or email, kept as the API returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReputationSummary {
    pub fraud_score: Option<Value>,
    pub is_vpn: Option<Value>,
    pub is_proxy: Option<Value>,
    pub is_tor: Option<Value>,
    pub is_crawler: Option<Value>,
    pub recent_abuse: Option<Value>,
    pub is_bot: Option<Value>,
}

impl ReputationSummary {
    /// Absent and `null` fields stay `None`; anything else is kept verbatim.
    pub fn from_json(data: &Value) -> Self {
        let field = |key: &str| data.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            fraud_score: field("fraud_score"),
            is_vpn: field("vpn"),
            is_proxy: field("proxy"),
            is_tor: field("tor"),
            is_crawler: field("crawler"),
            recent_abuse: field("recent_abuse"),
            is_bot: field("is_bot"),
        }
    }
}

fn show(value: &Option<Value>) -> String {
    match value {
        None => ABSENT.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

impl fmt::Display for ReputationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fraud Score: {}, VPN: {}, Proxy: {}, Tor: {}, Crawler: {}, Recent Abuse: {}, Bot: {}",
            show(&self.fraud_score),
            show(&self.is_vpn),
            show(&self.is_proxy),
            show(&self.is_tor),
            show(&self.is_crawler),
            show(&self.recent_abuse),
            show(&self.is_bot),
        )
    }
}

/// Result of [`ReputationClient::check`]. Every failure is folded in here.
#[derive(Debug, Clone, PartialEq)]
pub enum ReputationOutcome {
    Report(ReputationSummary),
    HttpError(u16),
    Failed(String),
}

impl ReputationOutcome {
    pub fn is_report(&self) -> bool {
        matches!(self, ReputationOutcome::Report(_))
    }
}

impl fmt::Display for ReputationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReputationOutcome::Report(summary) => fmt::Display::fmt(summary, f),
            ReputationOutcome::HttpError(status) => write!(f, "Error from API: {}", status),
            ReputationOutcome::Failed(reason) => {
                write!(f, "Exception during fraud check: {}", reason)
            }
        }
    }
}

/// Full response of the detailed lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpReputationDetails {
    pub ip_address: Option<String>,
    pub fraud_score: Option<f64>,
    #[serde(alias = "proxy")]
    pub is_proxy: Option<bool>,
    #[serde(alias = "vpn")]
    pub is_vpn: Option<bool>,
    #[serde(alias = "tor")]
    pub is_tor: Option<bool>,
    #[serde(alias = "crawler")]
    pub is_crawler: Option<bool>,
    pub recent_abuse: Option<bool>,
    pub bot_status: Option<bool>,
    pub region: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "ISP")]
    pub isp: Option<String>,
    pub organization: Option<String>,
    pub timestamp: Option<Value>,
}

/// Summary reputation source consulted by the agent tool.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn check(&self, signal: &str) -> ReputationOutcome;
}

#[derive(Clone)]
pub struct ReputationClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ReputationClient {
    pub fn new(settings: &ReputationSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(AppError::internal)?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            client,
        })
    }

    fn lookup_url(&self, api_key: &str, signal: &str) -> String {
        format!("{}{}/{}", self.base_url, api_key, signal)
    }

    /// Summary lookup used by the agent. Never fails: bad status, timeouts
    /// and malformed bodies come back as descriptive outcomes. An unset key is
    /// not checked here; the endpoint rejects the request instead.
    pub async fn check(&self, signal: &str) -> ReputationOutcome {
        let url = self.lookup_url(self.api_key.as_deref().unwrap_or(""), signal);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                // the URL carries the API key
                let err = err.without_url();
                tracing::warn!("Reputation lookup for {} failed: {}", signal, err);
                return ReputationOutcome::Failed(err.to_string());
            }
        };

        let status = response.status();
        if status.as_u16() != 200 {
            tracing::warn!("Reputation API returned {} for {}", status, signal);
            return ReputationOutcome::HttpError(status.as_u16());
        }

        match response.json::<Value>().await {
            Ok(data) => ReputationOutcome::Report(ReputationSummary::from_json(&data)),
            Err(err) => ReputationOutcome::Failed(err.without_url().to_string()),
        }
    }

    /// Detailed lookup with strict semantics: a missing key or a non-200
    /// response is an error.
    pub async fn lookup_details(&self, ip_address: &str) -> Result<IpReputationDetails, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("FRAUD_API_KEY is not set (reputation.api_key)".to_string())
            })?;

        let response = self
            .client
            .get(self.lookup_url(api_key, ip_address))
            .send()
            .await
            .map_err(|e| AppError::transport(e.without_url()))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                status: status.as_u16(),
                message: format!("reputation request failed: {}", text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::transport(e.without_url()))
    }
}

#[async_trait]
impl ReputationLookup for ReputationClient {
    async fn check(&self, signal: &str) -> ReputationOutcome {
        ReputationClient::check(self, signal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn fake_ipqs(Path((key, signal)): Path<(String, String)>) -> Response {
        match key.as_str() {
            "full" => Json(json!({
                "ip_address": signal,
                "fraud_score": 87,
                "vpn": true,
                "proxy": true,
                "tor": false,
                "crawler": false,
                "recent_abuse": true,
                "is_bot": false,
                "bot_status": false,
                "region": "Ontario",
                "city": "Toronto",
                "ISP": "Example Telecom",
                "organization": "Example Org",
                "timestamp": 1700000000
            }))
            .into_response(),
            "partial" => {
                Json(json!({ "fraud_score": 12.5, "vpn": "maybe", "tor": null })).into_response()
            }
            "garbage" => (StatusCode::OK, "<html>not json</html>").into_response(),
            _ => (StatusCode::UNAUTHORIZED, "invalid key").into_response(),
        }
    }

    async fn client_with_key(key: Option<&str>) -> ReputationClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/ip/:key/:signal", get(fake_ipqs));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ReputationClient::new(&ReputationSettings {
            base_url: format!("http://{}/ip/", addr),
            api_key: key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn summary_renders_all_fraud_fields() {
        let client = client_with_key(Some("full")).await;
        let outcome = client.check("198.51.100.23").await;

        assert!(outcome.is_report());
        assert_eq!(
            outcome.to_string(),
            "Fraud Score: 87, VPN: true, Proxy: true, Tor: false, Crawler: false, Recent Abuse: true, Bot: false"
        );
    }

    #[tokio::test]
    async fn missing_fields_are_absent_and_odd_types_pass_through() {
        let client = client_with_key(Some("partial")).await;
        let outcome = client.check("someone@example.com").await;

        assert_eq!(
            outcome.to_string(),
            "Fraud Score: 12.5, VPN: maybe, Proxy: n/a, Tor: n/a, Crawler: n/a, Recent Abuse: n/a, Bot: n/a"
        );
    }

    #[tokio::test]
    async fn non_200_status_is_reported_as_text() {
        let client = client_with_key(Some("revoked")).await;
        let outcome = client.check("198.51.100.23").await;
        assert_eq!(outcome, ReputationOutcome::HttpError(401));
        assert_eq!(outcome.to_string(), "Error from API: 401");
    }

    #[tokio::test]
    async fn malformed_body_is_reported_as_text() {
        let client = client_with_key(Some("garbage")).await;
        let text = client.check("198.51.100.23").await.to_string();
        assert!(text.starts_with("Exception during fraud check:"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_never_raises() {
        let client = ReputationClient::new(&ReputationSettings {
            base_url: "http://127.0.0.1:1/ip/".to_string(),
            api_key: Some("full".to_string()),
            timeout_secs: 2,
        })
        .unwrap();

        let outcome = client.check("198.51.100.23").await;
        assert!(matches!(outcome, ReputationOutcome::Failed(_)));
        assert!(outcome
            .to_string()
            .starts_with("Exception during fraud check: "));
    }

    #[tokio::test]
    async fn transport_failures_do_not_expose_the_api_key() {
        let client = ReputationClient::new(&ReputationSettings {
            base_url: "http://127.0.0.1:1/ip/".to_string(),
            api_key: Some("SECRETKEY123".to_string()),
            timeout_secs: 2,
        })
        .unwrap();

        let text = client.check("198.51.100.23").await.to_string();
        assert!(text.starts_with("Exception during fraud check: "));
        assert!(!text.contains("SECRETKEY123"));

        let err = client.lookup_details("198.51.100.23").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(!err.to_string().contains("SECRETKEY123"));
    }

    #[tokio::test]
    async fn malformed_body_text_does_not_expose_the_api_key() {
        let client = client_with_key(Some("garbage")).await;
        let text = client.check("198.51.100.23").await.to_string();
        assert!(!text.contains("/ip/garbage/"));
    }

    #[tokio::test]
    async fn detailed_lookup_maps_extended_fields() {
        let client = client_with_key(Some("full")).await;
        let details = client.lookup_details("152.58.121.146").await.unwrap();

        assert_eq!(details.ip_address.as_deref(), Some("152.58.121.146"));
        assert_eq!(details.fraud_score, Some(87.0));
        assert_eq!(details.is_proxy, Some(true));
        assert_eq!(details.is_tor, Some(false));
        assert_eq!(details.isp.as_deref(), Some("Example Telecom"));
        assert_eq!(details.city.as_deref(), Some("Toronto"));
        assert_eq!(details.timestamp, Some(json!(1700000000)));
    }

    #[tokio::test]
    async fn detailed_lookup_fails_fast_without_key() {
        let client = client_with_key(None).await;
        let err = client.lookup_details("152.58.121.146").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn detailed_lookup_errors_on_bad_status() {
        let client = client_with_key(Some("revoked")).await;
        let err = client.lookup_details("152.58.121.146").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("invalid key"));
    }
}
