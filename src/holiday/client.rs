use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::http::{FetchError, JsonFetcher};

use super::HolidaySource;

/// Public-holiday lookup against a holidayapi.com-style endpoint.
///
/// Only holidays flagged `"public": true` are returned; private and
/// observance days do not block deliveries.
pub struct HolidayApiClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
    api_key: String,
}

impl HolidayApiClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn request_url(&self, country: &str, year: i32) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Request(format!("bad holiday API base URL: {e}")))?;
        url.query_pairs_mut()
            .append_key_only("pretty")
            .append_pair("country", country)
            .append_pair("year", &year.to_string())
            .append_pair("public", "true")
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    /// URL with the API key masked, for logs. `key` is always the last pair.
    fn redacted(&self, url: &Url) -> String {
        let full = url.as_str();
        match full.rfind("&key=") {
            Some(pos) => format!("{}&key=***", &full[..pos]),
            None => full.to_string(),
        }
    }
}

#[async_trait]
impl HolidaySource for HolidayApiClient {
    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn lookup(&self, country: &str, year: i32) -> Result<HashSet<NaiveDate>, FetchError> {
        let url = self.request_url(country, year)?;
        debug!("fetching public holidays from {}", self.redacted(&url));
        let body = self.fetcher.fetch_json(url.as_str()).await?;
        let holidays = parse_holidays(&body);
        debug!("parsed {} public holidays for {country}/{year}", holidays.len());
        Ok(holidays)
    }
}

/// Extract public holiday dates. A missing or non-array `holidays` field is
/// an empty set; entries that are not public or carry a bad date are skipped.
pub(crate) fn parse_holidays(body: &Value) -> HashSet<NaiveDate> {
    let Some(entries) = body.get("holidays").and_then(Value::as_array) else {
        debug!("holidays array missing from API response");
        return HashSet::new();
    };
    entries
        .iter()
        .filter(|h| h.get("public").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|h| h.get("date").and_then(Value::as_str))
        .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        urls: Mutex<Vec<String>>,
        reply: Result<Value, FetchError>,
    }

    #[async_trait]
    impl JsonFetcher for Recording {
        async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.reply.clone()
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_only_public_holidays() {
        let body = json!({
            "holidays": [
                {"name": "Yom Kippur", "date": "2025-10-02", "public": true},
                {"name": "Observance", "date": "2025-10-05", "public": false},
                {"name": "No flag", "date": "2025-10-06"},
                {"name": "Bad date", "date": "02/10/2025", "public": true},
                {"name": "Simchat Torah", "date": "2025-10-14", "public": true}
            ]
        });
        let parsed = parse_holidays(&body);
        assert_eq!(parsed, [d("2025-10-02"), d("2025-10-14")].into_iter().collect());
    }

    #[test]
    fn missing_holidays_field_is_empty() {
        assert!(parse_holidays(&json!({"status": 200})).is_empty());
        assert!(parse_holidays(&json!({"holidays": "nope"})).is_empty());
    }

    #[test]
    fn configured_only_with_key() {
        let fetcher = Arc::new(Recording { urls: Mutex::new(vec![]), reply: Ok(json!({})) });
        assert!(!HolidayApiClient::new(fetcher.clone(), "https://h.example/v1/holidays", " ").is_configured());
        assert!(HolidayApiClient::new(fetcher, "https://h.example/v1/holidays", "k").is_configured());
    }

    #[tokio::test]
    async fn builds_encoded_request_url() {
        let fetcher = Arc::new(Recording {
            urls: Mutex::new(vec![]),
            reply: Ok(json!({"holidays": [{"date": "2025-10-30", "public": true}]})),
        });
        let client = HolidayApiClient::new(fetcher.clone(), "https://h.example/v1/holidays", "s3cr&t");

        let holidays = client.lookup("IL", 2025).await.unwrap();
        assert!(holidays.contains(&d("2025-10-30")));

        let urls = fetcher.urls.lock().unwrap();
        assert_eq!(
            urls[0],
            "https://h.example/v1/holidays?pretty&country=IL&year=2025&public=true&key=s3cr%26t"
        );
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let fetcher = Arc::new(Recording {
            urls: Mutex::new(vec![]),
            reply: Err(FetchError::Status(401)),
        });
        let client = HolidayApiClient::new(fetcher, "https://h.example/v1/holidays", "k");
        assert_eq!(client.lookup("IL", 2025).await, Err(FetchError::Status(401)));
    }

    #[test]
    fn redacts_api_key() {
        let fetcher = Arc::new(Recording { urls: Mutex::new(vec![]), reply: Ok(json!({})) });
        let client = HolidayApiClient::new(fetcher, "https://h.example/v1/holidays", "s3cr&t");
        let url = client.request_url("IL", 2025).unwrap();
        let shown = client.redacted(&url);
        assert!(!shown.contains("s3cr"));
        assert!(shown.ends_with("key=***"));
    }
}
