//! Blocking HTTP client for the API-Football v3 REST API

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::parser::{parse_fixtures, parse_odds, parse_statistics};
use super::ExternalDataSource;
use crate::config::ApiConfig;
use crate::error::SourceError;
use crate::models::{BookmakerQuote, Fixture, FixtureId, MatchStatistics, TeamId};

const API_KEY_HEADER: &str = "x-apisports-key";

/// API-Football client with rate limiting and bounded retry
pub struct ApiFootballClient {
    client: Client,
    config: ApiConfig,
    last_request: Mutex<Instant>,
}

impl ApiFootballClient {
    pub fn new(config: ApiConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SourceError::Api(format!("invalid API key header: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        } else {
            warn!("No API key configured; requests will be rejected by the provider");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        let start = Instant::now()
            .checked_sub(Duration::from_millis(config.delay_ms))
            .unwrap_or_else(Instant::now);

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(start),
        })
    }

    /// Sleep until at least `delay_ms` has passed since the previous request
    fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock();
        let delay = Duration::from_millis(self.config.delay_ms);
        let elapsed = last.elapsed();

        if elapsed < delay {
            thread::sleep(delay - elapsed);
        }

        *last = Instant::now();
    }

    fn build_url(&self, path: &str, query: &[(&str, String)]) -> String {
        let params: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!(
            "{}/{}?{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            params.join("&")
        )
    }

    /// GET with rate limiting and retry. Client errors other than 429 fail fast.
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let attempts = self.config.max_retries.max(1);

        for attempt in 0..attempts {
            self.wait_for_rate_limit();

            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text()?);
                    }
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(SourceError::Status {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    warn!(
                        "Request failed with status {} (attempt {}/{})",
                        status,
                        attempt + 1,
                        attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt + 1,
                        attempts,
                        e
                    );
                }
            }

            if attempt + 1 < attempts {
                let backoff = Duration::from_millis(self.config.delay_ms * (attempt as u64 + 1));
                thread::sleep(backoff);
            }
        }

        Err(SourceError::RetriesExhausted {
            url: url.to_string(),
            attempts,
        })
    }
}

impl ExternalDataSource for ApiFootballClient {
    fn fetch_recent(&self, team: TeamId, limit: usize) -> Result<Vec<Fixture>, SourceError> {
        let mut query = vec![("team", team.to_string()), ("last", limit.to_string())];
        if let Some(season) = self.config.season {
            query.push(("season", season.to_string()));
        }
        let url = self.build_url("fixtures", &query);
        info!("Fetching recent fixtures: {}", url);
        parse_fixtures(&self.fetch(&url)?)
    }

    fn fetch_statistics(&self, fixture_id: FixtureId) -> Result<Vec<MatchStatistics>, SourceError> {
        let url = self.build_url("fixtures/statistics", &[("fixture", fixture_id.to_string())]);
        debug!("Fetching statistics: {}", url);
        parse_statistics(fixture_id, &self.fetch(&url)?)
    }

    fn fetch_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        limit: usize,
    ) -> Result<Vec<Fixture>, SourceError> {
        let url = self.build_url(
            "fixtures/headtohead",
            &[
                ("h2h", format!("{}-{}", team_a, team_b)),
                ("last", limit.to_string()),
            ],
        );
        info!("Fetching head-to-head: {}", url);
        parse_fixtures(&self.fetch(&url)?)
    }

    fn fetch_market(&self, fixture_id: FixtureId) -> Result<Vec<BookmakerQuote>, SourceError> {
        let url = self.build_url("odds", &[("fixture", fixture_id.to_string())]);
        info!("Fetching odds: {}", url);
        parse_odds(&self.fetch(&url)?)
    }

    fn fetch_fixture(&self, fixture_id: FixtureId) -> Result<Option<Fixture>, SourceError> {
        let url = self.build_url("fixtures", &[("id", fixture_id.to_string())]);
        debug!("Fetching fixture: {}", url);
        Ok(parse_fixtures(&self.fetch(&url)?)?
            .into_iter()
            .find(|f| f.id == fixture_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiFootballClient {
        ApiFootballClient::new(ApiConfig {
            api_key: Some("test-key".to_string()),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_build_url() {
        let url = client().build_url(
            "fixtures/headtohead",
            &[("h2h", "33-39".to_string()), ("last", "5".to_string())],
        );
        assert_eq!(
            url,
            "https://v3.football.api-sports.io/fixtures/headtohead?h2h=33-39&last=5"
        );
    }

    #[test]
    fn test_build_url_trims_slashes() {
        let client = ApiFootballClient::new(ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        let url = client.build_url("/odds", &[("fixture", "7".to_string())]);
        assert_eq!(url, "http://localhost:8080/odds?fixture=7");
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        let result = ApiFootballClient::new(ApiConfig {
            api_key: Some("bad\nkey".to_string()),
            ..ApiConfig::default()
        });
        assert!(matches!(result, Err(SourceError::Api(_))));
    }
}
