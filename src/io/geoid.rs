use crate::io::tiles::check_lonlat;
use crate::types::{SkyError, SkyResult};
use regex::Regex;
use std::time::Duration;

/// Public GeoidEval endpoint of GeographicLib
pub const GEOID_EVAL_URL: &str = "https://geographiclib.sourceforge.io/cgi-bin/GeoidEval";

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of geoid heights: the correction in meters between the EGM96 geoid
/// and the WGS84 ellipsoid at a point. Negative means the geoid lies below
/// the ellipsoid.
///
/// The production implementation is a network client, so the trait lets
/// pipelines swap in a deterministic stub for tests.
pub trait GeoidModel: Sync {
    fn height(&self, lon: f64, lat: f64) -> SkyResult<f64>;
}

/// Client for the GeoidEval web service.
///
/// The service is queried with a plain GET and the height is scraped out of
/// the returned HTML. Transport failures and non-success statuses are
/// retried up to the configured attempt count with no backoff; a response
/// that cannot be parsed fails immediately, since repeating the request
/// would return the same document.
pub struct GeoidEvalClient {
    url: String,
    attempts: u32,
    client: reqwest::blocking::Client,
}

impl GeoidEvalClient {
    pub fn new() -> SkyResult<Self> {
        Self::with_config(GEOID_EVAL_URL, DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT)
    }

    pub fn with_config(url: &str, attempts: u32, timeout: Duration) -> SkyResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skyshed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkyError::GeoidLookup(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            attempts: attempts.max(1),
            client,
        })
    }
}

impl GeoidModel for GeoidEvalClient {
    fn height(&self, lon: f64, lat: f64) -> SkyResult<f64> {
        check_lonlat(lon, lat)?;

        let input = format!("{}+{}", lat, lon);
        for attempt in 1..=self.attempts {
            log::debug!(
                "Geoid height query attempt {} of {} for ({}, {})",
                attempt,
                self.attempts,
                lon,
                lat
            );
            match self
                .client
                .get(&self.url)
                .query(&[("input", input.as_str())])
                .send()
            {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().map_err(|e| {
                        SkyError::GeoidLookup(format!("failed to read response body: {}", e))
                    })?;
                    return parse_geoid_response(&body);
                }
                Ok(response) => {
                    log::warn!(
                        "GeoidEval returned HTTP {} on attempt {}",
                        response.status(),
                        attempt
                    );
                }
                Err(e) => {
                    log::warn!("GeoidEval request failed on attempt {}: {}", attempt, e);
                }
            }
        }

        Err(SkyError::GeoidLookup(format!(
            "no response from {} after {} attempts",
            self.url, self.attempts
        )))
    }
}

/// Extract the EGM96 geoid height from a GeoidEval HTML response
fn parse_geoid_response(body: &str) -> SkyResult<f64> {
    let pattern = Regex::new(r#"EGM96</a>\s*=\s*<font color="blue">([\d\.\-]+)</font>"#)
        .expect("geoid response pattern is valid");

    let captures = pattern
        .captures(body)
        .ok_or_else(|| SkyError::GeoidLookup("no EGM96 height in response".to_string()))?;
    captures[1]
        .parse()
        .map_err(|e| SkyError::GeoidLookup(format!("unparsable EGM96 height: {}", e)))
}
