//! Nominatim geocoding restricted to the Valencia metro area

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Coordinates, GeocodingProvider};
use crate::Result;

/// Bounding box covering the Valencia metropolitan area (lon1,lat1,lon2,lat2)
const VALENCIA_VIEWBOX: &str = "-0.5,39.6,0.0,39.3";

/// Client for a Nominatim-compatible geocoder
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    bounded: bool,
}

impl NominatimClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: String, user_agent: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::Error::Http)?;

        Ok(Self {
            client,
            base_url,
            user_agent,
            bounded: true,
        })
    }

    /// Disable the Valencia bounding box, allowing worldwide lookups
    #[must_use]
    pub const fn unbounded(mut self) -> Self {
        self.bounded = false;
        self
    }
}

#[async_trait]
impl GeocodingProvider for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let mut params = vec![
            ("q", format!("{query}, Valencia, España")),
            ("format", "json".to_string()),
            ("limit", "1".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        if self.bounded {
            params.push(("bounded", "1".to_string()));
            params.push(("viewbox", VALENCIA_VIEWBOX.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(crate::Error::Geocoding(format!(
                "geocoder returned {}",
                response.status()
            )));
        }

        let results: Vec<Value> = response.json().await?;
        Ok(results.first().and_then(parse_result))
    }
}

/// Nominatim returns lat/lon as strings
fn parse_result(result: &Value) -> Option<Coordinates> {
    let lat = result.get("lat")?.as_str()?.parse::<f64>().ok()?;
    let lon = result.get("lon")?.as_str()?.parse::<f64>().ok()?;
    Some(Coordinates::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_result_string_coords() {
        let result = json!({"lat": "39.4699", "lon": "-0.3763"});
        let coords = parse_result(&result).unwrap();
        assert!((coords.lat - 39.4699).abs() < f64::EPSILON);
        assert!((coords.lon - -0.3763).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_result_rejects_garbage() {
        assert!(parse_result(&json!({"lat": "abc", "lon": "-0.3"})).is_none());
        assert!(parse_result(&json!({"lon": "-0.3"})).is_none());
    }
}
