//! OSRM routing client with Spanish turn instructions

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Coordinates, RoutingProvider, TravelMode};
use crate::Result;

/// Client for an OSRM-compatible routing server
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(crate::Error::Http)?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RoutingProvider for OsrmClient {
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Value> {
        // OSRM takes lon,lat pairs
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.base_url,
            mode.as_str(),
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat,
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("overview", "false"),
                ("steps", "true"),
                ("language", "es"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(route_error(format!(
                "servicio de rutas no disponible ({})",
                response.status()
            )));
        }

        let body: Value = response.json().await?;

        if body.get("code").and_then(Value::as_str) != Some("Ok") {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no se encontró una ruta entre esos puntos");
            return Ok(route_error(message.to_string()));
        }

        let Some(route) = body
            .get("routes")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
        else {
            return Ok(route_error(
                "no se encontró una ruta entre esos puntos".to_string(),
            ));
        };

        Ok(summarize_route(route, mode))
    }
}

fn route_error(message: String) -> Value {
    json!({ "error": message })
}

/// Collapse an OSRM route into totals plus Spanish step instructions
fn summarize_route(route: &Value, mode: TravelMode) -> Value {
    let distance_m = route.get("distance").and_then(Value::as_f64).unwrap_or(0.0);
    let duration_s = route.get("duration").and_then(Value::as_f64).unwrap_or(0.0);

    let instrucciones: Vec<String> = route
        .get("legs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|leg| leg.get("steps").and_then(Value::as_array))
        .flatten()
        .filter_map(step_instruction)
        .collect();

    json!({
        "distancia_total_km": ((distance_m / 1000.0) * 10.0).round() / 10.0,
        "duracion_minutos": (duration_s / 60.0).round(),
        "modo": mode.as_str(),
        "instrucciones": instrucciones,
        "fuente": "OSRM",
    })
}

/// One Spanish sentence per OSRM step, skipping zero-length arrival noise
fn step_instruction(step: &Value) -> Option<String> {
    let maneuver = step.get("maneuver")?;
    let kind = maneuver.get("type").and_then(Value::as_str).unwrap_or("");
    let modifier = maneuver.get("modifier").and_then(Value::as_str);
    let name = step
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty());
    let distance = step.get("distance").and_then(Value::as_f64).unwrap_or(0.0);

    let action = match (kind, modifier) {
        ("depart", _) => "Sal".to_string(),
        ("arrive", _) => return Some("Has llegado a tu destino".to_string()),
        ("turn", Some("left")) | ("end of road", Some("left")) => "Gira a la izquierda".to_string(),
        ("turn", Some("right")) | ("end of road", Some("right")) => {
            "Gira a la derecha".to_string()
        }
        ("turn", Some("slight left")) => "Gira ligeramente a la izquierda".to_string(),
        ("turn", Some("slight right")) => "Gira ligeramente a la derecha".to_string(),
        ("continue", _) | ("new name", _) => "Continúa recto".to_string(),
        ("roundabout", _) | ("rotary", _) => "Toma la rotonda".to_string(),
        ("merge", _) => "Incorpórate".to_string(),
        ("fork", Some("left")) => "Mantente a la izquierda".to_string(),
        ("fork", Some("right")) => "Mantente a la derecha".to_string(),
        _ if distance < 1.0 => return None,
        _ => "Continúa".to_string(),
    };

    let mut sentence = action;
    if let Some(street) = name {
        sentence.push_str(&format!(" por {street}"));
    }
    if distance >= 1.0 {
        sentence.push_str(&format!(" durante {}", distance_phrase(distance)));
    }

    Some(sentence)
}

/// Distances under a kilometre read in metres, longer ones in km
fn distance_phrase(metres: f64) -> String {
    if metres < 1000.0 {
        format!("{} metros", metres.round() as u64)
    } else {
        format!("{:.1} km", metres / 1000.0)
    }
}
