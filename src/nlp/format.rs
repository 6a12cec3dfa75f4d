//! Natural-language rendering of structured provider data
//!
//! Turns the JSON a domain handler produced into one spoken Spanish sentence.
//! Every renderer tolerates missing fields (the clause is simply omitted) and
//! surfaces an explicit `error` field as an apology instead of the normal
//! sentence.

use serde_json::Value;

use super::IntentKind;

/// Render a domain result into a sentence for speech synthesis
#[must_use]
pub fn format_response(intent: IntentKind, data: &Value) -> String {
    match intent {
        IntentKind::NearestStop => format_stop(data),
        IntentKind::Route => format_route(data),
        IntentKind::Traffic => format_traffic(data),
        IntentKind::Accessibility => format_accessibility(data),
        IntentKind::Greeting => {
            "Hola, soy tu asistente de movilidad urbana para Valencia. \
             ¿En qué puedo ayudarte?"
                .to_string()
        }
        IntentKind::Farewell => "¡Hasta luego! Que tengas un buen viaje.".to_string(),
        IntentKind::General => {
            "Lo siento, no he entendido tu consulta. ¿Podrías repetirla?".to_string()
        }
    }
}

fn error_field(data: &Value) -> Option<String> {
    data.get("error")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
}

/// State a distance in metres: exact under 100, rounded to tens above
fn distance_phrase(metres: u64) -> String {
    if metres < 100 {
        metres.to_string()
    } else {
        let rounded = ((metres as f64) / 10.0).round() as u64 * 10;
        rounded.to_string()
    }
}

/// Print a JSON number without a trailing `.0` for whole values
fn number_phrase(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn format_stop(data: &Value) -> String {
    if let Some(error) = error_field(data) {
        return format!("Lo siento, {error}");
    }

    let Some(parada) = data.get("parada_principal").filter(|p| p.is_object()) else {
        return "No encontré paradas de transporte público cerca de tu ubicación.".to_string();
    };

    let nombre = parada
        .get("nombre")
        .and_then(Value::as_str)
        .unwrap_or("Parada");

    let mut response = format!("La parada más cercana es {nombre}");

    if let Some(distancia) = parada.get("distancia_m").and_then(Value::as_u64) {
        response.push_str(&format!(
            ", está a unos {} metros",
            distance_phrase(distancia)
        ));
    }

    if let Some(lineas) = lines_phrase(parada.get("lineas")) {
        response.push_str(&format!(". Pasan las líneas {lineas}"));
    }

    response.push('.');
    response
}

/// Render the `lineas` field, which may arrive as a string or an array
fn lines_phrase(lineas: Option<&Value>) -> Option<String> {
    match lineas? {
        Value::String(s) if !s.is_empty() && s != "N/D" => Some(s.clone()),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

fn format_route(data: &Value) -> String {
    if let Some(error) = error_field(data) {
        return format!("No pude calcular la ruta: {error}");
    }

    let distancia_km = data
        .get("distancia_total_km")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let duracion_min = data
        .get("duracion_minutos")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let mut response = format!(
        "La ruta tiene {} kilómetros y tomará aproximadamente {} minutos. ",
        number_phrase(distancia_km),
        duracion_min as i64
    );

    let instrucciones: Vec<&str> = data
        .get("instrucciones")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if !instrucciones.is_empty() {
        response.push_str("Las direcciones son: ");
        // Narrate only the first three steps; more would overload the listener
        for (i, instruccion) in instrucciones.iter().take(3).enumerate() {
            response.push_str(&format!("{}. {}. ", i + 1, instruccion));
        }
        if instrucciones.len() > 3 {
            response.push_str("Continúa siguiendo las indicaciones GPS.");
        }
    }

    response
}

fn format_traffic(data: &Value) -> String {
    if let Some(error) = error_field(data) {
        return format!("Lo siento, {error}");
    }

    let zona = data
        .get("zona")
        .and_then(Value::as_str)
        .unwrap_or("la zona consultada");
    let estado = data
        .get("estado")
        .and_then(Value::as_str)
        .unwrap_or("desconocido");

    let mut response = format!("En {zona}, el tráfico está {estado}");

    if let Some(recomendacion) = data
        .get("recomendacion")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
    {
        response.push_str(&format!(". {recomendacion}"));
    }

    response.push('.');
    response
}

fn format_accessibility(data: &Value) -> String {
    if let Some(error) = error_field(data) {
        return format!("Lo siento, {error}");
    }

    let lugar = data
        .get("lugar")
        .and_then(Value::as_str)
        .unwrap_or("el lugar consultado");

    if !data
        .get("encontrado")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return format!(
            "No encontré información específica de accesibilidad para {lugar}. \
             Te recomiendo contactar directamente con el lugar."
        );
    }

    let accesible = data
        .get("accesible")
        .and_then(Value::as_str)
        .unwrap_or("Desconocido");

    let mut response = format!("Sobre la accesibilidad de {lugar}: ");

    let verdict = accesible.to_lowercase();
    if ["sí", "si", "yes", "accesible", "adaptado"].contains(&verdict.as_str()) {
        response.push_str("es accesible para personas con movilidad reducida");
    } else if ["no", "no accesible", "no adaptado"].contains(&verdict.as_str()) {
        response.push_str("no está completamente adaptado para personas con movilidad reducida");
    } else {
        response.push_str(&format!("la información indica: {accesible}"));
    }

    if let Some(detalles) = data
        .get("detalles_accesibilidad")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
    {
        response.push_str(&format!(". {detalles}"));
    }

    response.push('.');
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_distance_is_exact() {
        assert_eq!(distance_phrase(45), "45");
    }

    #[test]
    fn test_long_distance_rounds_to_tens() {
        assert_eq!(distance_phrase(287), "290");
        assert_eq!(distance_phrase(104), "100");
    }

    #[test]
    fn test_stop_response_full() {
        let data = json!({
            "parada_principal": {
                "nombre": "Ruzafa - Sueca",
                "distancia_m": 95,
                "lineas": ["7", "27"]
            }
        });
        let text = format_response(IntentKind::NearestStop, &data);
        assert!(text.contains("Ruzafa - Sueca"));
        assert!(text.contains("95 metros"));
        assert!(text.contains("líneas 7, 27"));
    }

    #[test]
    fn test_stop_response_omits_missing_distance() {
        let data = json!({"parada_principal": {"nombre": "Colón"}});
        let text = format_response(IntentKind::NearestStop, &data);
        assert!(text.contains("Colón"));
        assert!(!text.contains("metros"));
    }

    #[test]
    fn test_stop_response_without_stop() {
        let data = json!({});
        let text = format_response(IntentKind::NearestStop, &data);
        assert!(text.contains("No encontré paradas"));
    }

    #[test]
    fn test_error_field_becomes_apology() {
        let data = json!({"error": "No se pudo determinar la ubicación"});
        let text = format_response(IntentKind::NearestStop, &data);
        assert_eq!(text, "Lo siento, no se pudo determinar la ubicación");
    }

    #[test]
    fn test_route_narrates_three_steps_then_generic_clause() {
        let data = json!({
            "distancia_total_km": 2.4,
            "duracion_minutos": 30.0,
            "instrucciones": ["Gira a la derecha", "Sigue recto", "Gira a la izquierda",
                              "Cruza la plaza", "Llega al destino"]
        });
        let text = format_response(IntentKind::Route, &data);
        assert!(text.contains("1. Gira a la derecha"));
        assert!(text.contains("2. Sigue recto"));
        assert!(text.contains("3. Gira a la izquierda"));
        assert!(!text.contains("Cruza la plaza"));
        assert!(text.contains("Continúa siguiendo las indicaciones GPS."));
    }

    #[test]
    fn test_route_few_steps_has_no_generic_clause() {
        let data = json!({
            "distancia_total_km": 1.0,
            "duracion_minutos": 12.0,
            "instrucciones": ["Sigue recto", "Llega al destino"]
        });
        let text = format_response(IntentKind::Route, &data);
        assert!(text.contains("2. Llega al destino"));
        assert!(!text.contains("indicaciones GPS"));
    }

    #[test]
    fn test_route_error() {
        let data = json!({"error": "Servicio no disponible"});
        let text = format_response(IntentKind::Route, &data);
        assert_eq!(text, "No pude calcular la ruta: servicio no disponible");
    }

    #[test]
    fn test_traffic_response() {
        let data = json!({
            "zona": "Ruzafa",
            "estado": "moderado",
            "recomendacion": "Tráfico normal, tiempo de viaje estándar"
        });
        let text = format_response(IntentKind::Traffic, &data);
        assert!(text.starts_with("En Ruzafa, el tráfico está moderado"));
        assert!(text.contains("tiempo de viaje estándar"));
    }

    #[test]
    fn test_traffic_defaults() {
        let text = format_response(IntentKind::Traffic, &json!({}));
        assert_eq!(
            text,
            "En la zona consultada, el tráfico está desconocido."
        );
    }

    #[test]
    fn test_accessibility_not_found() {
        let data = json!({"lugar": "Bar Pepe", "encontrado": false});
        let text = format_response(IntentKind::Accessibility, &data);
        assert!(text.contains("No encontré información"));
        assert!(text.contains("Bar Pepe"));
    }

    #[test]
    fn test_accessibility_found() {
        let data = json!({
            "lugar": "Museo IVAM",
            "encontrado": true,
            "accesible": "accesible",
            "detalles_accesibilidad": "Acceso por rampa"
        });
        let text = format_response(IntentKind::Accessibility, &data);
        assert!(text.contains("es accesible para personas con movilidad reducida"));
        assert!(text.contains("Acceso por rampa"));
    }

    #[test]
    fn test_conversational_responses() {
        let greeting = format_response(IntentKind::Greeting, &json!({}));
        assert!(greeting.contains("asistente de movilidad"));

        let farewell = format_response(IntentKind::Farewell, &json!({}));
        assert!(farewell.contains("Hasta luego"));

        let fallback = format_response(IntentKind::General, &json!({}));
        assert!(fallback.contains("no he entendido"));
    }
}
