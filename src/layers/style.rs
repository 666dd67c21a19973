use crate::transform::Feature;

/// Types whose marker fill follows the temperature ladder.
pub const TEMPERATURE_TYPES: [&str; 2] = ["WeatherObserved", "TemperatureSensor"];

const STATUS_ACTIVE: &str = "#2dd4bf";
const STATUS_MAINTENANCE: &str = "#f59e0b";
const STATUS_OTHER: &str = "#60a5fa";

/// Upper bounds (exclusive) and colours; readings at or above the last
/// bound use [`TEMPERATURE_HOT`].
const TEMPERATURE_LADDER: [(f64, &str); 4] = [
    (0.0, "#3b82f6"),
    (10.0, "#22d3ee"),
    (20.0, "#22c55e"),
    (28.0, "#f59e0b"),
];
const TEMPERATURE_HOT: &str = "#ef4444";

/// Stable colour for an entity type.
///
/// Order-dependent hash over UTF-16 code units, folded into a hue.
pub fn type_color(entity_type: &str) -> String {
    let hue = entity_type
        .encode_utf16()
        .fold(0u32, |hash, unit| (hash * 31 + u32::from(unit)) % 360);
    format!("hsl({}, 70%, 55%)", hue)
}

pub fn status_color(status: &str) -> &'static str {
    match status {
        "active" => STATUS_ACTIVE,
        "maintenance" => STATUS_MAINTENANCE,
        _ => STATUS_OTHER,
    }
}

pub fn temperature_color(celsius: f64) -> &'static str {
    TEMPERATURE_LADDER
        .iter()
        .find(|(bound, _)| celsius < *bound)
        .map(|(_, color)| *color)
        .unwrap_or(TEMPERATURE_HOT)
}

/// Marker body colour for a feature.
///
/// Temperature-bearing types with a numeric reading use the ladder; other
/// features use their status colour, falling back to the type colour.
pub fn marker_fill(feature: &Feature, type_color: &str) -> String {
    if TEMPERATURE_TYPES.contains(&feature.entity_type.as_str()) {
        let reading = feature
            .attributes
            .iter()
            .find(|a| a.key == "temperature")
            .and_then(|a| a.as_number());
        if let Some(celsius) = reading {
            return temperature_color(celsius).to_string();
        }
    }

    match &feature.status {
        Some(status) => status_color(status).to_string(),
        None => type_color.to_string(),
    }
}

/// Short abbreviation for an entity type, at most two characters.
///
/// "WeatherObserved" → "WO", "Station" → "ST".
pub fn glyph(entity_type: &str) -> String {
    let capitals: String = entity_type
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .take(2)
        .collect();
    if capitals.len() == 2 {
        return capitals;
    }

    entity_type
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Popup body for a feature. Every interpolated value is escaped.
pub fn popup_html(feature: &Feature) -> String {
    let label = if feature.label.is_empty() {
        "Unknown"
    } else {
        feature.label.as_str()
    };
    let status = feature.status.as_deref().unwrap_or("ok");

    let mut html = String::from(r#"<div class="popup">"#);
    html.push_str(&format!(
        r#"<div class="popup-title">{}</div>"#,
        escape_html(label)
    ));
    html.push_str(&format!(
        r#"<div class="popup-type">{}</div>"#,
        escape_html(&feature.entity_type)
    ));
    html.push_str(&format!("<div>Status: {}</div>", escape_html(status)));

    if let Some(observed) = &feature.observed_raw {
        html.push_str(&format!("<div>Obs: {}</div>", escape_html(observed)));
    }

    for attribute in &feature.attributes {
        let unit = attribute
            .unit
            .as_deref()
            .map(|u| format!(" {}", escape_html(u)))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div>{}: {}{}</div>",
            escape_html(&attribute.key),
            escape_html(&attribute.value),
            unit
        ));
    }

    html.push_str("</div>");
    html
}
