use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Label shown in place of a place name after a device lookup.
    pub fn label(&self) -> String {
        format!("{}, {}", self.latitude, self.longitude)
    }
}

/// Weather context attached to a crop analysis request.
///
/// Serializes to the `{temp, humidity, wind, desc, rain}` shape the crop
/// advisor expects. Any reading the weather service omitted stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    #[serde(rename = "wind")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "desc")]
    pub condition: Option<String>,
    #[serde(rename = "rain")]
    pub recent_precipitation: Option<f64>,
    #[serde(skip)]
    pub location_label: String,
}

impl WeatherSnapshot {
    /// Parse an OpenWeather-style body without failing on missing fields.
    pub fn from_weather_body(body: &Value, location_label: impl Into<String>) -> Self {
        // No rain block means no recent rain.
        let recent_precipitation = match body.get("rain") {
            None | Some(Value::Null) => Some(0.0),
            Some(rain) => rain.get("1h").and_then(Value::as_f64),
        };

        Self {
            temperature: body.pointer("/main/temp").and_then(Value::as_f64),
            humidity: body.pointer("/main/humidity").and_then(Value::as_f64),
            wind_speed: body.pointer("/wind/speed").and_then(Value::as_f64),
            condition: body
                .pointer("/weather/0/description")
                .and_then(Value::as_str)
                .map(str::to_string),
            recent_precipitation,
            location_label: location_label.into(),
        }
    }

    /// Snapshot for an unreadable body: no readings and no rain block.
    pub fn unknown(location_label: impl Into<String>) -> Self {
        Self::from_weather_body(&Value::Null, location_label)
    }
}
