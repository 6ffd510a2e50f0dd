//! Enrichment stage: weather context for the crop advisor.
//!
//! Two entry points feed the same `WeatherSnapshot`:
//! - **device**: asks a `Locate` implementation for coordinates, then looks them up
//! - **name**: looks up a free-text place name; blank names never reach the backend

use async_trait::async_trait;
use krishi_core::config::DeviceConfig;
use krishi_core::models::{Coordinates, WeatherSnapshot};
use krishi_core::{KrishiBackend, KrishiError, ValidationError};

/// Source of the device's position. Denial is an ordinary, recoverable error.
#[async_trait]
pub trait Locate: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, KrishiError>;
}

/// Position fixed at startup, or none at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

impl FixedLocation {
    pub fn from_config(device: &DeviceConfig) -> Self {
        Self(device.coordinates().map(|(lat, lon)| Coordinates::new(lat, lon)))
    }
}

#[async_trait]
impl Locate for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, KrishiError> {
        self.0.ok_or_else(|| {
            KrishiError::LocationDenied("device location is not available".to_string())
        })
    }
}

pub async fn locate_by_device(
    backend: &dyn KrishiBackend,
    locator: &dyn Locate,
) -> Result<WeatherSnapshot, KrishiError> {
    let coordinates = match locator.current_position().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Device location unavailable");
            return Err(e);
        }
    };

    tracing::info!(
        lat = coordinates.latitude,
        lon = coordinates.longitude,
        "Fetching weather for device position"
    );
    backend
        .weather_by_coordinates(coordinates)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Weather lookup by coordinates failed");
            e.into()
        })
}

pub async fn locate_by_name(
    backend: &dyn KrishiBackend,
    place: &str,
) -> Result<WeatherSnapshot, KrishiError> {
    let place = place.trim();
    if place.is_empty() {
        return Err(ValidationError::BlankLocation.into());
    }

    tracing::info!(place = %place, "Fetching weather for place");
    backend.weather_by_name(place).await.map_err(|e| {
        tracing::error!(place = %place, error = %e, "Weather lookup by name failed");
        e.into()
    })
}
