use super::WeatherClient;
use crate::config::OpenWeatherMapConfig;
use crate::error::{GreenhouseError, Result};
use crate::models::{Location, WeatherForecast, WeatherReading};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    config: OpenWeatherMapConfig,
}

// OpenWeatherMap API response structures
#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    rain: Option<OwmPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastItem>,
    #[serde(default)]
    city: Option<OwmCity>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    rain: Option<OwmPrecipitation>,
    #[serde(default)]
    snow: Option<OwmPrecipitation>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmPrecipitation {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    three_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    name: String,
}

impl OpenWeatherMapClient {
    pub fn new(config: OpenWeatherMapConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Coordinates when known, otherwise the city name.
    fn location_query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let mut query = match (location.lat, location.lon) {
            (Some(lat), Some(lon)) => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
            _ => vec![("q", location.city.clone())],
        };
        query.push(("appid", self.config.api_key.clone()));
        query.push(("units", self.config.units.clone()));
        query
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &Location,
    ) -> Result<T> {
        let url = format!("{}/{}", self.config.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&self.location_query(location))
            .send()
            .await
            .map_err(|e| GreenhouseError::UpstreamUnavailable(format!("OpenWeatherMap: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GreenhouseError::UpstreamUnavailable(format!(
                "OpenWeatherMap returned {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            GreenhouseError::UpstreamUnavailable(format!(
                "Failed to parse OpenWeatherMap response: {}",
                e
            ))
        })
    }

    /// Test connection to OpenWeatherMap API
    pub async fn test_connection(&self, location: &Location) -> Result<bool> {
        Ok(self.current(location).await.is_ok())
    }

    fn convert_current(&self, response: OwmCurrentResponse, location: &Location) -> WeatherReading {
        let precipitation_mm = response
            .rain
            .as_ref()
            .and_then(|r| r.one_hour)
            .unwrap_or(0.0);

        WeatherReading {
            timestamp: Some(Utc::now()),
            city: Some(location.city.clone()),
            temperature: response.main.temp,
            humidity: response.main.humidity,
            wind_speed: response.wind.and_then(|w| w.speed),
            precipitation_mm: Some(precipitation_mm),
            soil_moisture_pct: None,
        }
    }

    fn convert_forecast(&self, response: OwmForecastResponse, location: &Location) -> WeatherForecast {
        let samples = response
            .list
            .into_iter()
            .map(|item| self.convert_forecast_item(item, location))
            .collect();

        WeatherForecast {
            fetched_at: Utc::now(),
            city: response
                .city
                .map(|c| c.name)
                .unwrap_or_else(|| location.city.clone()),
            samples,
        }
    }

    fn convert_forecast_item(&self, item: OwmForecastItem, location: &Location) -> WeatherReading {
        let timestamp = DateTime::from_timestamp(item.dt, 0).unwrap_or_else(Utc::now);

        // Combine rain and snow precipitation
        let rain_mm = item.rain.as_ref().and_then(|r| r.three_hour).unwrap_or(0.0);
        let snow_mm = item.snow.as_ref().and_then(|s| s.three_hour).unwrap_or(0.0);

        WeatherReading {
            timestamp: Some(timestamp),
            city: Some(location.city.clone()),
            temperature: item.main.temp,
            humidity: item.main.humidity,
            wind_speed: item.wind.and_then(|w| w.speed),
            precipitation_mm: Some(rain_mm + snow_mm),
            soil_moisture_pct: None,
        }
    }
}

impl WeatherClient for OpenWeatherMapClient {
    async fn current(&self, location: &Location) -> Result<WeatherReading> {
        let response: OwmCurrentResponse = self.get("weather", location).await?;
        Ok(self.convert_current(response, location))
    }

    async fn forecast(&self, location: &Location) -> Result<WeatherForecast> {
        let response: OwmForecastResponse = self.get("forecast", location).await?;
        Ok(self.convert_forecast(response, location))
    }
}
