pub mod openweathermap;
pub mod profiles;

pub use openweathermap::OpenWeatherMapClient;
pub use profiles::load_profiles_dir;

use crate::error::Result;
use crate::models::{Location, WeatherForecast, WeatherReading};
use std::future::Future;

/// External weather provider. Calls may fail or hang; callers bound them
/// with a timeout and treat failure as "no data this tick".
pub trait WeatherClient: Send + Sync {
    fn current(&self, location: &Location) -> impl Future<Output = Result<WeatherReading>> + Send;

    fn forecast(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<WeatherForecast>> + Send;
}
