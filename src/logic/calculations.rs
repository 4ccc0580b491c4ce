use crate::models::Range;

/// Clamp a value into `[min, max]`
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// First-order exponential smoothing towards `target`.
/// With no previous value the target is taken as-is.
pub fn smooth(previous: Option<f64>, target: f64, alpha: f64) -> f64 {
    match previous {
        Some(prev) if prev.is_finite() => prev + (target - prev) * alpha,
        _ => target,
    }
}

/// Hysteresis margin for a range: a fraction of its width, never below `min_margin`.
pub fn hysteresis_margin(range: &Range, fraction: f64, min_margin: f64) -> f64 {
    (range.width().max(min_margin) * fraction).max(min_margin)
}

/// Estimate soil moisture from outside conditions when no reading exists yet.
/// Humid air raises it, heat above 20°C dries it.
pub fn initial_soil_moisture(ext_temperature: f64, ext_humidity: f64, ext_soil: f64) -> f64 {
    let estimate =
        ext_soil + (ext_humidity - 50.0) * 0.05 - (ext_temperature - 20.0).max(0.0) * 0.2;
    clamp(estimate, 0.0, 100.0)
}

/// Evaporation per tick with irrigation off. Grows with heat above 15°C
/// and with wind, amplified when the air is drier than 50%.
pub fn evaporation(temperature: f64, humidity: f64, wind: f64) -> f64 {
    let base = 0.01 + (temperature - 15.0).max(0.0) * 0.0008 + wind * 0.0005;
    base * (1.0 + (50.0 - humidity).max(0.0) / 200.0)
}

/// Water drawn by plants per tick.
///
/// Plants pull harder the further the soil sits below the midpoint of their
/// preferred range, and harder again when warm.
pub fn plant_uptake(temperature: f64, soil_moisture: f64, soil_range: Option<&Range>) -> f64 {
    let base = match soil_range {
        Some(range) => {
            let deficit = (range.midpoint() - soil_moisture).max(0.0);
            0.01 + (deficit / 100.0).min(0.05)
        }
        None => 0.01,
    };
    let warmth = (temperature - 20.0).max(0.0);
    let factor = base * (1.0 + warmth / 50.0);
    factor * (1.0 + warmth / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth() {
        assert_eq!(smooth(None, 30.0, 0.2), 30.0);
        assert!((smooth(Some(20.0), 30.0, 0.2) - 22.0).abs() < 1e-9);
        assert_eq!(smooth(Some(f64::NAN), 30.0, 0.2), 30.0);
        // alpha 1 jumps straight to the target
        assert_eq!(smooth(Some(10.0), 30.0, 1.0), 30.0);
    }

    #[test]
    fn test_hysteresis_margin() {
        // 5% of 20 is 1.0
        assert!((hysteresis_margin(&Range::new(30.0, 50.0), 0.05, 1.0) - 1.0).abs() < 1e-9);
        // narrow ranges fall back to the minimum
        assert_eq!(hysteresis_margin(&Range::new(20.0, 22.0), 0.05, 1.0), 1.0);
        // wide ranges scale
        assert!((hysteresis_margin(&Range::new(0.0, 100.0), 0.05, 1.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_initial_soil_moisture() {
        assert!((initial_soil_moisture(20.0, 50.0, 30.0) - 30.0).abs() < 1e-9);
        // 30°C removes 2 points, 70% humidity adds 1
        assert!((initial_soil_moisture(30.0, 70.0, 30.0) - 29.0).abs() < 1e-9);
        assert_eq!(initial_soil_moisture(80.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_evaporation() {
        let cool_humid = evaporation(15.0, 60.0, 0.0);
        assert!((cool_humid - 0.01).abs() < 1e-9);

        let hot_dry_windy = evaporation(35.0, 20.0, 10.0);
        assert!(hot_dry_windy > cool_humid);
    }

    #[test]
    fn test_plant_uptake() {
        let range = Range::new(30.0, 50.0);
        let at_mid = plant_uptake(20.0, 40.0, Some(&range));
        assert!((at_mid - 0.01).abs() < 1e-9);

        let dry = plant_uptake(20.0, 10.0, Some(&range));
        // deficit of 30 points, capped at 0.05 extra
        assert!((dry - 0.06).abs() < 1e-9);

        let warm = plant_uptake(30.0, 40.0, Some(&range));
        assert!(warm > at_mid);

        assert!((plant_uptake(20.0, 10.0, None) - 0.01).abs() < 1e-9);
    }
}
