//! Closed-form unit conversions for the raw weather feed.

/// (°F − 32) × 5/9
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn mph_to_kph(mph: f64) -> f64 {
    mph * 1.609344
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * 33.86389
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-9);
        assert!((fahrenheit_to_celsius(-40.0) - -40.0).abs() < 1e-9);
    }

    #[test]
    fn test_mph_to_kph() {
        assert!((mph_to_kph(10.0) - 16.09344).abs() < 1e-9);
        assert_eq!(mph_to_kph(0.0), 0.0);
    }

    #[test]
    fn test_inhg_to_hpa() {
        assert!((inhg_to_hpa(29.92) - 1013.2075888).abs() < 1e-6);
    }
}
