//! Tiered advisory text with the measured stress substituted in.

use crate::stress::AlertLevel;

pub fn advisory_message(stress_percentage: f64, alert: AlertLevel) -> String {
    match alert {
        AlertLevel::Safe => format!(
            "Field stress is LOW at {stress_percentage:.1}%. Crop canopy appears healthy. \
             Maintain current irrigation and nutrient schedules."
        ),
        AlertLevel::Monitor => format!(
            "Field stress is MODERATE at {stress_percentage:.1}%. \
             Recommend soil moisture sampling and targeted scouting within 48 hours. \
             Consider supplementary irrigation if no rainfall is forecast."
        ),
        AlertLevel::Critical => format!(
            "CRITICAL stress detected at {stress_percentage:.1}%. \
             Immediate field inspection required. Check for drought, nutrient deficiency, \
             or pest pressure. Apply corrective intervention within 24 hours."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_stress_per_tier() {
        assert!(advisory_message(12.34, AlertLevel::Safe).starts_with("Field stress is LOW at 12.3%."));
        assert!(advisory_message(45.0, AlertLevel::Monitor).contains("MODERATE at 45.0%"));
        assert!(advisory_message(88.8, AlertLevel::Critical).starts_with("CRITICAL stress detected at 88.8%."));
    }
}
