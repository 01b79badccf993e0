use serde::Serialize;

use super::{ensure_finite, round_to, round_to_half_unit};
use crate::core::error::{Result, ServiceError};

/// Inputs of the standard meal + correction bolus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BolusInput {
    /// Grams of carbohydrate in the meal.
    pub carbs: f64,
    /// Grams of carbohydrate covered by one unit (I/C ratio).
    pub ic_ratio: f64,
    /// mg/dL drop per unit (FSI).
    pub correction_factor: f64,
    pub current_glucose: f64,
    pub target_glucose: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BolusResult {
    pub carb_bolus: f64,
    pub correction_bolus: f64,
    pub total_insulin: f64,
    pub rounded_dose: f64,
}

impl BolusInput {
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.carbs,
            self.ic_ratio,
            self.correction_factor,
            self.current_glucose,
            self.target_glucose,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ServiceError::validation("Parameters must be finite numbers."));
        }
        if self.carbs < 0.0 {
            return Err(ServiceError::validation("Carbohydrates cannot be negative."));
        }
        if self.ic_ratio <= 0.0 || self.correction_factor <= 0.0 {
            return Err(ServiceError::validation(
                "I/C ratio and correction factor must be greater than zero.",
            ));
        }
        if self.current_glucose <= 0.0 || self.target_glucose <= 0.0 {
            return Err(ServiceError::validation(
                "Blood glucose values must be greater than zero.",
            ));
        }
        Ok(())
    }
}

/// Meal insulin plus a correction that only ever adds insulin: a reading
/// below target never subtracts from the meal dose.
pub fn calculate_bolus(input: &BolusInput) -> Result<BolusResult> {
    input.validate()?;

    let meal_insulin = input.carbs / input.ic_ratio;
    let correction_insulin =
        (input.current_glucose - input.target_glucose).max(0.0) / input.correction_factor;
    let total_insulin = round_to((meal_insulin + correction_insulin).max(0.0), 1);

    let result = BolusResult {
        carb_bolus: round_to(meal_insulin, 2),
        correction_bolus: round_to(correction_insulin, 2),
        total_insulin,
        rounded_dose: round_to_half_unit(total_insulin),
    };
    ensure_finite(&[
        result.carb_bolus,
        result.correction_bolus,
        result.total_insulin,
        result.rounded_dose,
    ])?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(carbs: f64, current: f64) -> BolusInput {
        BolusInput {
            carbs,
            ic_ratio: 10.0,
            correction_factor: 50.0,
            current_glucose: current,
            target_glucose: 120.0,
        }
    }

    #[test]
    fn test_meal_and_correction() {
        let result = calculate_bolus(&input(60.0, 220.0)).unwrap();
        assert_eq!(result.carb_bolus, 6.0);
        assert_eq!(result.correction_bolus, 2.0);
        assert_eq!(result.total_insulin, 8.0);
        assert_eq!(result.rounded_dose, 8.0);
    }

    #[test]
    fn test_below_target_has_no_negative_correction() {
        let result = calculate_bolus(&input(45.0, 80.0)).unwrap();
        assert_eq!(result.correction_bolus, 0.0);
        assert_eq!(result.total_insulin, 4.5);
    }

    #[test]
    fn test_total_rounds_to_one_decimal() {
        let result = calculate_bolus(&BolusInput {
            carbs: 47.0,
            ic_ratio: 12.0,
            correction_factor: 40.0,
            current_glucose: 150.0,
            target_glucose: 110.0,
        })
        .unwrap();
        // 3.9166.. + 1.0
        assert_eq!(result.carb_bolus, 3.92);
        assert_eq!(result.total_insulin, 4.9);
        assert_eq!(result.rounded_dose, 5.0);
    }

    #[test]
    fn test_zero_carbs_is_a_pure_correction() {
        let result = calculate_bolus(&input(0.0, 170.0)).unwrap();
        assert_eq!(result.carb_bolus, 0.0);
        assert_eq!(result.total_insulin, 1.0);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let mut bad = input(60.0, 150.0);
        bad.ic_ratio = 0.0;
        assert!(matches!(calculate_bolus(&bad), Err(ServiceError::Validation(_))));

        let mut bad = input(-1.0, 150.0);
        assert!(calculate_bolus(&bad).is_err());

        bad = input(60.0, f64::NAN);
        assert!(calculate_bolus(&bad).is_err());

        bad = input(60.0, 150.0);
        bad.target_glucose = 0.0;
        assert!(calculate_bolus(&bad).is_err());
    }

    #[test]
    fn test_overflowing_dose_is_rejected() {
        let huge = BolusInput {
            carbs: 1e307,
            ic_ratio: 1.0,
            correction_factor: 50.0,
            current_glucose: 220.0,
            target_glucose: 120.0,
        };
        assert!(matches!(calculate_bolus(&huge), Err(ServiceError::Validation(_))));

        let tiny_ratio = BolusInput {
            carbs: 60.0,
            ic_ratio: 1e-308,
            ..huge
        };
        assert!(calculate_bolus(&tiny_ratio).is_err());
    }
}
