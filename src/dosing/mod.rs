//! Closed-form dose calculations. Pure arithmetic, no I/O.

pub mod bolus;
pub mod fat_protein;

pub use bolus::{calculate_bolus, BolusInput, BolusResult};
pub use fat_protein::{calculate_fat_protein_bolus, FatProteinInput, FatProteinResult};

use crate::core::error::{Result, ServiceError};

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Nearest half unit, the dosing step of most insulin pens.
pub fn round_to_half_unit(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Finite inputs can still overflow once scaled; serde_json would write
/// the infinity as `null`.
pub(crate) fn ensure_finite(values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ServiceError::validation("Values too large to calculate a dose."))
    }
}
