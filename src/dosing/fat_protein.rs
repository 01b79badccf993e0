use serde::Serialize;

use super::{ensure_finite, round_to, round_to_half_unit};
use crate::core::error::{Result, ServiceError};

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;
/// One extra unit per 200 kcal of fat and protein (Pankowska).
const KCAL_PER_UNIT: f64 = 200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FatProteinInput {
    pub proteins: f64,
    pub fats: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FatProteinResult {
    pub protein_calories: f64,
    pub fat_calories: f64,
    pub total_calories: f64,
    pub additional_bolus: f64,
    pub rounded_bolus: f64,
}

pub fn calculate_fat_protein_bolus(input: &FatProteinInput) -> Result<FatProteinResult> {
    if !input.proteins.is_finite() || !input.fats.is_finite() {
        return Err(ServiceError::validation("Protein and fat values must be finite numbers."));
    }
    if input.proteins < 0.0 || input.fats < 0.0 {
        return Err(ServiceError::validation("Invalid protein or fat values."));
    }

    let protein_calories = input.proteins * KCAL_PER_GRAM_PROTEIN;
    let fat_calories = input.fats * KCAL_PER_GRAM_FAT;
    let total_calories = protein_calories + fat_calories;
    let additional_bolus = total_calories / KCAL_PER_UNIT;

    let result = FatProteinResult {
        protein_calories: round_to(protein_calories, 1),
        fat_calories: round_to(fat_calories, 1),
        total_calories: round_to(total_calories, 1),
        additional_bolus: round_to(additional_bolus, 2),
        rounded_bolus: round_to_half_unit(additional_bolus),
    };
    ensure_finite(&[
        result.protein_calories,
        result.fat_calories,
        result.total_calories,
        result.additional_bolus,
        result.rounded_bolus,
    ])?;
    Ok(result)
}
