//! Request bodies as sent by the mobile/web client.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::analysis::{Language, MealAnalysisRequest};
use crate::core::error::{Result, ServiceError};
use crate::dosing::{BolusInput, FatProteinInput};

const MIN_DESCRIPTION_CHARS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Only logged; identity is owned by the auth provider.
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub language: Option<String>,
}

impl AnalyzeRequest {
    pub fn into_meal_request(self) -> Result<MealAnalysisRequest> {
        let image = self
            .image
            .filter(|img| !img.trim().is_empty())
            .ok_or_else(|| ServiceError::validation("Image missing or invalid."))?;

        let description = self
            .description
            .filter(|d| d.trim().chars().count() >= MIN_DESCRIPTION_CHARS)
            .ok_or_else(|| ServiceError::validation("Description too short."))?;

        Ok(MealAnalysisRequest {
            image,
            description,
            language: Language::from_code(self.language.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsulinRequest {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ic_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub correction_factor: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_glucose: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub target_glucose: Option<f64>,
}

impl InsulinRequest {
    pub fn into_input(self) -> Result<BolusInput> {
        match (
            self.carbs,
            self.ic_ratio,
            self.correction_factor,
            self.current_glucose,
            self.target_glucose,
        ) {
            (Some(carbs), Some(ic_ratio), Some(correction_factor), Some(current), Some(target)) => {
                Ok(BolusInput {
                    carbs,
                    ic_ratio,
                    correction_factor,
                    current_glucose: current,
                    target_glucose: target,
                })
            }
            _ => Err(ServiceError::validation(
                "Missing parameters for the calculation.",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FatProteinRequest {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub proteins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fats: Option<f64>,
}

impl FatProteinRequest {
    pub fn into_input(self) -> FatProteinInput {
        FatProteinInput {
            proteins: self.proteins.unwrap_or(0.0),
            fats: self.fats.unwrap_or(0.0),
        }
    }
}

/// Accepts `12.5`, `"12.5"`, `null` and `""` (the last two as absent).
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number, got '{}'", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyze_validation() {
        let ok: AnalyzeRequest = serde_json::from_value(json!({
            "image": "data:image/jpeg;base64,AAAA",
            "description": "  risotto  ",
            "language": "en"
        }))
        .unwrap();
        let meal = ok.into_meal_request().unwrap();
        assert_eq!(meal.language, Language::English);

        let no_image: AnalyzeRequest =
            serde_json::from_value(json!({ "description": "risotto" })).unwrap();
        assert_eq!(
            no_image.into_meal_request().unwrap_err().to_string(),
            "Image missing or invalid."
        );

        let short: AnalyzeRequest =
            serde_json::from_value(json!({ "image": "https://x/y.jpg", "description": " ab " }))
                .unwrap();
        assert_eq!(
            short.into_meal_request().unwrap_err().to_string(),
            "Description too short."
        );
    }

    #[test]
    fn test_insulin_request_accepts_strings() {
        let req: InsulinRequest = serde_json::from_value(json!({
            "carbs": "60",
            "icRatio": 10,
            "correctionFactor": "50.0",
            "currentGlucose": 180,
            "targetGlucose": 120
        }))
        .unwrap();
        let input = req.into_input().unwrap();
        assert_eq!(input.carbs, 60.0);
        assert_eq!(input.correction_factor, 50.0);
    }

    #[test]
    fn test_insulin_request_missing_field() {
        let req: InsulinRequest = serde_json::from_value(json!({
            "carbs": 60, "icRatio": 10, "correctionFactor": "", "currentGlucose": 180, "targetGlucose": 120
        }))
        .unwrap();
        assert!(matches!(req.into_input(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_non_numeric_string_is_a_decode_error() {
        let result = serde_json::from_value::<InsulinRequest>(json!({ "carbs": "lots" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_fat_protein_defaults_to_zero() {
        let req: FatProteinRequest = serde_json::from_value(json!({ "fats": 12 })).unwrap();
        assert_eq!(
            req.into_input(),
            FatProteinInput {
                proteins: 0.0,
                fats: 12.0
            }
        );
    }
}
