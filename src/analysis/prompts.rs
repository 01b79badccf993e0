//! Per-language prompt templates for the estimate ensemble.

use crate::core::config::EnsembleConfig;

const NUTRIENT_JSON: &str =
    r#"{"carbohydrates": X, "proteins": Y, "fats": Z, "calories": W}"#;
const VERDICT_JSON: &str = r#"{"carbohydrates": X, "proteins": Y, "fats": Z, "calories": W, "fullAnalysis": "..."}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Italian,
    English,
}

impl Language {
    /// `"en"` selects English; every other code falls back to Italian.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some(c) if c.eq_ignore_ascii_case("en") => Language::English,
            _ => Language::Italian,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    pub primary: String,
    pub support: String,
    pub judge: String,
}

impl PromptSet {
    pub fn new(language: Language, config: &EnsembleConfig) -> Self {
        match language {
            Language::English => Self::english(config),
            Language::Italian => Self::italian(config),
        }
    }

    fn english(config: &EnsembleConfig) -> Self {
        let primary = format!(
            "Identify the dish in the photo. Estimate the weight of the dish and of each \
             ingredient, then the grams of carbohydrates, proteins and fats and the calories. \
             Begin with a JSON summary {NUTRIENT_JSON}, then describe the ingredients, their \
             estimated weights and the calculation step by step. Small portions (a thin slice \
             of cake, a single biscuit, a handful of crisps) are easy to overestimate."
        );
        let support = format!(
            "Estimate the main nutrients of the dish in the photo. Reply with {NUTRIENT_JSON} \
             and a short explanation."
        );
        let judge = format!(
            "You receive {} of the same dish: one main estimate and {} supporting estimate(s). \
             Produce the most plausible carbohydrate, protein, fat and calorie figures as a \
             weighted average. The main estimate always weighs more than {}%. An estimate that \
             looks implausible weighs much less. Do not mention that several estimates were \
             compared and do not name any model; explain concisely how the dish weight and the \
             macronutrients were estimated. Return {VERDICT_JSON}",
            count_phrase(config.support_calls + 1, "analysis", "analyses"),
            config.support_calls,
            config.primary_weight_percent,
        );
        Self {
            primary,
            support,
            judge,
        }
    }

    fn italian(config: &EnsembleConfig) -> Self {
        let primary = format!(
            "Riconosci il piatto nella foto. Stima il peso del piatto e di ogni ingrediente, \
             poi i grammi di carboidrati, proteine e grassi e le calorie. Inizia con un \
             riepilogo JSON {NUTRIENT_JSON}, poi descrivi gli ingredienti, il peso stimato di \
             ciascuno e il calcolo passo per passo. Le porzioni piccole (una fetta sottile di \
             torta, un biscotto, qualche patatina) si sovrastimano facilmente."
        );
        let support = format!(
            "Stima i nutrienti principali del piatto nella foto. Rispondi con {NUTRIENT_JSON} \
             e una breve spiegazione."
        );
        let judge = format!(
            "Ricevi {} analisi dello stesso piatto: una stima principale e {} stima/e di \
             supporto. Produci i valori più plausibili di carboidrati, proteine, grassi e \
             calorie come media ponderata. La stima principale pesa sempre più del {}%. Una \
             stima poco plausibile pesa molto meno. Non dire che hai confrontato più stime e \
             non nominare alcun modello; spiega in modo sintetico come hai stimato il peso del \
             piatto e i macronutrienti. Restituisci {VERDICT_JSON}",
            config.support_calls + 1,
            config.support_calls,
            config.primary_weight_percent,
        );
        Self {
            primary,
            support,
            judge,
        }
    }
}

fn count_phrase(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// User message text sent with the photo.
pub fn user_description(description: &str) -> String {
    format!("User description: {}", description)
}

/// `gpt-4o` -> `GPT-4o`; other names pass through.
pub fn display_model_name(model: &str) -> String {
    match model.strip_prefix("gpt") {
        Some(rest) => format!("GPT{}", rest),
        None => model.to_string(),
    }
}

pub fn primary_label(model: &str) -> String {
    format!("{} (main)", display_model_name(model))
}

/// `index` is 1-based.
pub fn support_label(model: &str, index: usize) -> String {
    format!("{} (support {})", display_model_name(model), index)
}

pub fn labeled_estimate(label: &str, content: &str) -> String {
    format!("--- {} ---\n{}", label, content.trim())
}

pub fn judge_input(labeled: &[String]) -> String {
    format!("Received analyses:\n\n{}", labeled.join("\n\n"))
}
