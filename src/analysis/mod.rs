pub mod ensemble;
pub mod extract;
pub mod prompts;

pub use ensemble::{MealAnalysis, MealAnalysisRequest, MealAnalyzer, ModelRole};
pub use extract::{parse_judge_reply, JudgeVerdict, Nutrients};
pub use prompts::{Language, PromptSet};
