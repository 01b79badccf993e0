use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::extract::{parse_judge_reply, Nutrients};
use super::prompts::{self, Language, PromptSet};
use crate::api::{ChatCompletion, ChatMessage, ChatRequest};
use crate::core::config::EnsembleConfig;
use crate::core::error::Result;
use crate::core::health::HealthChecker;
use crate::core::metrics::ServiceMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Primary,
    Support,
    Judge,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Primary => "primary",
            ModelRole::Support => "support",
            ModelRole::Judge => "judge",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MealAnalysisRequest {
    /// Public URL or data URL of the meal photo.
    pub image: String,
    pub description: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub nutrients: Nutrients,
    pub full_analysis: String,
}

/// Primary estimate plus N support estimates in parallel, then one judge
/// call over the labelled outputs.
pub struct MealAnalyzer {
    client: Arc<dyn ChatCompletion>,
    config: EnsembleConfig,
    metrics: ServiceMetrics,
    health: HealthChecker,
}

impl MealAnalyzer {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        config: EnsembleConfig,
        metrics: ServiceMetrics,
        health: HealthChecker,
    ) -> Self {
        Self {
            client,
            config,
            metrics,
            health,
        }
    }

    pub fn build_requests(&self, request: &MealAnalysisRequest) -> (Vec<ChatRequest>, PromptSet) {
        let prompt_set = PromptSet::new(request.language, &self.config);
        let user_text = prompts::user_description(&request.description);

        let mut estimates = Vec::with_capacity(self.config.support_calls + 1);
        estimates.push(
            ChatRequest::new(
                self.config.primary_model.clone(),
                vec![
                    ChatMessage::system(prompt_set.primary.clone()),
                    ChatMessage::user_with_image(user_text.clone(), request.image.clone()),
                ],
            )
            .with_verbosity(self.config.primary_verbosity.clone()),
        );
        for _ in 0..self.config.support_calls {
            estimates.push(
                ChatRequest::new(
                    self.config.support_model.clone(),
                    vec![
                        ChatMessage::system(prompt_set.support.clone()),
                        ChatMessage::user_with_image(user_text.clone(), request.image.clone()),
                    ],
                )
                .with_temperature(self.config.support_temperature),
            );
        }

        (estimates, prompt_set)
    }

    pub async fn analyze(&self, request: &MealAnalysisRequest) -> Result<MealAnalysis> {
        let started = Instant::now();
        let (estimates, prompt_set) = self.build_requests(request);

        // All-or-nothing: one failed estimate fails the analysis.
        let calls = estimates.into_iter().enumerate().map(|(i, req)| {
            let role = if i == 0 {
                ModelRole::Primary
            } else {
                ModelRole::Support
            };
            self.call(role, req)
        });
        let outputs = try_join_all(calls).await?;

        let labeled: Vec<String> = outputs
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let label = if i == 0 {
                    prompts::primary_label(&self.config.primary_model)
                } else {
                    prompts::support_label(&self.config.support_model, i)
                };
                prompts::labeled_estimate(&label, content)
            })
            .collect();

        let judge_request = ChatRequest::new(
            self.config.judge_model.clone(),
            vec![
                ChatMessage::system(prompt_set.judge),
                ChatMessage::user_text(prompts::judge_input(&labeled)),
            ],
        );
        let reply = self.call(ModelRole::Judge, judge_request).await?;

        let verdict = parse_judge_reply(&reply);
        if !verdict.parsed {
            warn!("Judge reply had no usable JSON, returning empty nutrients");
            self.metrics.record_parse_fallback();
        }

        let elapsed = started.elapsed();
        self.metrics.observe_analysis(elapsed);
        info!(
            "🍽️ Analysis done in {:?} (carbs: {:?}, {} estimates)",
            elapsed,
            verdict.nutrients.carbohydrates,
            outputs.len()
        );

        Ok(MealAnalysis {
            nutrients: verdict.nutrients,
            full_analysis: verdict.full_analysis,
        })
    }

    async fn call(&self, role: ModelRole, request: ChatRequest) -> Result<String> {
        let result = self.client.complete(&request).await;

        self.metrics.record_llm_call(role.as_str(), result.is_ok());
        self.health.set_openai_api(result.is_ok()).await;
        if let Err(e) = &result {
            warn!("{} call to {} failed: {}", role.as_str(), request.model, e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::openai::MockChatCompletion;
    use crate::api::MessageContent;
    use crate::core::error::ServiceError;
    use std::sync::Mutex;

    fn analyzer(mock: MockChatCompletion, config: EnsembleConfig) -> MealAnalyzer {
        MealAnalyzer::new(
            Arc::new(mock),
            config,
            ServiceMetrics::new().unwrap(),
            HealthChecker::new(),
        )
    }

    fn meal(language: Language) -> MealAnalysisRequest {
        MealAnalysisRequest {
            image: "https://storage.example/mealphotos/photo_1.jpg".to_string(),
            description: "spaghetti al pomodoro".to_string(),
            language,
        }
    }

    fn text_of(message: &ChatMessage) -> String {
        match &message.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    crate::api::ContentPart::Text { text } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    #[tokio::test]
    async fn test_primary_support_then_judge() {
        let judge_inputs = Arc::new(Mutex::new(Vec::new()));
        let captured = judge_inputs.clone();

        let mut mock = MockChatCompletion::new();
        mock.expect_complete()
            .times(4)
            .returning(move |req: &ChatRequest| match req.model.as_str() {
                "gpt-5" => Ok("{\"carbohydrates\": 70} main".to_string()),
                "gpt-4o" if req.temperature.is_some() => {
                    Ok("{\"carbohydrates\": 60} support".to_string())
                }
                _ => {
                    captured.lock().unwrap().push(text_of(&req.messages[1]));
                    Ok("Result: {\"carbohydrates\": 67, \"proteins\": 12, \"fats\": 8, \"calories\": 380, \"fullAnalysis\": \"About 300 g of pasta.\"}".to_string())
                }
            });

        let analyzer = analyzer(mock, EnsembleConfig::default());
        let analysis = analyzer.analyze(&meal(Language::English)).await.unwrap();

        assert_eq!(analysis.nutrients.carbohydrates, Some(67.0));
        assert_eq!(analysis.nutrients.calories, Some(380.0));
        assert_eq!(analysis.full_analysis, "About 300 g of pasta.");

        let inputs = judge_inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].starts_with("Received analyses:\n\n--- GPT-5 (main) ---\n"));
        assert!(inputs[0].contains("--- GPT-4o (support 1) ---\n{\"carbohydrates\": 60} support"));
        assert!(inputs[0].contains("--- GPT-4o (support 2) ---"));
        assert_eq!(analyzer.metrics.llm_call_count("support", true), 2);
    }

    #[tokio::test]
    async fn test_any_estimate_failure_fails_the_analysis() {
        let mut mock = MockChatCompletion::new();
        mock.expect_complete().returning(|req: &ChatRequest| {
            if req.temperature.is_some() {
                Err(ServiceError::upstream("429 Too Many Requests"))
            } else {
                Ok("{}".to_string())
            }
        });

        let analyzer = analyzer(mock, EnsembleConfig::default());
        let result = analyzer.analyze(&meal(Language::Italian)).await;

        assert!(matches!(result, Err(ServiceError::Upstream(_))));
        assert_eq!(analyzer.metrics.llm_call_count("judge", true), 0);
        assert_eq!(analyzer.health.get_status().await.status, "degraded");
    }

    #[tokio::test]
    async fn test_malformed_judge_reply_degrades_to_nulls() {
        let mut mock = MockChatCompletion::new();
        mock.expect_complete()
            .returning(|_req: &ChatRequest| Ok("Sorry, the photo is too dark.".to_string()));

        let analyzer = analyzer(mock, EnsembleConfig::default());
        let analysis = analyzer.analyze(&meal(Language::English)).await.unwrap();

        assert_eq!(analysis.nutrients, Nutrients::default());
        assert_eq!(analysis.full_analysis, "Sorry, the photo is too dark.");
        assert_eq!(analyzer.metrics.parse_fallback_count(), 1);
    }

    #[tokio::test]
    async fn test_no_support_calls() {
        let mut mock = MockChatCompletion::new();
        mock.expect_complete()
            .times(2)
            .returning(|_req: &ChatRequest| Ok("{\"carbohydrates\": 30}".to_string()));

        let config = EnsembleConfig {
            support_calls: 0,
            ..EnsembleConfig::default()
        };
        let analyzer = analyzer(mock, config);
        let analysis = analyzer.analyze(&meal(Language::Italian)).await.unwrap();
        assert_eq!(analysis.nutrients.carbohydrates, Some(30.0));
    }

    #[test]
    fn test_estimate_requests_shape() {
        let analyzer = analyzer(MockChatCompletion::new(), EnsembleConfig::default());
        let (requests, _) = analyzer.build_requests(&meal(Language::English));

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].model, "gpt-5");
        assert_eq!(requests[0].verbosity.as_deref(), Some("low"));
        assert_eq!(requests[0].temperature, None);
        assert_eq!(requests[1].model, "gpt-4o");
        assert_eq!(requests[1].temperature, Some(0.7));
        assert_eq!(
            text_of(&requests[2].messages[1]),
            "User description: spaghetti al pomodoro"
        );
    }
}
