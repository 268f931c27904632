//! Tactical Advisor
//!
//! Optional natural-language enrichment behind a narrow contract: a prompt
//! goes in, free text comes back, and the JSON object inside it is parsed
//! into a typed result. Every failure is non-fatal for the caller.
//!
//! ## Backends
//!
//! - **HttpAdvisor**: OpenAI-compatible chat completions endpoint (Fireworks by default)
//! - **DisabledAdvisor**: always reports `NotConfigured`

mod http;
pub mod parsing;
pub mod prompt;

pub use http::HttpAdvisor;
pub use parsing::{AdvisorRecommendation, AdvisorZone, BattleDebrief};
pub use prompt::{AdvisorContext, AdvisorPrompt, BattleSummary, CategoryBreakdown, DebriefMode};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Advisor failures. None of them fail the surrounding request.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor is not configured")]
    NotConfigured,
    #[error("advisor timed out after {0:?}")]
    Timeout(Duration),
    #[error("advisor request failed: {0}")]
    Http(String),
    #[error("advisor returned HTTP {0}")]
    Status(u16),
    #[error("advisor returned an empty response")]
    EmptyResponse,
    #[error("advisor response contains no JSON object")]
    NoJson,
    #[error("advisor response is malformed: {0}")]
    Malformed(String),
}

impl AdvisorError {
    /// Short machine-readable status reported alongside a degraded response
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "network_error",
            Self::Status(_) => "http_error",
            Self::EmptyResponse => "empty_response",
            Self::NoJson => "no_json",
            Self::Malformed(_) => "malformed_json",
        }
    }
}

/// Trait for advisor backends
#[async_trait]
pub trait TacticalAdvisor: Send + Sync {
    /// Send one prompt and return the raw completion text
    async fn generate(&self, prompt: &AdvisorPrompt) -> Result<String, AdvisorError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Whether the backend has what it needs to make a call
    fn is_available(&self) -> bool {
        true
    }
}

/// Advisor used when enrichment is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAdvisor;

#[async_trait]
impl TacticalAdvisor for DisabledAdvisor {
    async fn generate(&self, _prompt: &AdvisorPrompt) -> Result<String, AdvisorError> {
        Err(AdvisorError::NotConfigured)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Ask the advisor for a recommendation enrichment.
///
/// Single attempt, bounded by `timeout`.
pub async fn advise(
    advisor: &dyn TacticalAdvisor,
    context: &AdvisorContext,
    max_tokens: u32,
    timeout: Duration,
) -> Result<AdvisorRecommendation, AdvisorError> {
    let prompt = prompt::recommendation_prompt(context, max_tokens);
    let text = call(advisor, &prompt, timeout).await?;
    parsing::parse_recommendation(&text)
}

/// Ask the advisor for a post-battle debrief.
pub async fn debrief(
    advisor: &dyn TacticalAdvisor,
    summary: &BattleSummary,
    mode: DebriefMode,
    max_tokens: u32,
    timeout: Duration,
) -> Result<BattleDebrief, AdvisorError> {
    let prompt = prompt::debrief_prompt(summary, mode, max_tokens);
    let text = call(advisor, &prompt, timeout).await?;
    parsing::parse_debrief(&text)
}

async fn call(
    advisor: &dyn TacticalAdvisor,
    prompt: &AdvisorPrompt,
    timeout: Duration,
) -> Result<String, AdvisorError> {
    if !advisor.is_available() {
        return Err(AdvisorError::NotConfigured);
    }

    debug!(
        backend = advisor.backend_name(),
        prompt_len = prompt.text.len(),
        "Calling tactical advisor"
    );

    match tokio::time::timeout(timeout, advisor.generate(prompt)).await {
        Ok(Ok(text)) if text.trim().is_empty() => Err(AdvisorError::EmptyResponse),
        Ok(result) => result,
        Err(_) => Err(AdvisorError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScenarioKey;

    struct CannedAdvisor(&'static str);

    #[async_trait]
    impl TacticalAdvisor for CannedAdvisor {
        async fn generate(&self, _prompt: &AdvisorPrompt) -> Result<String, AdvisorError> {
            Ok(self.0.to_string())
        }

        fn backend_name(&self) -> &'static str {
            "canned"
        }
    }

    struct StalledAdvisor;

    #[async_trait]
    impl TacticalAdvisor for StalledAdvisor {
        async fn generate(&self, _prompt: &AdvisorPrompt) -> Result<String, AdvisorError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }

        fn backend_name(&self) -> &'static str {
            "stalled"
        }
    }

    fn context() -> AdvisorContext {
        AdvisorContext {
            scenario: ScenarioKey::new("gaza", "army"),
            budget: 2_000_000,
            ..AdvisorContext::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_advisor_is_not_configured() {
        let err = advise(&DisabledAdvisor, &context(), 600, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NotConfigured));
        assert_eq!(err.code(), "not_configured");
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let err = advise(&StalledAdvisor, &context(), 600, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_json_is_extracted_from_prose() {
        let advisor = CannedAdvisor(
            r#"Sure! Here is my plan: {"tactical_notes": ["Hold the ridge"], "priority_targets": ["SAM sites"]} Good luck."#,
        );
        let rec = advise(&advisor, &context(), 600, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(rec.tactical_notes, vec!["Hold the ridge"]);
        assert_eq!(rec.priority_targets, vec!["SAM sites"]);
    }

    #[tokio::test]
    async fn test_blank_response_is_reported() {
        let err = advise(&CannedAdvisor("   "), &context(), 600, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::EmptyResponse));
    }
}
