use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::llm::client::ChatClient;
use crate::llm::prompt;
use crate::llm::{IntentClassifier, ReportRenderer, Responder, Verdict};
use crate::workflow::aggregate::{render_plain, Report};
use crate::workflow::state::Intent;

/// LLM-backed classifier, direct responder and report renderer.
pub struct Assistant {
    client: ChatClient,
    classification_temperature: f32,
    chat_temperature: f32,
    report_temperature: f32,
}

impl Assistant {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
            classification_temperature: config.classification_temperature,
            chat_temperature: config.chat_temperature,
            report_temperature: config.report_temperature,
        })
    }
}

#[async_trait]
impl IntentClassifier for Assistant {
    async fn classify(&self, query: &str) -> Result<Verdict> {
        let answer = self
            .client
            .complete(prompt::CLASSIFY_SYSTEM, query, self.classification_temperature)
            .await?;

        match prompt::parse_yes_no(&answer) {
            Some(false) => return Ok(Verdict::General),
            Some(true) => {}
            None => {
                return Err(AppError::ClassifierUnavailable(format!(
                    "unparseable classification answer: {answer:?}"
                )))
            }
        }

        let extracted = self
            .client
            .complete(
                prompt::EXTRACT_LOCATION_SYSTEM,
                query,
                self.classification_temperature,
            )
            .await?;

        tracing::debug!(model = %self.client.model(), location = %extracted, "Extracted location");

        prompt::parse_location(&extracted)
            .map(Verdict::Destination)
            .ok_or_else(|| {
                AppError::ClassifierUnavailable(format!(
                    "no location extracted from destination query: {extracted:?}"
                ))
            })
    }
}

#[async_trait]
impl Responder for Assistant {
    async fn answer(&self, query: &str) -> Result<String> {
        self.client
            .complete(prompt::CHAT_SYSTEM, query, self.chat_temperature)
            .await
    }
}

#[async_trait]
impl ReportRenderer for Assistant {
    async fn render(&self, intent: Intent, report: &Report) -> Result<String> {
        let context = render_plain(report);
        let text = self
            .client
            .complete(
                prompt::REPORT_SYSTEM,
                &prompt::report_request(intent.as_str(), &context),
                self.report_temperature,
            )
            .await?;

        if text.is_empty() {
            return Err(AppError::Render("model returned an empty report".to_string()));
        }
        Ok(text)
    }
}
