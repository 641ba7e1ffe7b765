mod gemini;

pub use gemini::GeminiGenerator;

use crate::model::EventRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Text-generation service used for extraction
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the raw response text
    async fn generate(&self, prompt: &str) -> Result<String, String>;
}

const USER_PROMPT_TEMPLATE: &str = "Extract the following information from the email content and return it as valid JSON:
- event_name: the name of the event
- participants: list of participant email addresses or names
- location: where the event takes place
- occurrences: array of objects, one per date the event happens, each with
  date_time (\"YYYY-MM-DD HH:mm\", 24-hour clock) and duration_minutes (integer)
- repeat_frequency: how often the event repeats, if mentioned
- end_date: the last date of a repeating event (\"YYYY-MM-DD\"), if mentioned

Return only the JSON object with no additional text.

Email content:
{email_body}";

/// Converts raw email text into structured event records via the model
pub struct EventExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl EventExtractor {
    /// Create an extractor backed by the given generator
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Extract event information from one email body.
    ///
    /// Never fails: model and parse failures become fallback records so the
    /// pipeline always receives a value.
    pub async fn extract(&self, email_body: &str) -> EventRecord {
        info!("Extracting event information from email");
        let prompt = USER_PROMPT_TEMPLATE.replace("{email_body}", email_body);

        let response = match self.generator.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!("Model request failed: {}", e);
                return EventRecord::fallback(None);
            }
        };

        let json_str = strip_code_fence(&response);
        match serde_json::from_str::<EventRecord>(json_str) {
            Ok(record) => {
                info!(
                    "Extracted event '{}' with {} occurrence(s)",
                    record.name,
                    record.occurrences.len()
                );
                record
            }
            Err(e) => {
                error!("Failed to parse event JSON from response: {}", e);
                EventRecord::fallback(Some(response))
            }
        }
    }
}

/// Strip a markdown code fence from the model response if present,
/// otherwise treat the whole trimmed response as the JSON payload
fn strip_code_fence(response: &str) -> &str {
    match response.split_once("```json") {
        Some((_, rest)) => rest.split("```").next().unwrap_or(rest).trim(),
        None => response.trim(),
    }
}
