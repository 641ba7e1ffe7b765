use super::TextGenerator;
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use tracing::info;

const SYSTEM_PROMPT: &str = "You are a meeting-request parser. You analyze the given email text, \
extract the event name, participants, location, occurrence date/times, repeat frequency and end \
date, and output your findings as a single JSON object.";

/// Gemini-backed text generation
pub struct GeminiGenerator {
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    /// Create a generator for the given API key and model name
    pub fn new(api_key: String, model: String) -> Self {
        Self { api_key, model }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        info!("Sending extraction prompt to Gemini model {}", self.model);

        let client = GeminiClient::new(&self.api_key);
        let agent = client
            .agent(&self.model)
            .preamble(SYSTEM_PROMPT)
            .temperature(0.2)
            .build();

        let response = agent
            .chat(prompt.to_string(), Vec::<Message>::new())
            .await
            .map_err(|e| format!("Gemini request failed: {}", e))?;

        info!("Received response from Gemini");
        Ok(response)
    }
}
