//! Bridges `openai-chat` to the generator's `TextGenerator` seam.

use charsmith_core::generator::TextGenerator;
use charsmith_core::prompt::Prompt;
use charsmith_core::CharsmithError;
use openai_chat::ChatClient;

pub struct ChatService {
    client: ChatClient,
    model: String,
}

impl ChatService {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        ChatService {
            client,
            model: model.into(),
        }
    }
}

impl TextGenerator for ChatService {
    fn generate(&self, prompt: &Prompt) -> charsmith_core::Result<String> {
        self.client
            .complete(&self.model, &prompt.system, &prompt.user)
            .map_err(|e| {
                tracing::debug!(transient = e.is_transient(), "chat completion failed");
                CharsmithError::Generation(e.to_string())
            })
    }
}
