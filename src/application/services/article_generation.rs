use std::sync::Arc;

use crate::application::ports::{GenerationPrompt, GenerationProvider};
use crate::domain::entities::GenerationRequest;
use crate::domain::errors::DomainError;

pub const ARTICLE_SYSTEM_PROMPT: &str = r#"You are an expert content writer and blogger. Your primary task is to generate well-structured, engaging articles in HTML format based on the user's request.

Instructions:
1. Role: act as a professional writer. Your tone should be informative and engaging.
2. Output format: the entire response must be HTML.
3. Tags:
   - Use <h1> for the main title of the article.
   - Use <h2> for major sections or subheadings.
   - Use <p> for all paragraphs.
   - Use <ul> with <li> for bullet points and <strong> for important keywords.
   - Do NOT include <html>, <head>, or <body> tags. Only generate the content that would go inside <body>.
   - Each complete article MUST be wrapped in its own <article> tag.
4. Multiple articles: if the user asks for more than one article, wrap each one in its own <article> tag and separate them with <hr>. Generate the requested number of distinct articles, each with its own heading and content.

Analyze the user's query below and generate the content according to these rules."#;

/// Turns a claimed request into article HTML.
pub struct ArticleGenerationService {
    provider: Arc<dyn GenerationProvider>,
}

impl ArticleGenerationService {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, DomainError> {
        let prompt = GenerationPrompt {
            model: request.model().to_string(),
            system_prompt: Some(ARTICLE_SYSTEM_PROMPT.to_string()),
            prompt: request.user_query().to_string(),
        };

        let text = self.provider.generate(prompt).await?;
        if text.trim().is_empty() {
            return Err(DomainError::Generation(
                "model returned no article content".to_string(),
            ));
        }
        Ok(text)
    }
}
