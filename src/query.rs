//! Retrieval-augmented query engine.
//!
//! Answers a question by embedding it, retrieving the top-k most similar
//! passages, assembling them into a grounding context, and delegating to
//! an opaque completion service with a fixed instruction template. The
//! completion is returned verbatim — no post-processing, no citation
//! extraction. An empty index yields an empty context and the model is
//! instructed to decline; only a completion-service failure is an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CompletionConfig;
use crate::embedding::Embedder;
use crate::error::QueryError;
use crate::index::VectorIndex;
use crate::models::SearchHit;

/// Instruction template sent to the completion service. `{question}` and
/// `{context}` are substituted by [`build_prompt`].
const PROMPT_TEMPLATE: &str = "\
You are an assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If you don't know the answer, just say that you don't know.
Use five sentences maximum and keep the answer concise.

Question: {question}
Context: {context}
Answer:";

/// Opaque text-completion service: one blocking call per query.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError>;
}

/// Completion via an OpenAI-compatible `/chat/completions` endpoint.
///
/// A single un-retried call per query; requires `OPENAI_API_KEY`.
pub struct OpenAiCompletion {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, QueryError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| QueryError::Completion {
            status: 0,
            body: "OPENAI_API_KEY environment variable not set".into(),
        })?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(QueryError::Completion {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response.json().await?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| QueryError::InvalidResponse("missing choices[0].message.content".into()))
    }
}

/// Join retrieved passage texts, in similarity-rank order, into one
/// grounding context block.
pub fn assemble_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the instruction template for one question and its context.
pub fn build_prompt(question: &str, context: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{context}", context)
}

/// Answers questions against the vector index.
pub struct QueryEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionClient>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionClient>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            top_k,
        }
    }

    /// Answer a question from indexed passages. Fails as a whole on any
    /// component error; no partial answer is returned.
    pub async fn answer(&self, question: &str) -> Result<String, QueryError> {
        let query_vector = self.embedder.embed_one(question).await?;
        let hits = self.index.search(&query_vector, self.top_k).await?;

        let context = assemble_context(&hits);
        let prompt = build_prompt(question, &context);

        tracing::debug!(
            question,
            retrieved = hits.len(),
            "dispatching completion request"
        );

        self.completion.complete(&prompt).await
    }
}
