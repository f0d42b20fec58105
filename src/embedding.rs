//! Embedding similarity search
//!
//! Third strategy in the pipeline. Documents with non-empty embedding text
//! are vectorized once at load time; a query is accepted only when its best
//! cosine similarity clears a high threshold.
//!
//! With an API key configured the embedder calls an OpenAI-style embeddings
//! endpoint. Without one it falls back to deterministic feature-hashed
//! character trigrams, which keeps the strategy (and its threshold
//! semantics) working offline.

use crate::error::{AssistantError, Result};
use crate::knowledge::SearchDocument;
use crate::locale::Locale;
use crate::response::ResponseTemplate;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// Minimum cosine similarity for an embedding match.
pub const SIMILARITY_THRESHOLD: f32 = 0.75;

const LOCAL_DIMENSION: usize = 256;
const REMOTE_DIMENSION: usize = 1536;
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

pub type Embedding = Vec<f32>;

pub struct TextEmbedder {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    client: reqwest::Client,
    dimension: usize,
}

impl TextEmbedder {
    /// Deterministic local embedder, no network involved.
    pub fn local() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
            dimension: LOCAL_DIMENSION,
        }
    }

    /// Remote embedder against an OpenAI-style endpoint.
    pub fn remote(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
            dimension: REMOTE_DIMENSION,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        match &self.api_key {
            Some(key) if !key.is_empty() => self.embed_remote(key, text).await,
            _ => Ok(self.embed_local(text)),
        }
    }

    async fn embed_remote(&self, key: &str, text: &str) -> Result<Embedding> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Embedding(format!("Embedding call failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(AssistantError::Embedding(format!(
                "Embedding endpoint returned {}",
                response.status()
            )));
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Embedding(format!("Bad embedding response: {}", e)))?;
        let vector = payload["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| AssistantError::Embedding("No embedding in response".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Vec<f32>>();
        if vector.is_empty() {
            return Err(AssistantError::Embedding("Empty embedding vector".to_string()));
        }
        Ok(vector)
    }

    /// Feature-hashed character trigrams, L2-normalized. Identical inputs
    /// always map to identical vectors.
    fn embed_local(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        let normalized: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        let chars: Vec<char> = normalized.chars().collect();
        if chars.is_empty() {
            return vector;
        }
        for window in chars.windows(3.min(chars.len())) {
            let mut hasher = DefaultHasher::new();
            window.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

/// One indexed document: its id, vector, and the template it resolves to.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub doc_id: String,
    pub vector: Embedding,
    pub template: ResponseTemplate,
}

/// Linear-scan cosine index, built once at load time.
#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    entries: Vec<IndexEntry>,
}

impl EmbeddingIndex {
    /// Embeds every document with non-empty embedding text. Individual
    /// embedding failures are logged and skipped; they never fail the load.
    pub async fn build(
        embedder: &TextEmbedder,
        documents: &[SearchDocument],
        locale: Locale,
    ) -> Self {
        let mut entries = Vec::new();
        for doc in documents {
            let text = doc.text_for_embedding.resolve(locale);
            if text.is_empty() {
                continue;
            }
            match embedder.embed(text).await {
                Ok(vector) => entries.push(IndexEntry {
                    doc_id: doc.id.clone(),
                    vector,
                    template: doc.response.clone(),
                }),
                Err(e) => {
                    warn!(doc_id = %doc.id, "Skipping document, embedding failed: {}", e);
                }
            }
        }
        debug!(indexed = entries.len(), "Embedding index built");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best entry above the similarity threshold, if any.
    pub fn search(&self, query: &Embedding) -> Option<(&IndexEntry, f32)> {
        let mut best: Option<(&IndexEntry, f32)> = None;
        for entry in &self.entries {
            let score = cosine_similarity(query, &entry.vector);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best.filter(|(_, score)| *score > SIMILARITY_THRESHOLD)
    }
}

/// Cosine similarity between two vectors. Mismatched lengths score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 1.0);

        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_local_embedding_deterministic() {
        let embedder = TextEmbedder::local();
        let a = embedder.embed_local("what projects have you built");
        let b = embedder.embed_local("what projects have you built");
        assert_eq!(a, b);
        assert!(cosine_similarity(&a, &b) > 0.999);
    }

    #[test]
    fn test_local_embedding_separates_topics() {
        let embedder = TextEmbedder::local();
        let a = embedder.embed_local("data engineering pipeline projects");
        let b = embedder.embed_local("안녕하세요 반갑습니다");
        assert!(cosine_similarity(&a, &b) < SIMILARITY_THRESHOLD);
    }

    #[tokio::test]
    async fn test_index_skips_empty_embedding_text() {
        let docs: Vec<SearchDocument> = serde_json::from_value(serde_json::json!([
            {
                "id": "d1",
                "text_for_embedding": "my featured projects",
                "response": {"category": "projects"}
            },
            {
                "id": "d2",
                "text_for_embedding": "",
                "response": {"category": "skills"}
            }
        ]))
        .unwrap();
        let embedder = TextEmbedder::local();
        let index = EmbeddingIndex::build(&embedder, &docs, Locale::En).await;
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_search_threshold() {
        let docs: Vec<SearchDocument> = serde_json::from_value(serde_json::json!([
            {
                "id": "d1",
                "text_for_embedding": "tell me about your data projects",
                "response": {"category": "projects"}
            }
        ]))
        .unwrap();
        let embedder = TextEmbedder::local();
        let index = EmbeddingIndex::build(&embedder, &docs, Locale::En).await;

        let near = embedder.embed("tell me about your data projects").await.unwrap();
        let hit = index.search(&near);
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().0.doc_id, "d1");

        let far = embedder.embed("완전히 다른 주제").await.unwrap();
        assert!(index.search(&far).is_none());
    }
}
