//! Knowledge base model and loader
//!
//! The knowledge base is a single JSON document describing the portfolio's
//! content: searchable documents, per-category response data, conversational
//! phrase pools, what-if scenarios, a navigation map, the default response,
//! and per-locale synonym tables. It is loaded once, cached for the
//! resolver's lifetime, and never mutated afterwards.
//!
//! Missing top-level fields default to empty collections so a sparse
//! document degrades to the default responder instead of failing resolution.
//! Only a fetch or parse failure of the whole document rejects the load.

use crate::embedding::{EmbeddingIndex, TextEmbedder};
use crate::error::{AssistantError, Result};
use crate::locale::{Locale, LocalizedText};
use crate::response::{FollowUpAction, ResponseTemplate};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// The loaded JSON document. Immutable after load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub search_documents: Vec<SearchDocument>,
    #[serde(default)]
    pub response_categories: HashMap<String, CategoryData>,
    #[serde(default)]
    pub interactive_phrases: InteractivePhrases,
    #[serde(default)]
    pub what_if_scenarios: HashMap<String, WhatIfScenario>,
    #[serde(default)]
    pub navigation_map: HashMap<String, NavigationTarget>,
    #[serde(default)]
    pub default_response: DefaultResponse,
    /// Locale code -> category -> keyword list, used by the Korean classifier.
    #[serde(default)]
    pub synonyms_map: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Unit indexed by both the phrase search and the embedding search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    #[serde(default)]
    pub query_phrases: Vec<String>,
    #[serde(default)]
    pub text_for_embedding: LocalizedText,
    pub response: ResponseTemplate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryData {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub ai_insight: LocalizedText,
    #[serde(default)]
    pub additional_info: LocalizedText,
    #[serde(default)]
    pub items: Vec<CategoryItem>,
    #[serde(default)]
    pub sub_sections: HashMap<String, SubSection>,
    #[serde(default)]
    pub follow_up_actions: Vec<FollowUpActionJson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryItem {
    pub id: String,
    pub title: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub meta: LocalizedText,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    /// Narrative Q&A pairs rendered as extra follow-up actions on detail view.
    #[serde(default)]
    pub qa: Vec<QaPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QaPair {
    pub question: LocalizedText,
    #[serde(default)]
    pub answer: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubSection {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub ai_insight: LocalizedText,
    #[serde(default)]
    pub items: Vec<CategoryItem>,
    #[serde(default)]
    pub follow_up_actions: Vec<FollowUpActionJson>,
}

/// Phrase pools for conversational replies plus the starter suggestions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractivePhrases {
    #[serde(default)]
    pub greeting: Vec<LocalizedText>,
    #[serde(default)]
    pub thank_you: Vec<LocalizedText>,
    #[serde(default)]
    pub empathetic: Vec<LocalizedText>,
    #[serde(default)]
    pub initial_suggestions: Vec<FollowUpActionJson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatIfScenario {
    pub question: LocalizedText,
    #[serde(default)]
    pub answer: LocalizedText,
    #[serde(default)]
    pub follow_up_actions: Vec<FollowUpActionJson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationTarget {
    pub page: String,
    #[serde(default)]
    pub url_fragment: Option<String>,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default)]
    pub insight: LocalizedText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultResponse {
    #[serde(default)]
    pub clarification_prompts: Vec<LocalizedText>,
    #[serde(default)]
    pub additional_info: LocalizedText,
    #[serde(rename = "followUpActions", default)]
    pub follow_up_actions: ActionGroup,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionGroup {
    #[serde(default)]
    pub actions: Vec<FollowUpActionJson>,
}

/// Follow-up action as stored in the knowledge base (labels still bilingual).
#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpActionJson {
    pub label: LocalizedText,
    #[serde(default)]
    pub query: Option<LocalizedText>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
}

impl FollowUpActionJson {
    pub fn resolve(&self, locale: Locale) -> FollowUpAction {
        FollowUpAction {
            label: self.label.resolve(locale).to_string(),
            query: self
                .query
                .as_ref()
                .map(|q| q.resolve(locale).to_string())
                .filter(|q| !q.is_empty()),
            action: self.action.clone(),
            target_id: self.target_id.clone(),
        }
    }
}

impl KnowledgeBase {
    pub fn category(&self, name: &str) -> Option<&CategoryData> {
        self.response_categories.get(name)
    }

    /// True if any item in the given category carries the tag.
    pub fn category_has_tag(&self, category: &str, tag: &str) -> bool {
        self.category(category)
            .map(|c| c.items.iter().any(|i| i.tags.iter().any(|t| t == tag)))
            .unwrap_or(false)
    }

    /// Keyword table for the given locale, if the document ships one.
    pub fn synonyms_for(&self, locale: Locale) -> Option<&HashMap<String, Vec<String>>> {
        self.synonyms_map.get(locale.code())
    }
}

/// Knowledge base plus the embedding index built from it at load time.
#[derive(Debug)]
pub struct LoadedKnowledge {
    pub base: KnowledgeBase,
    pub index: EmbeddingIndex,
}

/// Idempotent, coalescing loader.
///
/// Concurrent `load` calls share one in-flight fetch; repeated calls after a
/// successful load are no-ops. A failed load leaves the cell empty so the
/// caller can retry. The fetch counter exposes how many underlying reads
/// actually happened.
pub struct KnowledgeLoader {
    path: PathBuf,
    cell: OnceCell<Arc<LoadedKnowledge>>,
    fetch_count: AtomicUsize,
}

impl KnowledgeLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
            fetch_count: AtomicUsize::new(0),
        }
    }

    pub async fn load(
        &self,
        embedder: &TextEmbedder,
        locale: Locale,
    ) -> Result<Arc<LoadedKnowledge>> {
        self.cell
            .get_or_try_init(|| async {
                self.fetch_count.fetch_add(1, Ordering::SeqCst);
                let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                    AssistantError::KnowledgeBase(format!(
                        "Failed to read {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                let base: KnowledgeBase = serde_json::from_str(&contents).map_err(|e| {
                    AssistantError::KnowledgeBase(format!("Failed to parse knowledge base: {}", e))
                })?;
                let index =
                    EmbeddingIndex::build(embedder, &base.search_documents, locale).await;
                info!(
                    documents = base.search_documents.len(),
                    categories = base.response_categories.len(),
                    indexed = index.len(),
                    "Knowledge base loaded"
                );
                Ok(Arc::new(LoadedKnowledge { base, index }))
            })
            .await
            .cloned()
    }

    /// Already-loaded knowledge, if any. Never triggers a fetch.
    pub fn get(&self) -> Option<Arc<LoadedKnowledge>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of underlying reads performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}
