//! Chat resolver
//!
//! The per-session context object: owns the knowledge loader, the embedder,
//! the LLM client, and the locale. A query runs the four match strategies
//! in strict order — phrase index, rule-based intents, embedding
//! similarity, remote LLM — and the first non-null match wins. When every
//! strategy misses, the default responder answers. `respond` always
//! resolves to a `UiResponse`; a knowledge base that never loaded yields
//! the hard-coded bilingual apology instead of an error.
//!
//! Queries are independent and stateless; the only shared state is the
//! cached knowledge base and the session locale.

use crate::assembler;
use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::intent;
use crate::knowledge::{KnowledgeLoader, LoadedKnowledge};
use crate::llm::GenerativeClient;
use crate::locale::Locale;
use crate::phrase_index::PhraseMatcher;
use crate::response::{FollowUpAction, ResponseTemplate, UiResponse};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ResolverConfig {
    pub knowledge_path: PathBuf,
    pub locale: Locale,
    pub llm_api_key: Option<String>,
    pub embedding_api_key: Option<String>,
}

impl ResolverConfig {
    pub fn new(knowledge_path: impl Into<PathBuf>) -> Self {
        Self {
            knowledge_path: knowledge_path.into(),
            locale: Locale::En,
            llm_api_key: None,
            embedding_api_key: None,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    pub fn with_embedding_api_key(mut self, key: impl Into<String>) -> Self {
        self.embedding_api_key = Some(key.into());
        self
    }
}

pub struct ChatResolver {
    loader: KnowledgeLoader,
    embedder: TextEmbedder,
    llm: GenerativeClient,
    matcher: PhraseMatcher,
    locale: Locale,
}

impl ChatResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let embedder = match config.embedding_api_key {
            Some(key) if !key.is_empty() => TextEmbedder::remote(key),
            _ => TextEmbedder::local(),
        };
        Self {
            loader: KnowledgeLoader::new(config.knowledge_path),
            embedder,
            llm: GenerativeClient::new(config.llm_api_key.unwrap_or_default()),
            matcher: PhraseMatcher::default(),
            locale: config.locale,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Sets the session display language. The embedding index built at load
    /// time is not rebuilt.
    pub fn set_language(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Loads and caches the knowledge base. Idempotent; concurrent calls
    /// share one in-flight fetch. Rejects on fetch/parse failure.
    pub async fn load_knowledge(&self) -> Result<()> {
        self.loader.load(&self.embedder, self.locale).await.map(|_| ())
    }

    /// Number of underlying knowledge-base reads performed so far.
    pub fn knowledge_fetch_count(&self) -> usize {
        self.loader.fetch_count()
    }

    /// Localized starter suggestions shown before the first query.
    pub async fn initial_suggestions(&self) -> Result<Vec<FollowUpAction>> {
        let loaded = self.loader.load(&self.embedder, self.locale).await?;
        let kb = &loaded.base;
        let source = if kb.interactive_phrases.initial_suggestions.is_empty() {
            &kb.default_response.follow_up_actions.actions
        } else {
            &kb.interactive_phrases.initial_suggestions
        };
        let actions = source.iter().map(|a| a.resolve(self.locale)).collect();
        Ok(assembler::dedup_actions(actions))
    }

    /// Runs the match pipeline only, without assembly. Mostly useful for
    /// inspecting which strategy won.
    pub async fn resolve(&self, query: &str) -> Result<Option<ResponseTemplate>> {
        let loaded = self.loader.load(&self.embedder, self.locale).await?;
        Ok(self.resolve_with(&loaded, query).await)
    }

    /// Answers one query. Never fails: load failures produce the bilingual
    /// apology, strategy misses produce the default responder.
    pub async fn respond(&self, query: &str) -> UiResponse {
        let loaded = match self.loader.load(&self.embedder, self.locale).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Knowledge base unavailable: {}", e);
                return assembler::unavailable_response(self.locale);
            }
        };

        let response = match self.resolve_with(&loaded, query).await {
            Some(template) => assembler::assemble(&loaded.base, &template, query, self.locale),
            None => assembler::default_response(&loaded.base, self.locale),
        };

        // Guarantee something renderable reaches the UI.
        if response.is_blank() {
            warn!("Assembled a blank response, falling back to default");
            return assembler::default_response(&loaded.base, self.locale);
        }
        response
    }

    async fn resolve_with(
        &self,
        loaded: &Arc<LoadedKnowledge>,
        query: &str,
    ) -> Option<ResponseTemplate> {
        let kb = &loaded.base;

        if let Some(template) = self.matcher.search(kb, query) {
            info!("Resolved via phrase index");
            return Some(template);
        }

        if let Some(template) = intent::classify(kb, query, self.locale) {
            info!("Resolved via intent classifier");
            return Some(template);
        }

        // Embedding failures are swallowed so the pipeline always reaches
        // the LLM fallback or the default responder.
        match self.embedder.embed(query).await {
            Ok(vector) => {
                if let Some((entry, score)) = loaded.index.search(&vector) {
                    info!(doc_id = %entry.doc_id, score, "Resolved via embedding similarity");
                    return Some(entry.template.clone());
                }
            }
            Err(e) => {
                debug!("Query embedding failed: {}", e);
            }
        }

        if let Some(response) = self.llm.generate(query, self.locale).await {
            info!("Resolved via LLM fallback");
            return Some(ResponseTemplate::Direct(Box::new(response)));
        }

        None
    }
}
