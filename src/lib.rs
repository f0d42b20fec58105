//! Multi-strategy response resolver for a bilingual portfolio chatbot.
//!
//! A query runs through four match strategies in fixed order — fuzzy phrase
//! lookup, rule-based intent classification, embedding similarity, and a
//! remote LLM fallback — over a JSON knowledge base loaded once per
//! session. Whatever matches is assembled into a localized, render-ready
//! response; if nothing does, a default responder takes over.

pub mod assembler;
pub mod embedding;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod llm;
pub mod locale;
pub mod phrase_index;
pub mod resolver;
pub mod response;

pub use error::{AssistantError, Result};
pub use locale::{Locale, LocalizedText};
pub use resolver::{ChatResolver, ResolverConfig};
pub use response::{FollowUpAction, ResponseTemplate, ResponseType, ResultCard, UiResponse};
