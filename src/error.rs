use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
