//! Response shapes
//!
//! `ResponseTemplate` is the intermediate, unlocalized description of *what*
//! matched a query. The knowledge base stores it as a loose
//! `{category, item?, subSection?, target_page?}` record; it is converted
//! into a tagged union here so the assembler can match exhaustively instead
//! of probing optional fields.
//!
//! `UiResponse` is the final, localized, render-ready object. Every textual
//! field reaching it has already been resolved to the session locale.

use serde::{Deserialize, Serialize};

/// Raw JSON shape of a response template as stored in the knowledge base.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TemplateJson {
    pub category: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default, rename = "subSection")]
    pub sub_section: Option<String>,
    #[serde(default)]
    pub target_page: Option<String>,
    #[serde(default)]
    pub url_fragment: Option<String>,
}

/// What matched a query, keyed by category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "TemplateJson")]
pub enum ResponseTemplate {
    Greeting,
    ThankYou,
    Empathetic,
    WhatIf {
        scenario: Option<String>,
    },
    Navigation {
        target_page: String,
        url_fragment: Option<String>,
    },
    NoAiProjects,
    Career {
        sub_section: Option<String>,
        item: Option<String>,
    },
    AboutMe,
    Tips,
    SiteStructure,
    Connect,
    /// Generic knowledge-base category, optionally narrowed to one item.
    Topic {
        category: String,
        item: Option<String>,
    },
    /// Pre-assembled response (produced by the LLM strategy, never stored).
    Direct(Box<UiResponse>),
}

impl From<TemplateJson> for ResponseTemplate {
    fn from(raw: TemplateJson) -> Self {
        match raw.category.as_str() {
            "greeting" => ResponseTemplate::Greeting,
            "thank_you" | "thanks" => ResponseTemplate::ThankYou,
            "empathetic" | "apology" => ResponseTemplate::Empathetic,
            "what_if" => ResponseTemplate::WhatIf { scenario: raw.item },
            "navigation" => ResponseTemplate::Navigation {
                target_page: raw.target_page.unwrap_or_default(),
                url_fragment: raw.url_fragment,
            },
            "no_ai_projects" => ResponseTemplate::NoAiProjects,
            "career" => ResponseTemplate::Career {
                sub_section: raw.sub_section,
                item: raw.item,
            },
            "about_me" => ResponseTemplate::AboutMe,
            "tips" => ResponseTemplate::Tips,
            "site_structure" => ResponseTemplate::SiteStructure,
            "connect" => ResponseTemplate::Connect,
            _ => ResponseTemplate::Topic {
                category: raw.category,
                item: raw.item,
            },
        }
    }
}

impl ResponseTemplate {
    /// Builds a template from a bare category tag, as produced by the
    /// rule-based classifier.
    pub fn from_category(category: &str, item: Option<String>) -> Self {
        ResponseTemplate::from(TemplateJson {
            category: category.to_string(),
            item,
            sub_section: None,
            target_page: None,
            url_fragment: None,
        })
    }
}

/// Kind of response, consumed by the presentation layer for rendering hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Informative,
    Conversational,
    Navigation,
    Generated,
    Fallback,
}

impl ResponseType {
    fn generated() -> Self {
        ResponseType::Generated
    }
}

/// A single result card rendered in the chat panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCard {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// A suggested follow-up chip. Structural equality drives deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowUpAction {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl FollowUpAction {
    pub fn query(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: Some(query.into()),
            action: None,
            target_id: None,
        }
    }
}

/// The assembled, localized output. Field names mirror the wire shape the
/// presentation layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiResponse {
    #[serde(rename = "aiInsight", default)]
    pub ai_insight: String,
    #[serde(default)]
    pub results: Vec<ResultCard>,
    #[serde(rename = "followUpActions", default)]
    pub follow_up_actions: Vec<FollowUpAction>,
    #[serde(rename = "additionalInfo", default)]
    pub additional_info: String,
    #[serde(default = "ResponseType::generated")]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_fragment: Option<String>,
}

impl UiResponse {
    /// A text-only response with no cards or follow-ups.
    pub fn insight(text: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            ai_insight: text.into(),
            results: Vec::new(),
            follow_up_actions: Vec::new(),
            additional_info: String::new(),
            response_type,
            action: None,
            target_page: None,
            url_fragment: None,
        }
    }

    /// True when nothing renderable is present.
    pub fn is_blank(&self) -> bool {
        self.ai_insight.is_empty()
            && self.results.is_empty()
            && self.follow_up_actions.is_empty()
            && self.additional_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_from_tagged_json() {
        let tpl: ResponseTemplate =
            serde_json::from_str(r#"{"category": "greeting"}"#).unwrap();
        assert_eq!(tpl, ResponseTemplate::Greeting);

        let tpl: ResponseTemplate =
            serde_json::from_str(r#"{"category": "career", "subSection": "education"}"#).unwrap();
        assert_eq!(
            tpl,
            ResponseTemplate::Career {
                sub_section: Some("education".to_string()),
                item: None,
            }
        );

        let tpl: ResponseTemplate = serde_json::from_str(
            r##"{"category": "navigation", "target_page": "gallery", "url_fragment": "#top"}"##,
        )
        .unwrap();
        assert_eq!(
            tpl,
            ResponseTemplate::Navigation {
                target_page: "gallery".to_string(),
                url_fragment: Some("#top".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_category_becomes_topic() {
        let tpl: ResponseTemplate =
            serde_json::from_str(r#"{"category": "projects", "item": "p1"}"#).unwrap();
        assert_eq!(
            tpl,
            ResponseTemplate::Topic {
                category: "projects".to_string(),
                item: Some("p1".to_string()),
            }
        );
    }

    #[test]
    fn test_ui_response_wire_names() {
        let resp = UiResponse::insight("hello", ResponseType::Conversational);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("aiInsight").is_some());
        assert!(json.get("followUpActions").is_some());
        assert!(json.get("additionalInfo").is_some());
        assert_eq!(json["response_type"], "conversational");
    }
}
