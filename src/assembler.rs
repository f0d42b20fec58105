//! Response assembler
//!
//! Converts a matched `ResponseTemplate` into the final, localized
//! `UiResponse`. Pure with respect to the knowledge base; the only
//! non-determinism is the pseudo-random pick from phrase pools.
//!
//! A template referencing a category absent from `response_categories`
//! degrades to the default responder with a warning, never an error.

use crate::knowledge::{CategoryData, KnowledgeBase};
use crate::locale::{Locale, LocalizedText};
use crate::response::{FollowUpAction, ResponseTemplate, ResponseType, ResultCard, UiResponse};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::warn;

pub fn assemble(
    kb: &KnowledgeBase,
    template: &ResponseTemplate,
    raw_query: &str,
    locale: Locale,
) -> UiResponse {
    let mut response = match template {
        ResponseTemplate::Greeting => conversational(kb, &kb.interactive_phrases.greeting, locale, builtin_greeting(locale)),
        ResponseTemplate::ThankYou => conversational(kb, &kb.interactive_phrases.thank_you, locale, builtin_thanks(locale)),
        ResponseTemplate::Empathetic => conversational(kb, &kb.interactive_phrases.empathetic, locale, builtin_empathy(locale)),
        ResponseTemplate::WhatIf { scenario } => what_if(kb, scenario.as_deref(), raw_query, locale),
        ResponseTemplate::Navigation {
            target_page,
            url_fragment,
        } => navigation(kb, target_page, url_fragment.as_deref(), locale),
        ResponseTemplate::NoAiProjects => no_ai_projects(locale),
        ResponseTemplate::Career { sub_section, item } => {
            category_view(kb, "career", item.as_deref(), sub_section.as_deref(), locale)
        }
        ResponseTemplate::AboutMe => category_view(kb, "about_me", None, None, locale),
        ResponseTemplate::Tips => category_view(kb, "tips", None, None, locale),
        ResponseTemplate::SiteStructure => category_view(kb, "site_structure", None, None, locale),
        ResponseTemplate::Connect => category_view(kb, "connect", None, None, locale),
        ResponseTemplate::Topic { category, item } => {
            category_view(kb, category, item.as_deref(), None, locale)
        }
        ResponseTemplate::Direct(resp) => (**resp).clone(),
    };
    response.follow_up_actions = dedup_actions(std::mem::take(&mut response.follow_up_actions));
    response
}

/// Clarification response used when no strategy matched (or a category was
/// missing). Prompt is picked pseudo-randomly from the document's pool.
pub fn default_response(kb: &KnowledgeBase, locale: Locale) -> UiResponse {
    let prompt = kb
        .default_response
        .clarification_prompts
        .choose(&mut rand::thread_rng())
        .map(|p| p.resolve(locale).to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| builtin_clarification(locale).to_string());

    let mut additional_info = kb
        .default_response
        .additional_info
        .resolve(locale)
        .to_string();
    if additional_info.is_empty() {
        additional_info = builtin_hint(locale).to_string();
    }

    let actions = kb
        .default_response
        .follow_up_actions
        .actions
        .iter()
        .map(|a| a.resolve(locale))
        .collect();

    UiResponse {
        ai_insight: prompt,
        results: Vec::new(),
        follow_up_actions: dedup_actions(actions),
        additional_info,
        response_type: ResponseType::Fallback,
        action: None,
        target_page: None,
        url_fragment: None,
    }
}

/// Hard-coded bilingual apology for when the knowledge base never loaded.
pub fn unavailable_response(locale: Locale) -> UiResponse {
    let text = match locale {
        Locale::En => "Sorry, the assistant is unavailable right now. Please try again in a moment.",
        Locale::Ko => "죄송합니다. 지금은 도우미를 사용할 수 없어요. 잠시 후 다시 시도해 주세요.",
    };
    UiResponse::insight(text, ResponseType::Fallback)
}

/// Removes structurally identical follow-up actions, keeping first
/// occurrence order.
pub fn dedup_actions(actions: Vec<FollowUpAction>) -> Vec<FollowUpAction> {
    let mut seen = HashSet::new();
    actions
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

fn conversational(
    kb: &KnowledgeBase,
    pool: &[LocalizedText],
    locale: Locale,
    fallback: &'static str,
) -> UiResponse {
    let text = pool
        .choose(&mut rand::thread_rng())
        .map(|p| p.resolve(locale).to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    let mut response = UiResponse::insight(text, ResponseType::Conversational);
    response.follow_up_actions = kb
        .interactive_phrases
        .initial_suggestions
        .iter()
        .map(|a| a.resolve(locale))
        .collect();
    response
}

fn what_if(
    kb: &KnowledgeBase,
    scenario_key: Option<&str>,
    raw_query: &str,
    locale: Locale,
) -> UiResponse {
    if kb.what_if_scenarios.is_empty() {
        warn!("What-if template matched but no scenarios in knowledge base");
        return default_response(kb, locale);
    }

    // Explicit key first, then the scenario whose question overlaps the
    // query the most, then a stable first-by-key fallback.
    let scenario = scenario_key
        .and_then(|k| kb.what_if_scenarios.get(k))
        .or_else(|| {
            let lowered = raw_query.to_lowercase();
            kb.what_if_scenarios
                .values()
                .map(|s| {
                    let question = s.question.resolve(locale).to_lowercase();
                    let overlap = question
                        .split_whitespace()
                        .filter(|w| w.chars().count() > 2 && lowered.contains(*w))
                        .count();
                    (overlap, s)
                })
                .filter(|(overlap, _)| *overlap > 0)
                .max_by_key(|(overlap, _)| *overlap)
                .map(|(_, s)| s)
        })
        .or_else(|| {
            let mut keys: Vec<&String> = kb.what_if_scenarios.keys().collect();
            keys.sort();
            keys.first().and_then(|k| kb.what_if_scenarios.get(*k))
        });

    match scenario {
        Some(s) => {
            let mut response =
                UiResponse::insight(s.answer.resolve(locale), ResponseType::Informative);
            response.additional_info = s.question.resolve(locale).to_string();
            let actions = if s.follow_up_actions.is_empty() {
                &kb.default_response.follow_up_actions.actions
            } else {
                &s.follow_up_actions
            };
            response.follow_up_actions = actions.iter().map(|a| a.resolve(locale)).collect();
            response
        }
        None => default_response(kb, locale),
    }
}

fn navigation(
    kb: &KnowledgeBase,
    target_page: &str,
    url_fragment: Option<&str>,
    locale: Locale,
) -> UiResponse {
    let target = kb.navigation_map.values().find(|t| t.page == target_page);
    let insight = target
        .map(|t| t.insight.resolve(locale))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match locale {
            Locale::En => format!("Taking you to {}.", target_page),
            Locale::Ko => format!("{} 페이지로 이동할게요.", target_page),
        });

    let mut response = UiResponse::insight(insight, ResponseType::Navigation);
    response.action = Some("navigate".to_string());
    response.target_page = Some(target_page.to_string());
    response.url_fragment = url_fragment
        .map(str::to_string)
        .or_else(|| target.and_then(|t| t.url_fragment.clone()));
    response
}

/// Redirect for AI-project questions on a portfolio with no AI work.
/// The three suggestions are fixed by design.
fn no_ai_projects(locale: Locale) -> UiResponse {
    let (insight, info, suggestions) = match locale {
        Locale::En => (
            "I haven't shipped AI projects yet, but the portfolio covers plenty of related ground.",
            "Here are some directions you might like instead.",
            [
                ("Data analysis projects", "show me your data analysis projects"),
                ("Problem-solving stories", "tell me about a problem you solved"),
                ("Main projects", "show me your main projects"),
            ],
        ),
        Locale::Ko => (
            "아직 AI 프로젝트는 없지만, 관련된 작업은 많이 있어요.",
            "대신 이런 주제는 어떠세요?",
            [
                ("데이터 분석 프로젝트", "데이터 분석 프로젝트 보여줘"),
                ("문제 해결 이야기", "해결한 문제를 알려줘"),
                ("주요 프로젝트", "주요 프로젝트 보여줘"),
            ],
        ),
    };
    let mut response = UiResponse::insight(insight, ResponseType::Informative);
    response.additional_info = info.to_string();
    response.follow_up_actions = suggestions
        .iter()
        .map(|(label, query)| FollowUpAction::query(*label, *query))
        .collect();
    response
}

fn category_view(
    kb: &KnowledgeBase,
    category: &str,
    item_id: Option<&str>,
    sub_section: Option<&str>,
    locale: Locale,
) -> UiResponse {
    let data = match kb.category(category) {
        Some(data) => data,
        None => {
            warn!(category, "Matched category missing from response_categories");
            return default_response(kb, locale);
        }
    };

    if let Some(sub_key) = sub_section {
        if let Some(sub) = data.sub_sections.get(sub_key) {
            return sub_section_view(data, sub_key, sub, kb, locale);
        }
        warn!(category, sub_section = sub_key, "Unknown sub-section, rendering overview");
    }

    if let Some(id) = item_id {
        if let Some(item) = data.items.iter().find(|i| i.id == id) {
            return item_detail_view(data, item, locale);
        }
        warn!(category, item = id, "Unknown item id, rendering overview");
    }

    overview_view(data, locale)
}

fn overview_view(data: &CategoryData, locale: Locale) -> UiResponse {
    let mut insight = data.ai_insight.resolve(locale).to_string();
    if insight.is_empty() {
        insight = data.title.resolve(locale).to_string();
    }
    UiResponse {
        ai_insight: insight,
        results: data.items.iter().map(|i| item_card(i, locale)).collect(),
        follow_up_actions: data
            .follow_up_actions
            .iter()
            .map(|a| a.resolve(locale))
            .collect(),
        additional_info: data.additional_info.resolve(locale).to_string(),
        response_type: ResponseType::Informative,
        action: None,
        target_page: None,
        url_fragment: None,
    }
}

/// Detail view for one item: its card plus the narrative Q&A pairs exposed
/// as extra follow-up actions.
fn item_detail_view(
    data: &CategoryData,
    item: &crate::knowledge::CategoryItem,
    locale: Locale,
) -> UiResponse {
    let mut insight = item.description.resolve(locale).to_string();
    if insight.is_empty() {
        insight = item.title.resolve(locale).to_string();
    }

    let mut actions: Vec<FollowUpAction> = data
        .follow_up_actions
        .iter()
        .map(|a| a.resolve(locale))
        .collect();
    for qa in &item.qa {
        let question = qa.question.resolve(locale);
        if !question.is_empty() {
            actions.push(FollowUpAction::query(question, question));
        }
    }

    UiResponse {
        ai_insight: insight,
        results: vec![item_card(item, locale)],
        follow_up_actions: actions,
        additional_info: data.additional_info.resolve(locale).to_string(),
        response_type: ResponseType::Informative,
        action: None,
        target_page: None,
        url_fragment: None,
    }
}

fn sub_section_view(
    data: &CategoryData,
    sub_key: &str,
    sub: &crate::knowledge::SubSection,
    kb: &KnowledgeBase,
    locale: Locale,
) -> UiResponse {
    let mut insight = sub.ai_insight.resolve(locale).to_string();
    if insight.is_empty() {
        insight = sub.title.resolve(locale).to_string();
    }
    if insight.is_empty() {
        warn!(sub_section = sub_key, "Empty sub-section");
        return default_response(kb, locale);
    }
    let actions = if sub.follow_up_actions.is_empty() {
        &data.follow_up_actions
    } else {
        &sub.follow_up_actions
    };
    UiResponse {
        ai_insight: insight,
        results: sub.items.iter().map(|i| item_card(i, locale)).collect(),
        follow_up_actions: actions.iter().map(|a| a.resolve(locale)).collect(),
        additional_info: data.additional_info.resolve(locale).to_string(),
        response_type: ResponseType::Informative,
        action: None,
        target_page: None,
        url_fragment: None,
    }
}

fn item_card(item: &crate::knowledge::CategoryItem, locale: Locale) -> ResultCard {
    ResultCard {
        title: item.title.resolve(locale).to_string(),
        description: item.description.resolve(locale).to_string(),
        meta: Some(item.meta.resolve(locale).to_string()).filter(|m| !m.is_empty()),
        target_id: item.target_id.clone(),
    }
}

fn builtin_greeting(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Hi! Ask me anything about this portfolio.",
        Locale::Ko => "안녕하세요! 포트폴리오에 대해 무엇이든 물어보세요.",
    }
}

fn builtin_thanks(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "You're welcome! Anything else you'd like to explore?",
        Locale::Ko => "천만에요! 더 궁금한 게 있으신가요?",
    }
}

fn builtin_empathy(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "No worries at all. What would you like to know?",
        Locale::Ko => "괜찮아요. 어떤 것이 궁금하신가요?",
    }
}

fn builtin_clarification(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "I'm not sure I caught that. Could you rephrase your question?",
        Locale::Ko => "질문을 잘 이해하지 못했어요. 다시 한번 말씀해 주시겠어요?",
    }
}

fn builtin_hint(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "You can ask about projects, skills, career, or how to get in touch.",
        Locale::Ko => "프로젝트, 기술, 경력, 연락 방법에 대해 물어볼 수 있어요.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        serde_json::from_value(serde_json::json!({
            "response_categories": {
                "projects": {
                    "ai_insight": {"en": "Here is my work.", "ko": "제 작업물입니다."},
                    "items": [
                        {
                            "id": "p1",
                            "title": {"en": "Dashboard", "ko": "대시보드"},
                            "description": {"en": "Analytics dashboard.", "ko": "분석 대시보드."},
                            "meta": "2024",
                            "qa": [
                                {"question": {"en": "Why this stack?"}, "answer": {"en": "It fit."}}
                            ]
                        },
                        {"id": "p2", "title": "Pipeline", "description": "Batch ETL."}
                    ],
                    "follow_up_actions": [
                        {"label": {"en": "All projects"}, "query": {"en": "show me your projects"}}
                    ]
                }
            },
            "default_response": {
                "clarification_prompts": [{"en": "Could you say that differently?"}],
                "followUpActions": {
                    "actions": [
                        {"label": {"en": "Projects"}, "query": {"en": "show me your projects"}}
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_overview_renders_all_items() {
        let kb = sample_kb();
        let tpl = ResponseTemplate::from_category("projects", None);
        let resp = assemble(&kb, &tpl, "projects", Locale::En);
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.ai_insight, "Here is my work.");
        assert_eq!(resp.response_type, ResponseType::Informative);
    }

    #[test]
    fn test_item_detail_adds_qa_follow_ups() {
        let kb = sample_kb();
        let tpl = ResponseTemplate::from_category("projects", Some("p1".to_string()));
        let resp = assemble(&kb, &tpl, "dashboard", Locale::En);
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].title, "Dashboard");
        assert!(resp
            .follow_up_actions
            .iter()
            .any(|a| a.label == "Why this stack?"));
    }

    #[test]
    fn test_missing_category_degrades_to_default() {
        let kb = sample_kb();
        let tpl = ResponseTemplate::from_category("nonexistent", None);
        let resp = assemble(&kb, &tpl, "whatever", Locale::En);
        assert_eq!(resp.response_type, ResponseType::Fallback);
        assert!(!resp.follow_up_actions.is_empty());
    }

    #[test]
    fn test_no_ai_projects_three_fixed_suggestions() {
        let kb = sample_kb();
        let resp = assemble(&kb, &ResponseTemplate::NoAiProjects, "ai projects?", Locale::En);
        let labels: Vec<&str> = resp
            .follow_up_actions
            .iter()
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Data analysis projects",
                "Problem-solving stories",
                "Main projects"
            ]
        );
    }

    #[test]
    fn test_dedup_by_structural_equality() {
        let a = FollowUpAction::query("Projects", "show me your projects");
        let b = FollowUpAction::query("Projects", "show me your projects");
        let c = FollowUpAction::query("Skills", "what are your skills");
        let deduped = dedup_actions(vec![a.clone(), b, c.clone()]);
        assert_eq!(deduped, vec![a, c]);
    }

    #[test]
    fn test_default_response_shape() {
        let kb = sample_kb();
        let resp = default_response(&kb, Locale::En);
        assert!(!resp.ai_insight.is_empty());
        assert!(!resp.additional_info.is_empty());
        assert_eq!(resp.follow_up_actions.len(), 1);
    }

    #[test]
    fn test_unavailable_is_localized() {
        assert!(unavailable_response(Locale::Ko).ai_insight.contains("죄송"));
        assert!(unavailable_response(Locale::En).follow_up_actions.is_empty());
    }

    #[test]
    fn test_korean_localization_never_leaks_maps() {
        let kb = sample_kb();
        let tpl = ResponseTemplate::from_category("projects", None);
        let resp = assemble(&kb, &tpl, "프로젝트", Locale::Ko);
        assert_eq!(resp.ai_insight, "제 작업물입니다.");
        // p2 has no Korean text: falls back to English, never a map dump.
        assert_eq!(resp.results[1].title, "Pipeline");
    }
}
