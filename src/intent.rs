//! Rule-based intent classifier
//!
//! Second strategy in the pipeline, locale-specific. English runs a
//! grammatical-pattern matcher: an interrogative frame combined with a fixed
//! table of topic phrases, plus dedicated conversational and what-if
//! patterns and the AI-projects probe. Korean runs keyword-substring
//! matching against the per-locale synonym table shipped in the knowledge
//! base (with a built-in fallback table).
//!
//! Returns a category tag, never rendered text.

use crate::knowledge::KnowledgeBase;
use crate::locale::Locale;
use crate::response::ResponseTemplate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref GREETING: Regex =
        Regex::new(r"(?i)^\s*(hi|hello|hey|yo|howdy|good\s+(morning|afternoon|evening))\b").unwrap();
    static ref THANKS: Regex = Regex::new(r"(?i)\b(thanks|thank\s+you|thx)\b").unwrap();
    static ref APOLOGY: Regex = Regex::new(r"(?i)\b(sorry|apologi[sz]e|my\s+bad)\b").unwrap();
    static ref WHAT_IF: Regex = Regex::new(r"(?i)\bwhat\s+if\b|\bhypothetical(ly)?\b").unwrap();
    static ref AI_PROJECTS: Regex = Regex::new(
        r"(?i)\b(ai|artificial\s+intelligence|machine\s+learning|ml)\b.*\bprojects?\b|\bprojects?\b.*\b(ai|artificial\s+intelligence|machine\s+learning|ml)\b"
    )
    .unwrap();
    static ref NAV_FRAME: Regex =
        Regex::new(r"(?i)\b(go\s+to|open|take\s+me\s+to|navigate\s+to|visit)\b").unwrap();
    static ref QUESTION_FRAME: Regex = Regex::new(
        r"(?i)^\s*(what|which|how|where|when|why|who|do|does|did|can|could|are|is|tell|show|describe|talk|give|list|any)\b"
    )
    .unwrap();

    /// Fixed topic-phrase table for the English matcher. Order is priority.
    static ref TOPIC_PATTERNS: Vec<(&'static str, Regex)> = vec![
        (
            "career",
            Regex::new(r"(?i)\bcareer\b|\bexperiences?\b|\bwork\s+history\b|\beducation\b|\bcompan(y|ies)\b|\bjobs?\b").unwrap(),
        ),
        (
            "skills",
            Regex::new(r"(?i)\bskills?\b|\btech(nical)?\s+stack\b|\btechnolog(y|ies)\b|\btools?\b").unwrap(),
        ),
        (
            "projects",
            Regex::new(r"(?i)\bprojects?\b|\bportfolio\b|\bwork\s+samples?\b|\bbuilt\b").unwrap(),
        ),
        (
            "connect",
            Regex::new(r"(?i)\bcontact\b|\bemail\b|\breach\s+(you|out)\b|\bconnect\b|\bhire\b|\bget\s+in\s+touch\b").unwrap(),
        ),
        (
            "about_me",
            Regex::new(r"(?i)\babout\s+(you|yourself)\b|\bwho\s+are\s+you\b|\bintroduce\s+yourself\b|\byour\s+background\b").unwrap(),
        ),
        (
            "tips",
            Regex::new(r"(?i)\btips?\b|\badvice\b|\brecommendations?\b").unwrap(),
        ),
        (
            "site_structure",
            Regex::new(r"(?i)\bsite\s*(map|structure)\b|\bsections?\s+of\s+(this|the)\s+site\b|\bwhat.+pages\b").unwrap(),
        ),
    ];

    /// Built-in Korean keyword table, used when the knowledge base does not
    /// ship a `synonyms_map` entry for `ko`. Order is priority.
    static ref KO_KEYWORDS: Vec<(&'static str, Vec<&'static str>)> = vec![
        ("greeting", vec!["안녕", "반가", "하이"]),
        ("thank_you", vec!["감사", "고마워", "고맙"]),
        ("empathetic", vec!["미안", "죄송"]),
        ("what_if", vec!["만약"]),
        ("projects", vec!["프로젝트", "작업물", "포트폴리오"]),
        ("skills", vec!["기술", "스킬", "스택"]),
        ("career", vec!["경력", "커리어", "이력", "학력", "회사"]),
        ("connect", vec!["연락", "이메일", "메일"]),
        ("about_me", vec!["소개", "누구"]),
    ];
}

/// Classifies a query into a response template, or `None` when no rule fires.
pub fn classify(kb: &KnowledgeBase, query: &str, locale: Locale) -> Option<ResponseTemplate> {
    let template = match locale {
        Locale::En => classify_en(kb, query),
        Locale::Ko => classify_ko(kb, query),
    };
    if let Some(ref t) = template {
        debug!(locale = locale.code(), template = ?t, "Intent classifier match");
    }
    template
}

fn classify_en(kb: &KnowledgeBase, query: &str) -> Option<ResponseTemplate> {
    if GREETING.is_match(query) {
        return Some(ResponseTemplate::Greeting);
    }
    if THANKS.is_match(query) {
        return Some(ResponseTemplate::ThankYou);
    }
    if APOLOGY.is_match(query) {
        return Some(ResponseTemplate::Empathetic);
    }
    if WHAT_IF.is_match(query) {
        return Some(ResponseTemplate::WhatIf { scenario: None });
    }
    if let Some(nav) = match_navigation(kb, query) {
        return Some(nav);
    }
    if AI_PROJECTS.is_match(query) {
        // The probe inspects the actual project tags: asking for AI work on
        // a portfolio with none gets the dedicated redirect response.
        if kb.category_has_tag("projects", "ai") {
            return Some(ResponseTemplate::from_category("projects", None));
        }
        return Some(ResponseTemplate::NoAiProjects);
    }

    // Topic phrases only count inside an interrogative frame or a short,
    // keyword-style query ("skills?", "your projects").
    let framed = QUESTION_FRAME.is_match(query) || query.split_whitespace().count() <= 4;
    if !framed {
        return None;
    }
    for (category, pattern) in TOPIC_PATTERNS.iter() {
        if pattern.is_match(query) {
            if *category == "career" {
                let sub_section = match_career_sub_section(kb, query);
                return Some(ResponseTemplate::Career {
                    sub_section,
                    item: None,
                });
            }
            return Some(ResponseTemplate::from_category(category, None));
        }
    }
    None
}

/// Navigation needs an explicit movement verb plus a known destination, so
/// "show me your projects" stays an informational query.
fn match_navigation(kb: &KnowledgeBase, query: &str) -> Option<ResponseTemplate> {
    if !NAV_FRAME.is_match(query) {
        return None;
    }
    let lowered = query.to_lowercase();
    for (key, target) in &kb.navigation_map {
        let label_en = target.label.resolve(Locale::En).to_lowercase();
        if lowered.contains(&key.to_lowercase())
            || (!label_en.is_empty() && lowered.contains(&label_en))
        {
            return Some(ResponseTemplate::Navigation {
                target_page: target.page.clone(),
                url_fragment: target.url_fragment.clone(),
            });
        }
    }
    None
}

fn match_career_sub_section(kb: &KnowledgeBase, query: &str) -> Option<String> {
    let lowered = query.to_lowercase();
    let career = kb.category("career")?;
    career
        .sub_sections
        .keys()
        .find(|key| lowered.contains(&key.to_lowercase()))
        .cloned()
}

fn classify_ko(kb: &KnowledgeBase, query: &str) -> Option<ResponseTemplate> {
    // Prefer the knowledge base's own synonym table; fall back to the
    // built-in keywords so conversational intents work on sparse documents.
    if let Some(table) = kb.synonyms_for(Locale::Ko) {
        let mut categories: Vec<&String> = table.keys().collect();
        categories.sort();
        // Conversational categories take priority over topics.
        categories.sort_by_key(|c| !is_conversational(c));
        for category in categories {
            if let Some(keywords) = table.get(category) {
                if keywords.iter().any(|k| !k.is_empty() && query.contains(k.as_str())) {
                    return Some(ResponseTemplate::from_category(category, None));
                }
            }
        }
    }
    for (category, keywords) in KO_KEYWORDS.iter() {
        if keywords.iter().any(|k| query.contains(k)) {
            return Some(ResponseTemplate::from_category(category, None));
        }
    }
    None
}

fn is_conversational(category: &str) -> bool {
    matches!(category, "greeting" | "thank_you" | "thanks" | "empathetic" | "apology")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        serde_json::from_value(serde_json::json!({
            "response_categories": {
                "projects": {
                    "items": [
                        {"id": "p1", "title": "Dashboard", "tags": ["data"]}
                    ]
                },
                "career": {
                    "sub_sections": {
                        "education": {"title": "Education"}
                    }
                }
            },
            "navigation_map": {
                "gallery": {"page": "gallery.html", "label": "Gallery"}
            },
            "synonyms_map": {
                "ko": {
                    "greeting": ["안녕"],
                    "projects": ["프로젝트"]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_english_greeting() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "hello there", Locale::En),
            Some(ResponseTemplate::Greeting)
        );
        assert_eq!(
            classify(&kb, "thanks a lot!", Locale::En),
            Some(ResponseTemplate::ThankYou)
        );
    }

    #[test]
    fn test_what_if() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "what if you had studied music?", Locale::En),
            Some(ResponseTemplate::WhatIf { scenario: None })
        );
    }

    #[test]
    fn test_ai_projects_probe() {
        let kb = sample_kb();
        // No project tagged "ai" -> dedicated redirect template.
        assert_eq!(
            classify(&kb, "do you have AI projects?", Locale::En),
            Some(ResponseTemplate::NoAiProjects)
        );
    }

    #[test]
    fn test_topic_requires_frame() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "what are your skills in backend work", Locale::En),
            Some(ResponseTemplate::from_category("skills", None))
        );
        // Long declarative sentence with a topic word buried inside: no match.
        assert_eq!(
            classify(
                &kb,
                "yesterday I was reading a long article mentioning skills somewhere in passing",
                Locale::En
            ),
            None
        );
    }

    #[test]
    fn test_career_sub_section() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "tell me about your education", Locale::En),
            Some(ResponseTemplate::Career {
                sub_section: Some("education".to_string()),
                item: None,
            })
        );
    }

    #[test]
    fn test_navigation_needs_verb() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "go to the gallery", Locale::En),
            Some(ResponseTemplate::Navigation {
                target_page: "gallery.html".to_string(),
                url_fragment: None,
            })
        );
        // No movement verb -> not navigation (falls to topic table / None).
        assert_ne!(
            classify(&kb, "what is in the gallery", Locale::En),
            Some(ResponseTemplate::Navigation {
                target_page: "gallery.html".to_string(),
                url_fragment: None,
            })
        );
    }

    #[test]
    fn test_korean_greeting() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "안녕", Locale::Ko),
            Some(ResponseTemplate::Greeting)
        );
    }

    #[test]
    fn test_korean_topic_from_synonyms() {
        let kb = sample_kb();
        assert_eq!(
            classify(&kb, "프로젝트 보여줘", Locale::Ko),
            Some(ResponseTemplate::from_category("projects", None))
        );
    }

    #[test]
    fn test_korean_builtin_fallback() {
        let kb: KnowledgeBase = serde_json::from_str("{}").unwrap();
        assert_eq!(
            classify(&kb, "감사합니다", Locale::Ko),
            Some(ResponseTemplate::ThankYou)
        );
    }

    #[test]
    fn test_no_match() {
        let kb = sample_kb();
        assert_eq!(classify(&kb, "zzz qqq www", Locale::En), None);
        assert_eq!(classify(&kb, "ㅁㄴㅇㄹ", Locale::Ko), None);
    }
}
