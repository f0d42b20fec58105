//! Locale and bilingual text resolution
//!
//! The knowledge base carries text either as a plain string or as an
//! `{en, ko}` map. Resolution always prefers the active locale, falls back
//! to English, and finally to the empty string.

use serde::{Deserialize, Serialize};

/// Active display language for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    /// Parses a locale code. Unsupported codes resolve to English.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "ko" | "kr" | "ko-kr" => Locale::Ko,
            _ => Locale::En,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ko => "ko",
        }
    }
}

/// Text that is either a plain string or a bilingual `{en, ko}` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Bilingual {
        #[serde(default)]
        en: Option<String>,
        #[serde(default)]
        ko: Option<String>,
    },
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl LocalizedText {
    /// Resolves to the active locale, falling back to English, then "".
    pub fn resolve(&self, locale: Locale) -> &str {
        match self {
            LocalizedText::Plain(s) => s,
            LocalizedText::Bilingual { en, ko } => {
                let preferred = match locale {
                    Locale::En => en.as_deref(),
                    Locale::Ko => ko.as_deref(),
                };
                preferred
                    .filter(|s| !s.is_empty())
                    .or(en.as_deref())
                    .unwrap_or("")
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LocalizedText::Plain(s) => s.is_empty(),
            LocalizedText::Bilingual { en, ko } => {
                en.as_deref().map_or(true, str::is_empty)
                    && ko.as_deref().map_or(true, str::is_empty)
            }
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        LocalizedText::Plain(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("ko"), Locale::Ko);
        assert_eq!(Locale::parse("KO-KR"), Locale::Ko);
        assert_eq!(Locale::parse("en"), Locale::En);
        // Unsupported locales fall back to English
        assert_eq!(Locale::parse("fr"), Locale::En);
    }

    #[test]
    fn test_resolve_prefers_active_locale() {
        let text: LocalizedText = serde_json::from_str(r#"{"en": "A", "ko": "B"}"#).unwrap();
        assert_eq!(text.resolve(Locale::Ko), "B");
        assert_eq!(text.resolve(Locale::En), "A");
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        let text: LocalizedText = serde_json::from_str(r#"{"en": "A"}"#).unwrap();
        assert_eq!(text.resolve(Locale::Ko), "A");

        let empty: LocalizedText = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(empty.resolve(Locale::Ko), "");
    }

    #[test]
    fn test_plain_string_shape() {
        let text: LocalizedText = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(text.resolve(Locale::Ko), "hello");
    }
}
