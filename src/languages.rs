use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Languages a mentor can mentor in or a mentee can work in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fi,
    Sv,
    Es,
    Pt,
    Zh,
    Hi,
    Ar,
    Fr,
    Ru,
    De,
    It,
    Ja,
    Ko,
    Nl,
    Tr,
    Pl,
    Cs,
    Uk,
    Fa,
    So,
}

impl Language {
    pub const ALL: [Language; 21] = [
        Language::En,
        Language::Fi,
        Language::Sv,
        Language::Es,
        Language::Pt,
        Language::Zh,
        Language::Hi,
        Language::Ar,
        Language::Fr,
        Language::Ru,
        Language::De,
        Language::It,
        Language::Ja,
        Language::Ko,
        Language::Nl,
        Language::Tr,
        Language::Pl,
        Language::Cs,
        Language::Uk,
        Language::Fa,
        Language::So,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fi => "fi",
            Language::Sv => "sv",
            Language::Es => "es",
            Language::Pt => "pt",
            Language::Zh => "zh",
            Language::Hi => "hi",
            Language::Ar => "ar",
            Language::Fr => "fr",
            Language::Ru => "ru",
            Language::De => "de",
            Language::It => "it",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Nl => "nl",
            Language::Tr => "tr",
            Language::Pl => "pl",
            Language::Cs => "cs",
            Language::Uk => "uk",
            Language::Fa => "fa",
            Language::So => "so",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fi => "Finnish",
            Language::Sv => "Swedish",
            Language::Es => "Spanish (Español)",
            Language::Pt => "Portuguese (Português)",
            Language::Zh => "Chinese (Mandarim)",
            Language::Hi => "Hindi",
            Language::Ar => "Arabic (العربية)",
            Language::Fr => "French (Français)",
            Language::Ru => "Russian (Русский)",
            Language::De => "German (Deutsch)",
            Language::It => "Italian (Italiano)",
            Language::Ja => "Japanese (日本語)",
            Language::Ko => "Korean (한국어)",
            Language::Nl => "Dutch (Nederlands)",
            Language::Tr => "Turkish (Türkçe)",
            Language::Pl => "Polish (Polski)",
            Language::Cs => "Czech (Čeština)",
            Language::Uk => "Ukrainian (Українська)",
            Language::Fa => "Farsi (Persian/Dari)",
            Language::So => "Somali",
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| AppError::validation(format!("Unknown language code: {}", s.trim())))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of languages; first occurrence wins on duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Language>", into = "Vec<Language>")]
pub struct LanguageSet(Vec<Language>);

impl LanguageSet {
    /// Parses user-supplied codes, ignoring blanks.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self, AppError> {
        let langs = codes
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !c.trim().is_empty())
            .map(str::parse::<Language>)
            .collect::<Result<Vec<Language>, _>>()?;
        Ok(Self::from(langs))
    }

    /// Reads the stored column; codes no longer known are dropped.
    pub fn from_stored(codes: &[String]) -> Self {
        Self::from(
            codes
                .iter()
                .filter_map(|c| c.parse::<Language>().ok())
                .collect::<Vec<Language>>(),
        )
    }

    pub fn to_codes(&self) -> Vec<String> {
        self.0.iter().map(|l| l.code().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Language> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined display names, or "Not specified".
    pub fn display(&self) -> String {
        if self.0.is_empty() {
            return "Not specified".to_string();
        }
        self.0.iter().map(|l| l.name()).collect::<Vec<_>>().join(", ")
    }
}

impl From<Vec<Language>> for LanguageSet {
    fn from(langs: Vec<Language>) -> Self {
        let mut out: Vec<Language> = Vec::with_capacity(langs.len());
        for l in langs {
            if !out.contains(&l) {
                out.push(l);
            }
        }
        Self(out)
    }
}

impl From<LanguageSet> for Vec<Language> {
    fn from(set: LanguageSet) -> Self {
        set.0
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageChoice {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn choices() -> Vec<LanguageChoice> {
    Language::ALL
        .into_iter()
        .map(|l| LanguageChoice {
            code: l.code(),
            name: l.name(),
        })
        .collect()
}
