use std::collections::HashMap;

use crate::models::LanguageBreakdown;

const BASE_SCORE: i32 = 50;
const MARKDOWN_BONUS: i32 = 30;
const COMMENTED_LANGUAGE_BONUS: i32 = 20;

/// General-purpose languages whose presence suggests inline documentation.
const COMMENTED_LANGUAGES: &[&str] = &["JavaScript", "TypeScript", "Python", "Java", "C++"];

/// Converts a language -> bytes map into a breakdown sorted by size.
pub fn language_breakdown(bytes_by_language: &HashMap<String, u64>) -> Vec<LanguageBreakdown> {
    let total: u64 = bytes_by_language.values().sum();

    let mut languages: Vec<_> = bytes_by_language
        .iter()
        .map(|(name, &bytes)| LanguageBreakdown {
            name: name.clone(),
            bytes,
            percentage: percentage(bytes, total),
        })
        .collect();

    sort_by_size(&mut languages);
    languages
}

/// `round(bytes / total * 100)`, 0 when there is nothing to divide by.
pub fn percentage(bytes: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((bytes as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8
}

pub(crate) fn sort_by_size(languages: &mut [LanguageBreakdown]) {
    languages.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.name.cmp(&b.name)));
}

/// Scores documentation from the language mix of a repository.
#[derive(Debug, Clone, Default)]
pub struct DocumentationScorer;

impl DocumentationScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, languages: &[LanguageBreakdown]) -> u8 {
        let mut score = BASE_SCORE;

        if languages.iter().any(|lang| lang.name == "Markdown") {
            score += MARKDOWN_BONUS;
        }
        if languages
            .iter()
            .any(|lang| COMMENTED_LANGUAGES.contains(&lang.name.as_str()))
        {
            score += COMMENTED_LANGUAGE_BONUS;
        }

        score.clamp(0, 100) as u8
    }
}
