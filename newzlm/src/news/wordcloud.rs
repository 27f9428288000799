use serde::Serialize;
use std::collections::HashMap;

use super::{HackerNewsItem, NewsArticle};

const MAX_WORDS: usize = 20;

const ARTICLE_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "must", "can", "this", "that", "these", "those",
];

const STORY_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordWeight {
    pub text: String,
    pub value: usize,
}

/// Most frequent words across headlines, descriptions and story titles.
///
/// Only all-lowercase ASCII words of three or more letters count. Ties keep the order in
/// which words were first seen.
pub fn word_cloud(articles: &[NewsArticle], stories: &[HackerNewsItem]) -> Vec<WordWeight> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    let mut tally = |text: &str, stop_words: &[&str]| {
        for word in words(&text.to_lowercase()) {
            if stop_words.contains(&word) {
                continue;
            }
            let count = counts.entry(word.to_string()).or_insert_with(|| {
                order.push(word.to_string());
                0
            });
            *count += 1;
        }
    };

    for article in articles {
        tally(&format!("{} {}", article.title, article.description), ARTICLE_STOP_WORDS);
    }
    for story in stories {
        tally(&story.title, STORY_STOP_WORDS);
    }

    let mut weights: Vec<WordWeight> = order
        .into_iter()
        .map(|word| {
            let value = counts[&word];
            WordWeight {
                text: capitalize(&word),
                value,
            }
        })
        .collect();

    // stable: equal counts stay in first-seen order
    weights.sort_by(|a, b| b.value.cmp(&a.value));
    weights.truncate(MAX_WORDS);
    weights
}

/// Word tokens: maximal runs of `[a-z0-9_]`, kept when purely `[a-z]{3,}`.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| w.len() >= 3 && w.bytes().all(|b| b.is_ascii_lowercase()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
