use chrono::{Duration, Utc};

use super::{placeholder_image, NewsArticle, SourceName};

/// Fixed articles shown when no news provider is reachable.
/// Timestamps are spaced one hour apart, newest first.
pub fn sample_articles() -> Vec<NewsArticle> {
    let entries = [
        (
            "AI Revolution Transforms Central Asian Tech Startups",
            "Kazakhstan and Uzbekistan lead the region in AI adoption for business transformation.",
            "https://example.com/ai-central-asia",
            "Tech Central Asia",
            "Technology",
        ),
        (
            "Digital Education Reform Launches Across Kyrgyzstan",
            "New digital learning initiatives aim to modernize education infrastructure.",
            "https://example.com/education-reform",
            "Education Today",
            "Education",
        ),
        (
            "Renewable Energy Projects Expand in Turkmenistan",
            "Turkmenistan invests in solar and wind energy to diversify its energy sector.",
            "https://example.com/renewable-turkmenistan",
            "Energy News",
            "Energy",
        ),
        (
            "Uzbekistan Hosts Regional Tech Conference",
            "Leaders from Central Asia gather to discuss digital transformation and innovation.",
            "https://example.com/uzbekistan-tech-conference",
            "Central Asia Times",
            "Technology",
        ),
        (
            "Kazakhstan Launches New Space Satellite",
            "The new satellite aims to improve telecommunications and internet access.",
            "https://example.com/kazakhstan-satellite",
            "Space Daily",
            "Science",
        ),
        (
            "Tajikistan Improves Water Management Systems",
            "Modern irrigation and water-saving technologies introduced in rural areas.",
            "https://example.com/tajikistan-water",
            "Agri News",
            "Environment",
        ),
    ];

    let now = Utc::now();
    entries
        .iter()
        .enumerate()
        .map(|(i, (title, description, url, source, category))| NewsArticle {
            id: (i + 1).to_string(),
            title: title.to_string(),
            description: description.to_string(),
            url: url.to_string(),
            url_to_image: placeholder_image(),
            published_at: (now - Duration::hours(i as i64)).to_rfc3339(),
            source: SourceName::new(*source),
            category: Some(category.to_string()),
            content: None,
        })
        .collect()
}
