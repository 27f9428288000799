use common::EditorialConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_VOICE: &str = "Professional, informative, and engaging. Focus on Central Asian perspectives with cultural sensitivity. Use clear, accessible language suitable for diverse audiences.";
const DEFAULT_GUIDELINES: &str = "Prioritize accuracy and fact-checking. Include relevant local context. Maintain neutrality while highlighting regional innovations and developments.";

/// Editorial configuration consumed by the generation prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorialSettings {
    pub editorial_voice: String,
    pub content_guidelines: String,
    pub tone: Option<String>,
    pub company: Option<String>,
    /// Anything else the newsroom wants passed to the generator
    pub extra: BTreeMap<String, String>,
}

impl Default for EditorialSettings {
    fn default() -> Self {
        Self {
            editorial_voice: DEFAULT_VOICE.to_string(),
            content_guidelines: DEFAULT_GUIDELINES.to_string(),
            tone: None,
            company: None,
            extra: BTreeMap::new(),
        }
    }
}

impl EditorialSettings {
    /// Built-in defaults overridden by the `[editorial]` config section
    pub fn from_config(config: Option<&EditorialConfig>) -> Self {
        let mut settings = Self::default();
        if let Some(cfg) = config {
            if let Some(voice) = &cfg.editorial_voice {
                settings.editorial_voice = voice.clone();
            }
            if let Some(guidelines) = &cfg.content_guidelines {
                settings.content_guidelines = guidelines.clone();
            }
            settings.tone = cfg.tone.clone().or(settings.tone);
            settings.company = cfg.company.clone().or(settings.company);
        }
        settings
    }

    /// System prompt handed to the article generator
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "Editorial voice: {}\nContent guidelines: {}",
            self.editorial_voice.trim(),
            self.content_guidelines.trim()
        );

        if let Some(tone) = self.tone.as_deref().filter(|t| !t.trim().is_empty()) {
            prompt.push_str(&format!("\nTone: {}", tone.trim()));
        }
        if let Some(company) = self.company.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nPublication: {}", company.trim()));
        }
        for (key, value) in &self.extra {
            prompt.push_str(&format!("\n{}: {}", key, value));
        }

        prompt
    }
}
