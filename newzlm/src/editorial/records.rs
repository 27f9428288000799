use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Named entries in the key-value store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Drafts,
    Submitted,
    Published,
    Settings,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Collection::Drafts => "newzlm_drafts",
            Collection::Submitted => "newzlm_submitted",
            Collection::Published => "newzlm_published",
            Collection::Settings => "newzlm_settings",
        }
    }
}

/// An article still owned by its author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// An article waiting for a moderation decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

/// An approved article as listed to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedArticle {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Human readable, e.g. "Dec 15, 2024"
    pub published_at: String,
    #[serde(default = "zero_views")]
    pub views: String,
}

/// Where an article currently sits in the lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ArticleRecord {
    Draft(Draft),
    Submitted(Submission),
    Published(PublishedArticle),
}

impl ArticleRecord {
    pub fn id(&self) -> &str {
        match self {
            ArticleRecord::Draft(d) => &d.id,
            ArticleRecord::Submitted(s) => &s.id,
            ArticleRecord::Published(p) => &p.id,
        }
    }
}

pub(crate) trait Keyed {
    fn id(&self) -> &str;
}

impl Keyed for Draft {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Keyed for Submission {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Keyed for PublishedArticle {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Date format used for `publishedAt`
pub const PUBLISHED_DATE_FORMAT: &str = "%b %-d, %Y";

pub fn format_published_date(at: DateTime<Utc>) -> String {
    at.format(PUBLISHED_DATE_FORMAT).to_string()
}

/// Published entries shown before anything has been approved
pub fn seed_published() -> Vec<PublishedArticle> {
    vec![
        PublishedArticle {
            id: "6".to_string(),
            title: "Digital Transformation in Central Asia".to_string(),
            published_at: "Dec 15, 2024".to_string(),
            views: "1.2k".to_string(),
        },
        PublishedArticle {
            id: "7".to_string(),
            title: "Green Energy Initiatives".to_string(),
            published_at: "Dec 12, 2024".to_string(),
            views: "890".to_string(),
        },
    ]
}

/// Decode a persisted collection, keeping every well-formed record.
///
/// A value that is not a JSON array yields an empty collection. Records that fail to
/// decode, carry a blank id, or repeat an id already seen are dropped with a warning.
pub(crate) fn decode_collection<T>(collection: Collection, raw: &str) -> Vec<T>
where
    T: DeserializeOwned + Keyed,
{
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(key = collection.key(), error = %e, "malformed collection, treating as empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) if record.id().trim().is_empty() => {
                warn!(key = collection.key(), index, "dropping record with blank id");
            }
            Ok(record) => {
                if seen.insert(record.id().to_string()) {
                    records.push(record);
                } else {
                    warn!(key = collection.key(), id = record.id(), "dropping duplicate record");
                }
            }
            Err(e) => {
                warn!(key = collection.key(), index, error = %e, "dropping malformed record");
            }
        }
    }

    records
}

fn zero_views() -> String {
    "0".to_string()
}

/// Older data used numeric ids; accept both and normalise to strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
