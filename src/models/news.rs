//! News model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentItem, Tag};

/// A bilingual news entry.
///
/// `items` holds the ordered child item ids in list responses and the full
/// items in the detail response ([`NewsDetail`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News<I = String> {
    pub id: String,
    pub vi_title: String,
    pub jp_title: String,
    pub vi_description: String,
    pub jp_description: String,
    pub vi_poster: String,
    pub jp_poster: String,
    pub tags: Vec<Tag>,
    pub items: Vec<I>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// News entry with its items expanded, as served by the full-detail endpoint.
pub type NewsDetail = News<ContentItem>;

impl<I> News<I> {
    pub fn with_items<J>(self, items: Vec<J>) -> News<J> {
        News {
            id: self.id,
            vi_title: self.vi_title,
            jp_title: self.jp_title,
            vi_description: self.vi_description,
            jp_description: self.jp_description,
            vi_poster: self.vi_poster,
            jp_poster: self.jp_poster,
            tags: self.tags,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    pub vi_title: String,
    pub jp_title: String,
    pub vi_description: String,
    pub jp_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNewsInput {
    pub vi_title: Option<String>,
    pub jp_title: Option<String>,
    pub vi_description: Option<String>,
    pub jp_description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> News {
        let now = Utc::now();
        News {
            id: "n1".to_string(),
            vi_title: "Tin".to_string(),
            jp_title: "ニュース".to_string(),
            vi_description: "d".to_string(),
            jp_description: "d".to_string(),
            vi_poster: "uploads/news/a.png".to_string(),
            jp_poster: "uploads/news/b.png".to_string(),
            tags: vec![],
            items: vec!["i1".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["viTitle"], "Tin");
        assert_eq!(json["jpPoster"], "uploads/news/b.png");
        assert_eq!(json["items"][0], "i1");
    }

    #[test]
    fn test_with_items_keeps_parent_fields() {
        let news = sample();
        let detail: News<u32> = news.clone().with_items(vec![1, 2]);
        assert_eq!(detail.id, news.id);
        assert_eq!(detail.vi_poster, news.vi_poster);
        assert_eq!(detail.items, vec![1, 2]);
    }
}
