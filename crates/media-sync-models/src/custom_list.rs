use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TraktId;
use crate::media::MediaKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomList {
    pub id: i64, // Local, auto-assigned
    pub trakt_id: Option<TraktId>, // None until first synced
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub privacy: String,
    pub item_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomList {
    /// A fresh, unsynced private list. The store assigns the id on insert.
    pub fn create(name: &str, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            trakt_id: None,
            slug: slugify(name),
            name: name.to_string(),
            description,
            privacy: "private".to_string(),
            item_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Items are ordered by ascending `rank` within their list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomListItem {
    pub id: i64,
    pub list_id: i64,
    pub trakt_id: TraktId,
    pub kind: MediaKind,
    pub rank: i64,
    pub listed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Favourite Shows!"), "my-favourite-shows");
        assert_eq!(slugify("  sci-fi  "), "sci-fi");
    }

    #[test]
    fn test_create_is_unsynced() {
        let list = CustomList::create("Weekend", None);
        assert_eq!(list.trakt_id, None);
        assert_eq!(list.slug, "weekend");
        assert_eq!(list.item_count, 0);
    }
}
