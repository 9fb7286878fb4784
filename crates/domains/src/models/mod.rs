//! # Domain Models
//!
//! These structs represent the core entities of Verdespace.
//! We use UUID v4 for globally unique, collision-resistant identification.

mod choices;

pub use choices::{CareLevel, LightNeeds, PlantCategory, PlantSize, UnknownChoice, WaterNeeds};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry. Owns its images, comments, ratings and wishlist entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Free-text care tips
    pub tips: String,
    pub light_needs: LightNeeds,
    pub water_needs: WaterNeeds,
    pub care: CareLevel,
    pub air_purifying: bool,
    pub allergenic: bool,
    pub size: PlantSize,
    pub blooms: bool,
    pub category: PlantCategory,
    pub created_at: DateTime<Utc>,
}

/// Criteria for narrowing the plant list. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantFilter {
    /// Case-insensitive substring of the plant name
    pub name: Option<String>,
    pub size: Option<PlantSize>,
    pub blooms: Option<bool>,
    pub water_needs: Option<WaterNeeds>,
    pub light_needs: Option<LightNeeds>,
    pub allergenic: Option<bool>,
    pub air_purifying: Option<bool>,
    pub category: Option<PlantCategory>,
}

impl PlantFilter {
    pub fn matches(&self, plant: &Plant) -> bool {
        fn eq<T: PartialEq>(want: &Option<T>, have: &T) -> bool {
            want.as_ref().is_none_or(|w| w == have)
        }

        let name_ok = self.name.as_deref().is_none_or(|needle| {
            plant
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });

        name_ok
            && eq(&self.size, &plant.size)
            && eq(&self.blooms, &plant.blooms)
            && eq(&self.water_needs, &plant.water_needs)
            && eq(&self.light_needs, &plant.light_needs)
            && eq(&self.allergenic, &plant.allergenic)
            && eq(&self.air_purifying, &plant.air_purifying)
            && eq(&self.category, &plant.category)
    }
}

/// Metadata of an uploaded plant photo. The bytes live in `MediaStorage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantImage {
    pub id: Uuid,
    pub plant_id: Uuid,
    /// Key handed back by `MediaStorage::store`
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A comment on a plant. `parent_id == None` marks a top-level comment;
/// replies point at their parent and are deleted along with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub author_id: Uuid,
    /// Username captured at creation; usernames never change.
    pub author_name: String,
    pub parent_id: Option<Uuid>,
    pub text: String,
    /// Storage key of an attached image
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a user's wishlist. At most one entry per (user, plant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A 1..=5 score. At most one rating per (plant, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;
}

/// An account. `email` is the login key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// A file received from a client, before validation.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spider_plant() -> Plant {
        Plant {
            id: Uuid::new_v4(),
            name: "Spider Plant".into(),
            description: "A test description".into(),
            tips: "Keep near sunlight".into(),
            light_needs: LightNeeds::Indirect,
            water_needs: WaterNeeds::Moderate,
            care: CareLevel::Easy,
            air_purifying: true,
            allergenic: false,
            size: PlantSize::Small,
            blooms: false,
            category: PlantCategory::AirPurifying,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(PlantFilter::default().matches(&spider_plant()));
    }

    #[test]
    fn name_filter_is_case_insensitive_substring() {
        let filter = PlantFilter {
            name: Some("spider".into()),
            ..Default::default()
        };
        assert!(filter.matches(&spider_plant()));

        let filter = PlantFilter {
            name: Some("Cactus".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&spider_plant()));
    }

    #[test]
    fn every_set_field_must_match() {
        let filter = PlantFilter {
            air_purifying: Some(true),
            size: Some(PlantSize::Medium),
            ..Default::default()
        };
        assert!(!filter.matches(&spider_plant()));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            username: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_staff: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
