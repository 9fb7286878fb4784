//! Wire representations returned by the services.

use chrono::{DateTime, Utc};
use domains::{
    CareLevel, Comment, LightNeeds, Plant, PlantCategory, PlantImage, PlantSize, Rating, User,
    WaterNeeds, WishList,
};
use serde::Serialize;
use uuid::Uuid;

/// Compact plant used in lists and inside wishlist entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub size: PlantSize,
    pub category: PlantCategory,
    pub average_rating: Option<f64>,
}

impl PlantSummary {
    pub fn new(plant: &Plant, average_rating: Option<f64>) -> Self {
        Self {
            id: plant.id,
            name: plant.name.clone(),
            description: plant.description.clone(),
            size: plant.size,
            category: plant.category,
            average_rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
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
    pub average_rating: Option<f64>,
    pub images: Vec<ImageView>,
    pub comments: Vec<CommentNode>,
}

impl PlantDetail {
    pub fn new(
        plant: Plant,
        average_rating: Option<f64>,
        images: Vec<ImageView>,
        comments: Vec<CommentNode>,
    ) -> Self {
        Self {
            id: plant.id,
            name: plant.name,
            description: plant.description,
            tips: plant.tips,
            light_needs: plant.light_needs,
            water_needs: plant.water_needs,
            care: plant.care,
            air_purifying: plant.air_purifying,
            allergenic: plant.allergenic,
            size: plant.size,
            blooms: plant.blooms,
            category: plant.category,
            created_at: plant.created_at,
            average_rating,
            images,
            comments,
        }
    }
}

/// A plant image plus a time-limited URL to fetch it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub id: Uuid,
    pub plant: Uuid,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
}

impl ImageView {
    pub fn new(image: PlantImage, url: String) -> Self {
        Self {
            id: image.id,
            plant: image.plant_id,
            content_type: image.content_type,
            size_bytes: image.size_bytes,
            uploaded_at: image.uploaded_at,
            url,
        }
    }
}

/// A comment without its replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub plant: Uuid,
    pub parent: Option<Uuid>,
    pub author: Uuid,
    pub author_username: String,
    pub text: String,
    pub has_image: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            plant: c.plant_id,
            parent: c.parent_id,
            author: c.author_id,
            author_username: c.author_name,
            text: c.text,
            has_image: c.image.is_some(),
            created_at: c.created_at,
        }
    }
}

/// A comment and (a bounded part of) the tree of replies below it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: CommentView,
    /// Direct replies in the store, rendered or not.
    pub reply_count: usize,
    /// Set when fewer replies are rendered than exist in the store.
    pub truncated: bool,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WishListView {
    pub id: Uuid,
    pub user: Uuid,
    pub plant: Option<PlantSummary>,
    pub created_at: DateTime<Utc>,
}

impl WishListView {
    pub fn new(entry: WishList, plant: Option<PlantSummary>) -> Self {
        Self {
            id: entry.id,
            user: entry.user_id,
            plant,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingView {
    pub id: Uuid,
    pub plant: Uuid,
    pub user: Uuid,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
}

impl From<Rating> for RatingView {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id,
            plant: r.plant_id,
            user: r.user_id,
            rating: r.rating,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_staff: bool,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            username: u.username.clone(),
            is_staff: u.is_staff,
        }
    }
}
