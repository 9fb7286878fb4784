//! Ratings and the derived per-plant average.

use std::sync::Arc;

use domains::{Actor, DomainError, DomainResult, PlantRepository, Rating, RatingRepository};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::permissions::authenticated;
use crate::views::RatingView;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRating {
    pub plant: Uuid,
    pub rating: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingEdit {
    pub rating: i64,
}

/// Arithmetic mean rounded to 2 decimals; `None` when nothing was rated.
pub fn average(values: &[i16]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    let mean = sum as f64 / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

fn checked_value(raw: i64) -> DomainResult<i16> {
    if (i64::from(Rating::MIN)..=i64::from(Rating::MAX)).contains(&raw) {
        Ok(raw as i16)
    } else {
        Err(DomainError::validation(
            "rating",
            format!("Ensure this value is between {} and {}.", Rating::MIN, Rating::MAX),
        ))
    }
}

pub struct RatingService {
    ratings: Arc<dyn RatingRepository>,
    plants: Arc<dyn PlantRepository>,
}

impl RatingService {
    pub fn new(ratings: Arc<dyn RatingRepository>, plants: Arc<dyn PlantRepository>) -> Self {
        Self { ratings, plants }
    }

    /// Recomputed from every stored rating on each call.
    pub async fn average_for(&self, plant_id: Uuid) -> DomainResult<Option<f64>> {
        let values = self.ratings.values_for_plant(plant_id).await?;
        Ok(average(&values))
    }

    #[instrument(skip(self, actor, input), fields(plant = %input.plant))]
    pub async fn rate(&self, actor: Option<&Actor>, input: NewRating) -> DomainResult<RatingView> {
        let actor = authenticated(actor)?;
        let value = checked_value(input.rating)?;
        if self.plants.find_by_id(input.plant).await?.is_none() {
            return Err(DomainError::not_found("Plant", input.plant));
        }

        let rating = Rating {
            id: Uuid::new_v4(),
            plant_id: input.plant,
            user_id: actor.user_id,
            rating: value,
            created_at: chrono::Utc::now(),
        };
        if !self.ratings.insert_unique(&rating).await? {
            return Err(DomainError::validation("plant", "You have already rated this plant."));
        }
        info!(rating_id = %rating.id, value, "plant rated");
        Ok(rating.into())
    }

    pub async fn list(&self, actor: Option<&Actor>, plant: Option<Uuid>) -> DomainResult<Vec<RatingView>> {
        authenticated(actor)?;
        let ratings = self.ratings.list(plant).await?;
        Ok(ratings.into_iter().map(RatingView::from).collect())
    }

    pub async fn update(&self, actor: Option<&Actor>, id: Uuid, edit: RatingEdit) -> DomainResult<RatingView> {
        let actor = authenticated(actor)?;
        let value = checked_value(edit.rating)?;
        let mut rating = self.own(actor, id).await?;
        if !self.ratings.update_value(id, value).await? {
            return Err(DomainError::not_found("Rating", id));
        }
        rating.rating = value;
        Ok(rating.into())
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<()> {
        let actor = authenticated(actor)?;
        self.own(actor, id).await?;
        if !self.ratings.delete(id).await? {
            return Err(DomainError::not_found("Rating", id));
        }
        Ok(())
    }

    /// Another user's rating looks exactly like a missing one.
    async fn own(&self, actor: &Actor, id: Uuid) -> DomainResult<Rating> {
        self.ratings
            .find_by_id(id)
            .await?
            .filter(|r| r.user_id == actor.user_id)
            .ok_or_else(|| DomainError::not_found("Rating", id))
    }
}
