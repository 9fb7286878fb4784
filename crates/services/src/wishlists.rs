//! Personal wishlists.
//!
//! Entries are always scoped to the acting identity. Uniqueness of
//! (user, plant) is decided by the repository's atomic get-or-create,
//! never by a read-then-insert in this service.

use std::sync::Arc;

use domains::{
    Actor, DomainError, DomainResult, PlantRepository, Reassign, WishList, WishListRepository,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::permissions::authenticated;
use crate::ratings::RatingService;
use crate::views::{PlantSummary, WishListView};

pub const ALREADY_WISHLISTED: &str = "This plant is already in your wishlist.";

#[derive(Debug, Clone, Deserialize)]
pub struct WishListInput {
    pub plant_id: Uuid,
}

pub struct WishListService {
    wishlists: Arc<dyn WishListRepository>,
    plants: Arc<dyn PlantRepository>,
    ratings: Arc<RatingService>,
}

impl WishListService {
    pub fn new(
        wishlists: Arc<dyn WishListRepository>,
        plants: Arc<dyn PlantRepository>,
        ratings: Arc<RatingService>,
    ) -> Self {
        Self {
            wishlists,
            plants,
            ratings,
        }
    }

    #[instrument(skip(self, actor, input), fields(plant = %input.plant_id))]
    pub async fn add(&self, actor: Option<&Actor>, input: WishListInput) -> DomainResult<WishListView> {
        let actor = authenticated(actor)?;
        self.require_plant(input.plant_id).await?;

        let (entry, created) = self
            .wishlists
            .get_or_create(actor.user_id, input.plant_id)
            .await?;
        if !created {
            return Err(DomainError::validation("plant_id", ALREADY_WISHLISTED));
        }
        info!(entry_id = %entry.id, user = %actor.user_id, "plant added to wishlist");
        self.view(entry).await
    }

    pub async fn list(&self, actor: Option<&Actor>) -> DomainResult<Vec<WishListView>> {
        let actor = authenticated(actor)?;
        let mut views = Vec::new();
        for entry in self.wishlists.list_for_user(actor.user_id).await? {
            views.push(self.view(entry).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<WishListView> {
        let actor = authenticated(actor)?;
        let entry = self
            .wishlists
            .find_for_user(actor.user_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("WishList", id))?;
        self.view(entry).await
    }

    /// Points an entry at another plant, under the same uniqueness rule.
    #[instrument(skip(self, actor, input))]
    pub async fn move_to(&self, actor: Option<&Actor>, id: Uuid, input: WishListInput) -> DomainResult<WishListView> {
        let actor = authenticated(actor)?;
        self.require_plant(input.plant_id).await?;

        match self
            .wishlists
            .reassign(actor.user_id, id, input.plant_id)
            .await?
        {
            Reassign::Moved(entry) => self.view(entry).await,
            Reassign::Duplicate => Err(DomainError::validation("plant_id", ALREADY_WISHLISTED)),
            Reassign::Missing => Err(DomainError::not_found("WishList", id)),
        }
    }

    pub async fn remove(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<()> {
        let actor = authenticated(actor)?;
        if !self.wishlists.delete_for_user(actor.user_id, id).await? {
            return Err(DomainError::not_found("WishList", id));
        }
        Ok(())
    }

    async fn require_plant(&self, plant_id: Uuid) -> DomainResult<()> {
        match self.plants.find_by_id(plant_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Plant", plant_id)),
        }
    }

    async fn view(&self, entry: WishList) -> DomainResult<WishListView> {
        let plant = match entry.plant_id {
            Some(plant_id) => match self.plants.find_by_id(plant_id).await? {
                Some(plant) => {
                    let avg = self.ratings.average_for(plant_id).await?;
                    Some(PlantSummary::new(&plant, avg))
                }
                None => None,
            },
            None => None,
        };
        Ok(WishListView::new(entry, plant))
    }
}
