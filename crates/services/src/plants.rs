//! Plant catalog: staff-maintained entries, filtering, detail assembly
//! and the "new plant" notification.

use std::sync::Arc;

use domains::{
    Actor, CareLevel, CommentRepository, DomainError, DomainResult, LightNeeds, Notifier, Plant,
    PlantCategory, PlantFilter, PlantImageRepository, PlantRepository, PlantSize, WaterNeeds,
};
use serde::Deserialize;
use tracing::{info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::comments::CommentService;
use crate::images::ImageService;
use crate::permissions::{authenticated, staff_or_read_only, Action};
use crate::ratings::RatingService;
use crate::views::{PlantDetail, PlantSummary};

const NAME_MAX_CHARS: usize = 100;

/// Write payload for create and update. Categorical fields arrive as their
/// labels and are checked here so each bad value is reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlantDraft {
    pub name: String,
    pub description: String,
    pub tips: String,
    pub light_needs: String,
    pub water_needs: String,
    pub care: String,
    pub air_purifying: bool,
    pub allergenic: bool,
    pub size: String,
    pub blooms: bool,
    pub category: String,
}

impl PlantDraft {
    /// Produces a plant with the given identity and timestamp.
    fn into_plant(self, id: Uuid, created_at: chrono::DateTime<chrono::Utc>) -> DomainResult<Plant> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name", "This field may not be blank."));
        }
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(DomainError::validation(
                "name",
                format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
            ));
        }

        Ok(Plant {
            id,
            name,
            description: required_text("description", &self.description)?,
            tips: required_text("tips", &self.tips)?,
            light_needs: choice::<LightNeeds>("light_needs", &self.light_needs)?,
            water_needs: choice::<WaterNeeds>("water_needs", &self.water_needs)?,
            care: choice::<CareLevel>("care", &self.care)?,
            air_purifying: self.air_purifying,
            allergenic: self.allergenic,
            size: choice::<PlantSize>("size", &self.size)?,
            blooms: self.blooms,
            category: choice::<PlantCategory>("category", &self.category)?,
            created_at,
        })
    }
}

fn required_text(field: &str, raw: &str) -> DomainResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DomainError::validation(field, "This field may not be blank."));
    }
    Ok(text.to_string())
}

fn choice<T>(field: &str, raw: &str) -> DomainResult<T>
where
    T: std::str::FromStr<Err = domains::UnknownChoice>,
{
    raw.parse::<T>()
        .map_err(|e| DomainError::validation(field, format!("{e}.")))
}

/// Text sent through the notifier when a plant is created.
pub fn creation_message(plant: &Plant) -> String {
    format!(
        "New Plant Created \nPlant ID: {}\nPlant Name: {}\nPlant Size: {}\n",
        plant.id, plant.name, plant.size
    )
}

pub struct PlantService {
    plants: Arc<dyn PlantRepository>,
    images: Arc<dyn PlantImageRepository>,
    comments: Arc<dyn CommentRepository>,
    ratings: Arc<RatingService>,
    image_service: Arc<ImageService>,
    comment_service: Arc<CommentService>,
    notifier: Arc<dyn Notifier>,
}

impl PlantService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plants: Arc<dyn PlantRepository>,
        images: Arc<dyn PlantImageRepository>,
        comments: Arc<dyn CommentRepository>,
        ratings: Arc<RatingService>,
        image_service: Arc<ImageService>,
        comment_service: Arc<CommentService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            plants,
            images,
            comments,
            ratings,
            image_service,
            comment_service,
            notifier,
        }
    }

    #[instrument(skip(self, actor, draft))]
    pub async fn create(&self, actor: Option<&Actor>, draft: PlantDraft) -> DomainResult<PlantDetail> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Create)?;

        let plant = draft.into_plant(Uuid::new_v4(), chrono::Utc::now())?;
        self.plants.insert(&plant).await?;
        info!(plant_id = %plant.id, name = %plant.name, "plant created");

        self.notify_created(&plant);
        Ok(PlantDetail::new(plant, None, Vec::new(), Vec::new()))
    }

    /// Fire-and-forget: the send runs on its own task and failures are
    /// only logged.
    fn notify_created(&self, plant: &Plant) {
        let notifier = self.notifier.clone();
        let plant_id = plant.id;
        let text = creation_message(plant);
        tokio::spawn(
            async move {
                if let Err(e) = notifier.send(&text).await {
                    warn!(%plant_id, error = %e, "plant creation notification failed");
                }
            }
            .in_current_span(),
        );
    }

    pub async fn list(&self, actor: Option<&Actor>, filter: &PlantFilter) -> DomainResult<Vec<PlantSummary>> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::List)?;

        let mut summaries = Vec::new();
        for plant in self.plants.list(filter).await? {
            let avg = self.ratings.average_for(plant.id).await?;
            summaries.push(PlantSummary::new(&plant, avg));
        }
        Ok(summaries)
    }

    pub async fn detail(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<PlantDetail> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Retrieve)?;

        let plant = self.load(id).await?;
        let avg = self.ratings.average_for(id).await?;
        let images = self.image_service.views_for_plant(id).await?;
        let comments = self.comment_service.threads_for_plant(id).await?;
        Ok(PlantDetail::new(plant, avg, images, comments))
    }

    #[instrument(skip(self, actor, draft))]
    pub async fn update(&self, actor: Option<&Actor>, id: Uuid, draft: PlantDraft) -> DomainResult<PlantDetail> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Update)?;

        let existing = self.load(id).await?;
        let plant = draft.into_plant(id, existing.created_at)?;
        if !self.plants.update(&plant).await? {
            return Err(DomainError::not_found("Plant", id));
        }
        info!(plant_id = %id, "plant updated");
        self.detail(Some(actor), id).await
    }

    /// Deletes the plant with everything it owns, then removes the stored
    /// image objects best-effort.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<()> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Delete)?;
        self.load(id).await?;

        let mut objects: Vec<String> = self
            .images
            .list_for_plant(id)
            .await?
            .into_iter()
            .map(|image| image.storage_key)
            .collect();
        objects.extend(
            self.comments
                .list(Some(id))
                .await?
                .into_iter()
                .filter_map(|c| c.image),
        );

        if !self.plants.delete(id).await? {
            return Err(DomainError::not_found("Plant", id));
        }
        for reference in &objects {
            self.image_service.discard(reference).await;
        }
        info!(plant_id = %id, objects = objects.len(), "plant deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> DomainResult<Plant> {
        self.plants
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Plant", id))
    }
}
