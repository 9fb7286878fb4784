//! Plant images: upload validation, storage and signed access URLs.

use std::sync::Arc;
use std::time::Duration;

use domains::{
    Actor, DomainError, DomainResult, MediaStorage, PlantImage, PlantImageRepository,
    PlantRepository, Upload,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::permissions::{authenticated, staff_or_read_only, Action};
use crate::views::ImageView;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

/// Limits applied to every uploaded image.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub url_ttl: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            url_ttl: DEFAULT_URL_TTL,
        }
    }
}

impl UploadPolicy {
    /// Checks size, declared content type and the actual bytes.
    /// Returns the file extension matching the detected format.
    pub fn validate(&self, upload: &Upload) -> DomainResult<&'static str> {
        if upload.data.is_empty() {
            return Err(DomainError::validation("image", "No image file provided."));
        }
        if upload.data.len() > self.max_bytes {
            return Err(DomainError::validation(
                "image",
                format!(
                    "Image file too large (maximum {} MB).",
                    self.max_bytes / (1024 * 1024)
                ),
            ));
        }

        let declared: mime::Mime = upload
            .content_type
            .parse()
            .map_err(|_| unsupported_type())?;
        if declared.type_() != mime::IMAGE {
            return Err(unsupported_type());
        }

        let format = image::guess_format(&upload.data)
            .map_err(|_| DomainError::validation("image", "Uploaded file is not a valid image."))?;
        let ext = format
            .extensions_str()
            .first()
            .copied()
            .or_else(|| {
                mime_guess::get_mime_extensions(&declared)
                    .and_then(|exts| exts.first().copied())
            })
            .unwrap_or("bin");
        Ok(ext)
    }
}

fn unsupported_type() -> DomainError {
    DomainError::validation("image", "Unsupported file type. Only images are allowed.")
}

pub struct ImageService {
    images: Arc<dyn PlantImageRepository>,
    plants: Arc<dyn PlantRepository>,
    media: Arc<dyn MediaStorage>,
    policy: UploadPolicy,
}

impl ImageService {
    pub fn new(
        images: Arc<dyn PlantImageRepository>,
        plants: Arc<dyn PlantRepository>,
        media: Arc<dyn MediaStorage>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            images,
            plants,
            media,
            policy,
        }
    }

    pub fn policy(&self) -> UploadPolicy {
        self.policy
    }

    #[instrument(skip(self, actor, upload), fields(size = upload.data.len()))]
    pub async fn upload(
        &self,
        actor: Option<&Actor>,
        plant_id: Uuid,
        upload: Upload,
    ) -> DomainResult<ImageView> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Create)?;
        self.require_plant(plant_id).await?;

        let ext = self.policy.validate(&upload)?;
        let id = Uuid::new_v4();
        let key = format!("plants/{plant_id}/{id}.{ext}");
        let size_bytes = upload.data.len() as i64;
        let reference = self
            .media
            .store(&key, upload.data, &upload.content_type)
            .await?;

        let image = PlantImage {
            id,
            plant_id,
            storage_key: reference,
            content_type: upload.content_type,
            size_bytes,
            uploaded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.images.insert(&image).await {
            self.discard(&image.storage_key).await;
            return Err(e);
        }

        info!(image_id = %image.id, %plant_id, "plant image uploaded");
        self.view(image).await
    }

    pub async fn list_for_plant(
        &self,
        actor: Option<&Actor>,
        plant_id: Uuid,
    ) -> DomainResult<Vec<ImageView>> {
        authenticated(actor)?;
        self.require_plant(plant_id).await?;
        self.views_for_plant(plant_id).await
    }

    /// Signed views of every image of a plant, without access checks.
    pub(crate) async fn views_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<ImageView>> {
        let mut views = Vec::new();
        for image in self.images.list_for_plant(plant_id).await? {
            views.push(self.view(image).await?);
        }
        Ok(views)
    }

    /// Signed URL of the plant's first image.
    pub async fn primary_url(&self, actor: Option<&Actor>, plant_id: Uuid) -> DomainResult<String> {
        authenticated(actor)?;
        self.require_plant(plant_id).await?;
        let image = self
            .images
            .list_for_plant(plant_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("PlantImage", format!("plant {plant_id}")))?;
        self.sign(&image.storage_key).await
    }

    pub async fn list(&self, actor: Option<&Actor>) -> DomainResult<Vec<ImageView>> {
        authenticated(actor)?;
        let mut views = Vec::new();
        for image in self.images.list_all().await? {
            views.push(self.view(image).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<ImageView> {
        authenticated(actor)?;
        let image = self
            .images
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("PlantImage", id))?;
        self.view(image).await
    }

    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<()> {
        let actor = authenticated(actor)?;
        staff_or_read_only(actor, Action::Delete)?;
        let image = self
            .images
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("PlantImage", id))?;
        if !self.images.delete(id).await? {
            return Err(DomainError::not_found("PlantImage", id));
        }
        self.discard(&image.storage_key).await;
        info!(image_id = %id, "plant image deleted");
        Ok(())
    }

    pub(crate) async fn sign(&self, reference: &str) -> DomainResult<String> {
        self.media
            .signed_url(reference, self.policy.url_ttl)
            .await
            .inspect_err(|e| warn!(reference, error = %e, "signing image URL failed"))
    }

    /// Best-effort removal of a stored object; rows are already gone.
    pub(crate) async fn discard(&self, reference: &str) {
        if let Err(e) = self.media.delete(reference).await {
            warn!(reference, error = %e, "failed to remove stored object");
        }
    }

    async fn view(&self, image: PlantImage) -> DomainResult<ImageView> {
        let url = self.sign(&image.storage_key).await?;
        Ok(ImageView::new(image, url))
    }

    async fn require_plant(&self, plant_id: Uuid) -> DomainResult<()> {
        match self.plants.find_by_id(plant_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Plant", plant_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::{
        CareLevel, LightNeeds, MockMediaStorage, MockPlantImageRepository, MockPlantRepository,
        Plant, PlantCategory, PlantSize, WaterNeeds,
    };

    // Smallest valid PNG header the format sniffer accepts.
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn png(len: usize) -> Upload {
        let mut data = PNG_MAGIC.to_vec();
        data.resize(len.max(PNG_MAGIC.len()), 0);
        Upload {
            file_name: Some("leaf.png".into()),
            content_type: "image/png".into(),
            data: Bytes::from(data),
        }
    }

    fn staff() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: "admin@example.com".into(),
            is_staff: true,
        }
    }

    fn plant(id: Uuid) -> Plant {
        Plant {
            id,
            name: "Aloe Vera".into(),
            description: "A test aloe vera".into(),
            tips: "Keep in bright indirect light".into(),
            light_needs: LightNeeds::BrightIndirect,
            water_needs: WaterNeeds::Moderate,
            care: CareLevel::Medium,
            air_purifying: true,
            allergenic: false,
            size: PlantSize::Medium,
            blooms: true,
            category: PlantCategory::Medicinal,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn policy_rejects_oversized_files() {
        let err = UploadPolicy::default()
            .validate(&png(DEFAULT_MAX_UPLOAD_BYTES + 1))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "image"));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn policy_rejects_non_image_content_type() {
        let mut upload = png(64);
        upload.content_type = "application/pdf".into();
        let err = UploadPolicy::default().validate(&upload).unwrap_err();
        assert!(err.to_string().contains("Only images"));
    }

    #[test]
    fn policy_rejects_bytes_that_are_not_an_image() {
        let upload = Upload {
            file_name: None,
            content_type: "image/jpeg".into(),
            data: Bytes::from_static(b"definitely not a jpeg"),
        };
        assert!(UploadPolicy::default().validate(&upload).is_err());
    }

    #[test]
    fn policy_accepts_png_and_reports_extension() {
        assert_eq!(UploadPolicy::default().validate(&png(1024)).unwrap(), "png");
    }

    #[tokio::test]
    async fn primary_url_is_not_found_without_images() {
        let plant_id = Uuid::new_v4();
        let mut plants = MockPlantRepository::new();
        plants
            .expect_find_by_id()
            .returning(move |id| Ok(Some(plant(id))));
        let mut images = MockPlantImageRepository::new();
        images.expect_list_for_plant().returning(|_| Ok(vec![]));
        let media = MockMediaStorage::new();

        let svc = ImageService::new(
            Arc::new(images),
            Arc::new(plants),
            Arc::new(media),
            UploadPolicy::default(),
        );
        let err = svc.primary_url(Some(&staff()), plant_id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "PlantImage", .. }));
    }

    #[tokio::test]
    async fn signing_failure_surfaces_as_storage_error() {
        let plant_id = Uuid::new_v4();
        let mut plants = MockPlantRepository::new();
        plants
            .expect_find_by_id()
            .returning(move |id| Ok(Some(plant(id))));
        let mut images = MockPlantImageRepository::new();
        images.expect_list_for_plant().returning(move |pid| {
            Ok(vec![PlantImage {
                id: Uuid::new_v4(),
                plant_id: pid,
                storage_key: "plants/x.png".into(),
                content_type: "image/png".into(),
                size_bytes: 10,
                uploaded_at: chrono::Utc::now(),
            }])
        });
        let mut media = MockMediaStorage::new();
        media
            .expect_signed_url()
            .returning(|_, _| Err(DomainError::Storage("credentials expired".into())));

        let svc = ImageService::new(
            Arc::new(images),
            Arc::new(plants),
            Arc::new(media),
            UploadPolicy::default(),
        );
        let err = svc.primary_url(Some(&staff()), plant_id).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn non_staff_cannot_upload() {
        let svc = ImageService::new(
            Arc::new(MockPlantImageRepository::new()),
            Arc::new(MockPlantRepository::new()),
            Arc::new(MockMediaStorage::new()),
            UploadPolicy::default(),
        );
        let user = Actor {
            is_staff: false,
            ..staff()
        };
        let err = svc
            .upload(Some(&user), Uuid::new_v4(), png(128))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn upload_stores_under_plant_prefix() {
        let plant_id = Uuid::new_v4();
        let mut plants = MockPlantRepository::new();
        plants
            .expect_find_by_id()
            .returning(move |id| Ok(Some(plant(id))));
        let mut images = MockPlantImageRepository::new();
        images.expect_insert().times(1).returning(|_| Ok(()));
        let mut media = MockMediaStorage::new();
        media
            .expect_store()
            .withf(move |key, _, ct| key.starts_with(&format!("plants/{plant_id}/")) && key.ends_with(".png") && ct == "image/png")
            .returning(|key, _, _| Ok(key.to_string()));
        media
            .expect_signed_url()
            .returning(|key, _| Ok(format!("https://cdn.test/{key}?sig=1")));

        let svc = ImageService::new(
            Arc::new(images),
            Arc::new(plants),
            Arc::new(media),
            UploadPolicy::default(),
        );
        let view = svc.upload(Some(&staff()), plant_id, png(256)).await.unwrap();
        assert_eq!(view.plant, plant_id);
        assert_eq!(view.size_bytes, 256);
        assert!(view.url.starts_with("https://cdn.test/plants/"));
    }
}
