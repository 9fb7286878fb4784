//! Threaded comments.
//!
//! Comments form one tree per top-level comment through `parent_id`.
//! Rendering a thread walks the tree breadth-first with two bounds
//! (`ReplyLimits`) and a visited set, so a corrupted store with a cycle
//! still renders a finite tree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domains::{
    Actor, Comment, CommentRepository, DomainError, DomainResult, MediaStorage, PlantRepository,
    Upload,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::images::UploadPolicy;
use crate::permissions::{author_or_read_only, authenticated, Action};
use crate::views::{CommentNode, CommentView};

/// Bounds applied when rendering a reply tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLimits {
    /// Levels expanded below the rendered comment.
    pub max_depth: usize,
    /// Direct replies rendered per comment.
    pub per_node: usize,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            max_depth: 16,
            per_node: 10,
        }
    }
}

/// Body of a create request. The author is always the acting identity,
/// so there is no field for it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub text: String,
    pub plant: Uuid,
    #[serde(default)]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentEdit {
    #[serde(default)]
    pub text: String,
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    plants: Arc<dyn PlantRepository>,
    media: Arc<dyn MediaStorage>,
    policy: UploadPolicy,
    limits: ReplyLimits,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        plants: Arc<dyn PlantRepository>,
        media: Arc<dyn MediaStorage>,
        policy: UploadPolicy,
        limits: ReplyLimits,
    ) -> Self {
        Self {
            comments,
            plants,
            media,
            policy,
            limits,
        }
    }

    #[instrument(skip(self, actor, input), fields(plant = %input.plant))]
    pub async fn create(&self, actor: Option<&Actor>, input: NewComment) -> DomainResult<CommentView> {
        let actor = authenticated(actor)?;
        let text = clean_text(&input.text)?;

        if self.plants.find_by_id(input.plant).await?.is_none() {
            return Err(DomainError::validation(
                "plant",
                format!("Invalid pk \"{}\" - object does not exist.", input.plant),
            ));
        }

        if let Some(parent_id) = input.parent {
            let parent = self.comments.find_by_id(parent_id).await?.ok_or_else(|| {
                DomainError::validation(
                    "parent",
                    format!("Invalid pk \"{parent_id}\" - object does not exist."),
                )
            })?;
            if parent.plant_id != input.plant {
                return Err(DomainError::validation(
                    "parent",
                    "A reply must belong to the same plant as its parent comment.",
                ));
            }
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            plant_id: input.plant,
            author_id: actor.user_id,
            author_name: actor.username.clone(),
            parent_id: input.parent,
            text,
            image: None,
            created_at: chrono::Utc::now(),
        };
        self.comments.insert(&comment).await?;
        info!(comment_id = %comment.id, author = %actor.user_id, "comment created");
        Ok(comment.into())
    }

    pub async fn list(&self, actor: Option<&Actor>, plant: Option<Uuid>) -> DomainResult<Vec<CommentView>> {
        authenticated(actor)?;
        let comments = self.comments.list(plant).await?;
        Ok(comments.into_iter().map(CommentView::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<CommentView> {
        authenticated(actor)?;
        Ok(self.load(id).await?.into())
    }

    /// The comment with its bounded reply tree.
    pub async fn thread(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<CommentNode> {
        authenticated(actor)?;
        let root = self.load(id).await?;
        self.render(root).await
    }

    /// Rendered threads of every top-level comment on a plant.
    pub(crate) async fn threads_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<CommentNode>> {
        let mut threads = Vec::new();
        for root in self.comments.top_level(plant_id).await? {
            threads.push(self.render(root).await?);
        }
        Ok(threads)
    }

    #[instrument(skip(self, actor, edit))]
    pub async fn update(&self, actor: Option<&Actor>, id: Uuid, edit: CommentEdit) -> DomainResult<CommentView> {
        let actor = authenticated(actor)?;
        let mut comment = self.load(id).await?;
        author_or_read_only(actor, Action::Update, comment.author_id)?;

        comment.text = clean_text(&edit.text)?;
        if !self.comments.update(&comment).await? {
            return Err(DomainError::not_found("Comment", id));
        }
        Ok(comment.into())
    }

    /// Deletes the comment and all replies below it; returns how many
    /// comments were removed.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<u64> {
        let actor = authenticated(actor)?;
        let comment = self.load(id).await?;
        author_or_read_only(actor, Action::Delete, comment.author_id)?;

        let removed = self.comments.delete(id).await?;
        for image in removed.iter().filter_map(|c| c.image.as_deref()) {
            self.discard(image).await;
        }
        info!(comment_id = %id, removed = removed.len(), "comment subtree deleted");
        Ok(removed.len() as u64)
    }

    /// Attaches (or replaces) the comment's image.
    #[instrument(skip(self, actor, upload))]
    pub async fn attach_image(&self, actor: Option<&Actor>, id: Uuid, upload: Upload) -> DomainResult<CommentView> {
        let actor = authenticated(actor)?;
        let mut comment = self.load(id).await?;
        author_or_read_only(actor, Action::Update, comment.author_id)?;

        let ext = self.policy.validate(&upload)?;
        let key = format!("comments/{id}/{}.{ext}", Uuid::new_v4());
        let reference = self.media.store(&key, upload.data, &upload.content_type).await?;

        let previous = comment.image.replace(reference);
        if !self.comments.update(&comment).await? {
            return Err(DomainError::not_found("Comment", id));
        }
        if let Some(old) = previous {
            self.discard(&old).await;
        }
        Ok(comment.into())
    }

    /// Signed URL of the comment's attached image.
    pub async fn image_url(&self, actor: Option<&Actor>, id: Uuid) -> DomainResult<String> {
        authenticated(actor)?;
        let comment = self.load(id).await?;
        let reference = comment
            .image
            .ok_or_else(|| DomainError::not_found("CommentImage", id))?;
        self.media.signed_url(&reference, self.policy.url_ttl).await
    }

    async fn load(&self, id: Uuid) -> DomainResult<Comment> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", id))
    }

    async fn discard(&self, reference: &str) {
        if let Err(e) = self.media.delete(reference).await {
            warn!(reference, error = %e, "failed to remove comment image");
        }
    }

    /// Breadth-first walk below `root`, then assembly into nested nodes.
    async fn render(&self, root: Comment) -> DomainResult<CommentNode> {
        let mut visited = HashSet::from([root.id]);
        let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        let mut frontier = vec![root.id];

        for depth in 0..=self.limits.max_depth {
            let mut next = Vec::new();
            for id in frontier {
                let count = self.comments.count_replies(id).await?;
                counts.insert(id, count);
                if count == 0 || depth == self.limits.max_depth {
                    continue;
                }

                let mut kept = Vec::new();
                for reply in self.comments.replies(id, self.limits.per_node).await? {
                    if visited.insert(reply.id) {
                        next.push(reply.id);
                        kept.push(reply);
                    } else {
                        warn!(comment_id = %reply.id, parent = %id, "reply cycle detected, not expanding");
                    }
                }
                children.insert(id, kept);
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(assemble(root, &mut children, &counts))
    }
}

fn assemble(
    comment: Comment,
    children: &mut HashMap<Uuid, Vec<Comment>>,
    counts: &HashMap<Uuid, usize>,
) -> CommentNode {
    let reply_count = counts.get(&comment.id).copied().unwrap_or(0);
    let replies: Vec<CommentNode> = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| assemble(reply, children, counts))
        .collect();

    CommentNode {
        truncated: replies.len() < reply_count,
        reply_count,
        replies,
        comment: comment.into(),
    }
}

fn clean_text(raw: &str) -> DomainResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DomainError::validation("text", "This field may not be blank."));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockCommentRepository, MockMediaStorage, MockPlantRepository};
    use mockall::predicate::eq;

    fn actor(name: &str) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            username: name.into(),
            is_staff: false,
        }
    }

    fn comment(plant_id: Uuid, parent_id: Option<Uuid>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            plant_id,
            author_id: Uuid::new_v4(),
            author_name: "someone".into(),
            parent_id,
            text: "nice".into(),
            image: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn service(comments: MockCommentRepository, plants: MockPlantRepository, limits: ReplyLimits) -> CommentService {
        CommentService::new(
            Arc::new(comments),
            Arc::new(plants),
            Arc::new(MockMediaStorage::new()),
            UploadPolicy::default(),
            limits,
        )
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_touching_the_store() {
        let svc = service(MockCommentRepository::new(), MockPlantRepository::new(), ReplyLimits::default());
        let err = svc
            .create(
                Some(&actor("a")),
                NewComment {
                    text: "   ".into(),
                    plant: Uuid::new_v4(),
                    parent: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "text"));
    }

    #[tokio::test]
    async fn unknown_plant_is_a_validation_error() {
        let mut plants = MockPlantRepository::new();
        plants.expect_find_by_id().returning(|_| Ok(None));
        let svc = service(MockCommentRepository::new(), plants, ReplyLimits::default());
        let err = svc
            .create(
                Some(&actor("a")),
                NewComment {
                    text: "hi".into(),
                    plant: Uuid::new_v4(),
                    parent: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "plant"));
    }

    #[tokio::test]
    async fn reply_on_another_plant_is_rejected() {
        let plant_a = Uuid::new_v4();
        let plant_b = Uuid::new_v4();
        let parent = comment(plant_a, None);
        let parent_id = parent.id;

        let mut plants = MockPlantRepository::new();
        plants.expect_find_by_id().returning(|id| {
            Ok(Some(domains::Plant {
                id,
                name: "Cactus".into(),
                description: "A test cactus".into(),
                tips: "Keep in full sun".into(),
                light_needs: domains::LightNeeds::FullSun,
                water_needs: domains::WaterNeeds::Low,
                care: domains::CareLevel::Easy,
                air_purifying: false,
                allergenic: true,
                size: domains::PlantSize::Small,
                blooms: true,
                category: domains::PlantCategory::Cactus,
                created_at: chrono::Utc::now(),
            }))
        });
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_by_id()
            .with(eq(parent_id))
            .returning(move |_| Ok(Some(parent.clone())));
        comments.expect_insert().never();

        let svc = service(comments, plants, ReplyLimits::default());
        let err = svc
            .create(
                Some(&actor("a")),
                NewComment {
                    text: "reply".into(),
                    plant: plant_b,
                    parent: Some(parent_id),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "parent"));
    }

    #[tokio::test]
    async fn only_the_author_may_edit() {
        let existing = comment(Uuid::new_v4(), None);
        let id = existing.id;
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        comments.expect_update().never();

        let svc = service(comments, MockPlantRepository::new(), ReplyLimits::default());
        let err = svc
            .update(Some(&actor("intruder")), id, CommentEdit { text: "changed".into() })
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    /// A chain root -> c1 -> c2 -> c3 rendered with max_depth 2 stops at c2.
    #[tokio::test]
    async fn render_stops_at_max_depth() {
        let plant = Uuid::new_v4();
        let root = comment(plant, None);
        let c1 = comment(plant, Some(root.id));
        let c2 = comment(plant, Some(c1.id));
        let c3 = comment(plant, Some(c2.id));
        let chain: HashMap<Uuid, Comment> = [(root.id, c1.clone()), (c1.id, c2.clone()), (c2.id, c3)]
            .into_iter()
            .collect();
        let chain = Arc::new(chain);

        let mut comments = MockCommentRepository::new();
        let counts = chain.clone();
        comments
            .expect_count_replies()
            .returning(move |id| Ok(usize::from(counts.contains_key(&id))));
        let replies = chain.clone();
        comments
            .expect_replies()
            .returning(move |id, _| Ok(replies.get(&id).cloned().into_iter().collect()));

        let svc = service(
            comments,
            MockPlantRepository::new(),
            ReplyLimits {
                max_depth: 2,
                per_node: 10,
            },
        );
        let node = svc.render(root).await.unwrap();
        let level1 = &node.replies[0];
        let level2 = &level1.replies[0];
        assert_eq!(level2.comment.id, c2.id);
        assert!(level2.replies.is_empty());
        assert!(level2.truncated);
        assert_eq!(level2.reply_count, 1);
        assert!(!node.truncated);
    }

    #[tokio::test]
    async fn render_never_expands_a_comment_twice() {
        let plant = Uuid::new_v4();
        let root = comment(plant, None);
        let root_again = root.clone();

        let mut comments = MockCommentRepository::new();
        comments.expect_count_replies().returning(|_| Ok(1));
        // the store claims the root is its own reply
        comments
            .expect_replies()
            .returning(move |_, _| Ok(vec![root_again.clone()]));

        let svc = service(comments, MockPlantRepository::new(), ReplyLimits::default());
        let node = svc.render(root).await.unwrap();
        assert!(node.replies.is_empty());
        assert!(node.truncated);
    }

    #[tokio::test]
    async fn render_passes_the_per_node_cap_to_the_store() {
        let plant = Uuid::new_v4();
        let root = comment(plant, None);
        let root_id = root.id;

        let mut comments = MockCommentRepository::new();
        comments
            .expect_count_replies()
            .returning(move |id| Ok(if id == root_id { 25 } else { 0 }));
        comments
            .expect_replies()
            .with(eq(root_id), eq(10))
            .times(1)
            .returning(move |_, limit| Ok((0..limit).map(|_| comment(plant, Some(root_id))).collect()));

        let svc = service(comments, MockPlantRepository::new(), ReplyLimits::default());
        let node = svc.render(root).await.unwrap();
        assert_eq!(node.replies.len(), 10);
        assert_eq!(node.reply_count, 25);
        assert!(node.truncated);
    }
}
