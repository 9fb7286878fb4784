//! # In-memory store
//!
//! A single `MemoryStore` implements every repository port so cascades can
//! cross tables the way SQL foreign keys do. Uniqueness indexes are kept in
//! their own `DashMap`s; `DashMap::entry` holds the shard lock across the
//! check and the insert, which is what makes get-or-create atomic.
//!
//! Lock order: an index map may be locked before its row map, never the
//! other way round.

mod media;

pub use media::MemoryMediaStorage;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Comment, CommentRepository, DomainResult, Plant, PlantFilter, PlantImage,
    PlantImageRepository, PlantRepository, Rating, RatingRepository, Reassign, User,
    UserRepository, WishList, WishListRepository,
};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    plants: DashMap<Uuid, Plant>,
    images: DashMap<Uuid, PlantImage>,
    comments: DashMap<Uuid, Comment>,
    wishlists: DashMap<Uuid, WishList>,
    /// (user, plant) -> wishlist entry id
    wishlist_keys: DashMap<(Uuid, Uuid), Uuid>,
    ratings: DashMap<Uuid, Rating>,
    /// (plant, user) -> rating id
    rating_keys: DashMap<(Uuid, Uuid), Uuid>,
    users: DashMap<Uuid, User>,
    /// email -> user id
    emails: DashMap<String, Uuid>,
    /// username -> user id
    usernames: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_wishlist(&self, id: Uuid) -> Option<WishList> {
        let (_, entry) = self.wishlists.remove(&id)?;
        if let Some(plant_id) = entry.plant_id {
            self.wishlist_keys
                .remove_if(&(entry.user_id, plant_id), |_, v| *v == id);
        }
        Some(entry)
    }

    fn remove_rating(&self, id: Uuid) -> Option<Rating> {
        let (_, rating) = self.ratings.remove(&id)?;
        self.rating_keys
            .remove_if(&(rating.plant_id, rating.user_id), |_, v| *v == id);
        Some(rating)
    }

    /// Ids of `root` and every comment below it.
    fn subtree(&self, root: Uuid) -> Vec<Uuid> {
        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            let parent = ids[cursor];
            let children: Vec<Uuid> = self
                .comments
                .iter()
                .filter(|c| c.parent_id == Some(parent) && !ids.contains(&c.id))
                .map(|c| c.id)
                .collect();
            ids.extend(children);
            cursor += 1;
        }
        ids
    }
}

fn oldest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid),
{
    rows.sort_by_key(|row| key(row));
}

#[async_trait]
impl PlantRepository for MemoryStore {
    async fn insert(&self, plant: &Plant) -> DomainResult<()> {
        self.plants.insert(plant.id, plant.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Plant>> {
        Ok(self.plants.get(&id).map(|p| p.clone()))
    }

    async fn list(&self, filter: &PlantFilter) -> DomainResult<Vec<Plant>> {
        let mut plants: Vec<Plant> = self
            .plants
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| p.clone())
            .collect();
        // Same key as the Postgres ORDER BY: case-folded name, then the
        // exact name, then id.
        plants.sort_by_cached_key(|p| (p.name.to_lowercase(), p.name.clone(), p.id));
        Ok(plants)
    }

    async fn update(&self, plant: &Plant) -> DomainResult<bool> {
        match self.plants.get_mut(&plant.id) {
            Some(mut row) => {
                *row = plant.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        if self.plants.remove(&id).is_none() {
            return Ok(false);
        }
        self.images.retain(|_, img| img.plant_id != id);
        self.comments.retain(|_, c| c.plant_id != id);

        let ratings: Vec<Uuid> = self
            .ratings
            .iter()
            .filter(|r| r.plant_id == id)
            .map(|r| r.id)
            .collect();
        for rating in ratings {
            self.remove_rating(rating);
        }

        let entries: Vec<Uuid> = self
            .wishlists
            .iter()
            .filter(|w| w.plant_id == Some(id))
            .map(|w| w.id)
            .collect();
        for entry in entries {
            self.remove_wishlist(entry);
        }
        Ok(true)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert(&self, comment: &Comment) -> DomainResult<()> {
        self.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| plant_id.is_none_or(|p| c.plant_id == p))
            .map(|c| c.clone())
            .collect();
        oldest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn top_level(&self, plant_id: Uuid) -> DomainResult<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.plant_id == plant_id && c.parent_id.is_none())
            .map(|c| c.clone())
            .collect();
        oldest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn replies(&self, parent_id: Uuid, limit: usize) -> DomainResult<Vec<Comment>> {
        let mut rows: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .map(|c| c.clone())
            .collect();
        oldest_first(&mut rows, |c| (c.created_at, c.id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_replies(&self, parent_id: Uuid) -> DomainResult<usize> {
        Ok(self
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .count())
    }

    async fn update(&self, comment: &Comment) -> DomainResult<bool> {
        match self.comments.get_mut(&comment.id) {
            Some(mut row) => {
                *row = comment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> DomainResult<Vec<Comment>> {
        if !self.comments.contains_key(&id) {
            return Ok(Vec::new());
        }
        Ok(self
            .subtree(id)
            .into_iter()
            .filter_map(|cid| self.comments.remove(&cid).map(|(_, c)| c))
            .collect())
    }
}

#[async_trait]
impl WishListRepository for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid, plant_id: Uuid) -> DomainResult<(WishList, bool)> {
        match self.wishlist_keys.entry((user_id, plant_id)) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                let entry = self
                    .wishlists
                    .get(&id)
                    .map(|w| w.clone())
                    .ok_or_else(|| domains::DomainError::Internal(format!("wishlist index points at missing entry {id}")))?;
                Ok((entry, false))
            }
            Entry::Vacant(slot) => {
                let entry = WishList {
                    id: Uuid::new_v4(),
                    user_id,
                    plant_id: Some(plant_id),
                    created_at: chrono::Utc::now(),
                };
                self.wishlists.insert(entry.id, entry.clone());
                slot.insert(entry.id);
                Ok((entry, true))
            }
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<WishList>> {
        let mut rows: Vec<WishList> = self
            .wishlists
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.clone())
            .collect();
        oldest_first(&mut rows, |w| (w.created_at, w.id));
        Ok(rows)
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<Option<WishList>> {
        Ok(self
            .wishlists
            .get(&id)
            .filter(|w| w.user_id == user_id)
            .map(|w| w.clone()))
    }

    async fn reassign(&self, user_id: Uuid, id: Uuid, plant_id: Uuid) -> DomainResult<Reassign> {
        let Some(current) = self.find_for_user(user_id, id).await? else {
            return Ok(Reassign::Missing);
        };

        match self.wishlist_keys.entry((user_id, plant_id)) {
            Entry::Occupied(owner) if *owner.get() == id => return Ok(Reassign::Moved(current)),
            Entry::Occupied(_) => return Ok(Reassign::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        if let Some(old) = current.plant_id {
            self.wishlist_keys.remove_if(&(user_id, old), |_, v| *v == id);
        }
        let moved = WishList {
            plant_id: Some(plant_id),
            ..current
        };
        self.wishlists.insert(id, moved.clone());
        Ok(Reassign::Moved(moved))
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<bool> {
        let owned = self
            .wishlists
            .get(&id)
            .is_some_and(|w| w.user_id == user_id);
        Ok(owned && self.remove_wishlist(id).is_some())
    }
}

#[async_trait]
impl RatingRepository for MemoryStore {
    async fn insert_unique(&self, rating: &Rating) -> DomainResult<bool> {
        match self.rating_keys.entry((rating.plant_id, rating.user_id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                self.ratings.insert(rating.id, rating.clone());
                slot.insert(rating.id);
                Ok(true)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Rating>> {
        Ok(self.ratings.get(&id).map(|r| r.clone()))
    }

    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Rating>> {
        let mut rows: Vec<Rating> = self
            .ratings
            .iter()
            .filter(|r| plant_id.is_none_or(|p| r.plant_id == p))
            .map(|r| r.clone())
            .collect();
        oldest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn values_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<i16>> {
        Ok(self
            .ratings
            .iter()
            .filter(|r| r.plant_id == plant_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn update_value(&self, id: Uuid, value: i16) -> DomainResult<bool> {
        match self.ratings.get_mut(&id) {
            Some(mut row) => {
                row.rating = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.remove_rating(id).is_some())
    }
}

#[async_trait]
impl PlantImageRepository for MemoryStore {
    async fn insert(&self, image: &PlantImage) -> DomainResult<()> {
        self.images.insert(image.id, image.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PlantImage>> {
        Ok(self.images.get(&id).map(|i| i.clone()))
    }

    async fn list_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<PlantImage>> {
        let mut rows: Vec<PlantImage> = self
            .images
            .iter()
            .filter(|i| i.plant_id == plant_id)
            .map(|i| i.clone())
            .collect();
        oldest_first(&mut rows, |i| (i.uploaded_at, i.id));
        Ok(rows)
    }

    async fn list_all(&self) -> DomainResult<Vec<PlantImage>> {
        let mut rows: Vec<PlantImage> = self.images.iter().map(|i| i.clone()).collect();
        oldest_first(&mut rows, |i| (i.uploaded_at, i.id));
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.images.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> DomainResult<bool> {
        let Entry::Vacant(email_slot) = self.emails.entry(user.email.clone()) else {
            return Ok(false);
        };
        let Entry::Vacant(name_slot) = self.usernames.entry(user.username.clone()) else {
            return Ok(false);
        };
        self.users.insert(user.id, user.clone());
        name_slot.insert(user.id);
        email_slot.insert(user.id);
        Ok(true)
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }
}
