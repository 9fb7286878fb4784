//! # PostgreSQL implementation
//!
//! Maps between the relational schema in `migrations/` and the `domains`
//! models. Uniqueness and cascades are enforced by the schema itself:
//! inserts that could collide use `ON CONFLICT DO NOTHING RETURNING`, so
//! concurrent requests are serialized by the database, not by us.

use std::str::FromStr;

use async_trait::async_trait;
use domains::{
    Comment, CommentRepository, DomainError, DomainResult, Plant, PlantFilter, PlantImage,
    PlantImageRepository, PlantRepository, Rating, RatingRepository, Reassign, User,
    UserRepository, WishList, WishListRepository,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> DomainResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::Internal(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

fn parse_choice<T: FromStr>(row: &PgRow, column: &str) -> DomainResult<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(db_err)?;
    raw.parse()
        .map_err(|e| DomainError::Internal(format!("column {column}: {e}")))
}

fn plant_from_row(row: &PgRow) -> DomainResult<Plant> {
    Ok(Plant {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        tips: row.try_get("tips").map_err(db_err)?,
        light_needs: parse_choice(row, "light_needs")?,
        water_needs: parse_choice(row, "water_needs")?,
        care: parse_choice(row, "care")?,
        air_purifying: row.try_get("air_purifying").map_err(db_err)?,
        allergenic: row.try_get("allergenic").map_err(db_err)?,
        size: parse_choice(row, "size")?,
        blooms: row.try_get("blooms").map_err(db_err)?,
        category: parse_choice(row, "category")?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn comment_from_row(row: &PgRow) -> DomainResult<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(db_err)?,
        plant_id: row.try_get("plant_id").map_err(db_err)?,
        author_id: row.try_get("author_id").map_err(db_err)?,
        author_name: row.try_get("author_name").map_err(db_err)?,
        parent_id: row.try_get("parent_id").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        image: row.try_get("image").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn wishlist_from_row(row: &PgRow) -> DomainResult<WishList> {
    Ok(WishList {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        plant_id: row.try_get("plant_id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn rating_from_row(row: &PgRow) -> DomainResult<Rating> {
    Ok(Rating {
        id: row.try_get("id").map_err(db_err)?,
        plant_id: row.try_get("plant_id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        rating: row.try_get("rating").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn image_from_row(row: &PgRow) -> DomainResult<PlantImage> {
    Ok(PlantImage {
        id: row.try_get("id").map_err(db_err)?,
        plant_id: row.try_get("plant_id").map_err(db_err)?,
        storage_key: row.try_get("storage_key").map_err(db_err)?,
        content_type: row.try_get("content_type").map_err(db_err)?,
        size_bytes: row.try_get("size_bytes").map_err(db_err)?,
        uploaded_at: row.try_get("uploaded_at").map_err(db_err)?,
    })
}

fn user_from_row(row: &PgRow) -> DomainResult<User> {
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        username: row.try_get("username").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        is_staff: row.try_get("is_staff").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn collect<T>(rows: Vec<PgRow>, map: fn(&PgRow) -> DomainResult<T>) -> DomainResult<Vec<T>> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl PlantRepository for PgStore {
    async fn insert(&self, plant: &Plant) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO plants (id, name, description, tips, light_needs, water_needs, care, \
             air_purifying, allergenic, size, blooms, category, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(plant.id)
        .bind(&plant.name)
        .bind(&plant.description)
        .bind(&plant.tips)
        .bind(plant.light_needs.as_str())
        .bind(plant.water_needs.as_str())
        .bind(plant.care.as_str())
        .bind(plant.air_purifying)
        .bind(plant.allergenic)
        .bind(plant.size.as_str())
        .bind(plant.blooms)
        .bind(plant.category.as_str())
        .bind(plant.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Plant>> {
        let row = sqlx::query("SELECT * FROM plants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(plant_from_row).transpose()
    }

    async fn list(&self, filter: &PlantFilter) -> DomainResult<Vec<Plant>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM plants WHERE TRUE");
        if let Some(name) = &filter.name {
            let escaped = name.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
            qb.push(" AND name ILIKE ").push_bind(format!("%{escaped}%"));
        }
        if let Some(size) = filter.size {
            qb.push(" AND size = ").push_bind(size.as_str());
        }
        if let Some(blooms) = filter.blooms {
            qb.push(" AND blooms = ").push_bind(blooms);
        }
        if let Some(water) = filter.water_needs {
            qb.push(" AND water_needs = ").push_bind(water.as_str());
        }
        if let Some(light) = filter.light_needs {
            qb.push(" AND light_needs = ").push_bind(light.as_str());
        }
        if let Some(allergenic) = filter.allergenic {
            qb.push(" AND allergenic = ").push_bind(allergenic);
        }
        if let Some(air) = filter.air_purifying {
            qb.push(" AND air_purifying = ").push_bind(air);
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        qb.push(r#" ORDER BY lower(name) COLLATE "C", name COLLATE "C", id"#);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        collect(rows, plant_from_row)
    }

    async fn update(&self, plant: &Plant) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE plants SET name = $2, description = $3, tips = $4, light_needs = $5, \
             water_needs = $6, care = $7, air_purifying = $8, allergenic = $9, size = $10, \
             blooms = $11, category = $12 WHERE id = $1",
        )
        .bind(plant.id)
        .bind(&plant.name)
        .bind(&plant.description)
        .bind(&plant.tips)
        .bind(plant.light_needs.as_str())
        .bind(plant.water_needs.as_str())
        .bind(plant.care.as_str())
        .bind(plant.air_purifying)
        .bind(plant.allergenic)
        .bind(plant.size.as_str())
        .bind(plant.blooms)
        .bind(plant.category.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM plants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn insert(&self, comment: &Comment) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, plant_id, author_id, author_name, parent_id, text, image, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(comment.id)
        .bind(comment.plant_id)
        .bind(comment.author_id)
        .bind(&comment.author_name)
        .bind(comment.parent_id)
        .bind(&comment.text)
        .bind(&comment.image)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Comment>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE ($1::uuid IS NULL OR plant_id = $1) ORDER BY created_at, id",
        )
        .bind(plant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, comment_from_row)
    }

    async fn top_level(&self, plant_id: Uuid) -> DomainResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE plant_id = $1 AND parent_id IS NULL ORDER BY created_at, id",
        )
        .bind(plant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, comment_from_row)
    }

    async fn replies(&self, parent_id: Uuid, limit: usize) -> DomainResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT * FROM comments WHERE parent_id = $1 ORDER BY created_at, id LIMIT $2",
        )
        .bind(parent_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, comment_from_row)
    }

    async fn count_replies(&self, parent_id: Uuid) -> DomainResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE parent_id = $1")
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn update(&self, comment: &Comment) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE comments SET text = $2, image = $3 WHERE id = $1")
            .bind(comment.id)
            .bind(&comment.text)
            .bind(&comment.image)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// The FK cascade would remove the subtree on its own; the recursive
    /// CTE is there so every removed row comes back to the caller.
    async fn delete(&self, id: Uuid) -> DomainResult<Vec<Comment>> {
        let rows = sqlx::query(
            "WITH RECURSIVE subtree AS ( \
                 SELECT id FROM comments WHERE id = $1 \
                 UNION \
                 SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id \
             ) \
             DELETE FROM comments WHERE id IN (SELECT id FROM subtree) RETURNING *",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, comment_from_row)
    }
}

#[async_trait]
impl WishListRepository for PgStore {
    async fn get_or_create(&self, user_id: Uuid, plant_id: Uuid) -> DomainResult<(WishList, bool)> {
        let inserted = sqlx::query(
            "INSERT INTO wishlists (id, user_id, plant_id, created_at) VALUES ($1, $2, $3, now()) \
             ON CONFLICT (user_id, plant_id) DO NOTHING RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(plant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = inserted {
            return Ok((wishlist_from_row(&row)?, true));
        }

        // Conflict: the pair already exists.
        let row = sqlx::query("SELECT * FROM wishlists WHERE user_id = $1 AND plant_id = $2")
            .bind(user_id)
            .bind(plant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok((wishlist_from_row(&row)?, false))
    }

    async fn list_for_user(&self, user_id: Uuid) -> DomainResult<Vec<WishList>> {
        let rows = sqlx::query("SELECT * FROM wishlists WHERE user_id = $1 ORDER BY created_at, id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        collect(rows, wishlist_from_row)
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<Option<WishList>> {
        let row = sqlx::query("SELECT * FROM wishlists WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(wishlist_from_row).transpose()
    }

    async fn reassign(&self, user_id: Uuid, id: Uuid, plant_id: Uuid) -> DomainResult<Reassign> {
        let result = sqlx::query(
            "UPDATE wishlists SET plant_id = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(plant_id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(Reassign::Moved(wishlist_from_row(&row)?)),
            Ok(None) => Ok(Reassign::Missing),
            Err(e) if is_unique_violation(&e) => Ok(Reassign::Duplicate),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM wishlists WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RatingRepository for PgStore {
    async fn insert_unique(&self, rating: &Rating) -> DomainResult<bool> {
        let result = sqlx::query(
            "INSERT INTO ratings (id, plant_id, user_id, rating, created_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (plant_id, user_id) DO NOTHING",
        )
        .bind(rating.id)
        .bind(rating.plant_id)
        .bind(rating.user_id)
        .bind(rating.rating)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Rating>> {
        let row = sqlx::query("SELECT * FROM ratings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(rating_from_row).transpose()
    }

    async fn list(&self, plant_id: Option<Uuid>) -> DomainResult<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT * FROM ratings WHERE ($1::uuid IS NULL OR plant_id = $1) ORDER BY created_at, id",
        )
        .bind(plant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows, rating_from_row)
    }

    async fn values_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<i16>> {
        sqlx::query_scalar::<_, i16>("SELECT rating FROM ratings WHERE plant_id = $1")
            .bind(plant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_value(&self, id: Uuid, value: i16) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE ratings SET rating = $2 WHERE id = $1")
            .bind(id)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PlantImageRepository for PgStore {
    async fn insert(&self, image: &PlantImage) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO plant_images (id, plant_id, storage_key, content_type, size_bytes, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(image.id)
        .bind(image.plant_id)
        .bind(&image.storage_key)
        .bind(&image.content_type)
        .bind(image.size_bytes)
        .bind(image.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PlantImage>> {
        let row = sqlx::query("SELECT * FROM plant_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(image_from_row).transpose()
    }

    async fn list_for_plant(&self, plant_id: Uuid) -> DomainResult<Vec<PlantImage>> {
        let rows = sqlx::query("SELECT * FROM plant_images WHERE plant_id = $1 ORDER BY uploaded_at, id")
            .bind(plant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        collect(rows, image_from_row)
    }

    async fn list_all(&self) -> DomainResult<Vec<PlantImage>> {
        let rows = sqlx::query("SELECT * FROM plant_images ORDER BY uploaded_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        collect(rows, image_from_row)
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM plant_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, user: &User) -> DomainResult<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, username, password_hash, is_staff, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }
}
