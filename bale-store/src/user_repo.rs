use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bale_core::repository::{CartRepository, RatingRepository, UserRepository};
use bale_core::*;

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    role: String,
    trust_score: i32,
    trust_total_error: f64,
    trust_rated_count: i32,
    is_blacklisted: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> CoreResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            role: self.role.parse()?,
            trust: TrustProfile {
                trust_score: self.trust_score,
                trust_total_error: self.trust_total_error,
                trust_rated_count: u32::try_from(self.trust_rated_count).unwrap_or(0),
                is_blacklisted: self.is_blacklisted,
            },
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, trust_score, trust_total_error, trust_rated_count, is_blacklisted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.trust.trust_score)
        .bind(user.trust.trust_total_error)
        .bind(i32::try_from(user.trust.trust_rated_count).map_err(CoreError::repository)?)
        .bind(user.trust.is_blacklisted)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role, trust_score, trust_total_error, trust_rated_count, is_blacklisted, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn update_trust_data(&self, id: Uuid, trust: &TrustProfile) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET trust_score = $2, trust_total_error = $3, trust_rated_count = $4, is_blacklisted = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(trust.trust_score)
        .bind(trust.trust_total_error)
        .bind(i32::try_from(trust.trust_rated_count).map_err(CoreError::repository)?)
        .bind(trust.is_blacklisted)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::RepositoryError(format!("user {} does not exist", id)));
        }
        Ok(())
    }

    async fn count_users(&self) -> CoreResult<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(n.max(0) as u64)
    }
}

// ============================================================================
// Cart
// ============================================================================

pub struct StoreCartRepository {
    pool: PgPool,
}

impl StoreCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    listing_id: Uuid,
    title: String,
    price_cents: i64,
    image_url: String,
    grade: String,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            listing_id: row.listing_id,
            title: row.title,
            price_cents: row.price_cents,
            image_url: row.image_url,
            grade: row.grade,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CartRepository for StoreCartRepository {
    async fn add_item(&self, item: &CartItem) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, listing_id, title, price_cents, image_url, grade, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(item.listing_id)
        .bind(&item.title)
        .bind(item.price_cents)
        .bind(&item.image_url)
        .bind(&item.grade)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(())
    }

    async fn list_items(&self, user_id: Uuid) -> CoreResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, listing_id, title, price_cents, image_url, grade, created_at \
             FROM cart_items WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn remove_item(&self, user_id: Uuid, listing_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::repository)?;
        Ok(())
    }
}

pub struct StoreRatingRepository {
    pool: PgPool,
}

impl StoreRatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepository for StoreRatingRepository {
    async fn record_rating(&self, rating: &ReviewRating) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO review_ratings (id, reviewer_id, product_id, order_id, rating, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (reviewer_id, product_id) DO NOTHING
            "#,
        )
        .bind(rating.id)
        .bind(rating.reviewer_id)
        .bind(rating.product_id)
        .bind(rating.order_id)
        .bind(rating.rating)
        .bind(rating.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::repository)?;
        Ok(result.rows_affected() > 0)
    }

    async fn has_rated(&self, reviewer_id: Uuid, product_id: Uuid) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM review_ratings WHERE reviewer_id = $1 AND product_id = $2)",
        )
        .bind(reviewer_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(CoreError::repository)
    }
}
