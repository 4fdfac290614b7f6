use anyhow::Context;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::PhotoRef;

/// User record. Never serialized directly; responses go through
/// `PublicUser` so credential and token fields cannot leak.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub contact: String,
    pub password_hash: String,
    pub user_type: String,
    pub occupation: Option<String>,
    pub profile_photo: Option<Json<PhotoRef>>,
    pub is_verified: bool,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<OffsetDateTime>,
    pub otp_last_sent_at: Option<OffsetDateTime>,
    /// The single currently-valid refresh token; rotation replaces it,
    /// logout clears it.
    pub refresh_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, username, email, contact, password_hash, user_type, occupation, \
     profile_photo, is_verified, otp_code, otp_expires_at, otp_last_sent_at, refresh_token, \
     created_at, updated_at";

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub contact: String,
    pub password_hash: String,
    pub user_type: String,
    pub occupation: Option<String>,
    pub profile_photo: Option<PhotoRef>,
    pub otp_code: String,
    pub otp_expires_at: OffsetDateTime,
    pub otp_last_sent_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Login lookup: the identifier matches either username or email.
    pub async fn find_by_identifier(db: &PgPool, identifier: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(identifier)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn username_or_email_exists(
        db: &PgPool,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn username_taken_by_other(
        db: &PgPool,
        username: &str,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
        )
        .bind(username)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn create(db: &PgPool, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, contact, password_hash, user_type, occupation, \
             profile_photo, otp_code, otp_expires_at, otp_last_sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.contact)
        .bind(new.password_hash)
        .bind(new.user_type)
        .bind(new.occupation)
        .bind(new.profile_photo.map(Json))
        .bind(new.otp_code)
        .bind(new.otp_expires_at)
        .bind(new.otp_last_sent_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_refresh_token(
        db: &PgPool,
        user_id: Uuid,
        token: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET refresh_token = $1, updated_at = now() WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_otp(
        db: &PgPool,
        user_id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
        sent_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET otp_code = $1, otp_expires_at = $2, otp_last_sent_at = $3, \
             updated_at = now() WHERE id = $4",
        )
        .bind(code)
        .bind(expires_at)
        .bind(sent_at)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn mark_verified(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET is_verified = TRUE, otp_code = NULL, otp_expires_at = NULL, \
             otp_last_sent_at = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_password(db: &PgPool, user_id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
            .bind(hash)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_profile(db: &PgPool, user: &User) -> anyhow::Result<User> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = $1, contact = $2, user_type = $3, occupation = $4, \
             profile_photo = $5, updated_at = now() WHERE id = $6 RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.contact)
        .bind(&user.user_type)
        .bind(&user.occupation)
        .bind(user.profile_photo.as_ref().map(|p| Json(&p.0)))
        .bind(user.id)
        .fetch_one(db)
        .await?;
        Ok(updated)
    }
}

/// Who inherits a roommate post when its creator leaves: the first listed
/// co-occupant that is not the departing user, or nobody.
pub fn next_post_owner(departing: Uuid, occupants: &[Uuid]) -> Option<Uuid> {
    occupants.iter().copied().find(|u| *u != departing)
}

/// Deletes a user and everything they own in one transaction. Returns the
/// photo references of the removed records so the caller can clean object
/// storage after commit.
pub async fn delete_cascade(
    db: &PgPool,
    user_id: Uuid,
    profile_photo: Option<PhotoRef>,
) -> anyhow::Result<Vec<PhotoRef>> {
    let mut tx = db.begin().await.context("begin delete cascade")?;
    let mut photos: Vec<PhotoRef> = profile_photo.into_iter().collect();

    let room_photos: Vec<(Json<Vec<PhotoRef>>,)> =
        sqlx::query_as("SELECT photos FROM rooms WHERE owner = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
    photos.extend(room_photos.into_iter().flat_map(|(p,)| p.0));

    let tiffin_photos: Vec<(Json<Vec<PhotoRef>>,)> =
        sqlx::query_as("SELECT photos FROM tiffins WHERE owner = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
    photos.extend(tiffin_photos.into_iter().flat_map(|(p,)| p.0));

    // Prune the user from co-occupant lists before deciding post ownership.
    sqlx::query(
        "UPDATE roommate_posts SET currently_living_users = \
         array_remove(currently_living_users, $1), updated_at = now() \
         WHERE $1 = ANY(currently_living_users)",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let posts: Vec<(Uuid, Vec<Uuid>, Json<Vec<PhotoRef>>)> = sqlx::query_as(
        "SELECT id, currently_living_users, photos FROM roommate_posts WHERE created_by = $1",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;
    for (post_id, occupants, post_photos) in posts {
        match next_post_owner(user_id, &occupants) {
            Some(heir) => {
                sqlx::query(
                    "UPDATE roommate_posts SET created_by = $1, updated_at = now() WHERE id = $2",
                )
                .bind(heir)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                photos.extend(post_photos.0);
                sqlx::query("DELETE FROM roommate_posts WHERE id = $1")
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query("DELETE FROM rooms WHERE owner = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tiffins WHERE owner = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM lpg_services WHERE owner = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM house_services WHERE provider = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM wifi_sharings WHERE owner = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    // Payments reference bookings, so they go first.
    sqlx::query("DELETE FROM payments WHERE customer = $1 OR service_provider = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bookings WHERE customer = $1 OR provider = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.context("commit delete cascade")?;
    Ok(photos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_post_owner_skips_departing_user() {
        let departing = Uuid::new_v4();
        let heir = Uuid::new_v4();
        assert_eq!(next_post_owner(departing, &[departing, heir]), Some(heir));
        assert_eq!(next_post_owner(departing, &[heir]), Some(heir));
    }

    #[test]
    fn next_post_owner_none_when_alone() {
        let departing = Uuid::new_v4();
        assert_eq!(next_post_owner(departing, &[departing]), None);
        assert_eq!(next_post_owner(departing, &[]), None);
    }
}
