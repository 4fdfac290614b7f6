use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::listings::{push_radius_filter, Address, GeoFilter};
use crate::roommates::dto::{NewRoommatePost, RoommateQuery};
use crate::storage::PhotoRef;

#[derive(Debug, Clone, FromRow)]
pub struct RoommatePost {
    pub id: Uuid,
    pub created_by: Uuid,
    pub post_type: String,
    pub rent: Option<f64>,
    pub other_services: Vec<String>,
    pub gender_preference: String,
    pub currently_living_users: Vec<Uuid>,
    pub looking_for: Option<i32>,
    pub available_from: Option<Date>,
    pub address: Json<Address>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub photos: Json<Vec<PhotoRef>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const POST_COLUMNS: &str = "id, created_by, post_type, rent, other_services, gender_preference, \
     currently_living_users, looking_for, available_from, address, longitude, latitude, photos, \
     created_at, updated_at";

pub async fn insert(
    db: &PgPool,
    created_by: Uuid,
    new: NewRoommatePost,
    photos: Vec<PhotoRef>,
) -> anyhow::Result<RoommatePost> {
    let post = sqlx::query_as::<_, RoommatePost>(&format!(
        "INSERT INTO roommate_posts (created_by, post_type, rent, other_services, \
         gender_preference, currently_living_users, looking_for, available_from, address, \
         longitude, latitude, photos) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(created_by)
    .bind(&new.post_type)
    .bind(new.rent)
    .bind(&new.other_services)
    .bind(&new.gender_preference)
    .bind(&new.currently_living_users)
    .bind(new.looking_for)
    .bind(new.available_from)
    .bind(Json(&new.address))
    .bind(new.location.as_ref().map(|l| l.longitude()))
    .bind(new.location.as_ref().map(|l| l.latitude()))
    .bind(Json(&photos))
    .fetch_one(db)
    .await?;
    Ok(post)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RoommatePost>> {
    let post = sqlx::query_as::<_, RoommatePost>(&format!(
        "SELECT {POST_COLUMNS} FROM roommate_posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(post)
}

pub async fn update(db: &PgPool, post: &RoommatePost) -> anyhow::Result<RoommatePost> {
    let updated = sqlx::query_as::<_, RoommatePost>(&format!(
        "UPDATE roommate_posts SET rent = $1, other_services = $2, gender_preference = $3, \
         currently_living_users = $4, looking_for = $5, available_from = $6, address = $7, \
         longitude = $8, latitude = $9, photos = $10, updated_at = now() \
         WHERE id = $11 RETURNING {POST_COLUMNS}"
    ))
    .bind(post.rent)
    .bind(&post.other_services)
    .bind(&post.gender_preference)
    .bind(&post.currently_living_users)
    .bind(post.looking_for)
    .bind(post.available_from)
    .bind(Json(&post.address.0))
    .bind(post.longitude)
    .bind(post.latitude)
    .bind(Json(&post.photos.0))
    .bind(post.id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM roommate_posts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_creator(db: &PgPool, created_by: Uuid) -> anyhow::Result<Vec<RoommatePost>> {
    let posts = sqlx::query_as::<_, RoommatePost>(&format!(
        "SELECT {POST_COLUMNS} FROM roommate_posts WHERE created_by = $1 ORDER BY created_at DESC"
    ))
    .bind(created_by)
    .fetch_all(db)
    .await?;
    Ok(posts)
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    q: &'a RoommateQuery,
    geo: &Option<GeoFilter>,
) {
    if let Some(post_type) = &q.post_type {
        qb.push(" AND post_type = ").push_bind(post_type);
    }
    if let Some(gender) = &q.gender {
        qb.push(" AND gender_preference = ").push_bind(gender);
    }
    if let Some(city) = &q.city {
        qb.push(" AND address->>'city' = ").push_bind(city);
    }
    if let Some(geo) = geo {
        push_radius_filter(qb, geo);
    }
}

pub async fn search(
    db: &PgPool,
    q: &RoommateQuery,
    geo: &Option<GeoFilter>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<RoommatePost>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {POST_COLUMNS} FROM roommate_posts WHERE TRUE"
    ));
    push_filters(&mut qb, q, geo);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let posts: Vec<RoommatePost> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roommate_posts WHERE TRUE");
    push_filters(&mut count_qb, q, geo);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(db).await?;

    Ok((posts, total))
}
