use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::listings::{push_radius_filter, Address, GeoFilter};
use crate::rooms::dto::{NewRoom, RoomQuery};
use crate::storage::PhotoRef;

#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub owner: Uuid,
    pub rent_per_month: f64,
    pub category: String,
    pub is_available: bool,
    pub other_services: Vec<String>,
    pub customer_gender: String,
    pub longitude: f64,
    pub latitude: f64,
    pub address: Json<Address>,
    pub photos: Json<Vec<PhotoRef>>,
    pub rating_average: f64,
    pub rating_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const ROOM_COLUMNS: &str = "id, owner, rent_per_month, category, is_available, other_services, \
     customer_gender, longitude, latitude, address, photos, rating_average, rating_count, \
     created_at, updated_at";

pub async fn insert(
    db: &PgPool,
    owner: Uuid,
    new: NewRoom,
    photos: Vec<PhotoRef>,
) -> anyhow::Result<Room> {
    let room = sqlx::query_as::<_, Room>(&format!(
        "INSERT INTO rooms (owner, rent_per_month, category, other_services, customer_gender, \
         longitude, latitude, address, photos) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {ROOM_COLUMNS}"
    ))
    .bind(owner)
    .bind(new.rent_per_month)
    .bind(&new.category)
    .bind(&new.other_services)
    .bind(&new.customer_gender)
    .bind(new.location.longitude())
    .bind(new.location.latitude())
    .bind(Json(&new.address))
    .bind(Json(&photos))
    .fetch_one(db)
    .await?;
    Ok(room)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Room>> {
    let room = sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(room)
}

/// Writes back a re-read and mutated row (last write wins).
pub async fn update(db: &PgPool, room: &Room) -> anyhow::Result<Room> {
    let updated = sqlx::query_as::<_, Room>(&format!(
        "UPDATE rooms SET rent_per_month = $1, category = $2, is_available = $3, \
         other_services = $4, customer_gender = $5, longitude = $6, latitude = $7, \
         address = $8, photos = $9, updated_at = now() \
         WHERE id = $10 RETURNING {ROOM_COLUMNS}"
    ))
    .bind(room.rent_per_month)
    .bind(&room.category)
    .bind(room.is_available)
    .bind(&room.other_services)
    .bind(&room.customer_gender)
    .bind(room.longitude)
    .bind(room.latitude)
    .bind(Json(&room.address.0))
    .bind(Json(&room.photos.0))
    .bind(room.id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_owner(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<Room>> {
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE owner = $1 ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(db)
    .await?;
    Ok(rooms)
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    q: &'a RoomQuery,
    geo: &Option<GeoFilter>,
) {
    if let Some(category) = &q.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(gender) = &q.gender {
        qb.push(" AND customer_gender = ").push_bind(gender);
    }
    if let Some(city) = &q.city {
        qb.push(" AND address->>'city' = ").push_bind(city);
    }
    if let Some(state) = &q.state {
        qb.push(" AND address->>'state' = ").push_bind(state);
    }
    if let Some(geo) = geo {
        push_radius_filter(qb, geo);
    }
}

/// Filtered page, newest first, plus the full filtered count.
pub async fn search(
    db: &PgPool,
    q: &RoomQuery,
    geo: &Option<GeoFilter>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Room>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE TRUE"
    ));
    push_filters(&mut qb, q, geo);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rooms: Vec<Room> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rooms WHERE TRUE");
    push_filters(&mut count_qb, q, geo);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(db).await?;

    Ok((rooms, total))
}
