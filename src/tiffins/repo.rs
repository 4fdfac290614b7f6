use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::listings::{push_radius_filter, Address, GeoFilter, Timings};
use crate::storage::PhotoRef;
use crate::tiffins::dto::{NewTiffin, TiffinPrice, TiffinQuery};

#[derive(Debug, Clone, FromRow)]
pub struct Tiffin {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub address: Json<Address>,
    pub delivery_available: bool,
    pub timings: Json<Timings>,
    pub price: Json<TiffinPrice>,
    pub photos: Json<Vec<PhotoRef>>,
    pub landline: Option<String>,
    pub active: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const TIFFIN_COLUMNS: &str = "id, owner, name, longitude, latitude, address, \
     delivery_available, timings, price, photos, landline, active, rating_average, \
     rating_count, created_at, updated_at";

pub async fn insert(
    db: &PgPool,
    owner: Uuid,
    new: NewTiffin,
    photos: Vec<PhotoRef>,
) -> anyhow::Result<Tiffin> {
    let tiffin = sqlx::query_as::<_, Tiffin>(&format!(
        "INSERT INTO tiffins (owner, name, longitude, latitude, address, delivery_available, \
         timings, price, photos, landline) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {TIFFIN_COLUMNS}"
    ))
    .bind(owner)
    .bind(&new.name)
    .bind(new.location.longitude())
    .bind(new.location.latitude())
    .bind(Json(&new.address))
    .bind(new.delivery_available)
    .bind(Json(&new.timings))
    .bind(Json(&new.price))
    .bind(Json(&photos))
    .bind(&new.landline)
    .fetch_one(db)
    .await?;
    Ok(tiffin)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Tiffin>> {
    let tiffin = sqlx::query_as::<_, Tiffin>(&format!(
        "SELECT {TIFFIN_COLUMNS} FROM tiffins WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(tiffin)
}

pub async fn update(db: &PgPool, tiffin: &Tiffin) -> anyhow::Result<Tiffin> {
    let updated = sqlx::query_as::<_, Tiffin>(&format!(
        "UPDATE tiffins SET name = $1, delivery_available = $2, landline = $3, active = $4, \
         address = $5, timings = $6, price = $7, photos = $8, updated_at = now() \
         WHERE id = $9 RETURNING {TIFFIN_COLUMNS}"
    ))
    .bind(&tiffin.name)
    .bind(tiffin.delivery_available)
    .bind(&tiffin.landline)
    .bind(tiffin.active)
    .bind(Json(&tiffin.address.0))
    .bind(Json(&tiffin.timings.0))
    .bind(Json(&tiffin.price.0))
    .bind(Json(&tiffin.photos.0))
    .bind(tiffin.id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM tiffins WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_owner(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<Tiffin>> {
    let tiffins = sqlx::query_as::<_, Tiffin>(&format!(
        "SELECT {TIFFIN_COLUMNS} FROM tiffins WHERE owner = $1 ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(db)
    .await?;
    Ok(tiffins)
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    q: &'a TiffinQuery,
    geo: &Option<GeoFilter>,
) {
    if let Some(city) = &q.city {
        qb.push(" AND address->>'city' = ").push_bind(city);
    }
    if let Some(opening) = &q.opening_time {
        qb.push(" AND timings->>'openingTime' = ").push_bind(opening);
    }
    if let Some(closing) = &q.closing_time {
        qb.push(" AND timings->>'closingTime' = ").push_bind(closing);
    }
    if let Some(delivery) = q.delivery_filter() {
        qb.push(" AND delivery_available = ").push_bind(delivery);
    }
    if let Some(geo) = geo {
        push_radius_filter(qb, geo);
    }
}

pub async fn search(
    db: &PgPool,
    q: &TiffinQuery,
    geo: &Option<GeoFilter>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Tiffin>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {TIFFIN_COLUMNS} FROM tiffins WHERE TRUE"
    ));
    push_filters(&mut qb, q, geo);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let tiffins: Vec<Tiffin> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tiffins WHERE TRUE");
    push_filters(&mut count_qb, q, geo);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(db).await?;

    Ok((tiffins, total))
}
