use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::listings::{push_radius_filter, Address, GeoFilter, Timings};
use crate::lpg::dto::{CylinderTier, LpgQuery, NewLpgService};

#[derive(Debug, Clone, FromRow)]
pub struct LpgService {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub capacity: Json<Vec<CylinderTier>>,
    pub longitude: f64,
    pub latitude: f64,
    pub address: Json<Address>,
    pub timings: Json<Timings>,
    pub landline: Option<String>,
    pub is_available: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const LPG_COLUMNS: &str = "id, owner, name, capacity, longitude, latitude, address, timings, \
     landline, is_available, created_at, updated_at";

pub async fn insert(db: &PgPool, owner: Uuid, new: NewLpgService) -> anyhow::Result<LpgService> {
    let service = sqlx::query_as::<_, LpgService>(&format!(
        "INSERT INTO lpg_services (owner, name, capacity, longitude, latitude, address, \
         timings, landline) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {LPG_COLUMNS}"
    ))
    .bind(owner)
    .bind(&new.name)
    .bind(Json(&new.capacity))
    .bind(new.location.longitude())
    .bind(new.location.latitude())
    .bind(Json(&new.address))
    .bind(Json(&new.timings))
    .bind(&new.landline)
    .fetch_one(db)
    .await?;
    Ok(service)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<LpgService>> {
    let service = sqlx::query_as::<_, LpgService>(&format!(
        "SELECT {LPG_COLUMNS} FROM lpg_services WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(service)
}

pub async fn update(db: &PgPool, service: &LpgService) -> anyhow::Result<LpgService> {
    let updated = sqlx::query_as::<_, LpgService>(&format!(
        "UPDATE lpg_services SET name = $1, capacity = $2, longitude = $3, latitude = $4, \
         address = $5, timings = $6, landline = $7, is_available = $8, updated_at = now() \
         WHERE id = $9 RETURNING {LPG_COLUMNS}"
    ))
    .bind(&service.name)
    .bind(Json(&service.capacity.0))
    .bind(service.longitude)
    .bind(service.latitude)
    .bind(Json(&service.address.0))
    .bind(Json(&service.timings.0))
    .bind(&service.landline)
    .bind(service.is_available)
    .bind(service.id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM lpg_services WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_owner(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<LpgService>> {
    let services = sqlx::query_as::<_, LpgService>(&format!(
        "SELECT {LPG_COLUMNS} FROM lpg_services WHERE owner = $1 ORDER BY created_at DESC"
    ))
    .bind(owner)
    .fetch_all(db)
    .await?;
    Ok(services)
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    q: &'a LpgQuery,
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
    if let Some(geo) = geo {
        push_radius_filter(qb, geo);
    }
}

pub async fn search(
    db: &PgPool,
    q: &LpgQuery,
    geo: &Option<GeoFilter>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<LpgService>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {LPG_COLUMNS} FROM lpg_services WHERE TRUE"
    ));
    push_filters(&mut qb, q, geo);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let services: Vec<LpgService> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM lpg_services WHERE TRUE");
    push_filters(&mut count_qb, q, geo);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(db).await?;

    Ok((services, total))
}
