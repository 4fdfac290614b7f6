use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::house::dto::{HouseServiceQuery, HouseTimings, NewHouseService};
use crate::listings::{push_radius_filter, GeoFilter};

#[derive(Debug, Clone, FromRow)]
pub struct HouseService {
    pub id: Uuid,
    pub provider: Uuid,
    pub service: String,
    pub charge: f64,
    pub timings: Json<HouseTimings>,
    pub longitude: f64,
    pub latitude: f64,
    pub rating_average: f64,
    pub rating_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const HOUSE_COLUMNS: &str = "id, provider, service, charge, timings, longitude, latitude, \
     rating_average, rating_count, created_at, updated_at";

pub async fn insert(
    db: &PgPool,
    provider: Uuid,
    new: NewHouseService,
) -> anyhow::Result<HouseService> {
    let service = sqlx::query_as::<_, HouseService>(&format!(
        "INSERT INTO house_services (provider, service, charge, timings, longitude, latitude) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {HOUSE_COLUMNS}"
    ))
    .bind(provider)
    .bind(&new.service)
    .bind(new.charge)
    .bind(Json(&new.timings))
    .bind(new.location.longitude())
    .bind(new.location.latitude())
    .fetch_one(db)
    .await?;
    Ok(service)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<HouseService>> {
    let service = sqlx::query_as::<_, HouseService>(&format!(
        "SELECT {HOUSE_COLUMNS} FROM house_services WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(service)
}

pub async fn update(db: &PgPool, service: &HouseService) -> anyhow::Result<HouseService> {
    let updated = sqlx::query_as::<_, HouseService>(&format!(
        "UPDATE house_services SET service = $1, charge = $2, timings = $3, longitude = $4, \
         latitude = $5, updated_at = now() \
         WHERE id = $6 RETURNING {HOUSE_COLUMNS}"
    ))
    .bind(&service.service)
    .bind(service.charge)
    .bind(Json(&service.timings.0))
    .bind(service.longitude)
    .bind(service.latitude)
    .bind(service.id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM house_services WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_by_provider(db: &PgPool, provider: Uuid) -> anyhow::Result<Vec<HouseService>> {
    let services = sqlx::query_as::<_, HouseService>(&format!(
        "SELECT {HOUSE_COLUMNS} FROM house_services WHERE provider = $1 ORDER BY created_at DESC"
    ))
    .bind(provider)
    .fetch_all(db)
    .await?;
    Ok(services)
}

fn push_filters<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    q: &'a HouseServiceQuery,
    geo: &Option<GeoFilter>,
) {
    if let Some(service_type) = &q.service_type {
        qb.push(" AND service = ").push_bind(service_type);
    }
    if let Some(min_charge) = q.min_charge() {
        qb.push(" AND charge >= ").push_bind(min_charge);
    }
    if let Some(max_charge) = q.max_charge() {
        qb.push(" AND charge <= ").push_bind(max_charge);
    }
    if let Some(geo) = geo {
        push_radius_filter(qb, geo);
    }
}

pub async fn search(
    db: &PgPool,
    q: &HouseServiceQuery,
    geo: &Option<GeoFilter>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<HouseService>, i64)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {HOUSE_COLUMNS} FROM house_services WHERE TRUE"
    ));
    push_filters(&mut qb, q, geo);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let services: Vec<HouseService> = qb.build_query_as().fetch_all(db).await?;

    let mut count_qb =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM house_services WHERE TRUE");
    push_filters(&mut count_qb, q, geo);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(db).await?;

    Ok((services, total))
}
