use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResponse, ApiResult},
    listings::{geo_filter, offset, parse_limit, parse_page, ListPage},
    lpg::dto::{
        apply_capacity_change, CapacityPatch, CreateLpgRequest, LpgQuery, LpgResponse,
        UpdateLpgRequest, DEFAULT_RADIUS_KM,
    },
    lpg::repo,
    state::AppState,
};

#[instrument(skip(state, user, payload))]
pub async fn create_lpg_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateLpgRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_service = payload.into_validated()?;
    let service = repo::insert(&state.db, user.id, new_service).await?;

    info!(service_id = %service.id, owner = %user.id, "lpg service created");
    Ok(ApiResponse::created(
        LpgResponse::from(service),
        "Successfully created lpg service listing",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_lpg_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLpgRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service not found".into()))?;
    if service.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can make changes".into(),
        ));
    }

    if let Some(name) = payload.name {
        if !name.trim().is_empty() {
            service.name = name.trim().to_string();
        }
    }
    if let Some(location) = payload.location {
        location.validate()?;
        service.longitude = location.longitude();
        service.latitude = location.latitude();
    }
    if let Some(landline) = payload.landline {
        service.landline = Some(landline);
    }
    if let Some(is_available) = payload.is_available {
        service.is_available = is_available;
    }
    if let Some(address) = payload.address {
        service.address.0.merge(address);
    }
    if let Some(timings) = payload.timings {
        service.timings.0.apply(timings)?;
    }

    let updated = repo::update(&state.db, &service).await?;
    info!(service_id = %updated.id, "lpg service updated");
    Ok(ApiResponse::ok(
        LpgResponse::from(updated),
        "Successfully updated the details",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_lpg_capacity(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CapacityPatch>,
) -> ApiResult<impl IntoResponse> {
    let mut service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service not found".into()))?;
    if service.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can make changes".into(),
        ));
    }

    let updated_existing = apply_capacity_change(&mut service.capacity.0, payload)?;
    let service = repo::update(&state.db, &service).await?;

    info!(service_id = %service.id, updated_existing, "lpg capacity changed");
    let message = if updated_existing {
        "Cylinder updated"
    } else {
        "Cylinder added"
    };
    Ok(ApiResponse::ok(LpgResponse::from(service), message))
}

#[instrument(skip(state, user))]
pub async fn delete_lpg_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service not found".into()))?;
    if service.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can delete the service".into(),
        ));
    }

    repo::delete(&state.db, service.id).await?;
    info!(service_id = %service.id, "lpg service deleted");
    Ok(ApiResponse::ok(json!({}), "Successfully deleted the service"))
}

#[instrument(skip(state))]
pub async fn all_lpg_services(
    State(state): State<AppState>,
    Query(q): Query<LpgQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = parse_page(&q.page);
    let limit = parse_limit(&q.limit);
    let geo = geo_filter(&q.lat, &q.lng, &q.radius, DEFAULT_RADIUS_KM);

    let (services, total) = repo::search(&state.db, &q, &geo, limit, offset(page, limit)).await?;
    Ok(ApiResponse::ok(
        ListPage {
            items: services
                .into_iter()
                .map(LpgResponse::from)
                .collect::<Vec<_>>(),
            total,
        },
        "Fetched LPG services with filters",
    ))
}

#[instrument(skip(state, user))]
pub async fn my_lpg_services(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let services = repo::list_by_owner(&state.db, user.id).await?;
    Ok(ApiResponse::ok(
        services
            .into_iter()
            .map(LpgResponse::from)
            .collect::<Vec<_>>(),
        "Fetched your LPG services",
    ))
}
