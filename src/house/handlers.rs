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
    house::dto::{
        CreateHouseServiceRequest, HouseServiceQuery, HouseServiceResponse,
        UpdateHouseServiceRequest, DEFAULT_RADIUS_KM,
    },
    house::repo,
    listings::{geo_filter, offset, parse_limit, parse_page, ListPage},
    state::AppState,
};

#[instrument(skip(state, user, payload))]
pub async fn create_house_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateHouseServiceRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_service = payload.into_validated()?;
    let service = repo::insert(&state.db, user.id, new_service).await?;

    info!(service_id = %service.id, provider = %user.id, "house service created");
    Ok(ApiResponse::created(
        HouseServiceResponse::from(service),
        "Service successfully listed",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_house_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHouseServiceRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service not found".into()))?;
    if service.provider != user.id {
        return Err(ApiError::Forbidden(
            "Only the service provider can edit the listing".into(),
        ));
    }

    if let Some(name) = payload.service {
        if !name.trim().is_empty() {
            service.service = name.trim().to_string();
        }
    }
    if let Some(charge) = payload.charge {
        if charge < 0.0 {
            return Err(ApiError::BadRequest("Charge must be positive".into()));
        }
        service.charge = charge;
    }
    if let Some(timings) = payload.timings {
        service.timings.0.merge(timings)?;
    }
    if let Some(location) = payload.location {
        location.validate()?;
        service.longitude = location.longitude();
        service.latitude = location.latitude();
    }

    let updated = repo::update(&state.db, &service).await?;
    info!(service_id = %updated.id, "house service updated");
    Ok(ApiResponse::ok(
        HouseServiceResponse::from(updated),
        "Successfully updated the service",
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_house_service(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let service = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Service not found".into()))?;
    if service.provider != user.id {
        return Err(ApiError::Forbidden(
            "Only the service provider can delete the listing".into(),
        ));
    }

    repo::delete(&state.db, service.id).await?;
    info!(service_id = %service.id, "house service deleted");
    Ok(ApiResponse::ok(json!({}), "Successfully deleted the service"))
}

#[instrument(skip(state))]
pub async fn all_house_services(
    State(state): State<AppState>,
    Query(q): Query<HouseServiceQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = parse_page(&q.page);
    let limit = parse_limit(&q.limit);
    let geo = geo_filter(&q.lat, &q.lng, &q.radius, DEFAULT_RADIUS_KM);

    let (services, total) = repo::search(&state.db, &q, &geo, limit, offset(page, limit)).await?;
    Ok(ApiResponse::ok(
        ListPage {
            items: services
                .into_iter()
                .map(HouseServiceResponse::from)
                .collect::<Vec<_>>(),
            total,
        },
        "Fetched house services",
    ))
}

#[instrument(skip(state, user))]
pub async fn my_house_services(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let services = repo::list_by_provider(&state.db, user.id).await?;
    Ok(ApiResponse::ok(
        services
            .into_iter()
            .map(HouseServiceResponse::from)
            .collect::<Vec<_>>(),
        "Fetched your house services",
    ))
}
