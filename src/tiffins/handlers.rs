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
    state::AppState,
    storage::{self, delete_photos},
    tiffins::dto::{
        CreateTiffinRequest, TiffinQuery, TiffinResponse, UpdateTiffinRequest, DEFAULT_RADIUS_KM,
    },
    tiffins::repo,
};

#[instrument(skip(state, user, payload))]
pub async fn create_tiffin(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateTiffinRequest>,
) -> ApiResult<impl IntoResponse> {
    if user.user_type != "service-provider" {
        return Err(ApiError::Forbidden(
            "Only service providers can list a tiffin service".into(),
        ));
    }

    let (new_tiffin, uploads) = payload.into_validated()?;
    let photos = storage::upload_photos(
        state.storage.as_ref(),
        &format!("tiffins/{}", user.id),
        &uploads,
    )
    .await?;
    let tiffin = repo::insert(&state.db, user.id, new_tiffin, photos).await?;

    info!(tiffin_id = %tiffin.id, owner = %user.id, "tiffin listing created");
    Ok(ApiResponse::created(
        TiffinResponse::from(tiffin),
        "Tiffin center listing successfully created",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_tiffin(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTiffinRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut tiffin = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tiffin center not found".into()))?;
    if tiffin.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can update the tiffin service".into(),
        ));
    }

    if let Some(name) = payload.name {
        if !name.trim().is_empty() {
            tiffin.name = name.trim().to_string();
        }
    }
    if let Some(delivery_available) = payload.delivery_available {
        tiffin.delivery_available = delivery_available;
    }
    if let Some(landline) = payload.landline {
        tiffin.landline = Some(landline);
    }
    if let Some(active) = payload.active {
        tiffin.active = active;
    }
    if let Some(address) = payload.address {
        tiffin.address.0.merge(address);
    }
    if let Some(timings) = payload.timings {
        tiffin.timings.0.apply(timings)?;
    }
    if let Some(price) = payload.price {
        tiffin.price.0.merge(price);
    }

    for needle in &payload.delete_photos {
        if let Some(pos) = tiffin.photos.0.iter().position(|p| p.matches(needle)) {
            let removed = tiffin.photos.0.remove(pos);
            if let Some(public_id) = removed.public_id() {
                state.storage.delete(&public_id).await?;
            }
        }
    }
    if !payload.add_photos.is_empty() {
        let added = storage::upload_photos(
            state.storage.as_ref(),
            &format!("tiffins/{}", tiffin.owner),
            &payload.add_photos,
        )
        .await?;
        tiffin.photos.0.extend(added);
    }

    let updated = repo::update(&state.db, &tiffin).await?;
    info!(tiffin_id = %updated.id, "tiffin listing updated");
    Ok(ApiResponse::ok(
        TiffinResponse::from(updated),
        "Successfully updated",
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_tiffin(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let tiffin = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tiffin center not found".into()))?;
    if tiffin.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can delete the tiffin service".into(),
        ));
    }

    delete_photos(state.storage.as_ref(), &tiffin.photos.0).await?;
    repo::delete(&state.db, tiffin.id).await?;

    info!(tiffin_id = %tiffin.id, "tiffin listing deleted");
    Ok(ApiResponse::ok(json!({}), "Successfully deleted the listing"))
}

#[instrument(skip(state))]
pub async fn all_tiffins(
    State(state): State<AppState>,
    Query(q): Query<TiffinQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = parse_page(&q.page);
    let limit = parse_limit(&q.limit);
    let geo = geo_filter(&q.lat, &q.lng, &q.radius, DEFAULT_RADIUS_KM);

    let (tiffins, total) = repo::search(&state.db, &q, &geo, limit, offset(page, limit)).await?;
    Ok(ApiResponse::ok(
        ListPage {
            items: tiffins
                .into_iter()
                .map(TiffinResponse::from)
                .collect::<Vec<_>>(),
            total,
        },
        "Fetched tiffins with filters",
    ))
}

#[instrument(skip(state, user))]
pub async fn my_tiffins(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let tiffins = repo::list_by_owner(&state.db, user.id).await?;
    Ok(ApiResponse::ok(
        tiffins
            .into_iter()
            .map(TiffinResponse::from)
            .collect::<Vec<_>>(),
        "Fetched your tiffin services",
    ))
}
