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
    rooms::dto::{
        CreateRoomRequest, RoomQuery, RoomResponse, UpdateRoomRequest, CATEGORIES,
        DEFAULT_RADIUS_KM, GENDERS,
    },
    rooms::repo,
    state::AppState,
    storage::{self, delete_photos},
};

#[instrument(skip(state, user, payload))]
pub async fn create_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateRoomRequest>,
) -> ApiResult<impl IntoResponse> {
    if user.user_type != "room-owner" && user.user_type != "service-provider" {
        return Err(ApiError::Forbidden(
            "Only room owners or service providers can list rooms".into(),
        ));
    }

    let (new_room, uploads) = payload.into_validated()?;
    let photos =
        storage::upload_photos(state.storage.as_ref(), &format!("rooms/{}", user.id), &uploads)
            .await?;
    let room = repo::insert(&state.db, user.id, new_room, photos).await?;

    info!(room_id = %room.id, owner = %user.id, "room listing created");
    Ok(ApiResponse::created(
        RoomResponse::from(room),
        "Room listing is done successfully",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoomRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut room = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".into()))?;
    if room.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the room owner can update the room listing".into(),
        ));
    }

    if let Some(rent) = payload.rent_per_month {
        if rent < 0.0 {
            return Err(ApiError::BadRequest("Rent must be positive".into()));
        }
        room.rent_per_month = rent;
    }
    if let Some(category) = payload.category {
        if !CATEGORIES.contains(&category.as_str()) {
            return Err(ApiError::BadRequest("Invalid room category".into()));
        }
        room.category = category;
    }
    if let Some(is_available) = payload.is_available {
        room.is_available = is_available;
    }
    if let Some(other_services) = payload.other_services {
        room.other_services = other_services;
    }
    if let Some(gender) = payload.customer_gender {
        if !GENDERS.contains(&gender.as_str()) {
            return Err(ApiError::BadRequest("Invalid customer gender".into()));
        }
        room.customer_gender = gender;
    }
    if let Some(location) = payload.location {
        location.validate()?;
        room.longitude = location.longitude();
        room.latitude = location.latitude();
    }
    if let Some(address) = payload.address {
        room.address.0.merge(address);
    }

    for needle in &payload.delete_photos {
        if let Some(pos) = room.photos.0.iter().position(|p| p.matches(needle)) {
            let removed = room.photos.0.remove(pos);
            if let Some(public_id) = removed.public_id() {
                state.storage.delete(&public_id).await?;
            }
        }
    }
    if !payload.add_photos.is_empty() {
        let added = storage::upload_photos(
            state.storage.as_ref(),
            &format!("rooms/{}", room.owner),
            &payload.add_photos,
        )
        .await?;
        room.photos.0.extend(added);
    }

    let updated = repo::update(&state.db, &room).await?;
    info!(room_id = %updated.id, "room listing updated");
    Ok(ApiResponse::ok(
        RoomResponse::from(updated),
        "Successfully updated",
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_room(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let room = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Room not found".into()))?;
    if room.owner != user.id {
        return Err(ApiError::Forbidden(
            "Only the room owner can delete the room listing".into(),
        ));
    }

    delete_photos(state.storage.as_ref(), &room.photos.0).await?;
    repo::delete(&state.db, room.id).await?;

    info!(room_id = %room.id, "room listing deleted");
    Ok(ApiResponse::ok(
        json!({}),
        "Successfully deleted the room listing",
    ))
}

#[instrument(skip(state))]
pub async fn all_rooms(
    State(state): State<AppState>,
    Query(q): Query<RoomQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = parse_page(&q.page);
    let limit = parse_limit(&q.limit);
    let geo = geo_filter(&q.lat, &q.lng, &q.radius, DEFAULT_RADIUS_KM);

    let (rooms, total) = repo::search(&state.db, &q, &geo, limit, offset(page, limit)).await?;
    Ok(ApiResponse::ok(
        ListPage {
            items: rooms.into_iter().map(RoomResponse::from).collect::<Vec<_>>(),
            total,
        },
        "Fetched rooms with filters",
    ))
}

#[instrument(skip(state, user))]
pub async fn my_rooms(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let rooms = repo::list_by_owner(&state.db, user.id).await?;
    Ok(ApiResponse::ok(
        rooms.into_iter().map(RoomResponse::from).collect::<Vec<_>>(),
        "Successfully fetched rooms",
    ))
}
