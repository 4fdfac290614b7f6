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
    roommates::dto::{
        CreateRoommatePostRequest, RoommatePostResponse, RoommateQuery,
        UpdateRoommatePostRequest, DEFAULT_RADIUS_KM, GENDER_PREFERENCES,
    },
    roommates::repo,
    state::AppState,
    storage::{self, delete_photos},
};

#[instrument(skip(state, user, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateRoommatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let (new_post, uploads) = payload.into_validated()?;
    let photos = storage::upload_photos(
        state.storage.as_ref(),
        &format!("roommates/{}", user.id),
        &uploads,
    )
    .await?;
    let post = repo::insert(&state.db, user.id, new_post, photos).await?;

    info!(post_id = %post.id, created_by = %user.id, "roommate post created");
    Ok(ApiResponse::created(
        RoommatePostResponse::from(post),
        "Roommate post successfully created",
    ))
}

#[instrument(skip(state, user, payload))]
pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoommatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut post = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Roommate post not found".into()))?;
    if post.created_by != user.id {
        return Err(ApiError::Forbidden(
            "Only the post creator can update the post".into(),
        ));
    }

    if let Some(rent) = payload.rent {
        if rent < 0.0 {
            return Err(ApiError::BadRequest("Rent must be positive".into()));
        }
        post.rent = Some(rent);
    }
    if let Some(other_services) = payload.other_services {
        post.other_services = other_services;
    }
    if let Some(gender_preference) = payload.gender_preference {
        if !GENDER_PREFERENCES.contains(&gender_preference.as_str()) {
            return Err(ApiError::BadRequest("Invalid gender preference".into()));
        }
        post.gender_preference = gender_preference;
    }
    if let Some(currently_living_users) = payload.currently_living_users {
        post.currently_living_users = currently_living_users;
    }
    if let Some(looking_for) = payload.looking_for {
        if looking_for < 1 {
            return Err(ApiError::BadRequest(
                "Headcount must be at least one".into(),
            ));
        }
        post.looking_for = Some(looking_for);
    }
    if let Some(available_from) = payload.available_from {
        post.available_from = Some(available_from);
    }
    if let Some(address) = payload.address {
        post.address.0.merge(address);
    }
    if let Some(location) = payload.location {
        location.validate()?;
        post.longitude = Some(location.longitude());
        post.latitude = Some(location.latitude());
    }

    for needle in &payload.delete_photos {
        if let Some(pos) = post.photos.0.iter().position(|p| p.matches(needle)) {
            let removed = post.photos.0.remove(pos);
            if let Some(public_id) = removed.public_id() {
                state.storage.delete(&public_id).await?;
            }
        }
    }
    if !payload.add_photos.is_empty() {
        let added = storage::upload_photos(
            state.storage.as_ref(),
            &format!("roommates/{}", post.created_by),
            &payload.add_photos,
        )
        .await?;
        post.photos.0.extend(added);
    }

    let updated = repo::update(&state.db, &post).await?;
    info!(post_id = %updated.id, "roommate post updated");
    Ok(ApiResponse::ok(
        RoommatePostResponse::from(updated),
        "Successfully updated",
    ))
}

#[instrument(skip(state, user))]
pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Roommate post not found".into()))?;
    if post.created_by != user.id {
        return Err(ApiError::Forbidden(
            "Only the post creator can delete the post".into(),
        ));
    }

    delete_photos(state.storage.as_ref(), &post.photos.0).await?;
    repo::delete(&state.db, post.id).await?;

    info!(post_id = %post.id, "roommate post deleted");
    Ok(ApiResponse::ok(json!({}), "Successfully deleted the post"))
}

#[instrument(skip(state))]
pub async fn all_posts(
    State(state): State<AppState>,
    Query(q): Query<RoommateQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = parse_page(&q.page);
    let limit = parse_limit(&q.limit);
    let geo = geo_filter(&q.lat, &q.lng, &q.radius, DEFAULT_RADIUS_KM);

    let (posts, total) = repo::search(&state.db, &q, &geo, limit, offset(page, limit)).await?;
    Ok(ApiResponse::ok(
        ListPage {
            items: posts
                .into_iter()
                .map(RoommatePostResponse::from)
                .collect::<Vec<_>>(),
            total,
        },
        "Fetched roommate posts with filters",
    ))
}

#[instrument(skip(state, user))]
pub async fn my_posts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let posts = repo::list_by_creator(&state.db, user.id).await?;
    Ok(ApiResponse::ok(
        posts
            .into_iter()
            .map(RoommatePostResponse::from)
            .collect::<Vec<_>>(),
        "Fetched your roommate posts",
    ))
}
