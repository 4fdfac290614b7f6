use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::listings::{Address, GeoPoint};
use crate::roommates::repo::RoommatePost;
use crate::storage::{PhotoRef, PhotoUpload};

pub const POST_TYPES: &[&str] = &["have-room", "need-room"];
pub const GENDER_PREFERENCES: &[&str] = &["male", "female", "any"];
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoommatePostRequest {
    pub post_type: Option<String>,
    pub rent: Option<f64>,
    #[serde(default)]
    pub other_services: Vec<String>,
    pub gender_preference: Option<String>,
    #[serde(default)]
    pub currently_living_users: Vec<Uuid>,
    pub looking_for: Option<i32>,
    #[serde(default, with = "date_format::option")]
    pub available_from: Option<Date>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub photos: Vec<PhotoUpload>,
}

pub struct NewRoommatePost {
    pub post_type: String,
    pub rent: Option<f64>,
    pub other_services: Vec<String>,
    pub gender_preference: String,
    pub currently_living_users: Vec<Uuid>,
    pub looking_for: Option<i32>,
    pub available_from: Option<Date>,
    pub address: Address,
    pub location: Option<GeoPoint>,
}

impl CreateRoommatePostRequest {
    pub fn into_validated(self) -> ApiResult<(NewRoommatePost, Vec<PhotoUpload>)> {
        let Some(post_type) = self.post_type else {
            return Err(ApiError::BadRequest("Post type is required".into()));
        };
        if !POST_TYPES.contains(&post_type.as_str()) {
            return Err(ApiError::BadRequest("Invalid post type".into()));
        }
        // A "have-room" post advertises an actual room, so it must say what
        // it costs and how many people are still wanted.
        if post_type == "have-room" && (self.rent.is_none() || self.looking_for.is_none()) {
            return Err(ApiError::BadRequest(
                "Rent and headcount are required for have-room posts".into(),
            ));
        }
        if let Some(rent) = self.rent {
            if rent < 0.0 {
                return Err(ApiError::BadRequest("Rent must be positive".into()));
            }
        }
        if let Some(looking_for) = self.looking_for {
            if looking_for < 1 {
                return Err(ApiError::BadRequest(
                    "Headcount must be at least one".into(),
                ));
            }
        }
        let gender_preference = self.gender_preference.unwrap_or_else(|| "any".to_string());
        if !GENDER_PREFERENCES.contains(&gender_preference.as_str()) {
            return Err(ApiError::BadRequest("Invalid gender preference".into()));
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok((
            NewRoommatePost {
                post_type,
                rent: self.rent,
                other_services: self.other_services,
                gender_preference,
                currently_living_users: self.currently_living_users,
                looking_for: self.looking_for,
                available_from: self.available_from,
                address: self.address.unwrap_or_default(),
                location: self.location,
            },
            self.photos,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoommatePostRequest {
    pub rent: Option<f64>,
    pub other_services: Option<Vec<String>>,
    pub gender_preference: Option<String>,
    pub currently_living_users: Option<Vec<Uuid>>,
    pub looking_for: Option<i32>,
    #[serde(default, with = "date_format::option")]
    pub available_from: Option<Date>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub delete_photos: Vec<String>,
    #[serde(default)]
    pub add_photos: Vec<PhotoUpload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommateQuery {
    pub post_type: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoommatePostResponse {
    pub id: Uuid,
    pub created_by: Uuid,
    pub post_type: String,
    pub rent: Option<f64>,
    pub other_services: Vec<String>,
    pub gender_preference: String,
    pub currently_living_users: Vec<Uuid>,
    pub looking_for: Option<i32>,
    #[serde(with = "date_format::option")]
    pub available_from: Option<Date>,
    pub address: Address,
    pub location: Option<GeoPoint>,
    pub photos: Vec<PhotoRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<RoommatePost> for RoommatePostResponse {
    fn from(post: RoommatePost) -> Self {
        let location = match (post.longitude, post.latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
            _ => None,
        };
        Self {
            id: post.id,
            created_by: post.created_by,
            post_type: post.post_type,
            rent: post.rent,
            other_services: post.other_services,
            gender_preference: post.gender_preference,
            currently_living_users: post.currently_living_users,
            looking_for: post.looking_for,
            available_from: post.available_from,
            address: post.address.0,
            location,
            photos: post.photos.0,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn have_room_request() -> CreateRoommatePostRequest {
        serde_json::from_value(serde_json::json!({
            "postType": "have-room",
            "rent": 6000,
            "lookingFor": 2,
            "genderPreference": "any",
            "availableFrom": "2026-09-01",
            "address": {"city": "Pune"},
            "location": {"type": "Point", "coordinates": [73.85, 18.52]}
        }))
        .unwrap()
    }

    #[test]
    fn have_room_requires_rent_and_headcount() {
        let mut req = have_room_request();
        req.rent = None;
        assert!(req.into_validated().is_err());

        let mut req = have_room_request();
        req.looking_for = None;
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn need_room_post_needs_neither() {
        let req: CreateRoommatePostRequest =
            serde_json::from_value(serde_json::json!({"postType": "need-room"})).unwrap();
        let (post, _) = req.into_validated().unwrap();
        assert_eq!(post.post_type, "need-room");
        assert_eq!(post.gender_preference, "any");
        assert!(post.rent.is_none());
    }

    #[test]
    fn rejects_unknown_post_type_and_preference() {
        let mut req = have_room_request();
        req.post_type = Some("maybe-room".into());
        assert!(req.into_validated().is_err());

        let mut req = have_room_request();
        req.gender_preference = Some("either".into());
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn available_from_parses_iso_date() {
        let (post, _) = have_room_request().into_validated().unwrap();
        let date = post.available_from.unwrap();
        assert_eq!(date.to_string(), "2026-09-01");
    }

    #[test]
    fn rejects_non_positive_headcount() {
        let mut req = have_room_request();
        req.looking_for = Some(0);
        assert!(req.into_validated().is_err());
    }
}
