use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::listings::{Address, GeoPoint};
use crate::rooms::repo::Room;
use crate::storage::{PhotoRef, PhotoUpload};

pub const CATEGORIES: &[&str] = &["1RK", "1BHK", "2BHK", "3BHK"];
pub const GENDERS: &[&str] = &["Male", "Female", "Any"];
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub rent_per_month: Option<f64>,
    pub category: Option<String>,
    #[serde(default)]
    pub other_services: Vec<String>,
    pub customer_gender: Option<String>,
    pub location: Option<GeoPoint>,
    pub address: Option<Address>,
    #[serde(default)]
    pub photos: Vec<PhotoUpload>,
}

/// A fully validated room listing ready to persist.
pub struct NewRoom {
    pub rent_per_month: f64,
    pub category: String,
    pub other_services: Vec<String>,
    pub customer_gender: String,
    pub location: GeoPoint,
    pub address: Address,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl CreateRoomRequest {
    pub fn into_validated(self) -> ApiResult<(NewRoom, Vec<PhotoUpload>)> {
        let (Some(rent_per_month), Some(category), Some(customer_gender), Some(location), Some(address)) = (
            self.rent_per_month,
            self.category,
            self.customer_gender,
            self.location,
            self.address,
        ) else {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        };
        if blank(&address.city) || blank(&address.state) || blank(&address.pincode) {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        }
        if rent_per_month < 0.0 {
            return Err(ApiError::BadRequest("Rent must be positive".into()));
        }
        if !CATEGORIES.contains(&category.as_str()) {
            return Err(ApiError::BadRequest("Invalid room category".into()));
        }
        if !GENDERS.contains(&customer_gender.as_str()) {
            return Err(ApiError::BadRequest("Invalid customer gender".into()));
        }
        location.validate()?;
        Ok((
            NewRoom {
                rent_per_month,
                category,
                other_services: self.other_services,
                customer_gender,
                location,
                address,
            },
            self.photos,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    pub rent_per_month: Option<f64>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub other_services: Option<Vec<String>>,
    pub customer_gender: Option<String>,
    pub location: Option<GeoPoint>,
    pub address: Option<Address>,
    #[serde(default)]
    pub delete_photos: Vec<String>,
    #[serde(default)]
    pub add_photos: Vec<PhotoUpload>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub category: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: Uuid,
    pub owner: Uuid,
    pub rent_per_month: f64,
    pub category: String,
    pub is_available: bool,
    pub other_services: Vec<String>,
    pub customer_gender: String,
    pub location: GeoPoint,
    pub address: Address,
    pub photos: Vec<PhotoRef>,
    pub rating_average: f64,
    pub rating_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            owner: room.owner,
            rent_per_month: room.rent_per_month,
            category: room.category,
            is_available: room.is_available,
            other_services: room.other_services,
            customer_gender: room.customer_gender,
            location: GeoPoint::new(room.longitude, room.latitude),
            address: room.address.0,
            photos: room.photos.0,
            rating_average: room.rating_average,
            rating_count: room.rating_count,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateRoomRequest {
        serde_json::from_value(serde_json::json!({
            "rentPerMonth": 8500,
            "category": "1BHK",
            "customerGender": "Any",
            "otherServices": ["wifi"],
            "location": {"type": "Point", "coordinates": [77.6, 12.9]},
            "address": {"city": "Bengaluru", "state": "Karnataka", "pincode": "560001"}
        }))
        .unwrap()
    }

    #[test]
    fn create_accepts_complete_payload() {
        let (new_room, photos) = create_request().into_validated().unwrap();
        assert_eq!(new_room.category, "1BHK");
        assert_eq!(new_room.location.latitude(), 12.9);
        assert!(photos.is_empty());
    }

    #[test]
    fn create_rejects_missing_required_fields() {
        let mut req = create_request();
        req.rent_per_month = None;
        assert!(req.into_validated().is_err());

        let mut req = create_request();
        req.address = Some(Address {
            city: Some("Bengaluru".into()),
            ..Default::default()
        });
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn create_rejects_bad_enum_values() {
        let mut req = create_request();
        req.category = Some("4BHK".into());
        assert!(req.into_validated().is_err());

        let mut req = create_request();
        req.customer_gender = Some("other".into());
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn create_rejects_negative_rent() {
        let mut req = create_request();
        req.rent_per_month = Some(-1.0);
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn response_exposes_geojson_location() {
        let (new_room, _) = create_request().into_validated().unwrap();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let room = Room {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            rent_per_month: new_room.rent_per_month,
            category: new_room.category,
            is_available: true,
            other_services: new_room.other_services,
            customer_gender: new_room.customer_gender,
            longitude: new_room.location.longitude(),
            latitude: new_room.location.latitude(),
            address: sqlx::types::Json(new_room.address),
            photos: sqlx::types::Json(vec![PhotoRef::Legacy("rooms/a".into())]),
            rating_average: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(RoomResponse::from(room)).unwrap();
        assert_eq!(json["location"]["type"], "Point");
        assert_eq!(json["location"]["coordinates"][0], 77.6);
        assert_eq!(json["rentPerMonth"], 8500.0);
        assert_eq!(json["photos"][0], "rooms/a");
    }
}
