use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::listings::{Address, GeoPoint, Timings};
use crate::storage::{PhotoRef, PhotoUpload};
use crate::tiffins::repo::Tiffin;

pub const DEFAULT_RADIUS_KM: f64 = 3.0;

/// Price tiers of a tiffin plan; per-plate is mandatory, the monthly
/// subscriptions are optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TiffinPrice {
    pub per_plate: String,
    pub one_time_monthly: Option<String>,
    pub two_time_monthly: Option<String>,
}

impl TiffinPrice {
    pub fn merge(&mut self, patch: TiffinPricePatch) {
        if let Some(per_plate) = patch.per_plate {
            self.per_plate = per_plate;
        }
        if patch.one_time_monthly.is_some() {
            self.one_time_monthly = patch.one_time_monthly;
        }
        if patch.two_time_monthly.is_some() {
            self.two_time_monthly = patch.two_time_monthly;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiffinPricePatch {
    pub per_plate: Option<String>,
    pub one_time_monthly: Option<String>,
    pub two_time_monthly: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTiffinRequest {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub address: Option<Address>,
    #[serde(default)]
    pub delivery_available: bool,
    pub timings: Option<Timings>,
    pub price: Option<TiffinPrice>,
    pub landline: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoUpload>,
}

pub struct NewTiffin {
    pub name: String,
    pub location: GeoPoint,
    pub address: Address,
    pub delivery_available: bool,
    pub timings: Timings,
    pub price: TiffinPrice,
    pub landline: Option<String>,
}

impl CreateTiffinRequest {
    pub fn into_validated(self) -> ApiResult<(NewTiffin, Vec<PhotoUpload>)> {
        let (Some(name), Some(location), Some(address), Some(timings), Some(price)) = (
            self.name,
            self.location,
            self.address,
            self.timings,
            self.price,
        ) else {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        };
        if name.trim().is_empty()
            || price.per_plate.trim().is_empty()
            || address.city.as_deref().map_or(true, |c| c.trim().is_empty())
        {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        }
        timings.validate()?;
        location.validate()?;
        Ok((
            NewTiffin {
                name: name.trim().to_string(),
                location,
                address,
                delivery_available: self.delivery_available,
                timings,
                price,
                landline: self.landline,
            },
            self.photos,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTiffinRequest {
    pub name: Option<String>,
    pub delivery_available: Option<bool>,
    pub landline: Option<String>,
    pub active: Option<bool>,
    pub address: Option<Address>,
    pub timings: Option<crate::listings::TimingsPatch>,
    pub price: Option<TiffinPricePatch>,
    #[serde(default)]
    pub delete_photos: Vec<String>,
    #[serde(default)]
    pub add_photos: Vec<PhotoUpload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiffinQuery {
    pub city: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub delivery_available: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

impl TiffinQuery {
    /// The filter only engages on an explicit true/false value.
    pub fn delivery_filter(&self) -> Option<bool> {
        match self.delivery_available.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiffinResponse {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub address: Address,
    pub delivery_available: bool,
    pub timings: Timings,
    pub price: TiffinPrice,
    pub photos: Vec<PhotoRef>,
    pub landline: Option<String>,
    pub active: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Tiffin> for TiffinResponse {
    fn from(tiffin: Tiffin) -> Self {
        Self {
            id: tiffin.id,
            owner: tiffin.owner,
            name: tiffin.name,
            location: GeoPoint::new(tiffin.longitude, tiffin.latitude),
            address: tiffin.address.0,
            delivery_available: tiffin.delivery_available,
            timings: tiffin.timings.0,
            price: tiffin.price.0,
            photos: tiffin.photos.0,
            landline: tiffin.landline,
            active: tiffin.active,
            rating_average: tiffin.rating_average,
            rating_count: tiffin.rating_count,
            created_at: tiffin.created_at,
            updated_at: tiffin.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateTiffinRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Annapurna Tiffins",
            "location": {"type": "Point", "coordinates": [73.85, 18.52]},
            "address": {"city": "Pune"},
            "deliveryAvailable": true,
            "timings": {"openingTime": "08:00", "closingTime": "21:30"},
            "price": {"perPlate": "80", "oneTimeMonthly": "2100"}
        }))
        .unwrap()
    }

    #[test]
    fn create_accepts_complete_payload() {
        let (new_tiffin, _) = create_request().into_validated().unwrap();
        assert!(new_tiffin.delivery_available);
        assert_eq!(new_tiffin.price.per_plate, "80");
    }

    #[test]
    fn create_requires_city_and_per_plate() {
        let mut req = create_request();
        req.address = Some(Address::default());
        assert!(req.into_validated().is_err());

        let mut req = create_request();
        req.price = Some(TiffinPrice {
            per_plate: " ".into(),
            one_time_monthly: None,
            two_time_monthly: None,
        });
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn create_rejects_malformed_timings() {
        let mut req = create_request();
        req.timings = Some(Timings {
            opening_time: "8am".into(),
            closing_time: "21:30".into(),
        });
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn price_merge_is_shallow() {
        let mut price = TiffinPrice {
            per_plate: "80".into(),
            one_time_monthly: Some("2100".into()),
            two_time_monthly: None,
        };
        price.merge(TiffinPricePatch {
            per_plate: Some("90".into()),
            one_time_monthly: None,
            two_time_monthly: Some("3900".into()),
        });
        assert_eq!(price.per_plate, "90");
        assert_eq!(price.one_time_monthly.as_deref(), Some("2100"));
        assert_eq!(price.two_time_monthly.as_deref(), Some("3900"));
    }

    #[test]
    fn delivery_filter_only_on_explicit_values() {
        let mut q: TiffinQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(q.delivery_filter(), None);
        q.delivery_available = Some("true".into());
        assert_eq!(q.delivery_filter(), Some(true));
        q.delivery_available = Some("false".into());
        assert_eq!(q.delivery_filter(), Some(false));
        q.delivery_available = Some("yes".into());
        assert_eq!(q.delivery_filter(), None);
    }
}
