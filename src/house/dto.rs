use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::house::repo::HouseService;
use crate::listings::{is_valid_time, GeoPoint};

pub const DEFAULT_RADIUS_KM: f64 = 6.0;

/// Working hours of a house-service provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HouseTimings {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl HouseTimings {
    pub fn validate(&self) -> ApiResult<()> {
        for value in [&self.start, &self.end].into_iter().flatten() {
            if !is_valid_time(value) {
                return Err(ApiError::BadRequest("Invalid timing format".into()));
            }
        }
        Ok(())
    }

    pub fn merge(&mut self, patch: HouseTimings) -> ApiResult<()> {
        if patch.start.is_some() {
            self.start = patch.start;
        }
        if patch.end.is_some() {
            self.end = patch.end;
        }
        self.validate()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHouseServiceRequest {
    pub service: Option<String>,
    pub charge: Option<f64>,
    pub timings: Option<HouseTimings>,
    pub location: Option<GeoPoint>,
}

pub struct NewHouseService {
    pub service: String,
    pub charge: f64,
    pub timings: HouseTimings,
    pub location: GeoPoint,
}

impl CreateHouseServiceRequest {
    pub fn into_validated(self) -> ApiResult<NewHouseService> {
        let (Some(service), Some(charge), Some(timings), Some(location)) =
            (self.service, self.charge, self.timings, self.location)
        else {
            return Err(ApiError::BadRequest("All fields are required".into()));
        };
        if service.trim().is_empty() || timings.start.is_none() || timings.end.is_none() {
            return Err(ApiError::BadRequest("All fields are required".into()));
        }
        if charge < 0.0 {
            return Err(ApiError::BadRequest("Charge must be positive".into()));
        }
        timings.validate()?;
        location.validate()?;
        Ok(NewHouseService {
            service: service.trim().to_string(),
            charge,
            timings,
            location,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateHouseServiceRequest {
    pub service: Option<String>,
    pub charge: Option<f64>,
    pub timings: Option<HouseTimings>,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseServiceQuery {
    pub service_type: Option<String>,
    pub min_charge: Option<String>,
    pub max_charge: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

impl HouseServiceQuery {
    pub fn min_charge(&self) -> Option<f64> {
        self.min_charge.as_deref().and_then(|v| v.parse().ok())
    }
    pub fn max_charge(&self) -> Option<f64> {
        self.max_charge.as_deref().and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseServiceResponse {
    pub id: Uuid,
    pub provider: Uuid,
    pub service: String,
    pub charge: f64,
    pub timings: HouseTimings,
    pub location: GeoPoint,
    pub rating_average: f64,
    pub rating_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<HouseService> for HouseServiceResponse {
    fn from(service: HouseService) -> Self {
        Self {
            id: service.id,
            provider: service.provider,
            service: service.service,
            charge: service.charge,
            timings: service.timings.0,
            location: GeoPoint::new(service.longitude, service.latitude),
            rating_average: service.rating_average,
            rating_count: service.rating_count,
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateHouseServiceRequest {
        serde_json::from_value(serde_json::json!({
            "service": "plumbing",
            "charge": 300,
            "timings": {"start": "09:00", "end": "18:00"},
            "location": {"type": "Point", "coordinates": [72.88, 19.07]}
        }))
        .unwrap()
    }

    #[test]
    fn create_accepts_complete_payload() {
        let new = create_request().into_validated().unwrap();
        assert_eq!(new.service, "plumbing");
        assert_eq!(new.charge, 300.0);
    }

    #[test]
    fn create_requires_both_timing_ends() {
        let mut req = create_request();
        req.timings = Some(HouseTimings {
            start: Some("09:00".into()),
            end: None,
        });
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn create_rejects_negative_charge() {
        let mut req = create_request();
        req.charge = Some(-10.0);
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn timings_merge_validates_result() {
        let mut timings = HouseTimings {
            start: Some("09:00".into()),
            end: Some("18:00".into()),
        };
        timings
            .merge(HouseTimings {
                start: Some("10:00".into()),
                end: None,
            })
            .unwrap();
        assert_eq!(timings.start.as_deref(), Some("10:00"));
        assert_eq!(timings.end.as_deref(), Some("18:00"));

        assert!(timings
            .merge(HouseTimings {
                start: Some("early".into()),
                end: None,
            })
            .is_err());
    }

    #[test]
    fn charge_bounds_ignore_malformed_input() {
        let q: HouseServiceQuery = serde_json::from_value(serde_json::json!({
            "minCharge": "100",
            "maxCharge": "not-a-number"
        }))
        .unwrap();
        assert_eq!(q.min_charge(), Some(100.0));
        assert_eq!(q.max_charge(), None);
    }
}
