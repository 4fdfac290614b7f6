use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::listings::{Address, GeoPoint, Timings};
use crate::lpg::repo::LpgService;

pub const DEFAULT_RADIUS_KM: f64 = 3.0;

/// One cylinder size a vendor offers, with purchase and refill pricing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CylinderTier {
    pub size: String,
    pub new_cylinder_price: f64,
    pub refill_price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLpgRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Vec<CylinderTier>,
    pub location: Option<GeoPoint>,
    pub address: Option<Address>,
    pub timings: Option<Timings>,
    pub landline: Option<String>,
}

pub struct NewLpgService {
    pub name: String,
    pub capacity: Vec<CylinderTier>,
    pub location: GeoPoint,
    pub address: Address,
    pub timings: Timings,
    pub landline: Option<String>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl CreateLpgRequest {
    pub fn into_validated(self) -> ApiResult<NewLpgService> {
        let (Some(name), Some(location), Some(address), Some(timings)) =
            (self.name, self.location, self.address, self.timings)
        else {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        };
        if name.trim().is_empty()
            || blank(&address.city)
            || blank(&address.state)
            || blank(&address.pincode)
        {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        }
        if self.capacity.is_empty()
            || self
                .capacity
                .iter()
                .any(|tier| tier.size.trim().is_empty())
        {
            return Err(ApiError::BadRequest("Certain fields are required".into()));
        }
        timings.validate()?;
        location.validate()?;
        Ok(NewLpgService {
            name: name.trim().to_string(),
            capacity: self.capacity,
            location,
            address,
            timings,
            landline: self.landline,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLpgRequest {
    pub name: Option<String>,
    pub location: Option<GeoPoint>,
    pub landline: Option<String>,
    pub is_available: Option<bool>,
    pub address: Option<Address>,
    pub timings: Option<crate::listings::TimingsPatch>,
}

/// Patch for a single cylinder tier: updates the tier matching `size`, or
/// appends a new one when no tier with that size exists yet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityPatch {
    pub size: Option<String>,
    pub new_size: Option<String>,
    pub new_cylinder_price: Option<f64>,
    pub refill_price: Option<f64>,
}

/// Returns `true` when an existing tier was patched, `false` when a new
/// tier was appended.
pub fn apply_capacity_change(
    tiers: &mut Vec<CylinderTier>,
    patch: CapacityPatch,
) -> ApiResult<bool> {
    let size = patch
        .size
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Original cylinder size is required".into()))?;

    if let Some(existing) = tiers.iter_mut().find(|t| t.size.trim() == size) {
        if let Some(price) = patch.new_cylinder_price {
            existing.new_cylinder_price = price;
        }
        if let Some(price) = patch.refill_price {
            existing.refill_price = price;
        }
        if let Some(new_size) = patch.new_size {
            if !new_size.trim().is_empty() {
                existing.size = new_size.trim().to_string();
            }
        }
        return Ok(true);
    }

    let (Some(new_cylinder_price), Some(refill_price)) =
        (patch.new_cylinder_price, patch.refill_price)
    else {
        return Err(ApiError::BadRequest(
            "New cylinders must have price and refill price".into(),
        ));
    };
    tiers.push(CylinderTier {
        size: size.to_string(),
        new_cylinder_price,
        refill_price,
    });
    Ok(false)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LpgQuery {
    pub city: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LpgResponse {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub capacity: Vec<CylinderTier>,
    pub location: GeoPoint,
    pub address: Address,
    pub timings: Timings,
    pub landline: Option<String>,
    pub is_available: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<LpgService> for LpgResponse {
    fn from(service: LpgService) -> Self {
        Self {
            id: service.id,
            owner: service.owner,
            name: service.name,
            capacity: service.capacity.0,
            location: GeoPoint::new(service.longitude, service.latitude),
            address: service.address.0,
            timings: service.timings.0,
            landline: service.landline,
            is_available: service.is_available,
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<CylinderTier> {
        vec![CylinderTier {
            size: "14.2kg".into(),
            new_cylinder_price: 2200.0,
            refill_price: 900.0,
        }]
    }

    #[test]
    fn capacity_patch_updates_existing_tier() {
        let mut t = tiers();
        let updated = apply_capacity_change(
            &mut t,
            CapacityPatch {
                size: Some("14.2kg".into()),
                new_size: Some("15kg".into()),
                new_cylinder_price: None,
                refill_price: Some(950.0),
            },
        )
        .unwrap();
        assert!(updated);
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].size, "15kg");
        assert_eq!(t[0].new_cylinder_price, 2200.0);
        assert_eq!(t[0].refill_price, 950.0);
    }

    #[test]
    fn capacity_patch_appends_fully_priced_new_tier() {
        let mut t = tiers();
        let updated = apply_capacity_change(
            &mut t,
            CapacityPatch {
                size: Some("5kg".into()),
                new_size: None,
                new_cylinder_price: Some(1100.0),
                refill_price: Some(450.0),
            },
        )
        .unwrap();
        assert!(!updated);
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].size, "5kg");
    }

    #[test]
    fn capacity_patch_rejects_new_tier_without_both_prices() {
        let mut t = tiers();
        let err = apply_capacity_change(
            &mut t,
            CapacityPatch {
                size: Some("5kg".into()),
                new_size: None,
                new_cylinder_price: Some(1100.0),
                refill_price: None,
            },
        );
        assert!(err.is_err());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn capacity_patch_requires_size() {
        let mut t = tiers();
        assert!(apply_capacity_change(
            &mut t,
            CapacityPatch {
                size: Some("  ".into()),
                new_size: None,
                new_cylinder_price: None,
                refill_price: None,
            },
        )
        .is_err());
    }

    #[test]
    fn create_requires_non_empty_capacity() {
        let req: CreateLpgRequest = serde_json::from_value(serde_json::json!({
            "name": "Gupta Gas Agency",
            "capacity": [],
            "location": {"type": "Point", "coordinates": [77.2, 28.6]},
            "address": {"city": "Delhi", "state": "Delhi", "pincode": "110001"},
            "timings": {"openingTime": "09:00", "closingTime": "19:00"}
        }))
        .unwrap();
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn create_accepts_complete_payload() {
        let req: CreateLpgRequest = serde_json::from_value(serde_json::json!({
            "name": "Gupta Gas Agency",
            "capacity": [{"size": "14.2kg", "newCylinderPrice": 2200, "refillPrice": 900}],
            "location": {"type": "Point", "coordinates": [77.2, 28.6]},
            "address": {"city": "Delhi", "state": "Delhi", "pincode": "110001"},
            "timings": {"openingTime": "09:00", "closingTime": "19:00"}
        }))
        .unwrap();
        let new = req.into_validated().unwrap();
        assert_eq!(new.capacity.len(), 1);
        assert_eq!(new.name, "Gupta Gas Agency");
    }
}
