//! Plumbing shared by every listing domain: the GeoJSON point stored on a
//! listing, structured addresses and opening hours, query-string parsing
//! with fallbacks and the radius filter applied to proximity searches.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::error::{ApiError, ApiResult};

/// GeoJSON `Point`, coordinates ordered `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_string()
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: point_type(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.kind != "Point" {
            return Err(ApiError::BadRequest("Invalid location format".into()));
        }
        let [lng, lat] = self.coordinates;
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::BadRequest(
                "Location coordinates are out of range".into(),
            ));
        }
        Ok(())
    }
}

/// Structured address stored as a JSONB sub-document. Which parts are
/// required varies by domain and is checked at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub city: Option<String>,
    pub state: Option<String>,
    pub street: Option<String>,
    pub pincode: Option<String>,
}

impl Address {
    /// Shallow merge: fields present in `patch` replace the stored value,
    /// everything else is kept.
    pub fn merge(&mut self, patch: Address) {
        if patch.city.is_some() {
            self.city = patch.city;
        }
        if patch.state.is_some() {
            self.state = patch.state;
        }
        if patch.street.is_some() {
            self.street = patch.street;
        }
        if patch.pincode.is_some() {
            self.pincode = patch.pincode;
        }
    }
}

lazy_static! {
    static ref TIME_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(:[0-5]\d)?$").unwrap();
}

pub fn is_valid_time(value: &str) -> bool {
    TIME_RE.is_match(value)
}

/// Opening hours, `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub opening_time: String,
    pub closing_time: String,
}

impl Timings {
    pub fn validate(&self) -> ApiResult<()> {
        if !is_valid_time(&self.opening_time) {
            return Err(ApiError::BadRequest("Invalid opening time format".into()));
        }
        if !is_valid_time(&self.closing_time) {
            return Err(ApiError::BadRequest("Invalid closing time format".into()));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: TimingsPatch) -> ApiResult<()> {
        if let Some(opening) = patch.opening_time {
            self.opening_time = opening;
        }
        if let Some(closing) = patch.closing_time {
            self.closing_time = closing;
        }
        self.validate()
    }
}

/// Partial update of [`Timings`]; untouched fields stay as stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingsPatch {
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
}

/// One page of search results plus the size of the full filtered set.
#[derive(Debug, Serialize)]
pub struct ListPage<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}

// Malformed query-string numbers fall back to the default instead of
// failing the request.

pub fn parse_page(raw: &Option<String>) -> i64 {
    raw.as_deref()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

pub fn parse_limit(raw: &Option<String>) -> i64 {
    raw.as_deref()
        .and_then(|v| v.parse::<i64>().ok())
        .map(|l| l.max(1))
        .unwrap_or(10)
}

pub fn offset(page: i64, limit: i64) -> i64 {
    (page - 1) * limit
}

/// Resolved proximity filter: a centre point and a radius in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

/// Builds the proximity filter from raw query parameters. Active only when
/// both coordinates parse; a missing or malformed radius falls back to the
/// domain default (kilometres, converted to metres here).
pub fn geo_filter(
    lat: &Option<String>,
    lng: &Option<String>,
    radius: &Option<String>,
    default_radius_km: f64,
) -> Option<GeoFilter> {
    let lat = lat.as_deref()?.parse::<f64>().ok()?;
    let lng = lng.as_deref()?.parse::<f64>().ok()?;
    let radius_km = radius
        .as_deref()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default_radius_km);
    Some(GeoFilter {
        lat,
        lng,
        radius_m: radius_km * 1000.0,
    })
}

/// Appends the earthdistance radius clause for tables carrying
/// `latitude`/`longitude` columns. The bounding-box test hits the GiST
/// index; the exact distance test trims the box corners.
pub fn push_radius_filter(qb: &mut QueryBuilder<'_, Postgres>, geo: &GeoFilter) {
    qb.push(" AND earth_box(ll_to_earth(")
        .push_bind(geo.lat)
        .push(", ")
        .push_bind(geo.lng)
        .push("), ")
        .push_bind(geo.radius_m)
        .push(") @> ll_to_earth(latitude, longitude)")
        .push(" AND earth_distance(ll_to_earth(")
        .push_bind(geo.lat)
        .push(", ")
        .push_bind(geo.lng)
        .push("), ll_to_earth(latitude, longitude)) <= ")
        .push_bind(geo.radius_m);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_roundtrip_and_accessors() {
        let p: GeoPoint =
            serde_json::from_str(r#"{"type":"Point","coordinates":[77.6,12.9]}"#).unwrap();
        assert_eq!(p.longitude(), 77.6);
        assert_eq!(p.latitude(), 12.9);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn geo_point_type_defaults_to_point() {
        let p: GeoPoint = serde_json::from_str(r#"{"coordinates":[77.6,12.9]}"#).unwrap();
        assert_eq!(p.kind, "Point");
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(181.0, 12.9).validate().is_err());
        assert!(GeoPoint::new(77.6, 91.0).validate().is_err());
    }

    #[test]
    fn address_merge_is_shallow() {
        let mut stored = Address {
            city: Some("Pune".into()),
            state: Some("Maharashtra".into()),
            street: Some("FC Road".into()),
            pincode: Some("411004".into()),
        };
        stored.merge(Address {
            city: Some("Mumbai".into()),
            ..Default::default()
        });
        assert_eq!(stored.city.as_deref(), Some("Mumbai"));
        assert_eq!(stored.state.as_deref(), Some("Maharashtra"));
        assert_eq!(stored.pincode.as_deref(), Some("411004"));
    }

    #[test]
    fn timings_validate_formats() {
        assert!(is_valid_time("09:30"));
        assert!(is_valid_time("23:59:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("9:30"));
        assert!(!is_valid_time("morning"));
    }

    #[test]
    fn timings_patch_keeps_unset_fields() {
        let mut t = Timings {
            opening_time: "08:00".into(),
            closing_time: "22:00".into(),
        };
        t.apply(TimingsPatch {
            opening_time: Some("09:00".into()),
            closing_time: None,
        })
        .unwrap();
        assert_eq!(t.opening_time, "09:00");
        assert_eq!(t.closing_time, "22:00");
    }

    #[test]
    fn timings_patch_rejects_bad_format() {
        let mut t = Timings {
            opening_time: "08:00".into(),
            closing_time: "22:00".into(),
        };
        assert!(t
            .apply(TimingsPatch {
                opening_time: Some("late".into()),
                closing_time: None,
            })
            .is_err());
    }

    #[test]
    fn pagination_falls_back_on_malformed_input() {
        assert_eq!(parse_page(&Some("2".into())), 2);
        assert_eq!(parse_page(&Some("abc".into())), 1);
        assert_eq!(parse_page(&Some("0".into())), 1);
        assert_eq!(parse_page(&None), 1);
        assert_eq!(parse_limit(&Some("25".into())), 25);
        assert_eq!(parse_limit(&Some("0".into())), 1);
        assert_eq!(parse_limit(&Some("x".into())), 10);
        assert_eq!(parse_limit(&None), 10);
        assert_eq!(offset(2, 10), 10);
    }

    #[test]
    fn geo_filter_requires_both_coordinates() {
        assert!(geo_filter(&Some("12.9".into()), &None, &None, 3.0).is_none());
        assert!(geo_filter(&None, &Some("77.6".into()), &None, 3.0).is_none());
    }

    #[test]
    fn geo_filter_converts_km_and_defaults() {
        let f = geo_filter(
            &Some("12.9".into()),
            &Some("77.6".into()),
            &Some("5".into()),
            3.0,
        )
        .unwrap();
        assert_eq!(f.radius_m, 5000.0);

        let f = geo_filter(&Some("12.9".into()), &Some("77.6".into()), &None, 3.0).unwrap();
        assert_eq!(f.radius_m, 3000.0);

        let f = geo_filter(
            &Some("12.9".into()),
            &Some("77.6".into()),
            &Some("x".into()),
            6.0,
        )
        .unwrap();
        assert_eq!(f.radius_m, 6000.0);
    }
}
