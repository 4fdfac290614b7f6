//! Booking and payment records. The schema is in place and enforced, but no
//! handler constructs or transitions these yet; booking flows are future
//! work.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const SERVICE_TYPES: &[&str] = &["room", "tiffin", "lpg", "house-service"];
pub const BOOKING_STATUSES: &[&str] = &["pending", "confirmed", "cancelled", "completed"];
pub const BOOKING_TYPES: &[&str] = &["one-time", "monthly", "weekly", "custom"];
pub const PAYMENT_METHODS: &[&str] = &["upi", "card", "netbanking", "cod"];
/// Payment state as tracked on the booking itself; `cod` marks settlement
/// on delivery with no payment record.
pub const BOOKING_PAYMENT_STATUSES: &[&str] = &["pending", "completed", "cod"];
/// Payment state on the payment record proper.
pub const PAYMENT_STATUSES: &[&str] = &["pending", "completed", "failed"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub customer: Uuid,
    pub provider: Uuid,
    pub service_type: String,
    pub service_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub booking_date: OffsetDateTime,
    pub booking_status: String,
    pub booking_type: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_ref: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub customer: Uuid,
    pub service_provider: Uuid,
    pub amount: f64,
    pub service_type: String,
    pub service_id: Uuid,
    pub booking_id: Uuid,
    pub method: String,
    pub provider: String,
    pub payment_status: String,
    /// Gateway transaction id, once a gateway is wired in.
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_serializes_camel_case() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let booking = Booking {
            id: Uuid::new_v4(),
            customer: Uuid::new_v4(),
            provider: Uuid::new_v4(),
            service_type: "room".into(),
            service_id: Uuid::new_v4(),
            booking_date: now,
            booking_status: "pending".into(),
            booking_type: "one-time".into(),
            payment_status: "pending".into(),
            payment_method: "cod".into(),
            payment_ref: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["serviceType"], "room");
        assert_eq!(json["bookingStatus"], "pending");
        assert!(SERVICE_TYPES.contains(&booking.service_type.as_str()));
        assert!(BOOKING_STATUSES.contains(&booking.booking_status.as_str()));
        assert!(BOOKING_TYPES.contains(&booking.booking_type.as_str()));
        assert!(PAYMENT_METHODS.contains(&booking.payment_method.as_str()));
        assert!(BOOKING_PAYMENT_STATUSES.contains(&booking.payment_status.as_str()));
        assert!(PAYMENT_STATUSES.contains(&"failed"));
    }
}
