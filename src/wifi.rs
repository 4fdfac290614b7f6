//! Shared-wifi listing record. Schema only; no controller exposes it yet.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WifiSharing {
    pub id: Uuid,
    pub owner: Uuid,
    pub contact: String,
    pub wifi_company: String,
    pub speed_mbps: f64,
    /// Typical repeater reach, metres.
    pub coverage_radius: f64,
    pub no_of_users: i32,
    pub total_bill: f64,
    pub per_user_cost: f64,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_sharing_serializes_camel_case() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let wifi = WifiSharing {
            id: Uuid::new_v4(),
            owner: Uuid::new_v4(),
            contact: "9876543210".into(),
            wifi_company: "Jio".into(),
            speed_mbps: 100.0,
            coverage_radius: 10.0,
            no_of_users: 4,
            total_bill: 800.0,
            per_user_cost: 200.0,
            longitude: None,
            latitude: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&wifi).unwrap();
        assert_eq!(json["wifiCompany"], "Jio");
        assert_eq!(json["perUserCost"], 200.0);
    }
}
