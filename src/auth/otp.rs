//! One-time-passcode issuance and checking for email verification.

use rand::Rng;
use time::{Duration, OffsetDateTime};

pub const OTP_TTL: Duration = Duration::minutes(10);
pub const RESEND_COOLDOWN: Duration = Duration::seconds(60);

/// Six ASCII digits, leading zeroes kept.
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

pub fn email_body(code: &str) -> String {
    format!(
        "Your StayMate verification code is: {}\n\nIt expires in 10 minutes.",
        code
    )
}

#[derive(Debug, PartialEq, Eq)]
pub enum OtpRejection {
    Missing,
    Mismatch,
    Expired,
}

/// Checks a submitted code against the stored one. Comparison is exact;
/// an elapsed expiry rejects even a matching code.
pub fn check_code(
    stored: Option<&str>,
    expires_at: Option<OffsetDateTime>,
    submitted: &str,
    now: OffsetDateTime,
) -> Result<(), OtpRejection> {
    let (code, expires_at) = match (stored, expires_at) {
        (Some(code), Some(expires_at)) => (code, expires_at),
        _ => return Err(OtpRejection::Missing),
    };
    if code != submitted {
        return Err(OtpRejection::Mismatch);
    }
    if now > expires_at {
        return Err(OtpRejection::Expired);
    }
    Ok(())
}

pub fn resend_allowed(last_sent: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match last_sent {
        Some(last_sent) => now - last_sent >= RESEND_COOLDOWN,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn generated_code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn check_code_requires_stored_code() {
        assert_eq!(
            check_code(None, None, "123456", now()),
            Err(OtpRejection::Missing)
        );
    }

    #[test]
    fn check_code_is_exact_match() {
        let expires = now() + OTP_TTL;
        assert_eq!(
            check_code(Some("123456"), Some(expires), "123457", now()),
            Err(OtpRejection::Mismatch)
        );
        // A numerically equal but differently formatted code must not pass.
        assert_eq!(
            check_code(Some("012345"), Some(expires), "12345", now()),
            Err(OtpRejection::Mismatch)
        );
        assert_eq!(check_code(Some("123456"), Some(expires), "123456", now()), Ok(()));
    }

    #[test]
    fn check_code_honours_expiry_window() {
        let issued = now();
        let expires = issued + OTP_TTL;
        assert_eq!(
            check_code(Some("123456"), Some(expires), "123456", expires),
            Ok(())
        );
        assert_eq!(
            check_code(
                Some("123456"),
                Some(expires),
                "123456",
                expires + Duration::seconds(1)
            ),
            Err(OtpRejection::Expired)
        );
    }

    #[test]
    fn resend_cooldown_boundaries() {
        let last = now();
        assert!(!resend_allowed(Some(last), last + Duration::seconds(59)));
        assert!(resend_allowed(Some(last), last + Duration::seconds(60)));
        assert!(resend_allowed(Some(last), last + Duration::seconds(61)));
        assert!(resend_allowed(None, last));
    }
}
