// One-time password codes
//
// Codes are 6 ASCII digits drawn uniformly from 100000..=999999.
// Expiry is checked before the code itself, so an expired code fails
// as expired whether or not it matches.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;

use crate::error::DomainError;

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;
pub const OTP_LENGTH: usize = 6;

/// Default lifetime of an issued code.
pub const DEFAULT_OTP_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("OTP expired")]
    Expired,
    #[error("OTP does not match")]
    Mismatch,
}

impl From<OtpError> for DomainError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Expired => DomainError::OtpExpired,
            OtpError::Mismatch => DomainError::InvalidOtp,
        }
    }
}

/// Generate a fresh 6-digit code.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX);
    code.to_string()
}

/// Expiry instant for a code issued at `issued_at`.
pub fn otp_expiry(issued_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    issued_at + ttl
}

/// Check a presented code against the stored one.
pub fn check_otp(
    stored_code: &str,
    expire_at: DateTime<Utc>,
    presented_code: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    if expire_at < now {
        return Err(OtpError::Expired);
    }
    if stored_code != presented_code.trim() {
        return Err(OtpError::Mismatch);
    }
    Ok(())
}
