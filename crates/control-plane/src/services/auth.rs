// Auth service: signup, login, OTP verification, session validation
//
// States: unregistered -> registered (unverified) -> OTP pending -> verified.
// A user holds at most one pending OTP; issuing a new one replaces it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use marketplace_core::otp::{check_otp, generate_otp, otp_expiry};
use marketplace_core::{DomainError, Result, Role};
use uuid::Uuid;

use crate::auth::jwt::{hash_token, JwtService};
use crate::mail::{EmailMessage, Mailer};
use crate::storage::{CreateUserRow, StorageBackend, UserRow, VerificationOutcome};

const EMAIL_TAKEN: &str = "User already exists";

/// A freshly issued code and the user it belongs to.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub user: UserRow,
    pub otp: String,
}

/// A verified user and their new session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserRow,
    pub token: String,
}

pub struct AuthService {
    db: StorageBackend,
    jwt: Arc<JwtService>,
    mailer: Arc<dyn Mailer>,
    otp_ttl: Duration,
}

impl AuthService {
    pub fn new(
        db: StorageBackend,
        jwt: Arc<JwtService>,
        mailer: Arc<dyn Mailer>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            db,
            jwt,
            mailer,
            otp_ttl,
        }
    }

    /// Register an unverified user and send them a code.
    ///
    /// `email` must already be normalized. Mail failures surface as
    /// `DomainError::Mail` after the user and OTP rows are written.
    pub async fn signup(&self, name: &str, email: &str) -> Result<OtpChallenge> {
        if self.db.get_user_by_email(email).await?.is_some() {
            return Err(DomainError::conflict(EMAIL_TAKEN));
        }

        let user = self
            .db
            .create_user(CreateUserRow {
                name: name.to_string(),
                email: email.to_string(),
                role: Role::User,
            })
            .await?;
        tracing::info!(user_id = %user.id, "User registered");

        let otp = self.issue_otp(&user).await?;
        Ok(OtpChallenge { user, otp })
    }

    /// Issue a new code for an existing user, replacing any pending one.
    pub async fn login(&self, email: &str) -> Result<OtpChallenge> {
        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        let otp = self.issue_otp(&user).await?;
        Ok(OtpChallenge { user, otp })
    }

    async fn issue_otp(&self, user: &UserRow) -> Result<String> {
        let otp = generate_otp();
        let ttl = chrono::Duration::from_std(self.otp_ttl).map_err(anyhow::Error::from)?;
        let expire_at = otp_expiry(Utc::now(), ttl);
        self.db.upsert_otp(user.id, &otp, expire_at).await?;

        let ttl_minutes = self.otp_ttl.as_secs().div_ceil(60);
        let message = EmailMessage::otp(&user.email, &user.name, &otp, ttl_minutes);
        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(user_id = %user.id, "Failed to deliver OTP: {:#}", e);
            return Err(DomainError::Mail(format!("{e:#}")));
        }

        tracing::info!(user_id = %user.id, "OTP issued");
        Ok(otp)
    }

    /// Check a presented code and open a session.
    ///
    /// The OTP row is consumed, the user marked verified and the token hash
    /// stored in one atomic step.
    pub async fn verify_otp(&self, user_id: Uuid, code: &str) -> Result<Session> {
        let pending = self
            .db
            .get_otp(user_id)
            .await?
            .ok_or(DomainError::InvalidOtp)?;

        check_otp(&pending.otp, pending.expire_at, code, Utc::now())?;

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        let token = self.jwt.issue_session_token(user.id, user.role())?;

        match self
            .db
            .complete_verification(user_id, &hash_token(&token))
            .await?
        {
            VerificationOutcome::Verified(user) => {
                tracing::info!(user_id = %user.id, "User verified");
                Ok(Session { user, token })
            }
            VerificationOutcome::OtpConsumed => Err(DomainError::InvalidOtp),
            VerificationOutcome::UserMissing => Err(DomainError::not_found("User")),
        }
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.db.get_user_by_email(email).await?.is_some())
    }

    /// Resolve a presented session token to its user.
    ///
    /// The signature and expiry must verify, the user must exist, and the
    /// token must be the latest one issued to that user.
    pub async fn authenticate(&self, token: &str) -> Result<UserRow> {
        let claims = self.jwt.validate_session_token(token).map_err(|e| {
            tracing::debug!("JWT validation failed: {:#}", e);
            DomainError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let user_id = claims
            .user_id()
            .map_err(|_| DomainError::Unauthorized("Invalid user ID in token".to_string()))?;

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        if user.token_hash.as_deref() != Some(hash_token(token).as_str()) {
            return Err(DomainError::Unauthorized("Token no longer valid".to_string()));
        }

        Ok(user)
    }
}
