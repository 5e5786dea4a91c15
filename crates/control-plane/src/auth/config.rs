// Authentication configuration loaded from environment variables.
// Decision: AUTH_ prefix for all auth config
// Decision: Without AUTH_JWT_SECRET a random per-process secret is used (sessions die on restart)

use std::time::Duration;

use marketplace_core::otp::DEFAULT_OTP_TTL_SECS;

/// Default session token and cookie lifetime (1 hour)
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 60 * 60;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWTs
    pub secret: String,
    /// Session token lifetime
    pub token_lifetime: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_lifetime: Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Lifetime of an issued OTP
    pub otp_ttl: Duration,
    /// Set the `Secure` attribute on session cookies
    pub cookie_secure: bool,
    /// Include the OTP in signup/login responses
    pub expose_otp: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            otp_ttl: Duration::from_secs(DEFAULT_OTP_TTL_SECS as u64),
            cookie_secure: false,
            expose_otp: true,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|s| {
            let s = s.trim().to_lowercase();
            s == "true" || s == "1"
        })
        .unwrap_or(default)
}

fn env_secs(name: &str, default: u64) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let secret = std::env::var("AUTH_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!("AUTH_JWT_SECRET not set, using a random per-process secret");
                use rand::Rng;
                let bytes: [u8; 32] = rand::thread_rng().gen();
                hex::encode(bytes)
            });

        let jwt = JwtConfig {
            secret,
            token_lifetime: env_secs("AUTH_TOKEN_LIFETIME_SECS", DEFAULT_TOKEN_LIFETIME_SECS),
        };

        Self {
            jwt,
            otp_ttl: env_secs("AUTH_OTP_TTL_SECS", DEFAULT_OTP_TTL_SECS as u64),
            cookie_secure: env_flag("AUTH_COOKIE_SECURE", false),
            expose_otp: env_flag("AUTH_EXPOSE_OTP", true),
        }
    }

    /// Session lifetime in whole seconds (cookie max-age)
    pub fn token_lifetime_secs(&self) -> i64 {
        self.jwt.token_lifetime.as_secs() as i64
    }
}
