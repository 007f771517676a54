/// Shared JWT module for identity tokens
///
/// Issues and validates compact HS256 token pairs. The access and refresh
/// tokens of one pair share a single `jti`, which is the revocation key used
/// by logout.
///
/// ## Security Design
///
/// - **HS256 ONLY**: any other header algorithm is rejected, including the
///   other HMAC variants (algorithm-confusion attacks)
/// - **Strict decoding**: exactly three non-empty base64url segments
/// - **Typed claims**: every required claim is a typed struct field, so a
///   missing or mistyped claim fails deserialization instead of defaulting
/// - **No oracle**: every validation failure is reported as
///   [`JwtError::InvalidToken`]; the reason is only logged at debug level
/// - **No globals**: keys live in [`TokenIssuer`] / [`TokenValidator`]
///   instances that are built at startup and injected
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - the only one accepted on decode
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Tolerated clock skew for `iat` claims set in the future
const MAX_IAT_FUTURE_SKEW_SECS: i64 = 60;

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Any decoding or verification failure. Deliberately undifferentiated.
    #[error("Invalid token")]
    InvalidToken,

    #[error("JWT configuration error: {0}")]
    Config(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

// ============================================================================
// Data Structures
// ============================================================================

/// Signing configuration shared by issuer and validator
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Symmetric HS256 secret
    pub secret: String,
    /// Value of the `iss` claim, checked on every decode
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Upper bound for either token lifetime (100 years); keeps `exp` in range
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

impl JwtConfig {
    fn check(&self) -> Result<(), JwtError> {
        if self.secret.is_empty() {
            return Err(JwtError::Config("JWT secret must not be empty".to_string()));
        }
        if self.issuer.is_empty() {
            return Err(JwtError::Config("JWT issuer must not be empty".to_string()));
        }
        if self.access_ttl.is_zero() {
            return Err(JwtError::Config(
                "access token TTL must be positive".to_string(),
            ));
        }
        if self.refresh_ttl > MAX_TOKEN_TTL {
            return Err(JwtError::Config(format!(
                "refresh token TTL must not exceed {} seconds",
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        if self.refresh_ttl < self.access_ttl {
            return Err(JwtError::Config(
                "refresh token TTL must not be shorter than access token TTL".to_string(),
            ));
        }
        Ok(())
    }
}

/// Identity snapshot embedded into access tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub enabled: bool,
    pub deleted: bool,
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    /// Subject (user ID)
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    /// Token pair identifier, shared with the refresh token
    pub jti: String,
    /// Token type: "access"
    pub typ: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub enabled: bool,
    pub deleted: bool,
}

/// Refresh token claims (no identity snapshot)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// Token type: "refresh"
    pub typ: String,
}

/// Token pair response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Shared token identifier of both tokens
    pub jti: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

// ============================================================================
// Token Generation
// ============================================================================

/// Mints signed token pairs
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Result<Self, JwtError> {
        config.check()?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        })
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access/refresh pair sharing one freshly generated `jti`
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, JwtError> {
        let now = Utc::now().timestamp();
        let jti = Uuid::new_v4().to_string();

        let access = AccessClaims {
            iss: self.issuer.clone(),
            sub: subject.id,
            iat: now,
            exp: expiry(now, self.access_ttl)?,
            jti: jti.clone(),
            typ: ACCESS_TOKEN_TYPE.to_string(),
            username: subject.username.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            enabled: subject.enabled,
            deleted: subject.deleted,
        };

        let refresh = RefreshClaims {
            iss: self.issuer.clone(),
            sub: subject.id,
            iat: now,
            exp: expiry(now, self.refresh_ttl)?,
            jti: jti.clone(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
        };

        let header = Header::new(JWT_ALGORITHM);
        let access_token = encode(&header, &access, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))?;
        let refresh_token = encode(&header, &refresh, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            jti,
            expires_in: secs(self.access_ttl),
        })
    }
}

fn secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

fn expiry(now: i64, ttl: Duration) -> Result<i64, JwtError> {
    now.checked_add(secs(ttl))
        .ok_or_else(|| JwtError::Config("token TTL overflows the exp claim".to_string()))
}

// ============================================================================
// Token Validation
// ============================================================================

/// Verifies token signatures and claims
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &JwtConfig) -> Result<Self, JwtError> {
        config.check()?;

        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.algorithms = vec![JWT_ALGORITHM];
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }

    /// Validate an access token and return its claims
    pub fn validate_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = self.decode_strict(token)?;
        check_registered(claims.iat, &claims.jti, &claims.typ, ACCESS_TOKEN_TYPE)?;
        Ok(claims)
    }

    /// Validate a refresh token and return its claims
    pub fn validate_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = self.decode_strict(token)?;
        check_registered(claims.iat, &claims.jti, &claims.typ, REFRESH_TOKEN_TYPE)?;
        Ok(claims)
    }

    fn decode_strict<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        if !is_compact_form(token) {
            debug!("Token rejected: not a three-segment compact token");
            return Err(JwtError::InvalidToken);
        }

        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token validation failed");
                JwtError::InvalidToken
            })
    }
}

fn check_registered(iat: i64, jti: &str, typ: &str, expected_typ: &str) -> Result<(), JwtError> {
    if typ != expected_typ {
        debug!(typ = %typ, expected = %expected_typ, "Token rejected: wrong token type");
        return Err(JwtError::InvalidToken);
    }
    if jti.is_empty() {
        debug!("Token rejected: empty jti");
        return Err(JwtError::InvalidToken);
    }
    if iat > Utc::now().timestamp() + MAX_IAT_FUTURE_SKEW_SECS {
        debug!(iat, "Token rejected: issued in the future");
        return Err(JwtError::InvalidToken);
    }
    Ok(())
}

/// Exactly three non-empty segments of unpadded base64url characters
fn is_compact_form(token: &str) -> bool {
    let mut segments = 0;
    for part in token.split('.') {
        segments += 1;
        if part.is_empty()
            || !part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return false;
        }
    }
    segments == 3
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SECRET: &str = "test-secret-for-unit-tests-only-0123456789";
    const TEST_ISSUER: &str = "identity-test";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: TEST_SECRET.to_string(),
            issuer: TEST_ISSUER.to_string(),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(86400),
        }
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "user".to_string(),
            enabled: true,
            deleted: false,
        }
    }

    fn sign(claims: &serde_json::Value, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("test token should encode")
    }

    fn raw_access_claims() -> serde_json::Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": TEST_ISSUER,
            "sub": Uuid::new_v4().to_string(),
            "iat": now,
            "exp": now + 600,
            "jti": Uuid::new_v4().to_string(),
            "typ": "access",
            "username": "bob",
            "email": "bob@example.com",
            "role": "user",
            "enabled": true,
            "deleted": false,
        })
    }

    #[test]
    fn test_signed_claims_round_trip() {
        let validator = TokenValidator::new(&config()).unwrap();
        for _ in 0..5 {
            let claims = raw_access_claims();
            let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
            let decoded = validator.validate_access(&token).unwrap();
            assert_eq!(decoded.sub.to_string(), claims["sub"].as_str().unwrap());
            assert_eq!(decoded.jti, claims["jti"].as_str().unwrap());
        }
    }

    #[test]
    fn test_issue_pair_shares_subject_and_jti() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let validator = TokenValidator::new(&config()).unwrap();
        let subject = subject();

        let pair = issuer.issue_pair(&subject).unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let access = validator.validate_access(&pair.access_token).unwrap();
        let refresh = validator.validate_refresh(&pair.refresh_token).unwrap();

        assert_eq!(access.sub, subject.id);
        assert_eq!(refresh.sub, subject.id);
        assert_eq!(access.jti, refresh.jti);
        assert_eq!(access.jti, pair.jti);
        assert_eq!(access.username, "alice");
        assert!(access.enabled);
        assert!(!access.deleted);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_each_pair_gets_new_jti() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let subject = subject();
        let first = issuer.issue_pair(&subject).unwrap();
        let second = issuer.issue_pair(&subject).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_different_secret_is_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        let token = sign(&raw_access_claims(), Algorithm::HS256, "another-secret");
        assert!(matches!(
            validator.validate_access(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_disallowed_algorithms_are_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign(&raw_access_claims(), alg, TEST_SECRET);
            assert!(matches!(
                validator.validate_access(&token),
                Err(JwtError::InvalidToken)
            ));
        }
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        let token = sign(&raw_access_claims(), Algorithm::HS256, TEST_SECRET);
        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let payload = parts.next().unwrap();
        // {"alg":"none","typ":"JWT"}
        let none_header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
        assert!(validator
            .validate_access(&format!("{none_header}.{payload}.sig"))
            .is_err());
        assert!(validator.validate_access(&format!("{header}.{payload}.")).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        let mut claims = raw_access_claims();
        claims["iss"] = json!("someone-else");
        let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
        assert!(matches!(
            validator.validate_access(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        let mut claims = raw_access_claims();
        let now = Utc::now().timestamp();
        claims["iat"] = json!(now - 120);
        claims["exp"] = json!(now - 1);
        let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
        assert!(matches!(
            validator.validate_access(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_missing_time_claims_are_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        for claim in ["iat", "exp", "jti", "sub", "iss"] {
            let mut claims = raw_access_claims();
            claims.as_object_mut().unwrap().remove(claim);
            let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
            assert!(
                validator.validate_access(&token).is_err(),
                "token without {claim} must be rejected"
            );
        }
    }

    #[test]
    fn test_mistyped_claims_are_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();

        let mut claims = raw_access_claims();
        claims["enabled"] = json!("yes");
        let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
        assert!(validator.validate_access(&token).is_err());

        let mut claims = raw_access_claims();
        claims["sub"] = json!("not-a-uuid");
        let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
        assert!(validator.validate_access(&token).is_err());
    }

    #[test]
    fn test_future_issued_at_is_rejected() {
        let validator = TokenValidator::new(&config()).unwrap();
        let mut claims = raw_access_claims();
        let now = Utc::now().timestamp();
        claims["iat"] = json!(now + 3600);
        claims["exp"] = json!(now + 7200);
        let token = sign(&claims, Algorithm::HS256, TEST_SECRET);
        assert!(validator.validate_access(&token).is_err());
    }

    #[test]
    fn test_trailing_data_is_rejected() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let validator = TokenValidator::new(&config()).unwrap();
        let pair = issuer.issue_pair(&subject()).unwrap();

        for tampered in [
            format!("{}.extra", pair.access_token),
            format!("{}=", pair.access_token),
            format!("{} ", pair.access_token),
            format!("{}\n", pair.access_token),
        ] {
            assert!(matches!(
                validator.validate_access(&tampered),
                Err(JwtError::InvalidToken)
            ));
        }
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let validator = TokenValidator::new(&config()).unwrap();
        let pair = issuer.issue_pair(&subject()).unwrap();

        assert!(validator.validate_access(&pair.refresh_token).is_err());
        assert!(validator.validate_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let issuer = TokenIssuer::new(&config()).unwrap();
        let validator = TokenValidator::new(&config()).unwrap();
        let pair = issuer.issue_pair(&subject()).unwrap();

        let mut parts: Vec<String> = pair.access_token.split('.').map(String::from).collect();
        let forged = sign(&raw_access_claims(), Algorithm::HS256, TEST_SECRET);
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        assert!(validator.validate_access(&parts.join(".")).is_err());
    }

    #[test]
    fn test_config_rejects_short_refresh_ttl() {
        let mut cfg = config();
        cfg.refresh_ttl = Duration::from_secs(10);
        assert!(matches!(TokenIssuer::new(&cfg), Err(JwtError::Config(_))));

        let mut cfg = config();
        cfg.secret.clear();
        assert!(matches!(TokenValidator::new(&cfg), Err(JwtError::Config(_))));
    }

    #[test]
    fn test_config_rejects_unbounded_ttl() {
        let mut cfg = config();
        cfg.refresh_ttl = Duration::from_secs(u64::MAX);
        assert!(matches!(TokenIssuer::new(&cfg), Err(JwtError::Config(_))));

        let mut cfg = config();
        cfg.access_ttl = MAX_TOKEN_TTL;
        cfg.refresh_ttl = MAX_TOKEN_TTL;
        let pair = TokenIssuer::new(&cfg).unwrap().issue_pair(&subject()).unwrap();
        assert_eq!(pair.expires_in, MAX_TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        assert!(matches!(
            expiry(i64::MAX - 10, Duration::from_secs(60)),
            Err(JwtError::Config(_))
        ));
        assert_eq!(expiry(100, Duration::from_secs(60)).unwrap(), 160);
    }
}
