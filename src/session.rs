use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::user::Role;

/// Claims the backend puts in the bearer token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    /// Expiration timestamp (UNIX TIME)
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not logged in. Run `dept-checkout login` first.")]
    Missing,

    #[error("Session expired. Please login again.")]
    Expired,

    #[error("Invalid session. Please login again. ({0})")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Token store error: {0}")]
    Io(#[from] io::Error),
}

/// File-backed home of the bearer token between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(token.as_bytes())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Decodes the token payload and checks `exp`. The signature is not checked:
/// the client never holds the signing secret and the backend verifies every
/// call anyway.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e),
        })
}

/// The logged-in user, passed explicitly to whatever needs identity or role.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: String,
    claims: Claims,
}

impl Session {
    pub fn from_token(token: &str) -> Result<Self, SessionError> {
        let claims = decode_claims(token)?;
        Ok(Self { token: token.to_string(), claims })
    }

    /// Restores the stored session. Expired or malformed tokens are deleted
    /// and reported so the user is asked to log in again.
    pub fn restore(store: &TokenStore) -> Result<Option<Self>, SessionError> {
        let Some(token) = store.load()? else {
            return Ok(None);
        };

        match Self::from_token(&token) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding stored token: {}", e);
                store.clear()?;
                Err(e)
            }
        }
    }

    /// Validates and persists a freshly issued token.
    pub fn login(store: &TokenStore, token: &str) -> Result<Self, SessionError> {
        let session = match Self::from_token(token) {
            Ok(session) => session,
            Err(e) => {
                store.clear()?;
                return Err(e);
            }
        };
        store.save(token)?;
        info!("Login successful for {} ({})", session.claims.email, session.claims.role);
        Ok(session)
    }

    pub fn logout(store: &TokenStore) -> Result<(), SessionError> {
        store.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.claims.user_id
    }

    pub fn name(&self) -> &str {
        &self.claims.name
    }

    pub fn email(&self) -> &str {
        &self.claims.email
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.claims.exp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(role: &str, exp_offset: i64) -> String {
        let exp = (Utc::now().timestamp() + exp_offset) as u64;
        let claims = serde_json::json!({
            "userId": "u-42",
            "email": "grace@uni.edu",
            "name": "Grace",
            "role": role,
            "exp": exp,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"server-only")).unwrap()
    }

    #[test]
    fn decodes_claims_without_the_signing_secret() {
        let session = Session::from_token(&token("faculty", 3600)).unwrap();
        assert_eq!(session.user_id(), "u-42");
        assert_eq!(session.role(), Role::Faculty);
        assert!(session.expires_at().unwrap() > Utc::now());
    }

    #[test]
    fn expired_and_garbage_tokens_are_rejected() {
        assert!(matches!(decode_claims(&token("student", -120)), Err(SessionError::Expired)));
        assert!(matches!(decode_claims("not-a-jwt"), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn restore_discards_expired_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token"));

        store.save(&token("student", -120)).unwrap();
        assert!(matches!(Session::restore(&store), Err(SessionError::Expired)));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(Session::restore(&store).unwrap(), None);
    }

    #[test]
    fn login_persists_and_logout_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        let raw = token("admin", 3600);

        let session = Session::login(&store, &raw).unwrap();
        assert_eq!(session.role(), Role::Admin);
        assert_eq!(store.load().unwrap().as_deref(), Some(raw.as_str()));

        let restored = Session::restore(&store).unwrap().unwrap();
        assert_eq!(restored, session);

        Session::logout(&store).unwrap();
        assert_eq!(store.load().unwrap(), None);
        Session::logout(&store).unwrap();
    }

    #[test]
    fn login_with_malformed_token_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        assert!(Session::login(&store, "abc.def.ghi").is_err());
        assert_eq!(store.load().unwrap(), None);
    }
}
