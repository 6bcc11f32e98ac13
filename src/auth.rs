//! Local account store with signed session tokens. Not a real identity provider.
use chrono::{Duration, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::error::{AuthError, StoreError};
use crate::store::KeyValueStore;

pub const USERS_KEY: &str = "users";
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    id: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct AuthService<S: KeyValueStore> {
    store: S,
    secret: Vec<u8>,
}

impl<S: KeyValueStore> AuthService<S> {
    pub fn new(store: S, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    pub fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut users = self.load_users()?;
        if find_user(&users, email).is_some() {
            return Err(AuthError::EmailTaken);
        }
        let user = StoredUser {
            id: new_user_id(email),
            email: email.to_string(),
            password_hash: self.password_hash(password),
        };
        users.push(user.clone());
        self.store
            .set(USERS_KEY, serde_json::to_string(&users).map_err(StoreError::from)?)?;
        info!("Registered user {}", user.id);
        Ok(self.session_for(&user))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let users = self.load_users()?;
        let user = find_user(&users, email).ok_or(AuthError::InvalidCredentials)?;
        let expected = self.password_hash(password);
        if !constant_time_eq(user.password_hash.as_bytes(), expected.as_bytes()) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(self.session_for(user))
    }

    /// Claims of a token signed by this service and not yet expired.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let (payload_hex, sig_hex) = token.split_once('.')?;
        let payload = hex::decode(payload_hex).ok()?;
        let signature = hex::decode(sig_hex).ok()?;
        let computed = self.sign(&payload);
        if signature.len() != computed.len() || !constant_time_eq(&computed, &signature) {
            return None;
        }
        let claims: Claims = serde_json::from_slice(&payload).ok()?;
        if claims.exp <= Utc::now().timestamp() {
            return None;
        }
        Some(claims)
    }

    fn load_users(&self) -> Result<Vec<StoredUser>, AuthError> {
        let Some(raw) = self.store.get(USERS_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed user store: {}", e);
            Vec::new()
        }))
    }

    fn session_for(&self, user: &StoredUser) -> Session {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        Session {
            token: self.issue(&claims),
            user: User {
                id: user.id.clone(),
                email: user.email.clone(),
            },
        }
    }

    fn issue(&self, claims: &Claims) -> String {
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let signature = self.sign(&payload);
        format!("{}.{}", hex::encode(&payload), hex::encode(signature))
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&self.secret) else {
            return Vec::new();
        };
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn password_hash(&self, password: &str) -> String {
        hex::encode(self.sign(password.as_bytes()))
    }
}

fn find_user<'a>(users: &'a [StoredUser], email: &str) -> Option<&'a StoredUser> {
    users
        .iter()
        .find(|u| u.email.to_lowercase() == email.to_lowercase())
}

fn new_user_id(email: &str) -> String {
    use sha2::Digest;
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let digest = Sha256::digest(format!("{}:{}", email.to_lowercase(), nanos).as_bytes());
    hex::encode(&digest[..16])
}
