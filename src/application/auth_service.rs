use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AdminBootstrap, AuthSettings};
use crate::domain::errors::{DomainError, FieldViolation};
use crate::domain::ports::UserRepository;
use crate::domain::user::{Actor, NewUser, ProfileChanges, Role, User};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Body of an issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.sub,
            role: self.role,
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), DomainError> {
        self.actor().require_role(role)
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Registration {
    fn validate(&self) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        let email = self.email.trim();
        if email.is_empty() {
            violations.push(FieldViolation::new("email", "Email is required"));
        } else if !email.contains('@') {
            violations.push(FieldViolation::new("email", "Email is not valid"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            violations.push(FieldViolation::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "Name is required"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }
}

/// A signed-in user together with a fresh token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, settings: AuthSettings) -> Self {
        Self { users, settings }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, DomainError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + self.settings.token_ttl.as_secs() as i64,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.expose().as_bytes()),
        )
        .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.expose().as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| DomainError::Unauthorized("invalid or expired token".to_string()))
    }

    /// Resolves a bearer token to a live, active account.
    pub fn authenticate(&self, token: &str) -> Result<User, DomainError> {
        let claims = self.verify(token)?;
        match self.users.find_by_id(claims.sub)? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(DomainError::Unauthorized("account is disabled".to_string())),
            None => Err(DomainError::Unauthorized("user no longer exists".to_string())),
        }
    }

    pub fn register(&self, registration: Registration) -> Result<Session, DomainError> {
        registration.validate()?;
        if self
            .users
            .find_by_email(registration.email.trim())?
            .is_some()
        {
            return Err(DomainError::Conflict("Email is already registered".to_string()));
        }

        let user = self.users.create(NewUser {
            id: Uuid::new_v4(),
            email: registration.email.trim().to_lowercase(),
            password_hash: hash_password(&registration.password)?,
            name: registration.name.trim().to_string(),
            phone: registration.phone,
            address: registration.address,
            role: Role::User,
        })?;
        info!("Registered user {}", user.id);
        let token = self.issue_token(&user)?;
        Ok(Session { user, token })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let invalid = || DomainError::Unauthorized("Invalid credentials".to_string());
        let user = self.users.find_by_email(email.trim())?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(DomainError::Unauthorized("account is disabled".to_string()));
        }
        let token = self.issue_token(&user)?;
        Ok(Session { user, token })
    }

    pub fn me(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)?
            .ok_or(DomainError::NotFound("User"))
    }

    pub fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<User, DomainError> {
        if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
            return Err(DomainError::invalid("name", "Name is required"));
        }
        if changes.is_empty() {
            return self.me(user_id);
        }
        self.users
            .update_profile(user_id, changes)?
            .ok_or(DomainError::NotFound("User"))
    }

    /// Makes sure the configured admin account exists with the configured password.
    pub fn ensure_admin(&self, admin: &AdminBootstrap) -> Result<User, DomainError> {
        let hash = hash_password(admin.password.expose())?;
        if let Some(existing) = self.users.find_by_email(&admin.email)? {
            let user = self
                .users
                .set_credentials(existing.id, hash, Role::Admin)?
                .ok_or(DomainError::NotFound("User"))?;
            info!("Admin account {} refreshed", user.email);
            return Ok(user);
        }
        let user = self.users.create(NewUser {
            id: Uuid::new_v4(),
            email: admin.email.clone(),
            password_hash: hash,
            name: "Administrator".to_string(),
            phone: None,
            address: None,
            role: Role::Admin,
        })?;
        info!("Admin account {} created", user.email);
        Ok(user)
    }
}

pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
