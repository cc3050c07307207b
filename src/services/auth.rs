//! Authentication service: accounts, password hashing and bearer tokens

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, TokenResponse, User, UserClaims},
    repository::Repository,
};

/// Hash a password into a PHC string with a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hashed = hash_password(&request.password)?;
        let user = self.repository.users.create(&request.email, &hashed).await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Authenticate by email and password and issue an access token
    pub async fn login(&self, request: LoginRequest) -> AppResult<TokenResponse> {
        let invalid = || AppError::Authentication("Incorrect email or password".to_string());

        let user = self
            .repository
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.hashed_password) {
            tracing::warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let token = self.issue_token(&user)?;
        Ok(TokenResponse::bearer(token))
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_minutes)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a bearer token without touching the database
    pub fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            AppError::Authentication("Could not validate credentials".to_string())
        })
    }

    /// Resolve a bearer token to the account it was issued for
    pub async fn resolve(&self, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token)?;
        self.repository
            .users
            .find_by_id(claims.user_id)
            .await?
            .filter(|user| user.email == claims.sub)
            .ok_or_else(|| AppError::Authentication("Could not validate credentials".to_string()))
    }
}
