use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{User, UserSummary};
use crate::error::{DomainError, DomainResult, RepoError};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};

const DEFAULT_ROLES: &[&str] = &["user"];
const SEARCH_LIMIT: u64 = 50;

/// Registration input. Shape checks happen before this point.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// A user together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

/// Registration, login and token resolution.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    pub async fn register(&self, registration: Registration) -> DomainResult<AuthSession> {
        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(DomainError::Duplicate("Username already taken".to_string()));
        }
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(DomainError::Duplicate("Email already registered".to_string()));
        }

        let password_hash = self.passwords.hash(&registration.password)?;
        let user = User::new(
            registration.username,
            registration.email,
            password_hash,
            registration.full_name,
        );

        // A concurrent registration can still win the race to the unique index.
        let user = self.users.create(user).await.map_err(|e| match e {
            RepoError::Constraint(msg) => DomainError::Duplicate(msg),
            other => other.into(),
        })?;

        self.session_for(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> DomainResult<AuthSession> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.session_for(user)
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> DomainResult<User> {
        let claims = self.tokens.validate_token(token)?;
        self.users
            .find_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownSubject.into())
    }

    pub async fn find_user(&self, id: Uuid) -> DomainResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    pub async fn search_users(&self, query: &str) -> DomainResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::Validation("Query parameter is required".to_string()));
        }
        Ok(self.users.search(query, SEARCH_LIMIT).await?)
    }

    fn session_for(&self, user: User) -> DomainResult<AuthSession> {
        let roles = DEFAULT_ROLES.iter().map(|r| r.to_string()).collect();
        let access_token = self.tokens.generate_token(user.id, &user.username, roles)?;
        Ok(AuthSession {
            user,
            access_token,
            expires_in: self.tokens.expiration_seconds(),
        })
    }
}
