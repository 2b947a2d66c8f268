//! Auth orchestrator: login, OAuth login, refresh and logout flows

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{
    AuthResponse, Claims, MessageResponse, OAuthLoginRequest, RefreshResponse, TokenSubject,
};
use super::oauth_mapper::{
    disambiguated_username, map_profile, MappedIdentity, OAuthProvider, ProviderProfile,
};
use super::tokens::TokenService;
use crate::common::{safe_email_log, ApiError};
use crate::services::metrics::{AuthEvent, AuthMetrics};
use crate::users::models::{User, UserDto};
use crate::users::service::UsersService;

pub const UNAUTHENTICATED_MESSAGE: &str = "Invalid or missing authentication token";

/// Where a single authentication attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Validating,
    Authenticated,
    Rejected,
}

struct Attempt {
    flow: &'static str,
    state: AuthState,
}

impl Attempt {
    fn start(flow: &'static str) -> Self {
        Self {
            flow,
            state: AuthState::Unauthenticated,
        }
    }

    fn validating(&mut self) {
        self.state = AuthState::Validating;
    }

    fn finish<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.state = if result.is_ok() {
            AuthState::Authenticated
        } else {
            AuthState::Rejected
        };
        debug!(flow = self.flow, state = ?self.state, "Authentication attempt finished");
        result
    }
}

pub struct AuthService {
    users: Arc<UsersService>,
    tokens: Arc<TokenService>,
    metrics: Arc<AuthMetrics>,
}

impl AuthService {
    pub fn new(
        users: Arc<UsersService>,
        tokens: Arc<TokenService>,
        metrics: Arc<AuthMetrics>,
    ) -> Self {
        Self {
            users,
            tokens,
            metrics,
        }
    }

    /// Password login. An unknown username and a wrong password produce the
    /// same `InvalidCredentials` error.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.metrics.record(AuthEvent::AuthRequest);
        let mut attempt = Attempt::start("login");
        attempt.validating();

        let result = self.validate_credentials(username, password).await;
        let result = match result {
            Ok(user) => self.session_for(&user),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.metrics.record(AuthEvent::LoginFailure);
        }
        attempt.finish(result)
    }

    async fn validate_credentials(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            debug!("Login rejected: unknown username");
            return Err(ApiError::InvalidCredentials);
        };

        if !self.tokens.verify_password(password, &user.password).await? {
            warn!(user_id = user.id, "Login rejected: password mismatch");
            return Err(ApiError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Federated login. The provider profile is reconciled into a local user
    /// (created on first sight, matched by email afterwards) and the session
    /// tokens are issued for the local user id.
    pub async fn oauth_login(&self, request: OAuthLoginRequest) -> Result<AuthResponse, ApiError> {
        self.metrics.record(AuthEvent::AuthRequest);
        let mut attempt = Attempt::start("oauth_login");
        attempt.validating();

        let result = self.reconcile_oauth(request).await;
        let result = match result {
            Ok(user) => self.session_for(&user),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.metrics.record(AuthEvent::LoginFailure);
        }
        attempt.finish(result)
    }

    async fn reconcile_oauth(&self, request: OAuthLoginRequest) -> Result<User, ApiError> {
        let Some(raw_profile) = request.profile.as_ref() else {
            warn!(provider = %request.provider, "OAuth login without profile data");
            return Err(ApiError::Unauthorized(
                "Profile data is missing or incomplete".to_string(),
            ));
        };

        let provider = OAuthProvider::parse(&request.provider)?;
        let profile = ProviderProfile::from_raw(provider, raw_profile)?;
        let mapped = map_profile(&profile)?;

        let user = match self.users.find_by_email(&mapped.user.email).await? {
            Some(existing) => {
                debug!(
                    user_id = existing.id,
                    provider = %provider,
                    "OAuth profile matched existing user"
                );
                existing
            }
            None => self.create_oauth_account(&mapped).await?,
        };

        self.users
            .update_oauth_tokens(
                user.id,
                provider.as_str(),
                &mapped.subject_id,
                &request.access_token,
                request.refresh_token.as_deref(),
            )
            .await?;

        info!(
            user_id = user.id,
            email = %safe_email_log(&user.email),
            provider = %provider,
            "User authenticated via OAuth"
        );
        Ok(user)
    }

    /// A `Conflict` here means either a concurrent login created the same email
    /// first, or the mapped username belongs to another account.
    async fn create_oauth_account(&self, mapped: &MappedIdentity) -> Result<User, ApiError> {
        match self.users.create_oauth_user(mapped.user.clone()).await {
            Ok(user) => Ok(user),
            Err(ApiError::Conflict(_)) => {
                if let Some(existing) = self.users.find_by_email(&mapped.user.email).await? {
                    return Ok(existing);
                }

                let mut retry = mapped.user.clone();
                retry.username =
                    disambiguated_username(&mapped.user.username, mapped.provider, &mapped.subject_id);
                info!(
                    provider = %mapped.provider,
                    "OAuth username already taken, creating account under disambiguated name"
                );
                self.users.create_oauth_user(retry).await
            }
            Err(e) => Err(e),
        }
    }

    fn session_for(&self, user: &User) -> Result<AuthResponse, ApiError> {
        let pair = self.tokens.issue_token_pair(&TokenSubject::from(user))?;
        Ok(AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: UserDto::from(user),
        })
    }

    /// New access token for the refresh token's subject. Revoked refresh tokens
    /// are refused; the refresh token itself is not rotated.
    pub async fn refresh_token(&self, token: &str) -> Result<RefreshResponse, ApiError> {
        self.metrics.record(AuthEvent::AuthRequest);
        let mut attempt = Attempt::start("refresh");
        attempt.validating();

        let result = self.reissue_access(token).await;
        if result.is_err() {
            self.metrics.record(AuthEvent::RefreshFailure);
        }
        attempt.finish(result)
    }

    async fn reissue_access(&self, token: &str) -> Result<RefreshResponse, ApiError> {
        let claims = self.tokens.verify_token(token)?;
        if self.tokens.is_revoked(token).await? {
            warn!(sub = %claims.sub, "Refresh attempted with a revoked token");
            return Err(ApiError::Unauthorized("Invalid token".to_string()));
        }

        let subject = subject_from_claims(&claims)?;
        let access_token = self.tokens.issue_access_token(&subject)?;
        Ok(RefreshResponse { access_token })
    }

    /// Revoke the token. Cache faults are server errors, distinct from an
    /// invalid token.
    pub async fn logout(&self, token: &str) -> Result<MessageResponse, ApiError> {
        self.metrics.record(AuthEvent::AuthRequest);
        self.metrics.record(AuthEvent::Logout);

        match self.tokens.revoke(token).await {
            Ok(()) => {
                info!("User logout successful");
                Ok(MessageResponse {
                    message: "Logged out successfully".to_string(),
                })
            }
            Err(ApiError::InternalServer(detail)) => Err(ApiError::InternalServer(format!(
                "An error occurred during logout: {}",
                detail
            ))),
            Err(e) => Err(e),
        }
    }

    /// Guard check for protected routes: the token must be present, correctly
    /// signed, unexpired and not revoked.
    pub async fn authorize_bearer(&self, token: &str) -> Result<Claims, ApiError> {
        if token.is_empty() {
            return Err(ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()));
        }

        let claims = self
            .tokens
            .verify_token(token)
            .map_err(|_| ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()))?;

        // Only correctly signed tokens reach the cache
        if self.tokens.is_revoked(token).await? {
            warn!(sub = %claims.sub, "Rejected request carrying a revoked token");
            return Err(ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()));
        }

        Ok(claims)
    }
}

fn subject_from_claims(claims: &Claims) -> Result<TokenSubject, ApiError> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Token payload is invalid".to_string()))?;
    Ok(TokenSubject {
        user_id,
        username: claims.username.clone(),
    })
}
