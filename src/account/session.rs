use super::backend::Backend;
use super::AccountError;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Minimum password length accepted by the hosted auth service.
const MIN_PASSWORD_LEN: usize = 6;

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of registering an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is live and a session was opened.
    SignedIn(User),
    /// The service sent a confirmation email; sign in after confirming.
    ConfirmationRequired(User),
}

struct Session {
    access_token: Arc<SecretString>,
    refresh_token: Option<SecretString>,
    expires_at: Option<Instant>,
    user: User,
}

impl Session {
    fn needs_refresh(&self) -> bool {
        self.refresh_token.is_some()
            && self
                .expires_at
                .is_some_and(|at| at <= Instant::now() + REFRESH_MARGIN)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: User,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        Session {
            access_token: Arc::new(SecretString::from(t.access_token)),
            refresh_token: t.refresh_token.map(SecretString::from),
            expires_at: t
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
            user: t.user,
        }
    }
}

fn validate_email(email: &str) -> Result<&str, AccountError> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AccountError::InvalidInput("Enter a valid email address".into()));
    }
    Ok(email)
}

fn validate_new_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Client for the hosted auth service.
///
/// Holds at most one session. The access token never leaves this type except
/// as a [`SecretString`] handed to [`RowStore`](super::RowStore).
pub struct AuthClient {
    backend: Backend,
    session: RwLock<Option<Session>>,
    /// Held for the whole of a token refresh. Refresh tokens rotate, so two
    /// refreshes racing with the same token would end the session.
    refresh_lock: Mutex<()>,
}

impl AuthClient {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Password sign-in. Replaces any existing session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(AccountError::InvalidInput("Enter your password".into()));
        }

        let request = self
            .backend
            .request(Method::POST, "/auth/v1/token?grant_type=password", None)
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = self.backend.send_json(request).await?;
        let user = token.user.clone();

        *self.session.write().await = Some(Session::from(token));
        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Registers a new account. `confirm` must equal `password`; a mismatch
    /// is rejected before anything is sent.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<SignUpOutcome, AccountError> {
        if password != confirm {
            return Err(AccountError::PasswordMismatch);
        }
        let email = validate_email(email)?;
        validate_new_password(password)?;

        let request = self
            .backend
            .request(Method::POST, "/auth/v1/signup", None)
            .json(&json!({ "email": email, "password": password }));
        let body: Value = self.backend.send_json(request).await?;

        // With email confirmation enabled the service returns a bare user
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| AccountError::Malformed(e.to_string()))?;
            let user = token.user.clone();
            *self.session.write().await = Some(Session::from(token));
            tracing::info!(user_id = %user.id, "Account created and signed in");
            Ok(SignUpOutcome::SignedIn(user))
        } else {
            let user: User = serde_json::from_value(body)
                .map_err(|e| AccountError::Malformed(e.to_string()))?;
            tracing::info!(user_id = %user.id, "Account created, awaiting confirmation");
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    /// Ends the session. The local session is dropped even when the remote
    /// logout fails.
    pub async fn sign_out(&self) -> Result<(), AccountError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let request = self.backend.request(
            Method::POST,
            "/auth/v1/logout",
            Some(session.access_token.as_ref()),
        );
        match self.backend.send(request).await {
            Ok(_) => {
                tracing::info!(user_id = %session.user.id, "Signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote logout failed; local session cleared");
                Err(e)
            }
        }
    }

    /// The signed-in user, if any. No network access.
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    /// Changes email and/or password of the signed-in user.
    pub async fn update_user(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AccountError> {
        let mut changes = serde_json::Map::new();
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            changes.insert("email".into(), json!(validate_email(email)?));
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            validate_new_password(password)?;
            changes.insert("password".into(), json!(password));
        }
        if changes.is_empty() {
            return Err(AccountError::InvalidInput("Nothing to update".into()));
        }

        let (token, _) = self.access_token().await?;
        let request = self
            .backend
            .request(Method::PUT, "/auth/v1/user", Some(token.as_ref()))
            .json(&Value::Object(changes));
        let user: User = self.backend.send_json(request).await?;
        self.store_user(&user).await;
        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Bearer token and user for row-store calls, refreshing a token that is
    /// about to expire.
    pub(crate) async fn access_token(&self) -> Result<(Arc<SecretString>, User), AccountError> {
        {
            let guard = self.session.read().await;
            let session = guard.as_ref().ok_or(AccountError::NotSignedIn)?;
            if !session.needs_refresh() {
                return Ok((Arc::clone(&session.access_token), session.user.clone()));
            }
        }
        self.refresh().await
    }

    /// Exchanges the refresh token for a new session.
    ///
    /// The session lock is not held during the request, so `current_user`
    /// and fresh tokens stay available while it runs.
    async fn refresh(&self) -> Result<(Arc<SecretString>, User), AccountError> {
        let _refreshing = self.refresh_lock.lock().await;
        let refresh_token = {
            let guard = self.session.read().await;
            let session = guard.as_ref().ok_or(AccountError::NotSignedIn)?;
            // Another task may have refreshed while we waited for the lock
            if !session.needs_refresh() {
                return Ok((Arc::clone(&session.access_token), session.user.clone()));
            }
            match session.refresh_token.as_ref() {
                Some(token) => SecretString::from(token.expose_secret().to_string()),
                None => return Ok((Arc::clone(&session.access_token), session.user.clone())),
            }
        };

        let request = self
            .backend
            .request(Method::POST, "/auth/v1/token?grant_type=refresh_token", None)
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));
        let outcome = self.backend.send_json::<TokenResponse>(request).await;

        let mut guard = self.session.write().await;
        // A sign-out or a new sign-in during the request wins over its result
        let same_session = guard
            .as_ref()
            .and_then(|s| s.refresh_token.as_ref())
            .is_some_and(|t| t.expose_secret() == refresh_token.expose_secret());
        if !same_session {
            let session = guard.as_ref().ok_or(AccountError::NotSignedIn)?;
            return Ok((Arc::clone(&session.access_token), session.user.clone()));
        }

        match outcome {
            Ok(token) => {
                let fresh = Session::from(token);
                let result = (Arc::clone(&fresh.access_token), fresh.user.clone());
                *guard = Some(fresh);
                tracing::debug!("Session refreshed");
                Ok(result)
            }
            Err(AccountError::Rejected { .. }) => {
                // Refresh token revoked or expired: the session is over
                *guard = None;
                tracing::info!("Session expired; signed out");
                Err(AccountError::NotSignedIn)
            }
            Err(e) => Err(e),
        }
    }

    async fn store_user(&self, user: &User) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.user = user.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AuthClient {
        let backend =
            Backend::new(reqwest::Client::new(), &server.uri(), SecretString::from("anon-key"))
                .unwrap();
        AuthClient::new(backend)
    }

    fn token_body(expires_in: u64) -> Value {
        json!({
            "access_token": "user-jwt",
            "token_type": "bearer",
            "expires_in": expires_in,
            "refresh_token": "refresh-1",
            "user": {"id": "u-1", "email": "ada@example.com"}
        })
    }

    #[tokio::test]
    async fn test_sign_in_opens_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_partial_json(json!({"email": "ada@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(3600)))
            .expect(1)
            .mount(&server)
            .await;

        let auth = client_for(&server);
        assert!(auth.current_user().await.is_none());
        let user = auth.sign_in(" ada@example.com ", "hunter22").await.unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(auth.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = client_for(&server);
        let err = auth.sign_in("ada@example.com", "wrong").await.unwrap_err();
        match err {
            AccountError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            e => panic!("Expected Rejected, got {:?}", e),
        }
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_mismatch_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let auth = client_for(&server);
        let err = auth
            .sign_up("ada@example.com", "secret1", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::PasswordMismatch));
        let err = auth.sign_up("not-an-email", "secret1", "secret1").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_sign_up_awaiting_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u-2",
                "email": "grace@example.com",
                "confirmation_sent_at": "2024-05-01T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let auth = client_for(&server);
        let outcome = auth
            .sign_up("grace@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired(ref u) if u.id == "u-2"));
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(3600)))
            .mount(&server)
            .await;
        Mock::given(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let auth = client_for(&server);
        auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert!(auth.sign_out().await.is_err());
        assert!(auth.current_user().await.is_none());
        // Second sign-out is a local no-op
        assert!(auth.sign_out().await.is_ok());
    }

    #[tokio::test]
    async fn test_update_user_requires_session() {
        let server = MockServer::start().await;
        let auth = client_for(&server);
        let err = auth
            .update_user(Some("new@example.com"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_update_user_sends_both_fields() {
        let server = MockServer::start().await;
        Mock::given(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(3600)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .and(body_partial_json(json!({"email": "new@example.com", "password": "longer-secret"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "u-1", "email": "new@example.com"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let auth = client_for(&server);
        auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        let user = auth
            .update_user(Some("new@example.com"), Some("longer-secret"))
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("new@example.com"));
        assert_eq!(
            auth.current_user().await.unwrap().email.as_deref(),
            Some("new@example.com")
        );

        let err = auth.update_user(None, Some("short")).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(0)))
            .mount(&server)
            .await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_partial_json(json!({"refresh_token": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-jwt",
                "expires_in": 3600,
                "refresh_token": "refresh-2",
                "user": {"id": "u-1", "email": "ada@example.com"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = client_for(&server);
        auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        let (first, second) = tokio::join!(auth.access_token(), auth.access_token());
        let (token, user) = first.unwrap();
        assert_eq!(token.expose_secret(), "fresh-jwt");
        assert_eq!(user.id, "u-1");
        // The second caller reuses the refreshed session
        assert_eq!(second.unwrap().0.expose_secret(), "fresh-jwt");
    }

    #[tokio::test]
    async fn test_session_readable_during_refresh() {
        let server = MockServer::start().await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(0)))
            .mount(&server)
            .await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body(3600))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let auth = client_for(&server);
        auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        let (refreshed, read_time) = tokio::join!(auth.access_token(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let started = Instant::now();
            assert!(auth.current_user().await.is_some());
            started.elapsed()
        });
        assert!(refreshed.is_ok());
        assert!(read_time < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_sign_out_during_refresh_stays_signed_out() {
        let server = MockServer::start().await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(0)))
            .mount(&server)
            .await;
        Mock::given(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body(3600))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let auth = client_for(&server);
        auth.sign_in("ada@example.com", "hunter22").await.unwrap();
        let (refreshed, _) = tokio::join!(auth.access_token(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            auth.sign_out().await
        });
        assert!(matches!(refreshed, Err(AccountError::NotSignedIn)));
        assert!(auth.current_user().await.is_none());
    }
}
