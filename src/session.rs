use crate::api::{ApiClient, ApiError};
use crate::error::ValidationError;
use secrecy::SecretString;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    /// Blank username or password; nothing was sent to the server.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The remote call failed. State is unchanged unless the server
    /// confirmed the transition first.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Session State
// ============================================================================

/// Process-wide authentication state.
///
/// Initialized unauthenticated; set on a successful check or login, cleared
/// on logout or a failed check. `username` is known only after an explicit
/// login in this process (the auth probe confirms the cookie without
/// returning an identity).
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub authenticated: bool,
    pub username: Option<Arc<str>>,
}

// ============================================================================
// Session Gate
// ============================================================================

/// Tracks the authenticated/unauthenticated view state and gates feed
/// initialization on it.
#[derive(Default)]
pub struct SessionGate {
    state: SessionState,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    /// The signed-in username, if one was established by login.
    pub fn username(&self) -> Option<&str> {
        self.state.username.as_deref()
    }

    /// Probes the server for a live session.
    ///
    /// Never errors: any failure, transport or otherwise, is treated as
    /// "not authenticated" and logged. Fail-closed is the only safe reading
    /// of an unreachable auth endpoint.
    pub async fn check_status(&mut self, api: &ApiClient) -> bool {
        match api.check_auth().await {
            Ok(()) => {
                self.state.authenticated = true;
                tracing::debug!("Session check: authenticated");
            }
            Err(e) => {
                self.state.authenticated = false;
                self.state.username = None;
                tracing::debug!(error = %e, "Session check failed, treating as unauthenticated");
            }
        }
        self.state.authenticated
    }

    /// Logs in and records the username on confirmed success only.
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &SecretString,
    ) -> Result<(), SessionError> {
        validate_credentials(username, password)?;
        api.login(username, password).await?;
        self.state.authenticated = true;
        self.state.username = Some(Arc::from(username));
        Ok(())
    }

    /// Registers a new account. Does not log in; the collaborator expects a
    /// separate login after registration.
    pub async fn register(
        &self,
        api: &ApiClient,
        username: &str,
        password: &SecretString,
    ) -> Result<(), SessionError> {
        validate_credentials(username, password)?;
        api.register(username, password).await?;
        Ok(())
    }

    /// Logs out. State is cleared only after the server confirms; a failed
    /// logout leaves the session as it was so the viewer can retry.
    pub async fn logout(&mut self, api: &ApiClient) -> Result<(), SessionError> {
        api.logout().await?;
        self.state = SessionState::default();
        Ok(())
    }

    /// Drops to the logged-out state without a remote call.
    ///
    /// Used when any feed operation comes back 401/403: the cookie is gone
    /// server-side and the local state must follow.
    pub fn force_logout(&mut self) {
        if self.state.authenticated {
            tracing::info!("Session expired, dropping to logged-out state");
        }
        self.state = SessionState::default();
    }
}

fn validate_credentials(username: &str, password: &SecretString) -> Result<(), ValidationError> {
    use secrecy::ExposeSecret;
    if username.trim().is_empty() || password.expose_secret().is_empty() {
        return Err(ValidationError::EmptyCredentials);
    }
    Ok(())
}
