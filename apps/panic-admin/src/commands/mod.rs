use anyhow::{Context, Result, bail};
use panic_admin_client::AdminApiClient;
use panic_admin_core::{FileTokenStore, Gate, GuardDecision, Session, SessionContext};
use tracing::debug;

use crate::config::AdminConfig;

mod dashboard;
mod feed;
mod records;
mod reports;
mod session;
mod settings;

/// Shared state for one CLI invocation.
pub struct Console {
    config: AdminConfig,
    session: SessionContext<FileTokenStore>,
}

impl Console {
    pub fn new(config: AdminConfig) -> Self {
        let session = SessionContext::new(FileTokenStore::new(config.token_path.clone()));
        Self { config, session }
    }

    /// Client carrying the stored token, if any.
    fn client(&self) -> Result<AdminApiClient> {
        let token = self
            .session
            .bearer_token()
            .context("failed to read session token")?;
        AdminApiClient::new(self.config.api_client_config(token)).context("invalid API client config")
    }

    /// Session admitted to a guarded area; refuses before any request is made.
    fn admit(&self, gate: Gate, area: &str) -> Result<Session> {
        match self
            .session
            .authorize(gate, area)
            .context("failed to read session token")?
        {
            GuardDecision::Allow(session) => {
                debug!(area, email = ?session.email, "session admitted");
                Ok(session)
            }
            GuardDecision::RedirectToLogin { return_to } => {
                bail!("not signed in; run `panic-admin login` before opening {return_to}")
            }
            GuardDecision::RedirectToLanding { path } => {
                bail!("{area} requires an admin session; this session can open {path}")
            }
        }
    }

    fn guarded_client(&self, gate: Gate, area: &str) -> Result<AdminApiClient> {
        let session = self.admit(gate, area)?;
        AdminApiClient::new(self.config.api_client_config(Some(session.token)))
            .context("invalid API client config")
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use panic_admin_core::TokenStore;

    use super::*;

    fn console_in(dir: &tempfile::TempDir) -> Console {
        let token_path = dir.path().join("token");
        let config = AdminConfig::from_lookup(|key| {
            (key == "PANIC_ADMIN_TOKEN_PATH").then(|| token_path.display().to_string())
        })
        .unwrap();
        Console::new(config)
    }

    fn admin_token() -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"1","email":"root@x.com","is_admin":true}"#);
        format!("{header}.{claims}.")
    }

    #[test]
    fn guarded_areas_refuse_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let console = console_in(&dir);
        let err = console.admit(Gate::Authenticated, "/dashboard").unwrap_err();
        assert!(err.to_string().contains("not signed in"), "{err}");
    }

    #[test]
    fn opaque_tokens_reach_the_dashboard_but_not_admin_areas() {
        let dir = tempfile::tempdir().unwrap();
        let console = console_in(&dir);
        console.session.login("opaque-token").unwrap();

        assert!(console.admit(Gate::Authenticated, "/dashboard").is_ok());
        let err = console.admit(Gate::Admin, "/users").unwrap_err();
        assert!(err.to_string().contains("requires an admin session"), "{err}");
    }

    #[test]
    fn admin_claims_unlock_admin_areas() {
        let dir = tempfile::tempdir().unwrap();
        let console = console_in(&dir);
        console.session.login(&admin_token()).unwrap();

        let session = console.admit(Gate::Admin, "/settings").unwrap();
        assert_eq!(session.email.as_deref(), Some("root@x.com"));
        assert!(console.guarded_client(Gate::Admin, "/settings").is_ok());

        console.session.logout().unwrap();
        assert_eq!(console.session.store().load_token().unwrap(), None);
    }
}
