use crate::config::PortalConfig;
use crate::error::PortalError;
use reqwest::Client as HttpClient;

const LOGIN_PATH: &str = "/login";
const LOGOUT_PATH: &str = "/logout";

/// Entry point to the consumption portal; hands out authenticated sessions.
pub struct Client {
    config: PortalConfig,
}

impl Client {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    pub fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    pub fn max_pages(&self) -> usize {
        self.config.max_pages
    }

    /// Opens a fresh session. Each session has its own cookie jar, so sessions
    /// never share portal state.
    pub async fn login(&self) -> Result<Session, PortalError> {
        let http_client = HttpClient::builder().cookie_store(true).build()?;
        let url = format!("{}{}", self.base_url(), LOGIN_PATH);
        tracing::debug!("Logging in to {}", url);

        let response = http_client
            .post(&url)
            .header("user-agent", "reqwest")
            .form(&[
                ("username", self.config.user.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortalError::server_error(status, body));
        }

        tracing::debug!("Login successful");
        Ok(Session {
            http_client,
            base_url: self.base_url().to_string(),
        })
    }
}

/// An authenticated portal session.
///
/// Closed with [`Session::logout`], which consumes the session.
pub struct Session {
    http_client: HttpClient,
    base_url: String,
}

impl Session {
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, PortalError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .header("user-agent", "reqwest")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(PortalError::server_error(status, body))
        }
    }

    /// Ends the session. Failures are logged and swallowed; they must not
    /// change the outcome of the work done inside the session.
    pub async fn logout(self) {
        match self.get(LOGOUT_PATH, &[]).await {
            Ok(_) => tracing::debug!("Logout successful"),
            Err(e) => tracing::warn!("Logout failed: {}", e),
        }
    }
}
