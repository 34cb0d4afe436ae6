use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::instrument;

use backoffice_auth::SessionContext;

use super::{SessionService, SessionServiceError, SessionSubject};

/// Session service client speaking JSON over HTTP.
///
/// `GET {base_url}/api/v1/sessions/{uuid}`: `404` means "no session", any other
/// non-success status is a service failure.
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSessionService {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, SessionServiceError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SessionServiceError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// A base URL without a trailing slash is treated as a directory.
    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    pub fn session_url(&self, subject: &SessionSubject) -> Result<Url, SessionServiceError> {
        self.base_url
            .join(&format!("api/v1/sessions/{}", subject.as_uuid()))
            .map_err(|e| SessionServiceError::Transport(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionService for HttpSessionService {
    #[instrument(skip(self), fields(subject = %subject), err)]
    async fn fetch_session(
        &self,
        subject: SessionSubject,
    ) -> Result<Option<SessionContext>, SessionServiceError> {
        let url = self.session_url(&subject)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionServiceError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<SessionContext>()
                .await
                .map(Some)
                .map_err(|e| SessionServiceError::Decode(e.to_string())),
            status => Err(SessionServiceError::UnexpectedStatus(status.as_u16())),
        }
    }
}
