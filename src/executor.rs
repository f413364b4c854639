//! Token request execution
//!
//! Issues the client-credentials grant request against a resolved address and
//! maps transport/status outcomes to the typed error taxonomy. Retry and
//! backoff are deliberately absent here; fault handling belongs to the
//! circuit breaker and the caller.

use reqwest::{Client, header};
use tracing::debug;

use crate::resolver::ServiceAddress;
use crate::token::AccessToken;
use crate::{Error, Result};

/// Fixed form body of the client-credentials grant
const GRANT_TYPE_FORM: [(&str, &str); 1] = [("grant_type", "client_credentials")];

/// Executes token-exchange requests over a shared HTTP client
#[derive(Clone)]
pub struct TokenRequestExecutor {
    http_client: Client,
    token_path: String,
}

impl TokenRequestExecutor {
    /// Create an executor for the given token-exchange path
    #[must_use]
    pub fn new(http_client: Client, token_path: impl Into<String>) -> Self {
        let token_path = token_path.into();
        Self {
            http_client,
            token_path: token_path.trim_start_matches('/').to_string(),
        }
    }

    /// POST the client-credentials grant to `{address}/{token_path}`.
    ///
    /// Classification:
    /// - 2xx with a token body decodes into [`AccessToken`]
    /// - 4xx becomes [`Error::ClientRequest`]
    /// - 5xx becomes [`Error::Server`]
    /// - connection faults become [`Error::Transport`]
    /// - an unparseable success body becomes [`Error::Protocol`]
    pub async fn request_token(
        &self,
        address: &ServiceAddress,
        authorization: &str,
    ) -> Result<AccessToken> {
        let url = format!("{}/{}", address.as_str(), self.token_path);
        debug!(%url, "Requesting access token");

        let response = self
            .http_client
            .post(&url)
            .header(header::AUTHORIZATION, authorization)
            .form(&GRANT_TYPE_FORM)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let token: AccessToken = response
                .json()
                .await
                .map_err(|e| Error::Protocol(format!("Invalid token response: {e}")))?;
            debug!(token_type = %token.token_type, expires_in = token.expires_in, "Token received");
            Ok(token)
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            Err(Error::ClientRequest {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(Error::Server {
                status: status.as_u16(),
            })
        }
    }
}
