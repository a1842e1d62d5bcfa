use crate::RedditClient;
use oauth2::basic::{BasicErrorResponse, BasicRevocationErrorResponse};
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use oauth2::{
    helpers, AccessToken, AuthUrl, Client as OAuthClient, ClientId, ClientSecret,
    EmptyExtraTokenFields, HttpRequest, HttpResponse, RefreshToken, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, StandardRevocableToken,
    StandardTokenIntrospectionResponse, TokenResponse, TokenType, TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use subtop_core::{CoreError, RedditApiError, RedditSettings};
use thiserror::Error;
use tracing::{debug, info};

/// Credential presented on every listing request.
///
/// Renders as `"<token_type> <access_token>"`, the exact value Reddit expects
/// in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    token_type: String,
    access_token: String,
}

impl BearerToken {
    pub fn new(token_type: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            token_type: token_type.into(),
            access_token: access_token.into(),
        }
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.token_type, self.access_token)
    }
}

/// Token type exactly as the server spelled it. Reddit answers `"bearer"`,
/// other deployments `"Bearer"`, and the header must echo whichever was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedditTokenType(String);

impl RedditTokenType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TokenType for RedditTokenType {}

/// Password-grant token response. Unlike the oauth2 crate's standard
/// response, `token_type` is kept verbatim instead of being lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditTokenResponse {
    access_token: AccessToken,
    token_type: RedditTokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(rename = "scope")]
    #[serde(deserialize_with = "helpers::deserialize_space_delimited_vec")]
    #[serde(serialize_with = "helpers::serialize_space_delimited_vec")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    scopes: Option<Vec<Scope>>,
}

impl TokenResponse<RedditTokenType> for RedditTokenResponse {
    fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &RedditTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        self.scopes.as_ref()
    }
}

pub type RedditOAuthClient = OAuthClient<
    BasicErrorResponse,
    RedditTokenResponse,
    RedditTokenType,
    StandardTokenIntrospectionResponse<EmptyExtraTokenFields, RedditTokenType>,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

/// Failure inside the transport handed to the oauth2 crate.
#[derive(Debug, Error)]
pub enum TokenTransportError {
    #[error("invalid token request: {0}")]
    InvalidRequest(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub(crate) fn build_oauth_client(
    settings: &RedditSettings,
) -> Result<RedditOAuthClient, CoreError> {
    let auth_url = AuthUrl::new(settings.authorize_url.clone()).map_err(|e| {
        RedditApiError::RequestBuild {
            endpoint: settings.authorize_url.clone(),
            details: e.to_string(),
        }
    })?;
    let token_url =
        TokenUrl::new(settings.token_url.clone()).map_err(|e| RedditApiError::RequestBuild {
            endpoint: settings.token_url.clone(),
            details: e.to_string(),
        })?;

    Ok(RedditOAuthClient::new(
        ClientId::new(settings.client_id.clone()),
        Some(ClientSecret::new(settings.client_secret.clone())),
        auth_url,
        Some(token_url),
    ))
}

impl RedditClient {
    /// Exchanges the account credentials for a bearer token using the
    /// resource-owner password grant. The client id and secret travel as HTTP
    /// Basic credentials.
    pub async fn acquire_token(&self) -> Result<BearerToken, CoreError> {
        let username = ResourceOwnerUsername::new(self.settings.username.clone());
        let password = ResourceOwnerPassword::new(self.settings.password.clone());
        let http_client = &self.http_client;

        info!("Requesting access token for user {}", self.settings.username);
        let response = self
            .oauth_client
            .exchange_password(&username, &password)
            .request_async(|request| send_token_request(http_client, request))
            .await
            .map_err(|e| token_error(&self.settings.token_url, e))?;

        let token = BearerToken::new(
            response.token_type().as_str(),
            response.access_token().secret().as_str(),
        );

        if token.access_token().is_empty() {
            return Err(RedditApiError::AuthenticationFailed {
                reason: "token endpoint returned an empty access token".to_string(),
            }
            .into());
        }

        debug!(
            "Acquired {} token (expires in {:?})",
            token.token_type(),
            response.expires_in()
        );
        Ok(token)
    }
}

async fn send_token_request(
    client: &Client,
    request: HttpRequest,
) -> Result<HttpResponse, TokenTransportError> {
    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
        .map_err(|e| TokenTransportError::InvalidRequest(e.to_string()))?;

    let mut builder = client.request(method, request.url.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.body(request.body).send().await?;

    let status_code = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| TokenTransportError::InvalidResponse(e.to_string()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in response.headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn token_error(
    endpoint: &str,
    error: RequestTokenError<TokenTransportError, BasicErrorResponse>,
) -> CoreError {
    match error {
        RequestTokenError::Request(TokenTransportError::Http(e)) => {
            if e.is_builder() {
                RedditApiError::RequestBuild {
                    endpoint: endpoint.to_string(),
                    details: e.to_string(),
                }
                .into()
            } else {
                CoreError::Network(e)
            }
        }
        RequestTokenError::Request(TokenTransportError::InvalidRequest(details)) => {
            RedditApiError::RequestBuild {
                endpoint: endpoint.to_string(),
                details,
            }
            .into()
        }
        RequestTokenError::Request(TokenTransportError::InvalidResponse(details)) => {
            RedditApiError::InvalidResponse { details }.into()
        }
        RequestTokenError::ServerResponse(response) => RedditApiError::AuthenticationFailed {
            reason: match response.error_description() {
                Some(description) => format!("{}: {}", response.error(), description),
                None => response.error().to_string(),
            },
        }
        .into(),
        RequestTokenError::Parse(e, _body) => RedditApiError::AuthenticationFailed {
            reason: format!("malformed token response: {}", e),
        }
        .into(),
        RequestTokenError::Other(reason) => {
            RedditApiError::AuthenticationFailed { reason }.into()
        }
    }
}
