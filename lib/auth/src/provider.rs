//! HTTP client for the identity provider's endpoints.
//!
//! One `reqwest::Client` is shared by the token, userinfo, and key-set
//! calls. Any non-success status is fatal to the call; nothing here
//! retries.

use jsonwebtoken::jwk::JwkSet;
use oauth2::{AuthorizationCode, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use reqwest::header::ACCEPT;
use rootcause::Report;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::instrument;

use crate::config::ProviderConfig;
use crate::error::AuthError;
use crate::token::TokenPair;

/// Client for the Provider's token, userinfo, and key-set endpoints.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    client_id: ClientId,
    client_secret: ClientSecret,
    userinfo_url: String,
    jwks_url: String,
}

impl ProviderClient {
    /// Creates a client for the configured Provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an endpoint URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, Report<AuthError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to create HTTP client: {e}")))?;

        let token_url = TokenUrl::new(config.token_url())
            .map_err(|e| AuthError::configuration(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri().to_string())
            .map_err(|e| AuthError::configuration(format!("invalid redirect URI: {e}")))?;

        Ok(Self {
            http,
            token_url,
            redirect_url,
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            userinfo_url: config.userinfo_url(),
            jwks_url: config.jwks_url(),
        })
    }

    /// Exchanges an authorization code using the `authorization_code` grant.
    ///
    /// Client credentials travel in the form body alongside the code and
    /// redirect URI. Any 2xx status is accepted and `token_type` is not
    /// required.
    ///
    /// # Errors
    ///
    /// Returns a Provider error on transport failure, a non-success status,
    /// or a body without `access_token`.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, Report<AuthError>> {
        let code = AuthorizationCode::new(code.to_string());
        let response = self
            .http
            .post(self.token_url.url().as_str())
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.secret().as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.secret().as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::provider(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::provider(format!(
                "token endpoint returned {}",
                response.status()
            ))
            .into());
        }

        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| AuthError::provider(format!("token response is invalid: {e}")))?;

        let access_token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::provider("token response has no access_token"))?;

        Ok(TokenPair::new(
            access_token,
            body.refresh_token.filter(|token| !token.is_empty()),
        ))
    }

    /// Fetches the userinfo document for an access token.
    ///
    /// # Errors
    ///
    /// Returns a Provider error on transport failure, a non-success status,
    /// or a body that is not JSON.
    #[instrument(skip_all)]
    pub async fn userinfo(&self, access_token: &str) -> Result<JsonValue, Report<AuthError>> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::provider(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::provider(format!(
                "userinfo endpoint returned {}",
                response.status()
            ))
            .into());
        }

        Ok(response
            .json()
            .await
            .map_err(|e| AuthError::provider(format!("userinfo response is not JSON: {e}")))?)
    }

    /// Fetches the Provider's published signing keys.
    ///
    /// # Errors
    ///
    /// Returns a Provider error on transport failure, a non-success status,
    /// or a body that is not a key set.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch_jwks(&self) -> Result<JwkSet, Report<AuthError>> {
        let response = self
            .http
            .get(&self.jwks_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::provider(format!("key set request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::provider(format!(
                "key set endpoint returned {}",
                response.status()
            ))
            .into());
        }

        Ok(response
            .json()
            .await
            .map_err(|e| AuthError::provider(format!("key set response is invalid: {e}")))?)
    }
}

/// Token endpoint body; fields beyond the two tokens are ignored.
#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ProviderConfig {
        ProviderConfig::builder(
            server.uri(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/login-callback".to_string(),
        )
        .build()
    }

    fn provider_kind(err: &Report<AuthError>) -> &'static str {
        err.current_context().kind()
    }

    #[tokio::test]
    async fn exchange_code_posts_authorization_code_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/default/v1/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("client_secret=client-secret"))
            .and(body_string_contains("redirect_uri="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "token_type": "Bearer",
                "refresh_token": "ref",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let tokens = client.exchange_code("abc123").await.expect("exchange");

        assert_eq!(tokens.access_token(), "tok");
        assert_eq!(tokens.refresh_token(), Some("ref"));
    }

    #[tokio::test]
    async fn exchange_code_accepts_response_without_token_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/default/v1/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let tokens = client.exchange_code("abc123").await.expect("exchange");

        assert_eq!(tokens.access_token(), "tok");
        assert_eq!(tokens.refresh_token(), None);
    }

    #[tokio::test]
    async fn exchange_code_accepts_any_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/default/v1/token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "access_token": "tok",
                "refresh_token": "ref",
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let tokens = client.exchange_code("abc123").await.expect("exchange");

        assert_eq!(tokens.access_token(), "tok");
        assert_eq!(tokens.refresh_token(), Some("ref"));
    }

    #[tokio::test]
    async fn exchange_code_fails_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/default/v1/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let err = client.exchange_code("abc123").await.expect_err("must fail");

        assert_eq!(provider_kind(&err), "provider");
    }

    #[tokio::test]
    async fn exchange_code_fails_without_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/default/v1/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let err = client.exchange_code("abc123").await.expect_err("must fail");

        assert_eq!(provider_kind(&err), "provider");
    }

    #[tokio::test]
    async fn userinfo_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/default/v1/userinfo"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "email": "a@example.com" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let body = client.userinfo("tok").await.expect("userinfo");

        assert_eq!(body["email"], "a@example.com");
    }

    #[tokio::test]
    async fn userinfo_fails_on_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/default/v1/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let err = client.userinfo("tok").await.expect_err("must fail");

        assert_eq!(provider_kind(&err), "provider");
    }

    #[tokio::test]
    async fn fetch_jwks_parses_key_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/default/v1/keys"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(include_str!("../tests/fixtures/jwks.json"))
                    .insert_header("content-type", "application/json"),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(&config_for(&server)).expect("client");
        let jwks = client.fetch_jwks().await.expect("jwks");

        assert!(jwks.find("provider-key-1").is_some());
    }

    #[test]
    fn rejects_invalid_redirect_uri() {
        let config = ProviderConfig::new(
            "https://idp.example.com".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "not a url".to_string(),
        );
        let err = ProviderClient::new(&config).err().expect("must fail");
        assert_eq!(provider_kind(&err), "configuration");
    }
}
