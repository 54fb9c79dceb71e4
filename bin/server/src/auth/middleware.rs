//! Session middleware and authentication extractors for Axum.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use passage_auth::{RequestCredentials, RequestIdentity, User};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use super::AppState;

/// Resolves the caller's identity and attaches it to the request.
///
/// Runs before every handler. Never writes a response itself: any failure
/// resolving credentials leaves the request `Anonymous`.
pub async fn identify_request(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = state
        .sessions
        .identify(RequestCredentials {
            session_cookie: jar
                .get(&state.session_config.cookie_name)
                .map(|cookie| cookie.value()),
            authorization: authorization.as_deref(),
        })
        .await;
    tracing::debug!(
        authenticated = identity.is_authenticated(),
        user_id = ?identity.user().map(User::id),
        "request identity resolved"
    );

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Extractor for the identity attached by [`identify_request`].
///
/// Yields `Anonymous` on routes the middleware did not run for.
pub struct CurrentIdentity(pub RequestIdentity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentIdentity(
            parts
                .extensions
                .get::<RequestIdentity>()
                .cloned()
                .unwrap_or(RequestIdentity::Anonymous),
        ))
    }
}

/// Extractor for requiring an authenticated user.
///
/// Anonymous callers are rejected with 401 and a JSON error body.
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentIdentity(identity) = match CurrentIdentity::from_request_parts(parts, state).await
        {
            Ok(identity) => identity,
            Err(never) => match never {},
        };

        match identity {
            RequestIdentity::Authenticated(user) => Ok(RequireUser(user)),
            RequestIdentity::Anonymous => Err(AuthRejection::NotAuthenticated),
        }
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "not authenticated" })),
            )
                .into_response(),
        }
    }
}
