//! Authentication routes for the login callback, logout, and identity query.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use passage_auth::AuthError;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{error, info, instrument, warn};

use super::{AppState, RequireUser};
use crate::config::SessionConfig;

/// Frontend path reached after a successful login.
const PROFILES_PATH: &str = "/profiles";

/// Frontend path reached after any login failure.
const ERROR_PATH: &str = "/error";

/// Query parameters for the login callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
}

/// Completes the Provider redirect.
///
/// Exchanges the code, makes sure a local user exists, and sets the
/// encrypted session cookie. Every failure ends in a redirect to the
/// frontend error page; this handler never answers with a 5xx.
#[instrument(skip_all)]
pub async fn login_callback(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let code = query
        .ok()
        .and_then(|Query(query)| query.code)
        .filter(|code| !code.is_empty());
    let Some(code) = code else {
        warn!("login callback without an authorization code");
        return found(&state.frontend(ERROR_PATH));
    };

    match complete_login(&state, &code).await {
        Ok(cookie_value) => {
            let cookie = session_cookie(&state.session_config, cookie_value);
            (jar.add(cookie), found(&state.frontend(PROFILES_PATH))).into_response()
        }
        Err(report) => {
            let err = report.current_context();
            error!(kind = err.kind(), error = %err, "login failed");
            found(&state.frontend(ERROR_PATH))
        }
    }
}

async fn complete_login(state: &AppState, code: &str) -> Result<String, Report<AuthError>> {
    let tokens = state.tokens.exchange_code_for_tokens(code).await?;
    let claims = state.tokens.resolve_identity(&tokens).await?;
    let user = state.users.find_or_create(claims.email()).await?;
    info!(user_id = %user.id(), "login completed");
    state.tokens.seal_session(&tokens)
}

/// Expires the session cookie and returns to the frontend.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let removal = removal_cookie(&state.session_config);
    (jar.add(removal), found(&state.frontend_url)).into_response()
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    user: UserView,
}

#[derive(Debug, Serialize)]
struct UserView {
    id: String,
    email: String,
}

/// Returns the authenticated user, or 401 for anonymous callers.
pub async fn me(RequireUser(user): RequireUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserView {
            id: user.id().to_string(),
            email: user.email().to_string(),
        },
    })
}

/// A `302 Found` redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn session_cookie(config: &SessionConfig, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), value))
        .path(config.cookie_path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(config.same_site.into())
        .max_age(TimeDuration::seconds(config.lifetime_seconds));
    if let Some(domain) = &config.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }
    cookie.build()
}

fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), ""))
        .path(config.cookie_path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(config.same_site.into())
        .max_age(TimeDuration::ZERO);
    if let Some(domain) = &config.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }
    cookie.build()
}
