use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use super::{
    log_requests,
    session::{SessionToken, COOKIE_SESSION_TOKEN_KEY},
    state::*,
    ServerConfig,
};
use crate::access::HomeView;
use crate::catalog::Tier;
use crate::portal::{LoginOutcome, Portal};
use crate::session::{SessionHandle, SessionLookup};
use crate::user::RejectReason;

const LOGIN_PATH: &str = "/login";
const LOGIN_ERROR_PATH: &str = "/login?error=true";

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub identity: Option<String>,
    pub tier: Option<Tier>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginQuery {
    pub error: Option<String>,
}

#[derive(Serialize)]
struct LoginView {
    pub error_message: Option<&'static str>,
}

// Missing fields read as empty so the authenticator rejects them like any
// other bad credential.
#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: &'static str,
}

fn service_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: RejectReason::StoreUnavailable.user_message(),
        }),
    )
        .into_response()
}

fn session_cookie(handle: &SessionHandle, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, handle.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .http_only(true)
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build()
}

async fn stats(lookup: SessionLookup, State(state): State<ServerState>) -> impl IntoResponse {
    let session = lookup.session();
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        identity: session.map(|s| s.identity.clone()),
        tier: session.map(|s| s.tier),
    })
}

async fn login_view(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let error_message = match query.error.as_deref() {
        Some("true") => Some(RejectReason::InvalidCredentials.user_message()),
        _ => None,
    };
    Json(LoginView { error_message })
}

async fn login(State(state): State<ServerState>, Form(form): Form<LoginForm>) -> Response {
    match state.portal.login(&form.email, &form.password) {
        Ok(LoginOutcome::LoggedIn { handle, home, .. }) => {
            let jar = CookieJar::new().add(session_cookie(&handle, state.config.secure_cookie));
            (jar, Redirect::to(home.path())).into_response()
        }
        Ok(LoginOutcome::Rejected(reason)) if reason.is_retryable() => service_unavailable(),
        Ok(LoginOutcome::Rejected(_)) => Redirect::to(LOGIN_ERROR_PATH).into_response(),
        Err(err) => {
            error!("Could not open a session after login: {}", err);
            service_unavailable()
        }
    }
}

async fn logout(State(portal): State<GuardedPortal>, SessionToken(token): SessionToken) -> Response {
    if let Some(handle) = token {
        if let Err(err) = portal.logout(&handle) {
            error!("Failed to destroy session {}: {}", handle.short(), err);
            return service_unavailable();
        }
    }
    let jar = CookieJar::new().add(expired_session_cookie());
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}

async fn home(lookup: SessionLookup) -> Response {
    match lookup.session() {
        None => Redirect::to(LOGIN_PATH).into_response(),
        Some(session) => Redirect::to(HomeView::for_tier(session.tier).path()).into_response(),
    }
}

fn serve_home(portal: &Portal, lookup: SessionLookup, requested: HomeView) -> Response {
    let Some(session) = lookup.session() else {
        return Redirect::to(LOGIN_PATH).into_response();
    };
    let own_view = HomeView::for_tier(session.tier);
    if own_view != requested {
        warn!(
            "Session {} ({}) asked for {:?}, sending it to {:?}",
            session.handle.short(),
            session.tier,
            requested,
            own_view
        );
        return Redirect::to(own_view.path()).into_response();
    }

    match portal.home(&lookup) {
        Ok(Some(content)) => Json(content).into_response(),
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(err) => {
            error!("Failed to load {:?}: {}", requested, err);
            service_unavailable()
        }
    }
}

async fn free_home(State(portal): State<GuardedPortal>, lookup: SessionLookup) -> Response {
    serve_home(&portal, lookup, HomeView::FreeHome)
}

async fn premium_home(State(portal): State<GuardedPortal>, lookup: SessionLookup) -> Response {
    serve_home(&portal, lookup, HomeView::PremiumHome)
}

pub fn make_app(config: ServerConfig, portal: Arc<Portal>) -> Result<Router> {
    let state = ServerState::new(config.clone(), portal);

    let auth_routes: Router = Router::new()
        .route("/login", get(login_view).post(login))
        .route("/logout", get(logout).post(logout))
        .with_state(state.clone());

    let home_routes: Router = Router::new()
        .route("/", get(home))
        .route("/free", get(free_home))
        .route("/premium", get(premium_home))
        .with_state(state.clone());

    let root_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(stats))
            .with_state(state.clone()),
    };

    let app: Router = root_router
        .merge(auth_routes)
        .nest("/home", home_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(config: ServerConfig, portal: Arc<Portal>) -> Result<()> {
    let port = config.port;
    let app = make_app(config, portal)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
