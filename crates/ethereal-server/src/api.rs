//! Public HTTP API
//!
//! ```text
//! GET    /        session secret (creates the session on first call)
//! POST   /        store a remote secret                 (remote.enabled)
//! GET    /{key}   retrieve a remote secret              (remote.enabled)
//! DELETE /{key}   delete a remote secret                (remote.enabled)
//! ```
//! A trailing slash after `{key}` is accepted.
//! `{key}` must have the UUID shape before any store access. The second
//! factor for GET/DELETE travels as the `secondFactor` query parameter.

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ethereal_core::types::{
    format_http_date, CreateSecretRequest, CreateSecretResponse, RetrieveSecretResponse,
    SessionKeyResponse,
};
use ethereal_core::{is_uuid, EtherealError, EtherealResult};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

const SECOND_FACTOR_PARAM: &str = "secondFactor";

pub fn router(state: AppState) -> Router {
    let router = if state.remote_enabled {
        Router::new()
            .route("/", get(session_key).post(create_secret))
            .route("/{key}", get(retrieve_secret).delete(delete_secret))
            .route("/{key}/", get(retrieve_secret).delete(delete_secret))
    } else {
        Router::new().route("/", get(session_key))
    };
    router
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

// ── Session secret ───────────────────────────────────────────────────────

async fn session_key(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session_id = state.cookie.session_id(&headers);
    let mut ctx = state.sessions.load(session_id.as_deref()).await?;
    let issued = !ctx.has_secret();
    let secret = state.sessions.get_or_create(&mut ctx).await?;

    if issued {
        state.metrics.sessions_issued.inc();
        debug!(new_session = ctx.is_new(), "session: secret issued");
    }

    let mut response = Json(SessionKeyResponse {
        key: Some(secret.expose().to_string()),
    })
    .into_response();

    if ctx.is_new() {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, state.cookie.set_cookie(ctx.id())?);
    }
    Ok(response)
}

// ── Remote secrets ───────────────────────────────────────────────────────

async fn create_secret(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let result = async {
        let request: CreateSecretRequest = serde_json::from_slice(&body)
            .map_err(|e| EtherealError::Validation(format!("request body: {e}")))?;
        state
            .remote
            .store(
                request.data.as_deref(),
                request.ttl.as_ref(),
                request.second_factor.as_deref(),
            )
            .await
    }
    .await;

    let stored = result.inspect_err(|e| state.metrics.reject(e))?;
    state.metrics.remote_created.inc();
    info!(
        remote_key = %stored.remote_key,
        ttl_secs = stored.ttl_secs,
        "remote: secret stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSecretResponse {
            key: Some(stored.remote_key),
            expiry_date: Some(format_http_date(stored.expiry_date)),
        }),
    ))
}

async fn retrieve_secret(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<RetrieveSecretResponse>, ApiError> {
    let result = async {
        validate_key(&key)?;
        let second_factor = second_factor(&params)?;
        state.remote.retrieve(&key, second_factor).await
    }
    .await;

    let secret = result.inspect_err(|e| state.metrics.reject(e))?;
    state.metrics.remote_retrieved.inc();
    debug!(remote_key = %key, "remote: secret retrieved");

    Ok(Json(RetrieveSecretResponse {
        data: Some(secret.data),
        expiry_date: Some(format_http_date(secret.expiry_date)),
    }))
}

async fn delete_secret(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<StatusCode, ApiError> {
    let result = async {
        validate_key(&key)?;
        let second_factor = second_factor(&params)?;
        state.remote.remove(&key, second_factor).await
    }
    .await;

    result.inspect_err(|e| state.metrics.reject(e))?;
    state.metrics.remote_deleted.inc();
    info!(remote_key = %key, "remote: secret deleted");
    Ok(StatusCode::OK)
}

fn validate_key(key: &str) -> EtherealResult<()> {
    if is_uuid(key) {
        Ok(())
    } else {
        Err(EtherealError::Validation("key is not a UUID".into()))
    }
}

/// The `secondFactor` query value. A repeated parameter never matches.
fn second_factor(params: &[(String, String)]) -> EtherealResult<Option<&str>> {
    let mut values = params
        .iter()
        .filter(|(name, _)| name == SECOND_FACTOR_PARAM)
        .map(|(_, value)| value.as_str());
    let first = values.next();
    if values.next().is_some() {
        return Err(EtherealError::Authentication(
            "secondFactor given more than once".into(),
        ));
    }
    Ok(first)
}
