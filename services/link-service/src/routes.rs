//! HTTP surface of the link service.
//!
//! Browser-facing routes (`/login/{external_id}`, `/callback`) answer with
//! short text or a minimal HTML page; API-shaped routes (`/refresh`,
//! `/cosmetics`) answer with terse JSON objects. All state lives in
//! [`AppState`] and is cloned into each handler.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{error, info, warn};

use cosmetics::{fetch_catalog, project};
use epic_auth::{
    DEFAULT_TOKEN_LIFETIME_SECS, PendingAuth, REFRESH_SKEW_SECS, SessionCache, TokenRecord,
    TokenStore, build_authorization_url, compute_challenge, exchange_code, generate_state,
    generate_verifier, refresh_token, unix_now,
};

use crate::config::Config;
use crate::metrics;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    oauth: Arc<epic_auth::OAuthApp>,
    http: reqwest::Client,
    store: Arc<TokenStore>,
    sessions: Arc<SessionCache>,
    prometheus: PrometheusHandle,
}

impl AppState {
    pub fn new(config: Config, store: TokenStore, prometheus: PrometheusHandle) -> Self {
        let oauth = config.oauth_app();
        Self {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
            http: reqwest::Client::new(),
            store: Arc::new(store),
            sessions: Arc::new(SessionCache::new()),
            prometheus,
        }
    }
}

/// All routes of the service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/login", get(login_without_id))
        .route("/login/{external_id}", get(start_login))
        .route("/callback", get(oauth_callback))
        .route("/refresh/{external_id}", get(refresh_tokens))
        .route("/cosmetics/{external_id}", get(owned_cosmetics))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Terse JSON error body for the API-shaped routes.
fn error_json(status: StatusCode, error: &str, details: Option<&str>) -> Response {
    let mut body = serde_json::json!({ "error": error });
    if let Some(details) = details {
        body["details"] = serde_json::Value::String(details.to_string());
    }
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Confirmation page shown in the user's browser after a successful link.
/// Deliberately free of caller-supplied data.
fn linked_page() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html>\n<html>\n<head><title>Account linked</title></head>\n\
         <body>\n<h1>Epic account linked</h1>\n\
         <p>You can close this window and return to the app.</p>\n</body>\n</html>",
    )
}

async fn liveness() -> &'static str {
    "epic-link-service is alive"
}

/// `/login` without an id has nothing to link against.
async fn login_without_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        "missing external id: use /login/{external_id}",
    )
        .into_response()
}

/// Start the PKCE flow for an external id.
///
/// Generates a verifier/challenge pair and a state value, parks them as a
/// pending session, and redirects the browser to the provider. Nothing is
/// persisted until the callback completes.
async fn start_login(State(state): State<AppState>, Path(external_id): Path<String>) -> Response {
    let external_id = external_id.trim().to_string();
    if external_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "external id must not be empty").into_response();
    }

    let verifier = generate_verifier();
    let challenge = compute_challenge(&verifier);
    let state_value = generate_state(&external_id);
    let url = build_authorization_url(&state.oauth, &state_value, &challenge);

    state
        .sessions
        .insert(state_value, PendingAuth::new(verifier, external_id.clone()))
        .await;
    let pending = state.sessions.len().await;

    info!(external_id, pending, "authorization flow started");

    (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Provider redirect target: consume the session, exchange the code,
/// persist the token triple.
///
/// The session is consumed before the exchange, so a replayed callback
/// (same state, any code) always answers 400 and a failed exchange forces
/// the user back to `/login`.
async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let code = query.code.unwrap_or_default();
    let state_value = query.state.unwrap_or_default();
    if code.is_empty() || state_value.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing code or state").into_response();
    }

    let Some(pending) = state.sessions.take(&state_value).await else {
        warn!("callback with unknown or expired state");
        return (
            StatusCode::BAD_REQUEST,
            "unknown or expired login attempt; start again from /login",
        )
            .into_response();
    };

    match exchange_code(&state.http, &state.oauth, &code, &pending.code_verifier).await {
        Ok(token) => {
            let expires_at = unix_now() + token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
            let record = TokenRecord {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_at,
            };
            if let Err(e) = state.store.upsert(pending.external_id.clone(), record).await {
                error!(external_id = %pending.external_id, error = %e, "failed to persist link");
                metrics::record_exchange("store_error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "account authorized but the link could not be saved; start again from /login",
                )
                    .into_response();
            }
            metrics::record_exchange("success");
            info!(external_id = %pending.external_id, expires_at, "account linked");
            linked_page().into_response()
        }
        Err(e) => {
            metrics::record_exchange("error");
            warn!(external_id = %pending.external_id, error = %e, "token exchange failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "token exchange failed; start again from /login",
            )
                .into_response()
        }
    }
}

/// Exchange the stored refresh token and overwrite the stored record.
///
/// Returns the updated record; any error leaves the store exactly as it
/// was.
async fn refresh_and_store(
    state: &AppState,
    external_id: &str,
    record: &TokenRecord,
) -> epic_auth::Result<TokenRecord> {
    let token = refresh_token(&state.http, &state.oauth, &record.refresh_token).await?;
    let expires_at = unix_now() + token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    state
        .store
        .update_tokens(
            external_id,
            token.access_token.clone(),
            token.refresh_token.clone(),
            expires_at,
        )
        .await?;
    Ok(TokenRecord {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
    })
}

/// Force a refresh of a linked account's tokens.
async fn refresh_tokens(State(state): State<AppState>, Path(external_id): Path<String>) -> Response {
    let Some(record) = state.store.get(&external_id).await else {
        return error_json(StatusCode::NOT_FOUND, "not linked", None);
    };

    match refresh_and_store(&state, &external_id, &record).await {
        Ok(updated) => {
            metrics::record_refresh("success", "explicit");
            info!(external_id, expires_at = updated.expires_at, "tokens refreshed");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                serde_json::json!({ "ok": true, "expires_at": updated.expires_at }).to_string(),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_refresh("error", "explicit");
            warn!(external_id, error = %e, "refresh failed");
            match e {
                // The provider answered but did not hand back a usable
                // token (rejected grant, revoked credentials, bad body).
                epic_auth::Error::TokenExchange(msg)
                | epic_auth::Error::InvalidCredentials(msg) => error_json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "refresh failed",
                    Some(&msg),
                ),
                // Transport or persistence trouble on our side.
                other => error_json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "refresh exception",
                    Some(&other.to_string()),
                ),
            }
        }
    }
}

/// Heuristic ownership projection for a linked account.
///
/// Refreshes the stored tokens first when they are within the expiry skew
/// window; that refresh is best-effort and a failure only logs. The catalog
/// fetch itself has no fallback: any failure is a hard 500.
async fn owned_cosmetics(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Response {
    let Some(record) = state.store.get(&external_id).await else {
        return error_json(StatusCode::NOT_FOUND, "not linked", None);
    };

    if unix_now() > record.expires_at.saturating_sub(REFRESH_SKEW_SECS) {
        match refresh_and_store(&state, &external_id, &record).await {
            Ok(updated) => {
                metrics::record_refresh("success", "opportunistic");
                info!(
                    external_id,
                    expires_at = updated.expires_at,
                    "refreshed expiring tokens"
                );
            }
            Err(e) => {
                metrics::record_refresh("error", "opportunistic");
                warn!(external_id, error = %e, "best-effort refresh failed, continuing");
            }
        }
    }

    let api_key = state.config.catalog_api_key.as_ref().map(|k| k.expose().as_str());
    let started = Instant::now();
    let items = match fetch_catalog(&state.http, &state.config.catalog_url, api_key).await {
        Ok(items) => {
            metrics::record_catalog_fetch("success", started.elapsed().as_secs_f64());
            items
        }
        Err(e) => {
            metrics::record_catalog_fetch("error", started.elapsed().as_secs_f64());
            error!(external_id, error = %e, "catalog fetch failed");
            return error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "catalog fetch failed",
                Some(&e.to_string()),
            );
        }
    };

    let projection = project(&items);
    info!(
        external_id,
        skins = projection.counts.skins,
        pickaxes = projection.counts.pickaxes,
        emotes = projection.counts.emotes,
        exclusives = projection.counts.exclusives,
        "served ownership projection"
    );
    Json(projection).into_response()
}

/// Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use tower::ServiceExt;

    use super::*;

    const TOKEN_BODY: &str =
        r#"{"access_token":"at_fresh","refresh_token":"rt_fresh","expires_in":7200}"#;

    const CATALOG_BODY: &str = r#"{
        "data": [
            {
                "id": "cid_ghoul",
                "name": "Ghoul Trooper",
                "type": {"value": "outfit"},
                "rarity": {"value": "epic"},
                "images": {"icon": "https://img.example/ghoul.png"},
                "gameplayTags": ["Cosmetics.Source.ItemShop"]
            },
            {
                "id": "pickaxe_reaper",
                "name": "Reaper",
                "type": {"value": "pickaxe"},
                "gameplayTags": ["Cosmetics.Source.BattlePass.Season3"]
            },
            {
                "id": "eid_floss",
                "name": "Floss",
                "type": {"value": "emote"},
                "introduction": {"text": "An exclusive reward."},
                "gameplayTags": []
            }
        ]
    }"#;

    fn test_prometheus_handle() -> PrometheusHandle {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle()
    }

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            client_id: "client-abc".into(),
            client_secret: None,
            redirect_uri: "https://bridge.example/callback".into(),
            catalog_api_key: None,
            store_path: dir.join("links.json"),
            port: 0,
            catalog_url: "http://127.0.0.1:9/catalog".into(),
        }
    }

    /// Build an AppState backed by a temp store, optionally pointing the
    /// token and catalog endpoints at local mocks.
    async fn test_state(
        dir: &std::path::Path,
        token_url: Option<String>,
        catalog_url: Option<String>,
    ) -> AppState {
        let mut config = test_config(dir);
        if let Some(url) = catalog_url {
            config.catalog_url = url;
        }
        let mut oauth = config.oauth_app();
        if let Some(url) = token_url {
            oauth.token_url = url;
        }
        let store = TokenStore::load(config.store_path.clone()).await.unwrap();
        AppState {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
            http: reqwest::Client::new(),
            store: Arc::new(store),
            sessions: Arc::new(SessionCache::new()),
            prometheus: test_prometheus_handle(),
        }
    }

    /// Serve a canned status + body on 127.0.0.1:0, return the token URL.
    async fn mock_token_endpoint(status: u16, body: &'static str) -> String {
        let app = Router::new().route(
            "/token",
            post(move || async move {
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/token")
    }

    /// Token mock that counts how many exchanges it served.
    async fn counting_token_endpoint(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let app = Router::new().route(
            "/token",
            post(move || {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::from_u16(status).unwrap(),
                        [(header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/token"), calls)
    }

    /// Serve a canned status + body on 127.0.0.1:0, return the catalog URL.
    async fn mock_catalog_endpoint(status: u16, body: &'static str) -> String {
        let app = Router::new().route(
            "/catalog",
            get(move || async move {
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/catalog")
    }

    async fn get_response(state: AppState, uri: &str) -> Response {
        build_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn linked_record(expires_at: u64) -> TokenRecord {
        TokenRecord {
            access_token: "at_old".into(),
            refresh_token: "rt_old".into(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn liveness_answers_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "epic-link-service is alive");
    }

    #[tokio::test]
    async fn login_redirects_to_provider() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;
        let sessions = state.sessions.clone();

        let response = get_response(state, "/login/discord-1").await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(location.starts_with("https://www.epicgames.com/id/authorize?"));
        assert!(location.contains("client_id=client-abc"));
        assert!(location.contains("code_challenge_method=S256"));
        assert!(location.contains("state=discord-1%3A"));
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn login_without_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/login").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("external id"));
    }

    #[tokio::test]
    async fn login_with_blank_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/login/%20").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_links_the_account() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(200, TOKEN_BODY).await;
        let state = test_state(dir.path(), Some(token_url), None).await;
        let store = state.store.clone();

        state
            .sessions
            .insert(
                "discord-1:abc".into(),
                PendingAuth::new("verifier-1".into(), "discord-1".into()),
            )
            .await;

        let before = unix_now();
        let response = get_response(state, "/callback?code=c1&state=discord-1:abc").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Epic account linked"));

        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_fresh");
        assert_eq!(record.refresh_token, "rt_fresh");
        assert!(record.expires_at >= before + 7200);
        assert!(record.expires_at <= unix_now() + 7200);
    }

    #[tokio::test]
    async fn callback_without_params_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/callback").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("missing code or state"));
    }

    #[tokio::test]
    async fn callback_with_unknown_state_never_reaches_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let (token_url, calls) = counting_token_endpoint(200, TOKEN_BODY).await;
        let state = test_state(dir.path(), Some(token_url), None).await;

        let response = get_response(state, "/callback?code=c1&state=discord-1:nope").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("unknown or expired"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_with_expired_session_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;
        let store = state.store.clone();

        state
            .sessions
            .insert(
                "discord-1:old".into(),
                PendingAuth {
                    code_verifier: "verifier-1".into(),
                    external_id: "discord-1".into(),
                    expires_at: unix_now() - 1,
                },
            )
            .await;

        let response = get_response(state, "/callback?code=c1&state=discord-1:old").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.get("discord-1").await.is_none());
    }

    #[tokio::test]
    async fn callback_replay_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(200, TOKEN_BODY).await;
        let state = test_state(dir.path(), Some(token_url), None).await;

        state
            .sessions
            .insert(
                "discord-1:abc".into(),
                PendingAuth::new("verifier-1".into(), "discord-1".into()),
            )
            .await;

        let first =
            get_response(state.clone(), "/callback?code=c1&state=discord-1:abc").await;
        assert_eq!(first.status(), StatusCode::OK);

        let replay = get_response(state, "/callback?code=c1&state=discord-1:abc").await;
        assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_exchange_burns_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(400, r#"{"error":"invalid_grant"}"#).await;
        let state = test_state(dir.path(), Some(token_url), None).await;
        let store = state.store.clone();
        let sessions = state.sessions.clone();

        sessions
            .insert(
                "discord-1:abc".into(),
                PendingAuth::new("verifier-1".into(), "discord-1".into()),
            )
            .await;

        let response =
            get_response(state.clone(), "/callback?code=bad&state=discord-1:abc").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.get("discord-1").await.is_none());
        assert_eq!(sessions.len().await, 0);

        // Retrying with the same state must not work.
        let retry = get_response(state, "/callback?code=c1&state=discord-1:abc").await;
        assert_eq!(retry.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_with_unusable_token_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(200, r#"{"token_type":"bearer"}"#).await;
        let state = test_state(dir.path(), Some(token_url), None).await;
        let store = state.store.clone();

        state
            .sessions
            .insert(
                "discord-1:abc".into(),
                PendingAuth::new("verifier-1".into(), "discord-1".into()),
            )
            .await;

        let response = get_response(state, "/callback?code=c1&state=discord-1:abc").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.get("discord-1").await.is_none());
    }

    #[tokio::test]
    async fn refresh_of_unlinked_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/refresh/nobody").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not linked");
    }

    #[tokio::test]
    async fn refresh_overwrites_the_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(200, TOKEN_BODY).await;
        let state = test_state(dir.path(), Some(token_url), None).await;
        let store = state.store.clone();

        store
            .upsert("discord-1".into(), linked_record(unix_now() + 100))
            .await
            .unwrap();

        let response = get_response(state, "/refresh/discord-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);

        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_fresh");
        assert_eq!(record.refresh_token, "rt_fresh");
        assert_eq!(json["expires_at"], record.expires_at);
    }

    #[tokio::test]
    async fn rejected_refresh_reports_refresh_failed() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(400, r#"{"error":"invalid_grant"}"#).await;
        let state = test_state(dir.path(), Some(token_url), None).await;
        let store = state.store.clone();

        store
            .upsert("discord-1".into(), linked_record(unix_now() + 100))
            .await
            .unwrap();

        let response = get_response(state, "/refresh/discord-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "refresh failed");
        assert!(json["details"].as_str().unwrap().contains("invalid_grant"));

        // Store untouched on failure.
        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_old");
    }

    #[tokio::test]
    async fn revoked_credentials_report_refresh_failed() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(401, r#"{"error":"invalid_client"}"#).await;
        let state = test_state(dir.path(), Some(token_url), None).await;

        state
            .store
            .upsert("discord-1".into(), linked_record(unix_now() + 100))
            .await
            .unwrap();

        let response = get_response(state, "/refresh/discord-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "refresh failed");
    }

    #[tokio::test]
    async fn unreachable_provider_reports_refresh_exception() {
        let dir = tempfile::tempdir().unwrap();
        // Port 9 (discard) refuses connections.
        let state =
            test_state(dir.path(), Some("http://127.0.0.1:9/token".into()), None).await;
        let store = state.store.clone();

        store
            .upsert("discord-1".into(), linked_record(unix_now() + 100))
            .await
            .unwrap();

        let response = get_response(state, "/refresh/discord-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "refresh exception");

        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_old");
    }

    #[tokio::test]
    async fn cosmetics_for_unlinked_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/cosmetics/nobody").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not linked");
    }

    #[tokio::test]
    async fn cosmetics_projects_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = mock_catalog_endpoint(200, CATALOG_BODY).await;
        let state = test_state(dir.path(), None, Some(catalog_url)).await;

        state
            .store
            .upsert("discord-1".into(), linked_record(unix_now() + 3600))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        assert_eq!(json["counts"]["skins"], 1);
        assert_eq!(json["counts"]["pickaxes"], 1);
        assert_eq!(json["counts"]["emotes"], 0);
        assert_eq!(json["counts"]["exclusives"], 1);
        assert_eq!(json["skins"][0]["name"], "Ghoul Trooper");
        assert_eq!(json["skins"][0]["image"], "https://img.example/ghoul.png");
        assert_eq!(json["skins"][0]["rarity"], "epic");
        assert_eq!(json["pickaxes"][0]["name"], "Reaper");
        assert_eq!(json["exclusives"][0]["name"], "Floss");
    }

    #[tokio::test]
    async fn cosmetics_with_fresh_token_skips_the_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let (token_url, calls) = counting_token_endpoint(200, TOKEN_BODY).await;
        let catalog_url = mock_catalog_endpoint(200, CATALOG_BODY).await;
        let state = test_state(dir.path(), Some(token_url), Some(catalog_url)).await;

        state
            .store
            .upsert("discord-1".into(), linked_record(unix_now() + 3600))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cosmetics_refreshes_an_expiring_token() {
        let dir = tempfile::tempdir().unwrap();
        let (token_url, calls) = counting_token_endpoint(200, TOKEN_BODY).await;
        let catalog_url = mock_catalog_endpoint(200, CATALOG_BODY).await;
        let state = test_state(dir.path(), Some(token_url), Some(catalog_url)).await;
        let store = state.store.clone();

        store
            .upsert("discord-1".into(), linked_record(unix_now()))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_fresh");
    }

    #[tokio::test]
    async fn cosmetics_survives_a_failed_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let token_url = mock_token_endpoint(400, r#"{"error":"invalid_grant"}"#).await;
        let catalog_url = mock_catalog_endpoint(200, CATALOG_BODY).await;
        let state = test_state(dir.path(), Some(token_url), Some(catalog_url)).await;
        let store = state.store.clone();

        store
            .upsert("discord-1".into(), linked_record(unix_now()))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["counts"]["skins"], 1);

        // The stale record stays.
        let record = store.get("discord-1").await.unwrap();
        assert_eq!(record.access_token, "at_old");
    }

    #[tokio::test]
    async fn cosmetics_catalog_failure_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = mock_catalog_endpoint(502, "upstream broke").await;
        let state = test_state(dir.path(), None, Some(catalog_url)).await;

        state
            .store
            .upsert("discord-1".into(), linked_record(unix_now() + 3600))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "catalog fetch failed");
        assert!(json["details"].as_str().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn cosmetics_empty_catalog_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = mock_catalog_endpoint(200, r#"{"data":[]}"#).await;
        let state = test_state(dir.path(), None, Some(catalog_url)).await;

        state
            .store
            .upsert("discord-1".into(), linked_record(unix_now() + 3600))
            .await
            .unwrap();

        let response = get_response(state, "/cosmetics/discord-1").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "catalog fetch failed");
        assert!(json["details"].as_str().unwrap().contains("no items"));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_exposition_format() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), None, None).await;

        let response = get_response(state, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }
}
