// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    middleware::{from_fn, from_fn_with_state, Next},
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        identity::{DelegationOutcome, Identity},
        middleware::authenticate,
        requirements::{all_of, authenticated, enforce, has_role},
    },
    cache::{CacheEntry, CacheEntryPage},
    state::AppState,
};

pub mod cache_entries;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let admin_gate = all_of(vec![authenticated(), has_role("admin")]);
    let admin_routes = Router::new()
        .route("/admin/cache", get(cache_entries::search_entries))
        .route(
            "/admin/cache/{key}",
            get(cache_entries::read_entry).delete(cache_entries::delete_entry),
        )
        .layer(from_fn(move |request: Request, next: Next| {
            let gate = admin_gate.clone();
            async move { enforce(gate, request, next).await }
        }));

    let v1_routes = Router::new()
        .route("/user/me", get(users::current_user))
        .merge(admin_routes)
        .layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::current_user,
        cache_entries::search_entries,
        cache_entries::read_entry,
        cache_entries::delete_entry
    ),
    components(
        schemas(
            CacheEntry,
            CacheEntryPage,
            Identity,
            DelegationOutcome,
            users::CurrentUserResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Users", description = "Resolved identity"),
        (name = "Cache", description = "Access-rights cache administration")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::proxy_pki::{
        ProxyPkiVerifier, DEFAULT_MASQUERADE_USER_HEADER, DEFAULT_PRIMARY_USER_HEADER,
        DEFAULT_PROXIED_USER_HEADER,
    };
    use crate::cache::checker::testing::FakeProvider;
    use crate::cache::provider::AccessAttributes;
    use crate::cache::store::AccessCache;
    use crate::cache::AccessChecker;
    use crate::config::Config;

    fn test_state(provider: FakeProvider) -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(AccessCache::open(&dir.path().join("cache.redb")).unwrap());
        let checker = Arc::new(AccessChecker::new(cache.clone(), Arc::new(provider)));
        let strategy = ProxyPkiVerifier::new(checker.clone(), Duration::from_secs(3600))
            .into_strategy([
                DEFAULT_PRIMARY_USER_HEADER,
                DEFAULT_PROXIED_USER_HEADER,
                DEFAULT_MASQUERADE_USER_HEADER,
            ])
            .unwrap();

        let state = AppState {
            cache,
            checker,
            strategy: Arc::new(strategy),
            config: Arc::new(Config::default_for_tests()),
        };
        (state, dir)
    }

    fn roles(roles: &[&str]) -> AccessAttributes {
        AccessAttributes {
            roles: roles.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state(FakeProvider::default());
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_needs_no_authentication() {
        let (state, _dir) = test_state(FakeProvider::default());
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn current_user_reports_resolved_identity() {
        let provider = FakeProvider::default().with_record("cn=alice", roles(&["user"]));
        let (state, _dir) = test_state(provider);

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/v1/user/me")
                    .header(DEFAULT_PRIMARY_USER_HEADER, "cn=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["identity"]["subject_dn"], "cn=alice");
        assert_eq!(json["delegation"], "primary");
    }

    #[tokio::test]
    async fn admin_routes_reject_non_admins() {
        let provider = FakeProvider::default().with_record("cn=bob", roles(&["user"]));
        let (state, _dir) = test_state(provider);

        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/v1/admin/cache")
                    .header(DEFAULT_PRIMARY_USER_HEADER, "cn=bob")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_search_and_delete_entries() {
        let provider = FakeProvider::default().with_record("cn=admin", roles(&["admin"]));
        let (state, _dir) = test_state(provider);
        state
            .cache
            .upsert("cn=bob", &serde_json::json!({"roles": ["user"]}))
            .unwrap();

        let search = router(state.clone())
            .oneshot(
                HttpRequest::builder()
                    .uri("/v1/admin/cache?q=bob")
                    .header(DEFAULT_PRIMARY_USER_HEADER, "cn=admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(search.status(), StatusCode::OK);
        let body = axum::body::to_bytes(search.into_body(), usize::MAX)
            .await
            .unwrap();
        let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(page["total"], 1);

        let delete = router(state)
            .oneshot(
                HttpRequest::builder()
                    .method("DELETE")
                    .uri("/v1/admin/cache/cn=bob")
                    .header(DEFAULT_PRIMARY_USER_HEADER, "cn=admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete.status(), StatusCode::OK);
    }
}
