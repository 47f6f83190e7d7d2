use axum::{
    extract::State,
    routing::{any_service, get},
    Json, Router,
};
use std::sync::Arc;

use crate::infra::mcp::ToolsSvc;
use crate::infra::runtime::mcp_transport::{make_streamable_http_service, LocalSessionManager};

/// `/healthz`, streamable MCP at `/mcp`, and a plain JSON descriptor listing at `/tools`.
pub fn build_app(svc: ToolsSvc) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let factory_svc = svc.clone();
    let mcp_service = make_streamable_http_service(move || factory_svc.clone(), session_mgr);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/tools", get(list_tools))
        .route_service("/mcp", any_service(mcp_service))
        .with_state(svc)
}

async fn list_tools(State(svc): State<ToolsSvc>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "server": svc.variant().server_name(),
        "tools": svc.registry().list(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolSettings, Variant};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(variant: Variant) -> Router {
        build_app(ToolsSvc::from_settings(variant, &ToolSettings::default()).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = app(Variant::Simple)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn tools_lists_descriptors() {
        let resp = app(Variant::Terminal)
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["server"], "terminal-mcp-server");
        assert_eq!(v["tools"][0]["name"], "execute_command");
        assert!(v["tools"][0]["inputSchema"].is_object());
    }
}
