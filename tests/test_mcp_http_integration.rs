use axum::Router;
use http_body_util::BodyExt; // for .collect
use hyper::{header, Request, StatusCode};
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use tower::ServiceExt; // for .oneshot

use crew_mcp_tools::infra::http_app::build_app;
use crew_mcp_tools::infra::mcp::ToolsSvc;
use crew_mcp_tools::tools::{ToolSettings, Variant};

fn rpc(body: &Value, session_id: Option<&str>) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header(header::ACCEPT, "application/json, text/event-stream")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session_id {
        builder = builder.header("MCP-Session-Id", id);
    }
    builder.body(axum::body::Body::from(body.to_string())).unwrap()
}

/// First JSON-RPC message carried in an SSE body.
async fn sse_message(app: &Router, req: Request<axum::body::Body>) -> Value {
    let res = timeout(Duration::from_secs(20), app.clone().oneshot(req))
        .await
        .unwrap()
        .unwrap();
    assert!(res.status().is_success());
    let bytes = timeout(Duration::from_secs(20), res.into_body().collect())
        .await
        .unwrap()
        .unwrap()
        .to_bytes();
    let s = String::from_utf8_lossy(&bytes);
    s.lines()
        .find_map(|line| line.strip_prefix("data: ").map(|d| d.to_string()))
        .and_then(|d| serde_json::from_str::<Value>(&d).ok())
        .expect("no JSON-RPC message in response")
}

async fn initialize(app: &Router) -> String {
    let init = json!({
        "jsonrpc":"2.0","id":1,"method":"initialize",
        "params":{ "protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"test","version":"0.1"} }
    });
    let init_res = app.clone().oneshot(rpc(&init, None)).await.unwrap();
    assert!(init_res.status().is_success());
    let session_id = init_res
        .headers()
        .get("MCP-Session-Id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();

    let initialized = json!({"jsonrpc":"2.0","method":"notifications/initialized","params":{}});
    let res = app
        .clone()
        .oneshot(rpc(&initialized, Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    session_id
}

#[tokio::test]
async fn initialize_list_and_call_over_streamable_http() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ToolSettings {
        root: dir.path().to_path_buf(),
        ..ToolSettings::default()
    };
    let app = build_app(ToolsSvc::from_settings(Variant::Simple, &settings).unwrap());
    let session_id = initialize(&app).await;

    // tools/list
    let list = json!({"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}});
    let v = sse_message(&app, rpc(&list, Some(&session_id))).await;
    let names: Vec<&str> = v["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["get_current_time", "calculate", "write_file", "read_file"]);

    // tools/call
    let call = json!({
        "jsonrpc":"2.0","id":3,"method":"tools/call",
        "params": {"name":"calculate","arguments":{"expression":"2+2"}}
    });
    let v = sse_message(&app, rpc(&call, Some(&session_id))).await;
    assert_eq!(v["result"]["content"][0]["text"], "Result: 2+2 = 4");
    assert_eq!(v["result"]["structuredContent"]["result"], 4);

    // write then read through the same session
    let write = json!({
        "jsonrpc":"2.0","id":4,"method":"tools/call",
        "params": {"name":"write_file","arguments":{"filename":"notes.txt","content":"line one\nline two"}}
    });
    let v = sse_message(&app, rpc(&write, Some(&session_id))).await;
    assert_ne!(v["result"]["isError"], true);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "line one\nline two"
    );
}

#[tokio::test]
async fn tool_failures_and_unknown_tools_are_distinguishable() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ToolSettings {
        root: dir.path().to_path_buf(),
        ..ToolSettings::default()
    };
    let app = build_app(ToolsSvc::from_settings(Variant::Simple, &settings).unwrap());
    let session_id = initialize(&app).await;

    let bad_expr = json!({
        "jsonrpc":"2.0","id":2,"method":"tools/call",
        "params": {"name":"calculate","arguments":{"expression":"__import__('os')"}}
    });
    let v = sse_message(&app, rpc(&bad_expr, Some(&session_id))).await;
    assert_eq!(v["result"]["isError"], true);
    assert_eq!(v["result"]["structuredContent"]["kind"], "evaluation");

    let unknown = json!({
        "jsonrpc":"2.0","id":3,"method":"tools/call",
        "params": {"name":"format_disk","arguments":{}}
    });
    let v = sse_message(&app, rpc(&unknown, Some(&session_id))).await;
    assert_eq!(v["error"]["code"], -32602);
}
