use std::net::SocketAddr;

use crate::infra::config::{Config, Transport};
use crate::infra::http_app::build_app;
use crate::infra::mcp::ToolsSvc;
use crate::infra::runtime::mcp_transport::serve_stdio;

/// Start the configured tool server and run until it stops.
pub async fn run_server(cfg: &Config) -> anyhow::Result<()> {
    cfg.validate()?;
    let transport = cfg.transport()?;
    let variant = cfg.variant()?;
    let settings = cfg.tool_settings();
    let svc = ToolsSvc::from_settings(variant, &settings)?;
    tracing::info!(
        mode = ?transport,
        variant = %variant,
        root = %settings.root.display(),
        tools = svc.registry().len(),
        "BOOT crew-mcp"
    );

    match transport {
        Transport::Stdio => serve_stdio(svc).await.map_err(|e| anyhow::anyhow!(e)),
        Transport::Server => {
            let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
            tracing::info!(%addr, "listening");
            axum::serve(tokio::net::TcpListener::bind(addr).await?, build_app(svc)).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refuses_to_start_with_invalid_config() {
        let cfg = Config { mode: "pigeon".into(), ..Config::default() };
        let err = run_server(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("unknown mode"));
    }
}
