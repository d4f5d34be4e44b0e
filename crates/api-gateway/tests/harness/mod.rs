//! Test harness: spawns a real gateway on 127.0.0.1:0.

use api_gateway::config::Config;
use api_gateway::routes::{self, AppState};
use api_gateway::services::{HttpSessionClient, UpstreamClient};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct TestGateway {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestGateway {
    /// Spawn a gateway. `overrides` are applied on top of URLs pointing at
    /// a closed port.
    pub async fn spawn(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("USER_SERVICE_URL".to_string(), "http://127.0.0.1:9".to_string()),
            ("BOOK_SERVICE_URL".to_string(), "http://127.0.0.1:9".to_string()),
            ("CATEGORY_SERVICE_URL".to_string(), "http://127.0.0.1:9".to_string()),
        ]);
        for (k, v) in overrides {
            vars.insert((*k).to_string(), (*v).to_string());
        }
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let authority = Arc::new(
            HttpSessionClient::new(&config.user_service_url, config.session_validate_timeout)
                .map_err(|e| anyhow::anyhow!("Failed to build session client: {}", e))?,
        );
        let upstream = UpstreamClient::new(config.upstream_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to build upstream client: {}", e))?;

        let state = Arc::new(AppState {
            config,
            authority,
            upstream,
        });
        let app = routes::build_routes(state, PrometheusBuilder::new().build_recorder().handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test gateway error: {}", e);
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
