use std::net::SocketAddr;
use std::sync::Arc;

use vmwatch_arm::ArmClient;
use vmwatch_core::config::Config;
use vmwatch_core::error::{Result, VmwatchError};

use crate::routes::{ApiState, router};

pub async fn run_api_server(cfg: Config, addr: SocketAddr) -> Result<()> {
    let arm = Arc::new(ArmClient::new(&cfg)?);
    let state = ApiState {
        arm,
        cfg: Arc::new(cfg),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VmwatchError::Transport(format!("bind {addr}: {e}")))?;
    tracing::info!(%addr, "monitoring api listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| VmwatchError::Transport(format!("http server failed: {e}")))
}
