//! ttsgate server binary.
//!
//! Fronts an inference sidecar with admission control and a result cache.
//!
//! ## Quick Start
//!
//! ```bash
//! # Defaults: port 8000, sidecar at http://127.0.0.1:9000
//! ttsgate-server
//!
//! # Cache on, small queue, file output
//! TTS_ENABLE_CACHE=1 TTS_MAX_QUEUE_SIZE=4 TTS_OUTPUT_MODE=file ttsgate-server
//! ```

use std::sync::Arc;

use ttsgate_server::{init_tracing, run_server, ServiceConfig, SidecarLoader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    init_tracing(&config.log_level);

    let loader = Arc::new(SidecarLoader::from_config(&config));
    run_server(config, loader).await
}
