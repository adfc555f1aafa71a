use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ttsgate_core::{DevicePlan, EngineLoader, Language, ModelRegistry, SynthesisParams};
use ttsgate_server::{init_tracing, run_server, ServiceConfig, SidecarLoader};

mod client;

#[derive(Parser)]
#[command(name = "ttsgate")]
#[command(version)]
#[command(about = "ttsgate - Admission-controlled speech synthesis service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server against the engine sidecar
    Serve {
        /// Bind host (overrides TTS_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides TTS_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Load every model before accepting requests
        #[arg(long)]
        preload: bool,
    },

    /// Check configuration, device selection and model availability
    Check {
        /// Skip loading a model and synthesizing a test phrase
        #[arg(long)]
        skip_engine: bool,
    },

    /// Replay a JSON list of synthesis requests and save the audio
    Batch {
        /// JSON file holding an array of /v1/tts request bodies
        jobs: PathBuf,

        /// Base URL of a running server
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        api_base: String,

        /// Directory for `<request_id>.<format>` files
        #[arg(long, default_value = "/tmp/ttsgate_batch_outputs")]
        out_dir: PathBuf,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Measure request latency against a running server
    Bench {
        /// Base URL of a running server
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        host: String,

        /// Total number of requests
        #[arg(short = 'n', long, default_value_t = 5)]
        requests: usize,

        /// Requests in flight per wave
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            preload,
        } => {
            let mut config = ServiceConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if preload {
                config.dispatch.preload_models = true;
            }
            init_tracing(&config.log_level);

            let loader = Arc::new(SidecarLoader::from_config(&config));
            run_server(config, loader).await?;
        }

        Commands::Check { skip_engine } => {
            let config = ServiceConfig::from_env();
            init_tracing("warn");
            check(&config, skip_engine).await?;
        }

        Commands::Batch {
            jobs,
            api_base,
            out_dir,
            timeout,
        } => {
            init_tracing("warn");
            println!("📦 Replaying {} against {}", jobs.display(), api_base);

            let written =
                client::run_batch(&api_base, &jobs, &out_dir, Duration::from_secs(timeout)).await?;
            for path in &written {
                println!("  ✓ {}", path.display());
            }
            println!("\n✅ Saved {} file(s) to {}", written.len(), out_dir.display());
        }

        Commands::Bench {
            host,
            requests,
            concurrency,
        } => {
            init_tracing("warn");
            println!("Benchmark against {}", host);

            let report = client::run_bench(&host, requests, concurrency).await?;
            println!("Requests: {}, Concurrency: {}", requests, concurrency.max(1));
            println!("p50: {:.1} ms, p95: {:.1} ms", report.p50(), report.p95());
        }
    }

    Ok(())
}

/// Hugging Face cache root: `HF_HOME`, else `~/.cache/huggingface`
fn hf_root(config: &ServiceConfig) -> Option<PathBuf> {
    config.hf_home.clone().or_else(|| {
        std::env::var_os("HOME").map(|home| Path::new(&home).join(".cache").join("huggingface"))
    })
}

async fn check(config: &ServiceConfig, skip_engine: bool) -> anyhow::Result<()> {
    println!("=== Configuration ===");
    println!("Device preference: {:?}", config.dispatch.device);
    println!("Dtype preference: {:?}", config.dispatch.dtype);
    println!("Output mode: {:?}", config.output_mode);
    println!("Engine sidecar: {}", config.engine_url);
    match &config.hf_home {
        Some(path) => println!("HF_HOME: {}", path.display()),
        None => println!("HF_HOME: (unset)"),
    }
    println!();

    let (device, dtype) = (config.dispatch.device, config.dispatch.dtype);
    let plan = tokio::task::spawn_blocking(move || DevicePlan::resolve(device, dtype)).await?;
    println!("=== Device ===");
    println!("Device: {}", plan.device);
    println!("Dtype: {}", plan.dtype);
    println!("Reason: {}", plan.reason);
    println!();

    let registry = ModelRegistry::qwen3();
    let hub = hf_root(config).map(|root| root.join("hub"));
    println!("=== Registry ===");
    for spec in registry.iter() {
        let cached = hub
            .as_ref()
            .map(|hub| hub.join(spec.hub_cache_slug()).exists())
            .unwrap_or(false);
        println!(
            "{} -> {} ({})",
            spec.name,
            spec.repo_id,
            if cached { "cached" } else { "not in cache" }
        );
    }
    println!();

    if skip_engine {
        println!("Skipping engine smoke test");
        println!("\n=== All checks passed ===");
        return Ok(());
    }

    let Some(spec) = registry.get(registry.default_model()).cloned() else {
        anyhow::bail!("Registry has no default model");
    };
    println!("=== Smoke test ({}) ===", spec.name);

    let loader = SidecarLoader::from_config(config);
    let output = tokio::task::spawn_blocking(move || {
        let engine = loader.load(&spec, &plan)?;
        engine.synthesize(&SynthesisParams::new("Hi").with_language(Language::En))
    })
    .await?
    .map_err(|e| anyhow::anyhow!("Smoke synthesis failed: {}", e))?;

    println!(
        "Synthesized {} samples at {} Hz ({:.2}s)",
        output.samples.len(),
        output.sample_rate,
        output.duration_secs()
    );
    println!("\n=== All checks passed ===");
    Ok(())
}
