//! HTTP client side of the CLI: batch replay and latency benchmarks.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Read a JSON array of `/v1/tts` bodies; every job must carry a `request_id`
pub fn load_jobs(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let data: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Value::Array(jobs) = data else {
        bail!("Expected a list of jobs in {}", path.display());
    };
    for (i, job) in jobs.iter().enumerate() {
        if request_id(job).is_none() {
            bail!("Job {} in {} has no request_id", i, path.display());
        }
    }
    Ok(jobs)
}

fn request_id(job: &Value) -> Option<&str> {
    job.get("request_id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
}

/// Resolve a possibly relative `audio_url` against the API base
fn absolute_url(api_base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}/{}", api_base.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

async fn write_audio(
    client: &Client,
    api_base: &str,
    request_id: &str,
    payload: &Value,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let format = payload
        .get("audio_format")
        .and_then(Value::as_str)
        .with_context(|| format!("Response for {} missing audio_format", request_id))?;
    let out_path = out_dir.join(format!("{}.{}", request_id, format));

    let bytes = if let Some(encoded) = payload.get("audio_base64").and_then(Value::as_str) {
        STANDARD
            .decode(encoded)
            .with_context(|| format!("Response for {} has invalid base64", request_id))?
    } else if let Some(url) = payload.get("audio_url").and_then(Value::as_str) {
        client
            .get(absolute_url(api_base, url))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        bail!("Response for {} missing audio payload", request_id);
    };

    tokio::fs::write(&out_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    Ok(out_path)
}

/// Replay every job in order, writing `<request_id>.<format>` files
pub async fn run_batch(
    api_base: &str,
    jobs_path: &Path,
    out_dir: &Path,
    timeout: Duration,
) -> anyhow::Result<Vec<PathBuf>> {
    let jobs = load_jobs(jobs_path)?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let client = Client::builder().timeout(timeout).build()?;
    let endpoint = format!("{}/v1/tts", api_base.trim_end_matches('/'));
    let mut written = Vec::with_capacity(jobs.len());

    for job in &jobs {
        let id = request_id(job).unwrap_or_default();
        debug!(request_id = id, "Submitting job");
        let payload: Value = client
            .post(&endpoint)
            .json(job)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        written.push(write_audio(&client, api_base, id, &payload, out_dir).await?);
    }

    Ok(written)
}

/// Latencies from a benchmark run, in milliseconds
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub latencies_ms: Vec<f64>,
}

impl BenchReport {
    pub fn new(mut latencies_ms: Vec<f64>) -> Self {
        latencies_ms.sort_by(|a, b| a.total_cmp(b));
        Self { latencies_ms }
    }

    /// Median; the mean of the two middle values for even counts
    pub fn p50(&self) -> f64 {
        let n = self.latencies_ms.len();
        if n == 0 {
            return 0.0;
        }
        if n % 2 == 1 {
            self.latencies_ms[n / 2]
        } else {
            (self.latencies_ms[n / 2 - 1] + self.latencies_ms[n / 2]) / 2.0
        }
    }

    /// Value at index `floor(0.95 * n)` of the sorted latencies
    pub fn p95(&self) -> f64 {
        let n = self.latencies_ms.len();
        if n == 0 {
            return 0.0;
        }
        let idx = ((0.95 * n as f64) as usize).min(n - 1);
        self.latencies_ms[idx]
    }
}

/// Fire `requests` synthesis calls in waves of `concurrency`
pub async fn run_bench(host: &str, requests: usize, concurrency: usize) -> anyhow::Result<BenchReport> {
    let concurrency = concurrency.max(1);
    let client = Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(concurrency)
        .build()?;
    let url = format!("{}/v1/tts", host.trim_end_matches('/'));
    let payload = json!({
        "text": "Benchmarking Qwen3 TTS",
        "model": "qwen3-tts-0.6b",
        "language": "en",
    });

    let mut latencies = Vec::with_capacity(requests);
    let mut sent = 0;
    while sent < requests {
        let wave = concurrency.min(requests - sent);
        let results = join_all((0..wave).map(|_| timed_request(&client, &url, &payload))).await;
        for latency in results {
            latencies.push(latency?);
        }
        sent += wave;
    }

    Ok(BenchReport::new(latencies))
}

async fn timed_request(client: &Client, url: &str, payload: &Value) -> anyhow::Result<f64> {
    let start = Instant::now();
    client
        .post(url)
        .json(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(start.elapsed().as_secs_f64() * 1000.0)
}
