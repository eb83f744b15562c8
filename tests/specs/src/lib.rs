// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `tokengate-server` binary as a subprocess and exercises
//! it over HTTP.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Resolve the path to the compiled `tokengate-server` binary.
pub fn server_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("tokengate-server")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `tokengate-server` process that is killed on drop.
pub struct ServerProcess {
    child: Child,
    port: u16,
}

/// Builder for the server's command line.
pub struct ServerBuilder {
    adapters: String,
    cache_ttl: u64,
    log_format: String,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        // No real CLIs are needed: an unknown adapter name selects nothing.
        Self { adapters: "none".to_owned(), cache_ttl: 30, log_format: "text".to_owned() }
    }
}

impl ServerBuilder {
    /// Adapter selection (`--adapters`).
    pub fn adapters(mut self, adapters: &str) -> Self {
        self.adapters = adapters.to_owned();
        self
    }

    /// Cache TTL in seconds (`--cache-ttl`).
    pub fn cache_ttl(mut self, secs: u64) -> Self {
        self.cache_ttl = secs;
        self
    }

    /// Log format (`--log-format`).
    pub fn log_format(mut self, format: &str) -> Self {
        self.log_format = format.to_owned();
        self
    }

    pub fn spawn(self) -> anyhow::Result<ServerProcess> {
        let binary = server_binary();
        anyhow::ensure!(binary.exists(), "tokengate-server binary not found at {}", binary.display());

        let port = free_port()?;
        let args: Vec<String> = vec![
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            port.to_string(),
            "--adapters".into(),
            self.adapters,
            "--cache-ttl".into(),
            self.cache_ttl.to_string(),
            "--log-format".into(),
            self.log_format,
            "--log-level".into(),
            "warn".into(),
        ];

        let child = Command::new(&binary)
            .args(&args)
            .env_remove("PORT")
            .env_remove("CACHE_TTL")
            .env_remove("ADAPTERS")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(ServerProcess { child, port })
    }
}

impl ServerProcess {
    pub fn build() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Spawn with no adapters selected.
    pub fn start() -> anyhow::Result<Self> {
        Self::build().spawn()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll `/health` until it answers 200.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("tokengate-server did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("tokengate-server did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
