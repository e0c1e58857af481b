use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

pub use openapi_mcp_test_support::{KillOnDrop, UpstreamApi, pick_unused_port, wait_http_ok};

pub fn proxy_bin() -> &'static str {
    env!("CARGO_BIN_EXE_openapi-mcp-proxy")
}

/// Spawn `serve <spec> --bind 127.0.0.1:<port>` plus any extra flags.
#[allow(dead_code)]
pub fn spawn_proxy_http(spec: &str, port: u16, extra: &[&str]) -> anyhow::Result<Child> {
    Command::new(proxy_bin())
        .args(["--log-level", "info", "serve", spec, "--bind"])
        .arg(format!("127.0.0.1:{port}"))
        .args(extra)
        .stdin(Stdio::null())
        .spawn()
        .context("spawn openapi-mcp-proxy")
}

/// Write an `OpenAPI` document into `dir` and return its path.
#[allow(dead_code)]
pub fn write_spec(dir: &Path, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
