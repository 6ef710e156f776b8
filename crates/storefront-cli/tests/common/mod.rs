use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

/// Location of the token file inside a test directory.
pub fn token_file(dir: &Path) -> PathBuf {
    dir.join("tokens.json")
}

/// Run the CLI against a mock server with an isolated token file.
pub async fn run_cli(args: &[&str], base_url: &str, tokens: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_storefront"));
    cmd.args(args);
    cmd.arg("--base-url").arg(base_url);
    cmd.arg("--token-file").arg(tokens);
    cmd.env_remove("STOREFRONT_API_URL");
    cmd.env_remove("STOREFRONT_TOKEN_FILE");
    cmd.env_remove("STOREFRONT_PASSWORD");
    cmd.output().await.expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub async fn run_cli_success(args: &[&str], base_url: &str, tokens: &Path) -> String {
    let output = run_cli(args, base_url, tokens).await;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Write a saved session the way the CLI stores it.
pub fn seed_tokens(path: &Path, access: &str, refresh: &str) {
    let json = serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
    });
    std::fs::write(path, json.to_string()).expect("Failed to write token file");
}

/// Read the saved session, if any.
pub fn read_tokens(path: &Path) -> Option<serde_json::Value> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
