//! Stamps the binary with a version derived from the enclosing git checkout.
//!
//! `STOREFRONT_VERSION` is `git describe` output (without a leading `v`, with
//! `-dirty` for uncommitted changes) or the package version outside git.

use std::path::PathBuf;
use std::process::Command;

fn main() {
    if let Some(git_dir) = git(&["rev-parse", "--absolute-git-dir"]) {
        let git_dir = PathBuf::from(git_dir);
        println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
        println!("cargo:rerun-if-changed={}", git_dir.join("refs").display());
    }

    let version = git(&["describe", "--tags", "--always", "--dirty"])
        .map(|describe| describe.trim_start_matches('v').to_string())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=STOREFRONT_VERSION={version}");
}

/// Run git and return its trimmed stdout, or `None` on any failure.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let stdout = stdout.trim();
    (!stdout.is_empty()).then(|| stdout.to_string())
}
