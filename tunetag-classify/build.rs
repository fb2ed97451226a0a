//! Exposes GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE to the crate.
//!
//! The hash comes from `git describe` and carries a `-dirty` suffix for
//! uncommitted changes. The timestamp is UTC and honours SOURCE_DATE_EPOCH
//! so packaged builds are reproducible.

use std::env;
use std::process::Command;

use chrono::{DateTime, SecondsFormat, Utc};

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn build_time() -> DateTime<Utc> {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

fn main() {
    let revision = git(&["describe", "--always", "--dirty", "--abbrev=8"])
        .unwrap_or_else(|| "unknown".to_string());

    // Re-run when the checkout moves; outside one only SOURCE_DATE_EPOCH does
    if let Some(git_dir) = git(&["rev-parse", "--git-dir"]) {
        println!("cargo:rerun-if-changed={}/HEAD", git_dir);
        println!("cargo:rerun-if-changed={}/index", git_dir);
    }
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    println!("cargo:rustc-env=GIT_HASH={}", revision);
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        build_time().to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!(
        "cargo:rustc-env=BUILD_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}
