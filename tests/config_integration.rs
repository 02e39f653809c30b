// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for configuration loading and layering.

use anyhow::{Context, Result};
use std::time::Duration;

use pantograph::config::Config;

#[test]
fn test_defaults_without_any_file() -> Result<()> {
    let config = Config::load(None)?;

    assert_eq!(config.start_timeout, 30);
    assert_eq!(config.theme, "vs-light");
    Ok(())
}

#[test]
fn test_explicit_file_overrides_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
start_timeout = 5
theme = "vs-dark"

[client.json]
transport = "socket"
secured = false
host = "localhost"
port = 30000
path = "sampleServer"

[client.plaintext]
transport = "worker"
url = "/usr/local/bin/plaintext-ls"
kind = "classic"
name = "plaintext"
"#,
    )?;

    let config = Config::load(Some(path))?;

    assert_eq!(config.start_timeout, 5);
    assert_eq!(config.theme, "vs-dark");
    assert_eq!(config.client.len(), 2);

    // Entries convert into ready-to-use client configurations carrying
    // the file-level timeout.
    let client = config
        .client_config("json")
        .context("missing json client config")?;
    assert_eq!(client.language_id, "json");
    assert_eq!(client.start_timeout, Duration::from_secs(5));

    assert!(config.client_config("rust").is_none());
    Ok(())
}

#[test]
fn test_partial_file_keeps_remaining_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "theme = \"vs-dark\"\n")?;

    let config = Config::load(Some(path))?;

    assert_eq!(config.theme, "vs-dark");
    assert_eq!(config.start_timeout, 30, "unset fields keep their defaults");
    assert!(config.client.is_empty());
    Ok(())
}

#[test]
fn test_worker_entry_round_trips_kind() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[client.typescript]
transport = "worker"
url = "/opt/servers/tsserver.js"
kind = "module"
"#,
    )?;

    let config = Config::load(Some(path))?;
    let client = config
        .client_config("typescript")
        .context("missing typescript client config")?;

    match client.transport {
        pantograph::client::TransportConfig::WorkerOptions(options) => {
            assert_eq!(options.kind, pantograph::client::WorkerKind::Module);
            assert_eq!(options.url.to_string_lossy(), "/opt/servers/tsserver.js");
        }
        _ => anyhow::bail!("expected a worker transport entry"),
    }
    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "start_timeout = \"not a number\"\n")?;

    assert!(Config::load(Some(path)).is_err());
    Ok(())
}
