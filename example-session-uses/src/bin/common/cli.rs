/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use pubsub_session::{Error, SessionConfig};
use std::fs::canonicalize;
use std::path::PathBuf;

pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}

pub(crate) fn canonicalize_cli_path(flag: &str, raw: &str) -> Result<PathBuf, Error> {
    canonicalize(PathBuf::from(raw)).map_err(|error| {
        invalid_argument(format!(
            "invalid value for {flag}: '{raw}' (expected an existing file path): {error}"
        ))
    })
}

/// Loads the session config from `--config` when given, otherwise starts from defaults.
///
/// `connect` endpoints are appended after the file is read, and `name` overrides the file's
/// session name when present.
pub(crate) fn load_session_config(
    config: Option<&str>,
    name: Option<&str>,
    connect: &[String],
) -> Result<SessionConfig, Error> {
    let mut session_config = match config {
        Some(raw) => SessionConfig::from_file(canonicalize_cli_path("--config", raw)?)?,
        None => SessionConfig::default(),
    };

    if let Some(name) = name {
        session_config.name = name.to_string();
    }
    if !connect.is_empty() {
        let mut endpoints = session_config.connect.endpoints.clone();
        endpoints.extend(connect.iter().cloned());
        let rendered = endpoints
            .iter()
            .map(|endpoint| format!("{endpoint:?}"))
            .collect::<Vec<_>>()
            .join(",");
        session_config.insert_json5("connect/endpoints", &format!("[{rendered}]"))?;
    }

    session_config.validate()?;
    Ok(session_config)
}

pub(crate) fn parse_payload_bytes(flag: &str, raw: &str, min: usize) -> Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("invalid value for {flag}: '{raw}' (expected an integer)"))?;
    if value < min {
        return Err(format!(
            "invalid value for {flag}: '{raw}' (must be at least {min})"
        ));
    }
    Ok(value)
}

pub(crate) fn parse_positive_f64(flag: &str, raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(format!(
            "invalid value for {flag}: '{raw}' (expected a positive number)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn defaults_apply_without_config_file() {
        let config = load_session_config(None, None, &[]).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn name_and_connect_override_defaults() {
        let connect = vec!["node-b".to_string(), "node-c".to_string()];
        let config = load_session_config(None, Some("node-a"), &connect).unwrap();
        assert_eq!(config.name, "node-a");
        assert_eq!(config.connect.endpoints, connect);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let error = load_session_config(Some("/definitely/not/here.json5"), None, &[])
            .unwrap_err();
        assert!(matches!(error, Error::Config(message) if message.contains("--config")));
    }

    #[test]
    fn payload_bytes_enforces_minimum() {
        assert_eq!(parse_payload_bytes("--payload-bytes", "1024", 16), Ok(1024));
        assert_eq!(
            parse_payload_bytes("--payload-bytes", "8", 16).unwrap_err(),
            "invalid value for --payload-bytes: '8' (must be at least 16)"
        );
        assert!(parse_payload_bytes("--payload-bytes", "lots", 16).is_err());
    }

    #[test]
    fn positive_f64_rejects_zero_and_nan() {
        assert_eq!(parse_positive_f64("--rate-hz", "250.5"), Ok(250.5));
        assert!(parse_positive_f64("--rate-hz", "0").is_err());
        assert!(parse_positive_f64("--rate-hz", "NaN").is_err());
        assert!(parse_positive_f64("--rate-hz", "-3").is_err());
    }

    #[derive(Debug, Parser)]
    #[command(version, about, long_about = None)]
    struct RepresentativeHelpArgs {
        #[arg(long)]
        config: Option<String>,
        #[arg(long, default_value = super::super::DEFAULT_KEY)]
        key: String,
        #[arg(long)]
        connect: Vec<String>,
    }

    #[test]
    fn representative_help_includes_common_flags_and_defaults() {
        let mut command = RepresentativeHelpArgs::command();
        let help = command.render_long_help().to_string();

        assert!(help.contains("--config <CONFIG>"));
        assert!(help.contains("--key <KEY>"));
        assert!(help.contains("demo/zenoh/getting-started"));
        assert!(help.contains("--connect <CONNECT>"));
    }
}
