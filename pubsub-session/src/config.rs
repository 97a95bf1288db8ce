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

//! Session configuration loaded from JSON5.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_SESSION_NAME: &str = "pubsub-session";
pub const DEFAULT_MESSAGE_QUEUE_SIZE: usize = 64;

/// Settings a [`Session`](crate::Session) is opened with.
///
/// ```
/// use pubsub_session::SessionConfig;
///
/// let config = SessionConfig::from_json5_str(
///     r#"{ name: "node-a", connect: { endpoints: ["node-b"] } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.name, "node-a");
/// assert_eq!(config.connect.endpoints, vec!["node-b".to_string()]);
/// assert_eq!(config.message_queue_size, 64);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Label used in logs and as the session's local node name.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub connect: ConnectConfig,
    /// Capacity of each subscription's delivery queue.
    #[serde(default = "default_message_queue_size")]
    pub message_queue_size: usize,
}

/// Remote endpoints every `put` is propagated to.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConnectConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
}

fn default_name() -> String {
    DEFAULT_SESSION_NAME.to_string()
}

fn default_message_queue_size() -> usize {
    DEFAULT_MESSAGE_QUEUE_SIZE
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            connect: ConnectConfig::default(),
            message_queue_size: default_message_queue_size(),
        }
    }
}

impl SessionConfig {
    /// Reads and validates a JSON5 configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("unable to read '{}': {err}", path.display()))
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn from_json5_str(contents: &str) -> Result<Self> {
        let config: Self = json5::from_str(contents)
            .map_err(|err| Error::Config(format!("unable to parse configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the value at a `/`-separated path with a JSON5 value.
    ///
    /// ```
    /// use pubsub_session::SessionConfig;
    ///
    /// let mut config = SessionConfig::default();
    /// config.insert_json5("connect/endpoints", r#"["node-b"]"#).unwrap();
    /// config.insert_json5("message_queue_size", "8").unwrap();
    ///
    /// assert_eq!(config.connect.endpoints, vec!["node-b".to_string()]);
    /// assert_eq!(config.message_queue_size, 8);
    /// ```
    pub fn insert_json5(&mut self, path: &str, value: &str) -> Result<()> {
        let value: Value = json5::from_str(value)
            .map_err(|err| Error::Config(format!("invalid value for '{path}': {err}")))?;
        let mut document = serde_json::to_value(&*self)
            .map_err(|err| Error::Config(format!("unable to serialize configuration: {err}")))?;

        let slot = path
            .split('/')
            .try_fold(&mut document, |node, segment| {
                if segment.is_empty() {
                    return None;
                }
                node.as_object_mut()?.get_mut(segment)
            })
            .ok_or_else(|| Error::Config(format!("unknown configuration path '{path}'")))?;
        *slot = value;

        let updated: Self = serde_json::from_value(document)
            .map_err(|err| Error::Config(format!("invalid value for '{path}': {err}")))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("name must not be empty".to_string()));
        }
        if self.message_queue_size == 0 {
            return Err(Error::Config(
                "message_queue_size must be greater than zero".to_string(),
            ));
        }
        if let Some(position) = self
            .connect
            .endpoints
            .iter()
            .position(|endpoint| endpoint.trim().is_empty())
        {
            return Err(Error::Config(format!(
                "connect.endpoints[{position}] must not be empty"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionConfig, DEFAULT_MESSAGE_QUEUE_SIZE, DEFAULT_SESSION_NAME};
    use crate::Error;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SessionConfig::from_json5_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.name, DEFAULT_SESSION_NAME);
        assert_eq!(config.message_queue_size, DEFAULT_MESSAGE_QUEUE_SIZE);
        assert!(config.connect.endpoints.is_empty());
    }

    #[test]
    fn json5_syntax_is_accepted() {
        let config = SessionConfig::from_json5_str(
            r#"{
                // comments and trailing commas are fine
                name: 'node-a',
                connect: { endpoints: ['node-b', 'node-c',], },
                message_queue_size: 16,
            }"#,
        )
        .unwrap();

        assert_eq!(config.name, "node-a");
        assert_eq!(config.connect.endpoints, vec!["node-b", "node-c"]);
        assert_eq!(config.message_queue_size, 16);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SessionConfig::from_json5_str(r#"{ mode: "peer" }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn validation_rejects_zero_queue_and_blank_values() {
        for document in [
            r#"{ message_queue_size: 0 }"#,
            r#"{ name: "  " }"#,
            r#"{ connect: { endpoints: ["node-b", ""] } }"#,
        ] {
            let err = SessionConfig::from_json5_str(document).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{document} should fail");
        }
    }

    #[test]
    fn insert_json5_updates_nested_paths() {
        let mut config = SessionConfig::default();
        config
            .insert_json5("connect/endpoints", r#"["node-b"]"#)
            .unwrap();
        config.insert_json5("name", r#""node-a""#).unwrap();

        assert_eq!(config.connect.endpoints, vec!["node-b"]);
        assert_eq!(config.name, "node-a");
    }

    #[test]
    fn insert_json5_rejects_unknown_paths_and_bad_values() {
        let mut config = SessionConfig::default();

        assert!(config.insert_json5("connect/peers", "[]").is_err());
        assert!(config.insert_json5("connect//endpoints", "[]").is_err());
        assert!(config.insert_json5("message_queue_size", r#""many""#).is_err());
        assert!(config.insert_json5("message_queue_size", "0").is_err());
        assert!(config.insert_json5("name", "{").is_err());

        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn from_file_reads_json5() {
        let path = std::env::temp_dir().join(format!(
            "pubsub-session-config-{}.json5",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{{ name: 'from-file', message_queue_size: 4 }}").unwrap();
        drop(file);

        let config = SessionConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.name, "from-file");
        assert_eq!(config.message_queue_size, 4);
        assert!(SessionConfig::from_file(&path).is_err());
    }
}
