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

//! Error kinds surfaced by the session API.

use crate::control_plane::registry::EntityId;
use std::convert::Infallible;
use thiserror::Error;

/// Errors returned by [`Session`](crate::Session) operations and their handles.
///
/// `CallbackFailure` is never returned to a publisher. It is built by the delivery path
/// so that a failing subscriber callback is reported with the same vocabulary as every
/// other failure, and then logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key expression '{key_expr}': {reason}")]
    InvalidKeyExpr { key_expr: String, reason: String },

    #[error("no declaration with id {0}")]
    NotFound(EntityId),

    #[error("session is closed")]
    SessionClosed,

    #[error("subscriber {subscriber} callback failed: {reason}")]
    CallbackFailure {
        subscriber: EntityId,
        reason: String,
    },

    #[error("invalid session configuration: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unable to start delivery worker: {0}")]
    Runtime(String),
}

impl Error {
    pub(crate) fn invalid_key_expr(key_expr: &str, reason: impl Into<String>) -> Self {
        Error::InvalidKeyExpr {
            key_expr: key_expr.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Error::InvalidKeyExpr`].
    pub fn is_invalid_key_expr(&self) -> bool {
        matches!(self, Error::InvalidKeyExpr { .. })
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns `true` for [`Error::SessionClosed`].
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Error::SessionClosed)
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::control_plane::registry::EntityId;

    #[test]
    fn display_names_the_offending_key_expr() {
        let err = Error::invalid_key_expr("a/*", "wildcards are not allowed in publish keys");
        assert!(err.is_invalid_key_expr());
        assert_eq!(
            err.to_string(),
            "invalid key expression 'a/*': wildcards are not allowed in publish keys"
        );
    }

    #[test]
    fn kind_predicates_are_exclusive() {
        let not_found = Error::NotFound(EntityId::from(7));
        assert!(not_found.is_not_found());
        assert!(!not_found.is_session_closed());
        assert_eq!(not_found.to_string(), "no declaration with id 7");

        assert!(Error::SessionClosed.is_session_closed());
        assert!(!Error::SessionClosed.is_invalid_key_expr());
    }
}
