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

//! Routing layer.
//!
//! Owns key-expression parsing and the matching policy that decides which subscriptions
//! receive a published sample.
//!
//! ```
//! use pubsub_session::KeyExpr;
//!
//! let pattern = KeyExpr::parse("demo/**/bench/*").unwrap();
//! let key = KeyExpr::literal("demo/zenoh/bench/req").unwrap();
//! assert!(pattern.matches(&key));
//!
//! // Publish keys must be wildcard-free.
//! assert!(KeyExpr::literal("demo/*").is_err());
//! ```

pub(crate) mod key_expr;
