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

//! Declaration registry: publishers and subscriptions keyed by one id space.

use crate::error::{Error, Result};
use crate::routing::key_expr::KeyExpr;
use std::fmt;

/// Identity of one declaration (publisher or subscription) inside a session.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId(u64);

impl EntityId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SubscriptionEntry<H> {
    id: EntityId,
    key_expr: KeyExpr,
    handle: H,
}

struct PublisherEntry {
    id: EntityId,
    key_expr: KeyExpr,
}

/// What [`Registry::remove`] took out.
#[derive(Debug)]
pub(crate) enum Removed<H> {
    Publisher(KeyExpr),
    Subscription(KeyExpr, H),
}

/// Storage owner for declarations.
///
/// Not synchronized on its own: the session keeps it behind its lifecycle lock so that
/// matching is a read and declare/remove are writes.
pub(crate) struct Registry<H> {
    next_id: u64,
    subscriptions: Vec<SubscriptionEntry<H>>,
    publishers: Vec<PublisherEntry>,
}

impl<H: Clone> Registry<H> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            subscriptions: Vec::new(),
            publishers: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Id the next declaration will receive.
    pub(crate) fn peek_next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Appends a subscription. Declaration order is kept for matching.
    pub(crate) fn add_subscription(&mut self, key_expr: KeyExpr, handle: H) -> EntityId {
        let id = self.allocate_id();
        self.subscriptions.push(SubscriptionEntry {
            id,
            key_expr,
            handle,
        });
        id
    }

    /// Registers a publisher on a wildcard-free key expression.
    pub(crate) fn add_publisher(&mut self, key_expr: KeyExpr) -> Result<EntityId> {
        key_expr.ensure_literal()?;
        let id = self.allocate_id();
        self.publishers.push(PublisherEntry { id, key_expr });
        Ok(id)
    }

    /// Removes a declaration. An unknown or already removed id fails with `NotFound`.
    pub(crate) fn remove(&mut self, id: EntityId) -> Result<Removed<H>> {
        if let Some(position) = self.subscriptions.iter().position(|entry| entry.id == id) {
            let entry = self.subscriptions.remove(position);
            return Ok(Removed::Subscription(entry.key_expr, entry.handle));
        }
        if let Some(position) = self.publishers.iter().position(|entry| entry.id == id) {
            let entry = self.publishers.remove(position);
            return Ok(Removed::Publisher(entry.key_expr));
        }
        Err(Error::NotFound(id))
    }

    /// Handles of every subscription whose pattern matches `key`, in declaration order.
    pub(crate) fn match_subscribers(&self, key: &KeyExpr) -> Vec<H> {
        self.subscriptions
            .iter()
            .filter(|entry| entry.key_expr.matches(key))
            .map(|entry| entry.handle.clone())
            .collect()
    }

    pub(crate) fn contains_publisher(&self, id: EntityId) -> bool {
        self.publishers.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn publisher_count(&self) -> usize {
        self.publishers.len()
    }

    /// Drops every declaration and returns the subscription handles that were held.
    pub(crate) fn clear(&mut self) -> Vec<H> {
        self.publishers.clear();
        self.subscriptions
            .drain(..)
            .map(|entry| entry.handle)
            .collect()
    }
}
