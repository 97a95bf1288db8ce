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

//! Frame receiver that feeds transport traffic into local dispatch.

use crate::data_plane::frame_codec::decode_sample;
use crate::observability::{events, fields};
use crate::session::SessionShared;
use crate::transport::FrameReceiver;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Weak;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "ingress_receiver";

/// Registered on the transport once per session.
///
/// Holds the session weakly so a transport that outlives the session does not keep it alive.
pub(crate) struct IngressReceiver {
    session_id: String,
    session: Weak<SessionShared>,
}

impl IngressReceiver {
    pub(crate) fn new(session_id: String, session: Weak<SessionShared>) -> Self {
        Self {
            session_id,
            session,
        }
    }
}

#[async_trait]
impl FrameReceiver for IngressReceiver {
    async fn on_receive(&self, frame: Bytes) {
        let session_label = self.session_id.as_str();
        debug!(
            event = events::INGRESS_RECEIVE,
            component = COMPONENT,
            session = session_label,
            frame_len = frame.len(),
            "received frame"
        );

        let Some(session) = self.session.upgrade() else {
            debug!(
                event = events::INGRESS_DROP_SESSION_CLOSED,
                component = COMPONENT,
                session = session_label,
                reason = fields::REASON_SESSION_CLOSED,
                "session is gone; dropping frame"
            );
            return;
        };

        let sample = match decode_sample(frame) {
            Ok(sample) => sample,
            Err(err) => {
                session.counters().record_remote_dropped();
                warn!(
                    event = events::INGRESS_DECODE_FAILED,
                    component = COMPONENT,
                    session = session_label,
                    err = %err,
                    "dropping undecodable frame"
                );
                return;
            }
        };

        let key = tracing::enabled!(Level::DEBUG).then(|| sample.key_expr().clone());
        match session.dispatch_received(sample).await {
            Ok(enqueued) => {
                session.counters().record_remote_received();
                if let Some(key) = key {
                    debug!(
                        component = COMPONENT,
                        session = session_label,
                        key = key.as_str(),
                        enqueued,
                        "dispatched remote sample"
                    );
                }
            }
            Err(err) => {
                session.counters().record_remote_dropped();
                debug!(
                    event = events::INGRESS_DROP_SESSION_CLOSED,
                    component = COMPONENT,
                    session = session.id(),
                    reason = fields::REASON_SESSION_CLOSED,
                    err = %err,
                    "dropping remote sample"
                );
            }
        }
    }
}
