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

//! Wire headers for the round-trip benchmark.
//!
//! A request carries `seq | client_send_mono_ns`, an ack carries
//! `seq | server_recv_mono_ns | server_send_mono_ns`. All fields are little-endian `u64`s and
//! timestamps are nanoseconds on a monotonic clock shared by both sides.

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub(crate) const REQ_HEADER_LEN: usize = 16;
pub(crate) const ACK_HEADER_LEN: usize = 24;

pub(crate) const DEFAULT_REQ_KEY: &str = "demo/zenoh/bench/req";
pub(crate) const DEFAULT_ACK_KEY: &str = "demo/zenoh/bench/ack";
pub(crate) const DEFAULT_PAYLOAD_BYTES: usize = 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ReqHeader {
    pub(crate) seq: u64,
    pub(crate) client_send_mono_ns: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct AckHeader {
    pub(crate) seq: u64,
    pub(crate) server_recv_mono_ns: u64,
    pub(crate) server_send_mono_ns: u64,
}

/// Builds a request of `payload_bytes` bytes: the header followed by zero padding.
///
/// Sizes below the header length are raised to it.
pub(crate) fn make_req_payload(seq: u64, client_send_mono_ns: u64, payload_bytes: usize) -> Bytes {
    let len = payload_bytes.max(REQ_HEADER_LEN);
    let mut payload = BytesMut::with_capacity(len);
    payload.put_u64_le(seq);
    payload.put_u64_le(client_send_mono_ns);
    payload.resize(len, 0);
    payload.freeze()
}

pub(crate) fn make_ack_payload(
    seq: u64,
    server_recv_mono_ns: u64,
    server_send_mono_ns: u64,
) -> Bytes {
    let mut payload = BytesMut::with_capacity(ACK_HEADER_LEN);
    payload.put_u64_le(seq);
    payload.put_u64_le(server_recv_mono_ns);
    payload.put_u64_le(server_send_mono_ns);
    payload.freeze()
}

/// Reads the request header, ignoring padding. `None` when the payload is too short.
pub(crate) fn parse_req_payload(mut payload: &[u8]) -> Option<ReqHeader> {
    if payload.len() < REQ_HEADER_LEN {
        return None;
    }
    Some(ReqHeader {
        seq: payload.get_u64_le(),
        client_send_mono_ns: payload.get_u64_le(),
    })
}

pub(crate) fn parse_ack_payload(mut payload: &[u8]) -> Option<AckHeader> {
    if payload.len() < ACK_HEADER_LEN {
        return None;
    }
    Some(AckHeader {
        seq: payload.get_u64_le(),
        server_recv_mono_ns: payload.get_u64_le(),
        server_send_mono_ns: payload.get_u64_le(),
    })
}
