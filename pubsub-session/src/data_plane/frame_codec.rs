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

//! Frame layout used for samples exchanged over a transport.
//!
//! Little endian: `u8 version | u16 key_len | key | i64 timestamp_micros | u32 payload_len | payload`.

use crate::routing::key_expr::KeyExpr;
use crate::sample::Sample;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::DateTime;
use thiserror::Error;

pub(crate) const FRAME_VERSION: u8 = 1;
const FIXED_LEN: usize = 1 + 2 + 8 + 4;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum FrameError {
    #[error("frame truncated: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid key in frame: {0}")]
    InvalidKey(String),
    #[error("timestamp {0}us is out of range")]
    InvalidTimestamp(i64),
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    #[error("key of {0} bytes does not fit in a frame")]
    KeyTooLong(usize),
    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),
}

fn ensure_remaining(frame: &Bytes, needed: usize) -> Result<(), FrameError> {
    if frame.remaining() < needed {
        return Err(FrameError::Truncated {
            needed,
            remaining: frame.remaining(),
        });
    }
    Ok(())
}

pub(crate) fn encode_sample(sample: &Sample) -> Result<Bytes, FrameError> {
    let key = sample.key_expr().as_str().as_bytes();
    let key_len = u16::try_from(key.len()).map_err(|_| FrameError::KeyTooLong(key.len()))?;
    let payload = sample.payload();
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| FrameError::PayloadTooLarge(payload.len()))?;

    let mut frame = BytesMut::with_capacity(FIXED_LEN + key.len() + payload.len());
    frame.put_u8(FRAME_VERSION);
    frame.put_u16_le(key_len);
    frame.put_slice(key);
    frame.put_i64_le(sample.timestamp().timestamp_micros());
    frame.put_u32_le(payload_len);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

pub(crate) fn decode_sample(mut frame: Bytes) -> Result<Sample, FrameError> {
    ensure_remaining(&frame, 3)?;
    let version = frame.get_u8();
    if version != FRAME_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }

    let key_len = usize::from(frame.get_u16_le());
    ensure_remaining(&frame, key_len)?;
    let key_bytes = frame.split_to(key_len);
    let key = std::str::from_utf8(&key_bytes)
        .map_err(|err| FrameError::InvalidKey(err.to_string()))?;
    let key_expr = KeyExpr::literal(key).map_err(|err| FrameError::InvalidKey(err.to_string()))?;

    ensure_remaining(&frame, 8 + 4)?;
    let micros = frame.get_i64_le();
    let timestamp =
        DateTime::from_timestamp_micros(micros).ok_or(FrameError::InvalidTimestamp(micros))?;

    let payload_len = frame.get_u32_le() as usize;
    ensure_remaining(&frame, payload_len)?;
    let payload = frame.split_to(payload_len);

    if frame.has_remaining() {
        return Err(FrameError::TrailingBytes(frame.remaining()));
    }

    Ok(Sample::with_timestamp(key_expr, payload, timestamp))
}

#[cfg(test)]
mod tests {
    use super::{decode_sample, encode_sample, FrameError, FRAME_VERSION};
    use crate::{KeyExpr, Sample};
    use bytes::{BufMut, Bytes, BytesMut};
    use chrono::{TimeZone, Utc};

    fn sample(key: &str, payload: &'static str) -> Sample {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        Sample::with_timestamp(KeyExpr::literal(key).unwrap(), payload, timestamp)
    }

    #[test]
    fn encoded_frame_has_expected_layout() {
        let frame = encode_sample(&sample("a/b", "hi")).unwrap();
        assert_eq!(frame[0], FRAME_VERSION);
        assert_eq!(&frame[1..3], &3u16.to_le_bytes());
        assert_eq!(&frame[3..6], b"a/b");
        assert_eq!(
            &frame[6..14],
            &1_700_000_000_123_456i64.to_le_bytes()
        );
        assert_eq!(&frame[14..18], &2u32.to_le_bytes());
        assert_eq!(&frame[18..], b"hi");
    }

    #[test]
    fn decode_restores_key_payload_and_timestamp() {
        let original = sample("demo/zenoh/getting-started", "Hello from Rust #3");
        let decoded = decode_sample(encode_sample(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_truncated_frames() {
        let frame = encode_sample(&sample("a/b", "payload")).unwrap();
        let truncated = frame.slice(..frame.len() - 1);
        assert!(matches!(
            decode_sample(truncated),
            Err(FrameError::Truncated { .. })
        ));
        assert!(matches!(
            decode_sample(Bytes::from_static(&[FRAME_VERSION])),
            Err(FrameError::Truncated {
                needed: 3,
                remaining: 1
            })
        ));
    }

    #[test]
    fn decode_rejects_unknown_version_and_trailing_bytes() {
        let frame = encode_sample(&sample("a", "x")).unwrap();

        let mut wrong_version = BytesMut::from(&frame[..]);
        wrong_version[0] = 9;
        assert_eq!(
            decode_sample(wrong_version.freeze()),
            Err(FrameError::UnsupportedVersion(9))
        );

        let mut trailing = BytesMut::from(&frame[..]);
        trailing.put_u8(0);
        assert_eq!(
            decode_sample(trailing.freeze()),
            Err(FrameError::TrailingBytes(1))
        );
    }

    #[test]
    fn decode_rejects_wildcard_keys() {
        let mut frame = BytesMut::new();
        frame.put_u8(FRAME_VERSION);
        frame.put_u16_le(3);
        frame.put_slice(b"a/*");
        frame.put_i64_le(0);
        frame.put_u32_le(0);
        assert!(matches!(
            decode_sample(frame.freeze()),
            Err(FrameError::InvalidKey(_))
        ));
    }
}
