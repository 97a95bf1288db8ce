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

//! Hierarchical key expressions with single-level (`*`) and multi-level (`**`) wildcards.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const SEPARATOR: char = '/';
const SINGLE_WILD: &str = "*";
const MULTI_WILD: &str = "**";
const RESERVED_CHARS: [char; 3] = ['#', '?', '$'];

/// One `/`-delimited chunk of a [`KeyExpr`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    Literal(Arc<str>),
    /// `*`: exactly one segment.
    SingleWild,
    /// `**`: zero or more segments.
    MultiWild,
}

impl Segment {
    fn parse(key_expr: &str, chunk: &str) -> Result<Self> {
        if chunk.is_empty() {
            return Err(Error::invalid_key_expr(key_expr, "empty segment"));
        }
        if let Some(bad) = chunk
            .chars()
            .find(|ch| RESERVED_CHARS.contains(ch) || ch.is_control() || ch.is_whitespace())
        {
            return Err(Error::invalid_key_expr(
                key_expr,
                format!("segment '{chunk}' contains disallowed character {bad:?}"),
            ));
        }

        match chunk {
            SINGLE_WILD => Ok(Segment::SingleWild),
            MULTI_WILD => Ok(Segment::MultiWild),
            _ if chunk.contains('*') => Err(Error::invalid_key_expr(
                key_expr,
                format!("malformed wildcard segment '{chunk}': '*' and '**' must stand alone"),
            )),
            _ => Ok(Segment::Literal(Arc::from(chunk))),
        }
    }

    pub fn is_wild(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }

    fn matches_one(&self, literal: &Segment) -> bool {
        match (self, literal) {
            (Segment::SingleWild, _) => true,
            (Segment::Literal(pattern), Segment::Literal(chunk)) => pattern == chunk,
            _ => false,
        }
    }
}

/// Parsed, immutable key expression such as `demo/zenoh/getting-started` or `demo/*/bench/**`.
///
/// Cloning is cheap; the canonical string and the segments are shared.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct KeyExpr {
    repr: Arc<str>,
    segments: Arc<[Segment]>,
}

impl KeyExpr {
    /// Parses a key expression, wildcards allowed.
    pub fn parse(key_expr: &str) -> Result<Self> {
        if key_expr.is_empty() {
            return Err(Error::invalid_key_expr(key_expr, "key expression is empty"));
        }

        let segments = key_expr
            .split(SEPARATOR)
            .map(|chunk| Segment::parse(key_expr, chunk))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            repr: Arc::from(key_expr),
            segments: segments.into(),
        })
    }

    /// Parses a key expression that must be usable as a publish key (no wildcards).
    pub fn literal(key_expr: &str) -> Result<Self> {
        let parsed = Self::parse(key_expr)?;
        parsed.ensure_literal()?;
        Ok(parsed)
    }

    pub(crate) fn ensure_literal(&self) -> Result<()> {
        if self.is_wild() {
            return Err(Error::invalid_key_expr(
                self.as_str(),
                "wildcards are not allowed in publish keys",
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_wild(&self) -> bool {
        self.segments.iter().any(Segment::is_wild)
    }

    /// Returns `true` when `literal` is one of the keys described by this pattern.
    ///
    /// `*` consumes exactly one segment of `literal`, `**` consumes zero or more. Wildcards on
    /// the `literal` side never match anything but the identical wildcard.
    pub fn matches(&self, literal: &KeyExpr) -> bool {
        matches(self, literal)
    }
}

/// Segment-wise match of `pattern` against `literal`.
///
/// Two-cursor walk that remembers the most recent `**` and, on a mismatch, lets it absorb one
/// more literal segment before retrying. Runs in O(|pattern| * |literal|) worst case.
pub fn matches(pattern: &KeyExpr, literal: &KeyExpr) -> bool {
    let pattern = pattern.segments();
    let literal = literal.segments();

    let (mut p, mut l) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while l < literal.len() {
        match pattern.get(p) {
            Some(Segment::MultiWild) => {
                backtrack = Some((p, l));
                p += 1;
            }
            Some(segment) if segment.matches_one(&literal[l]) => {
                p += 1;
                l += 1;
            }
            _ => match backtrack {
                Some((star_p, star_l)) => {
                    p = star_p + 1;
                    l = star_l + 1;
                    backtrack = Some((star_p, star_l + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..]
        .iter()
        .all(|segment| matches!(segment, Segment::MultiWild))
}

impl fmt::Display for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl fmt::Debug for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyExpr({})", self.repr)
    }
}

impl FromStr for KeyExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyExpr {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for KeyExpr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl AsRef<str> for KeyExpr {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyExpr, Segment};

    fn key(s: &str) -> KeyExpr {
        KeyExpr::parse(s).expect("valid key expression")
    }

    fn assert_matches(pattern: &str, literal: &str) {
        assert!(
            key(pattern).matches(&key(literal)),
            "expected '{pattern}' to match '{literal}'"
        );
    }

    fn assert_no_match(pattern: &str, literal: &str) {
        assert!(
            !key(pattern).matches(&key(literal)),
            "expected '{pattern}' not to match '{literal}'"
        );
    }

    #[test]
    fn parse_splits_segments_and_keeps_canonical_string() {
        let parsed = key("demo/*/bench/**");
        assert_eq!(parsed.as_str(), "demo/*/bench/**");
        assert_eq!(parsed.to_string(), "demo/*/bench/**");
        assert_eq!(
            parsed.segments(),
            &[
                Segment::Literal("demo".into()),
                Segment::SingleWild,
                Segment::Literal("bench".into()),
                Segment::MultiWild,
            ]
        );
        assert!(parsed.is_wild());
        assert!(!key("demo/zenoh/getting-started").is_wild());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        for bad in ["", "/a", "a/", "a//b", "/"] {
            let err = KeyExpr::parse(bad).unwrap_err();
            assert!(err.is_invalid_key_expr(), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn parse_rejects_disallowed_characters() {
        for bad in ["a/b#c", "a/?", "a/$x", "a/b c", "a/b\tc"] {
            assert!(
                KeyExpr::parse(bad).unwrap_err().is_invalid_key_expr(),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_wildcards_that_do_not_stand_alone() {
        for bad in ["a*", "a/b*", "a/**b", "***", "a/*x*/c"] {
            let err = KeyExpr::parse(bad).unwrap_err();
            assert!(err.to_string().contains("must stand alone"), "{err}");
        }
    }

    #[test]
    fn literal_rejects_wildcards() {
        assert!(KeyExpr::literal("a/*").unwrap_err().is_invalid_key_expr());
        assert!(KeyExpr::literal("**").unwrap_err().is_invalid_key_expr());
        assert!(KeyExpr::literal("a/b").is_ok());
    }

    #[test]
    fn single_wild_consumes_exactly_one_segment() {
        assert_matches("a/*/c", "a/x/c");
        assert_no_match("a/*/c", "a/x/y/c");
        assert_no_match("a/*/c", "a/c");
        assert_matches("*", "a");
        assert_no_match("*", "a/b");
    }

    #[test]
    fn multi_wild_in_the_middle_backtracks() {
        assert_matches("a/**/c", "a/c");
        assert_matches("a/**/c", "a/x/c");
        assert_matches("a/**/c", "a/x/y/c");
        assert_matches("a/**/c", "a/c/c/c");
        assert_no_match("a/**/c", "a/x/y");
        assert_matches("a/**/b/*/d", "a/x/b/y/b/z/d");
    }

    #[test]
    fn multi_wild_at_the_end_matches_zero_or_more() {
        assert_matches("a/**", "a");
        assert_matches("a/**", "a/x");
        assert_matches("a/**", "a/x/y");
        assert_no_match("a/**", "b/x");
    }

    #[test]
    fn multi_wild_at_the_start() {
        assert_matches("**", "a");
        assert_matches("**", "a/b/c");
        assert_matches("**/c", "c");
        assert_matches("**/c", "a/b/c");
        assert_no_match("**/c", "a/b/d");
        assert_matches("**/*", "a/b");
    }

    #[test]
    fn literal_patterns_require_exact_equality() {
        assert_matches("demo/zenoh/getting-started", "demo/zenoh/getting-started");
        assert_no_match("demo/zenoh", "demo/zenoh/getting-started");
        assert_no_match("demo/zenoh/getting-started", "demo/zenoh");
    }

    #[test]
    fn matching_is_deterministic() {
        let pattern = key("a/**/c/*");
        let literal = key("a/x/c/y/c/z");
        let first = pattern.matches(&literal);
        for _ in 0..100 {
            assert_eq!(pattern.matches(&literal), first);
        }
        assert!(first);
    }
}
