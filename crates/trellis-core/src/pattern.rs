//! Routing pattern parser
//!
//! A pattern is a path made of static text, named parameters (`{id}`),
//! regexp-constrained parameters (`{id:[0-9]+}`) and an optional trailing
//! catch-all (`*`). The parser walks a pattern one wild segment at a time;
//! everything between wild segments is static text.
//!
//! ```text
//! /users/{id}/files/*
//! ^^^^^^^             static
//!        ^^^^         param "id", tail '/'
//!            ^^^^^^^  static
//!                   ^ catch-all "*"
//! ```

use crate::error::RouteError;
use regex::Regex;

/// Kind of a routing segment, ordered by lookup precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Static = 0,
    Regexp = 1,
    Param = 2,
    CatchAll = 3,
}

impl NodeKind {
    pub(crate) const COUNT: usize = 4;

    pub(crate) const ALL: [NodeKind; NodeKind::COUNT] = [
        NodeKind::Static,
        NodeKind::Regexp,
        NodeKind::Param,
        NodeKind::CatchAll,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_wild(self) -> bool {
        self != NodeKind::Static
    }
}

/// Key under which the catch-all remainder is stored.
pub const CATCH_ALL_KEY: &str = "*";

/// The next wild segment of a pattern.
///
/// For a pattern with no wild segment left, `kind` is [`NodeKind::Static`]
/// and the segment spans the whole input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'p> {
    pub kind: NodeKind,
    /// Parameter name. `"*"` for a catch-all, empty for static text.
    pub key: &'p str,
    /// Anchored regexp source for [`NodeKind::Regexp`].
    pub regex: Option<String>,
    /// Byte that terminates the parameter value. `b'/'` unless the pattern
    /// continues with something else right after the closing brace, `0` for
    /// catch-all and static segments.
    pub tail: u8,
    /// Offset of the segment start in the input.
    pub start: usize,
    /// Offset just past the segment end in the input.
    pub end: usize,
}

impl<'p> Segment<'p> {
    /// Parse the next wild segment of `pattern`.
    pub fn next(pattern: &'p str) -> Result<Segment<'p>, RouteError> {
        let ps = pattern.find('{');
        let ws = pattern.find('*');

        let (ps, ws) = match (ps, ws) {
            (None, None) => {
                return Ok(Segment {
                    kind: NodeKind::Static,
                    key: "",
                    regex: None,
                    tail: 0,
                    start: 0,
                    end: pattern.len(),
                })
            }
            other => other,
        };

        if let (Some(ps), Some(ws)) = (ps, ws) {
            if ws < ps {
                return Err(RouteError::WildcardNotLast(pattern.to_string()));
            }
        }

        if let Some(ps) = ps {
            return Self::param(pattern, ps);
        }

        let ws = ws.unwrap_or_default();
        if ws + 1 < pattern.len() {
            return Err(RouteError::WildcardNotLast(pattern.to_string()));
        }

        Ok(Segment {
            kind: NodeKind::CatchAll,
            key: CATCH_ALL_KEY,
            regex: None,
            tail: 0,
            start: ws,
            end: pattern.len(),
        })
    }

    fn param(pattern: &'p str, ps: usize) -> Result<Segment<'p>, RouteError> {
        // Braces may nest inside a regexp, e.g. `{id:[0-9]{3}}`.
        let mut depth = 0usize;
        let mut close = None;
        for (i, b) in pattern.bytes().enumerate().skip(ps) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let pe = close.ok_or_else(|| RouteError::UnclosedParam(pattern.to_string()))?;
        let inner = &pattern[ps + 1..pe];
        let end = pe + 1;
        let tail = pattern.as_bytes().get(end).copied().unwrap_or(b'/');

        let (key, regex) = match inner.split_once(':') {
            Some((key, rex)) => (key, Some(rex)),
            None => (inner, None),
        };

        if key.is_empty() {
            return Err(RouteError::EmptyParamName(pattern.to_string()));
        }

        let (kind, regex) = match regex {
            Some(rex) if rex.is_empty() => {
                return Err(RouteError::InvalidRegex {
                    pattern: pattern.to_string(),
                    reason: "empty regexp".to_string(),
                })
            }
            Some(rex) => (NodeKind::Regexp, Some(anchor(rex))),
            None => (NodeKind::Param, None),
        };

        Ok(Segment {
            kind,
            key,
            regex,
            tail,
            start: ps,
            end,
        })
    }
}

fn anchor(rex: &str) -> String {
    let mut out = String::with_capacity(rex.len() + 2);
    if !rex.starts_with('^') {
        out.push('^');
    }
    out.push_str(rex);
    if !rex.ends_with('$') {
        out.push('$');
    }
    out
}

/// Compile an anchored regexp source taken from `pattern`.
pub(crate) fn compile_regex(source: &str, pattern: &str) -> Result<Regex, RouteError> {
    Regex::new(source).map_err(|err| RouteError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

/// List the parameter names of `pattern` in order of appearance.
///
/// This also fully validates the pattern, including compiling every regexp
/// constraint, so a pattern accepted here can be inserted without error.
pub fn param_keys(pattern: &str) -> Result<Vec<&str>, RouteError> {
    let mut keys: Vec<&str> = Vec::new();
    let mut rest = pattern;
    loop {
        let seg = Segment::next(rest)?;
        if seg.kind == NodeKind::Static {
            return Ok(keys);
        }
        if let Some(rex) = &seg.regex {
            compile_regex(rex, pattern)?;
        }
        if keys.contains(&seg.key) {
            return Err(RouteError::DuplicateParam {
                pattern: pattern.to_string(),
                key: seg.key.to_string(),
            });
        }
        keys.push(seg.key);
        rest = &rest[seg.end..];
    }
}
