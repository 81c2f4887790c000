//! Request parameter types: direction, fanout and per-type parameter maps.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which incident edges of a seed are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDir {
    /// Edges leaving the seed (seed is the source).
    Out,
    /// Edges entering the seed (seed is the destination).
    In,
}

impl EdgeDir {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
        }
    }
}

impl fmt::Display for EdgeDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeDir {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "out" | "outgoing" => Ok(Self::Out),
            "in" | "incoming" => Ok(Self::In),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Per-seed edge budget for one edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fanout {
    /// Every incident edge (`-1`).
    All,
    /// At most / exactly this many, depending on the policy. `Count(0)` samples nothing.
    Count(usize),
}

impl Fanout {
    pub const NONE: Fanout = Fanout::Count(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl TryFrom<i64> for Fanout {
    type Error = Error;

    fn try_from(v: i64) -> Result<Self> {
        match v {
            -1 => Ok(Self::All),
            n if n >= 0 => usize::try_from(n)
                .map(Self::Count)
                .map_err(|_| Error::InvalidFanout(v)),
            _ => Err(Error::InvalidFanout(v)),
        }
    }
}

impl From<usize> for Fanout {
    fn from(n: usize) -> Self {
        Self::Count(n)
    }
}

/// Parameters keyed by vertex-type or edge-type index.
///
/// Built from a dense `Vec` (position = type) or entry by entry; checked for
/// completeness with [`PerType::complete`] before any sampling starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PerType<T> {
    entries: BTreeMap<usize, T>,
}

impl<T> Default for PerType<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> PerType<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same value for types `0..count`.
    pub fn uniform(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        (0..count).map(|t| (t, value.clone())).collect()
    }

    pub fn insert(&mut self, ty: usize, value: T) -> Option<T> {
        self.entries.insert(ty, value)
    }

    pub fn with(mut self, ty: usize, value: T) -> Self {
        self.entries.insert(ty, value);
        self
    }

    pub fn get(&self, ty: usize) -> Option<&T> {
        self.entries.get(&ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().map(|(&k, v)| (k, v))
    }

    /// Dense view over types `0..count`.
    ///
    /// `what` names the parameter and `per` the kind of type (`"node"` or
    /// `"edge"`) in the error message.
    pub fn complete(&self, count: usize, what: &'static str, per: &'static str) -> Result<Vec<&T>> {
        if self.entries.len() != count {
            return Err(Error::ShapeMismatch {
                what,
                per,
                expected: count,
                got: self.entries.len(),
            });
        }
        (0..count)
            .map(|ty| self.entries.get(&ty).ok_or(Error::MissingType { what, ty }))
            .collect()
    }
}

impl<T> From<Vec<T>> for PerType<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().enumerate().collect()
    }
}

impl<T> FromIterator<(usize, T)> for PerType<T> {
    fn from_iter<I: IntoIterator<Item = (usize, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
