// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Std-stream redirect policy for worker processes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which std streams of a worker are redirected to files.
///
/// `All` is `Out` and `Err` combined; the numeric codes (0..3) match the
/// launcher flag syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Std {
    #[default]
    None,
    Out,
    Err,
    All,
}

crate::simple_display! {
    Std {
        None => "none",
        Out => "out",
        Err => "err",
        All => "all",
    }
}

impl Std {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Std::None),
            1 => Some(Std::Out),
            2 => Some(Std::Err),
            3 => Some(Std::All),
            _ => None,
        }
    }

    /// Whether stdout is included in this setting.
    pub fn includes_out(self) -> bool {
        matches!(self, Std::Out | Std::All)
    }

    /// Whether stderr is included in this setting.
    pub fn includes_err(self) -> bool {
        matches!(self, Std::Err | Std::All)
    }

    /// Combine two settings (union of streams).
    pub fn union(self, other: Std) -> Std {
        match (self.includes_out() || other.includes_out(), self.includes_err() || other.includes_err()) {
            (true, true) => Std::All,
            (true, false) => Std::Out,
            (false, true) => Std::Err,
            (false, false) => Std::None,
        }
    }
}

/// A redirect setting: one value for every local rank, or a per-rank map.
///
/// Ranks absent from a per-rank map default to [`Std::None`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdSpec {
    Single(Std),
    PerRank(HashMap<usize, Std>),
}

impl Default for StdSpec {
    fn default() -> Self {
        StdSpec::Single(Std::None)
    }
}

/// Parse failure for a redirect flag value.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} does not match a single 0..3 value or a <rank>:<0..3>,... mapping")]
pub struct StdParseError(pub String);

impl FromStr for StdSpec {
    type Err = StdParseError;

    /// Accepts either a single value (`"2"`) or a per-rank mapping
    /// (`"0:3,1:0,2:1"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || StdParseError(s.to_string());

        if !s.contains(':') {
            let code: u8 = s.parse().map_err(|_| err())?;
            return Std::from_code(code).map(StdSpec::Single).ok_or_else(err);
        }

        let mut map = HashMap::new();
        for part in s.split(',') {
            let (rank, code) = part.split_once(':').ok_or_else(err)?;
            let rank: usize = rank.parse().map_err(|_| err())?;
            let code: u8 = code.parse().map_err(|_| err())?;
            map.insert(rank, Std::from_code(code).ok_or_else(err)?);
        }
        Ok(StdSpec::PerRank(map))
    }
}

impl StdSpec {
    /// Normalize into an explicit per-rank map of size `local_world_size`.
    pub fn to_map(&self, local_world_size: usize) -> HashMap<usize, Std> {
        match self {
            StdSpec::Single(std) => (0..local_world_size).map(|i| (i, *std)).collect(),
            StdSpec::PerRank(map) => (0..local_world_size)
                .map(|i| (i, map.get(&i).copied().unwrap_or(Std::None)))
                .collect(),
        }
    }
}

impl fmt::Display for StdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdSpec::Single(std) => write!(f, "{std}"),
            StdSpec::PerRank(map) => {
                let mut ranks: Vec<usize> = map.keys().copied().collect();
                ranks.sort_unstable();
                let parts: Vec<String> =
                    ranks.iter().map(|rank| format!("{rank}:{}", map[rank])).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

#[cfg(test)]
#[path = "std_stream_tests.rs"]
mod tests;
