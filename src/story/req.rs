use crate::call::{CallRef, Value};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
/// Comparison operator of a requirement leaf.
///
/// `>=` and `<=` never appear here: the parser normalizes them to strict
/// comparisons by adjusting the integer operand by one.
pub enum Compare {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
/// Unit of a `repeat` requirement's waiting period.
pub enum RepeatUnit {
    Months,
    Seasons,
    Years,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Right-hand operand of a `call_` requirement leaf.
pub enum CallOperand {
    /// Compare against a literal bool, int or string.
    Literal(Value),
    /// Compare against the result of another call, evaluated per check.
    Call(CallRef),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// What a `season` requirement compares the current date against.
pub enum SeasonTarget {
    /// The season's id, e.g. `pollen`.
    Name(String),
    /// An exact month of the year, e.g. `pollen-2`.
    MonthOfYear(i32),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// A boolean condition gating a choice, effect, jump or text block.
pub struct Requirement {
    pub kind: RequirementKind,
    /// When the requirement fails, show the choice disabled instead of
    /// hiding it (`~ifd`). Only consulted on choice requirements.
    pub show_disabled: bool,
    /// Original expression text for diagnostics.
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// The evaluated variants of a [`Requirement`].
///
/// `All` and `Any` hold sub-requirements; everything else is a leaf
/// carrying exactly the data its comparison needs.
pub enum RequirementKind {
    /// Every sub-requirement must pass (`&&`).
    All(Vec<Requirement>),
    /// At least one sub-requirement must pass (`||`).
    Any(Vec<Requirement>),
    /// Compare a session memory (`mem_`).
    Memory {
        key: String,
        cmp: Compare,
        value: Value,
    },
    /// Compare a per-story-execution var (`var_`).
    Var {
        key: String,
        cmp: Compare,
        value: Value,
    },
    /// Compare a permanent groundhog (`hog_`).
    Groundhog {
        key: String,
        cmp: Compare,
        value: Value,
    },
    /// Compare how many months ago a story last executed (`story_`).
    ///
    /// `-1` encodes "never"; the parser turns `= true` into `> -1` and
    /// `= false` into `< 0`.
    StoryDone {
        id: String,
        cmp: Compare,
        months: i32,
    },
    /// The story may run again after a waiting period (`repeat`).
    ///
    /// Always true during requirement evaluation; the story-level execute
    /// gate applies the waiting period against the ledger.
    Repeat { unit: RepeatUnit, count: i32 },
    /// Compare a call result against a literal or another call (`call_`).
    Call {
        call: CallRef,
        cmp: Compare,
        operand: CallOperand,
    },
    /// Weighted pseudo-random selection among sibling choices (`random`).
    Random {
        weight: i32,
        /// `random!`: ignore the deterministic month seed.
        unseeded: bool,
    },
    /// Compare the current age in years (`age`).
    Age { cmp: Compare, value: i32 },
    /// Compare the current month of the game (`month`).
    Month { cmp: Compare, value: i32 },
    /// Compare the current season or month-of-year (`season`).
    Season { cmp: Compare, target: SeasonTarget },
    /// Compare the host-maintained biome id (`biome`).
    Biome { id: String, cmp: Compare },
    /// Check a host-maintained status flag (`status`).
    Status { id: String, cmp: Compare },
}

impl Requirement {
    pub(crate) fn new(kind: RequirementKind, source: String) -> Self {
        Requirement {
            kind,
            show_disabled: false,
            source,
        }
    }

    /// Depth-first search for a leaf of the same variant as `probe`.
    ///
    /// Only `All`/`Any` nodes are descended into.
    pub(crate) fn find_kind<F>(&self, probe: &F) -> Option<&Requirement>
    where
        F: Fn(&RequirementKind) -> bool,
    {
        if probe(&self.kind) {
            return Some(self);
        }

        match &self.kind {
            RequirementKind::All(subs) | RequirementKind::Any(subs) => {
                subs.iter().find_map(|sub| sub.find_kind(probe))
            }
            _ => None,
        }
    }

    /// Whether any nested sub-requirement is a `random` leaf.
    pub(crate) fn has_nested_random(&self) -> bool {
        match &self.kind {
            RequirementKind::All(subs) | RequirementKind::Any(subs) => subs
                .iter()
                .any(|sub| matches!(sub.kind, RequirementKind::Random { .. }) || sub.has_nested_random()),
            _ => false,
        }
    }
}
