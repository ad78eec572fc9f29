//! Filter state: the complete set of active inclusion predicates.
//!
//! Storage is one fixed slot per dimension, so "inactive" is always an empty
//! set and never a missing key. All mutation goes through named operations,
//! each of which bumps `generation` only when something actually changed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::dates::{format_filter_date, parse_filter_date, DateRange};
use super::dimension::{CategoricalDimension, Dimension, RangeDimension};
use crate::error::JournalError;

/// Non-set dimensions, replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingleValue {
    Win(Option<bool>),
    DateRange(DateRange),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    categorical: [BTreeSet<String>; CategoricalDimension::COUNT],
    ranges: [BTreeSet<String>; RangeDimension::COUNT],
    is_win: Option<bool>,
    date_range: DateRange,
    generation: u64,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            categorical: std::array::from_fn(|_| BTreeSet::new()),
            ranges: std::array::from_fn(|_| BTreeSet::new()),
            is_win: None,
            date_range: DateRange::all(),
            generation: 0,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categorical(&self, dimension: CategoricalDimension) -> &BTreeSet<String> {
        &self.categorical[dimension.index()]
    }

    pub fn ranges(&self, dimension: RangeDimension) -> &BTreeSet<String> {
        &self.ranges[dimension.index()]
    }

    pub fn selected(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Categorical(d) => self.categorical(d),
            Dimension::Range(d) => self.ranges(d),
        }
    }

    pub fn is_win(&self) -> Option<bool> {
        self.is_win
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Incremented on every effective mutation; never decreases.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Add `value` to the dimension's selection, or remove it if already present.
    ///
    /// Range dimensions only accept labels from their bucket catalog.
    pub fn toggle(&mut self, dimension: impl Into<Dimension>, value: &str) -> Result<(), JournalError> {
        let dimension = dimension.into();
        let set = match dimension {
            Dimension::Categorical(d) => {
                check_categorical_value(d, value)?;
                &mut self.categorical[d.index()]
            }
            Dimension::Range(d) => {
                if d.bucket(value).is_none() {
                    return Err(JournalError::InvalidFilter(format!(
                        "Unknown bucket '{}' for {}",
                        value, d
                    )));
                }
                &mut self.ranges[d.index()]
            }
        };

        if !set.remove(value) {
            set.insert(value.to_string());
        }
        self.generation += 1;
        Ok(())
    }

    pub fn set_single_value(&mut self, value: SingleValue) -> Result<(), JournalError> {
        if let SingleValue::DateRange(range) = value {
            DateRange::new(range.start, range.end)?;
        }
        let changed = match value {
            SingleValue::Win(is_win) => std::mem::replace(&mut self.is_win, is_win) != is_win,
            SingleValue::DateRange(range) => std::mem::replace(&mut self.date_range, range) != range,
        };
        if changed {
            self.generation += 1;
        }
        Ok(())
    }

    /// Restore every dimension to its inactive default.
    pub fn reset(&mut self) {
        if !self.is_any_active() {
            return;
        }
        self.categorical.iter_mut().for_each(BTreeSet::clear);
        self.ranges.iter_mut().for_each(BTreeSet::clear);
        self.is_win = None;
        self.date_range = DateRange::all();
        self.generation += 1;
    }

    /// Take over every dimension of `other`, keeping this state's generation
    /// history monotonic.
    pub fn assign(&mut self, other: &FilterState) {
        if self.same_selection(other) {
            return;
        }
        self.categorical = other.categorical.clone();
        self.ranges = other.ranges.clone();
        self.is_win = other.is_win;
        self.date_range = other.date_range;
        self.generation += 1;
    }

    fn same_selection(&self, other: &FilterState) -> bool {
        self.categorical == other.categorical
            && self.ranges == other.ranges
            && self.is_win == other.is_win
            && self.date_range == other.date_range
    }

    pub fn is_any_active(&self) -> bool {
        self.categorical.iter().any(|s| !s.is_empty())
            || self.ranges.iter().any(|s| !s.is_empty())
            || self.is_win.is_some()
            || !self.date_range.is_all()
    }

    /// Plain description for observers: sets become sorted lists, dates become text.
    pub fn serialize(&self) -> SerializedFilterState {
        let categories = CategoricalDimension::ALL
            .into_iter()
            .map(|d| (d.key().to_string(), self.categorical(d).iter().cloned().collect()))
            .collect();
        let ranges = RangeDimension::ALL
            .into_iter()
            .map(|d| (d.key().to_string(), self.ranges(d).iter().cloned().collect()))
            .collect();

        SerializedFilterState {
            categories,
            ranges,
            is_win: self.is_win,
            start_date: format_filter_date(self.date_range.start),
            end_date: format_filter_date(self.date_range.end),
        }
    }

    /// Rebuild a state from its serialized description.
    ///
    /// Keys missing from the description are inactive; unknown keys, unknown
    /// bucket labels and malformed dates are rejected.
    pub fn from_serialized(serialized: &SerializedFilterState) -> Result<Self, JournalError> {
        let mut state = Self::new();

        for (key, values) in &serialized.categories {
            let dimension: CategoricalDimension = key.parse()?;
            for value in values {
                check_categorical_value(dimension, value)?;
                state.categorical[dimension.index()].insert(value.clone());
            }
        }

        for (key, labels) in &serialized.ranges {
            let dimension: RangeDimension = key.parse()?;
            for label in labels {
                if dimension.bucket(label).is_none() {
                    return Err(JournalError::InvalidFilter(format!(
                        "Unknown bucket '{}' for {}",
                        label, dimension
                    )));
                }
                state.ranges[dimension.index()].insert(label.clone());
            }
        }

        state.is_win = serialized.is_win;
        state.date_range = DateRange::new(
            parse_filter_date(&serialized.start_date)?,
            parse_filter_date(&serialized.end_date)?,
        )?;

        Ok(state)
    }
}

/// Transmissible form of [`FilterState`]. Every dimension key is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedFilterState {
    pub categories: BTreeMap<String, Vec<String>>,
    pub ranges: BTreeMap<String, Vec<String>>,
    pub is_win: Option<bool>,
    pub start_date: String,
    pub end_date: String,
}

// A blank selection could never match, since blank trade values read as absent.
fn check_categorical_value(dimension: CategoricalDimension, value: &str) -> Result<(), JournalError> {
    if value.trim().is_empty() {
        return Err(JournalError::InvalidFilter(format!("Blank value for {}", dimension)));
    }
    Ok(())
}
