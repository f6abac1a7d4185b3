// file: src/models/series.rs
// description: time-indexed multi-column series with merge and regularization
// reference: internal data structures

use crate::error::{DatastoreError, Result};
use crate::models::frequency::Frequency;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl Observation {
    pub fn new(time: NaiveDateTime, values: Vec<Option<f64>>) -> Self {
        Self { time, values }
    }

    fn is_missing(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

/// Rows are kept sorted by time. Duplicate stamps are allowed until
/// [`TimeSeries::dedup_keep_first`] or [`TimeSeries::regularize`] is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    columns: Vec<String>,
    rows: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, mut rows: Vec<Observation>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.values.len() != columns.len()) {
            return Err(DatastoreError::Validation(format!(
                "Row at {} has {} values but series has {} columns",
                bad.time,
                bad.values.len(),
                columns.len()
            )));
        }
        rows.sort_by_key(|r| r.time);
        Ok(Self { columns, rows })
    }

    /// Convenience constructor for a single column.
    pub fn univariate(name: &str, points: Vec<(NaiveDateTime, Option<f64>)>) -> Self {
        let mut rows: Vec<Observation> = points
            .into_iter()
            .map(|(time, value)| Observation::new(time, vec![value]))
            .collect();
        rows.sort_by_key(|r| r.time);
        Self {
            columns: vec![name.to_string()],
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn times(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.time).collect()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.rows.first().map(|r| r.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.rows.last().map(|r| r.time)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Rows with `start <= time <= end`; open bounds when `None`.
    pub fn slice(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|r| start.is_none_or(|s| r.time >= s) && end.is_none_or(|e| r.time <= e))
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn select(&self, names: &[String]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| DatastoreError::NotFound {
                    kind: "column",
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|r| Observation::new(r.time, indices.iter().map(|&i| r.values[i]).collect()))
            .collect();

        Ok(Self {
            columns: names.to_vec(),
            rows,
        })
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.values.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Collapses all columns to their row-wise mean over non-missing values.
    pub fn mean_columns(&self, name: &str) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let present: Vec<f64> = r.values.iter().flatten().copied().collect();
                let mean = if present.is_empty() {
                    None
                } else {
                    Some(present.iter().sum::<f64>() / present.len() as f64)
                };
                Observation::new(r.time, vec![mean])
            })
            .collect();
        Self {
            columns: vec![name.to_string()],
            rows,
        }
    }

    pub fn rename_columns(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(DatastoreError::Validation(format!(
                "Cannot rename {} columns with {} names",
                self.columns.len(),
                names.len()
            )));
        }
        self.columns = names;
        Ok(())
    }

    /// Sets every value column in rows matching `predicate` to missing,
    /// leaving the columns listed in `keep` untouched.
    pub fn mask_rows<F>(&mut self, keep: &[usize], predicate: F)
    where
        F: Fn(&Observation) -> bool,
    {
        for row in &mut self.rows {
            if predicate(row) {
                for (idx, value) in row.values.iter_mut().enumerate() {
                    if !keep.contains(&idx) {
                        *value = None;
                    }
                }
            }
        }
    }

    /// Drops rows whose stamp repeats an earlier row.
    pub fn dedup_keep_first(&mut self) {
        self.rows.dedup_by(|later, earlier| later.time == earlier.time);
    }

    /// Priority merge: earlier series win and later series fill their gaps
    /// or extend coverage. All parts must share the same columns.
    pub fn merge(parts: &[TimeSeries]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Err(DatastoreError::Validation(
                "Nothing to merge".to_string(),
            ));
        };

        let mut merged: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = BTreeMap::new();

        for part in parts {
            if part.columns != first.columns {
                return Err(DatastoreError::Validation(format!(
                    "Cannot merge series with columns {:?} into {:?}",
                    part.columns, first.columns
                )));
            }

            for row in &part.rows {
                match merged.get_mut(&row.time) {
                    Some(existing) => {
                        for (slot, candidate) in existing.iter_mut().zip(&row.values) {
                            if slot.is_none() {
                                *slot = *candidate;
                            }
                        }
                    }
                    None => {
                        merged.insert(row.time, row.values.clone());
                    }
                }
            }
        }

        Ok(Self {
            columns: first.columns.clone(),
            rows: merged
                .into_iter()
                .map(|(time, values)| Observation::new(time, values))
                .collect(),
        })
    }

    /// Values from `self` take priority; `other` fills gaps.
    pub fn combine_first(&self, other: &TimeSeries) -> Result<Self> {
        Self::merge(&[self.clone(), other.clone()])
    }

    /// Appends rows from `other` and re-sorts without resolving duplicates.
    pub fn concat(&mut self, other: TimeSeries) -> Result<()> {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns != self.columns {
            return Err(DatastoreError::Validation(format!(
                "Cannot concatenate series with columns {:?} onto {:?}",
                other.columns, self.columns
            )));
        }
        self.rows.extend(other.rows);
        self.rows.sort_by_key(|r| r.time);
        Ok(())
    }

    /// The single spacing shared by every consecutive pair of rows.
    pub fn infer_freq(&self) -> Option<Frequency> {
        infer_constant_spacing(&self.times())
    }

    /// Rounds stamps to `freq`, keeps the first row per stamp and fills the
    /// grid between the first and last stamp with missing rows.
    pub fn regularize(&self, freq: Frequency) -> Self {
        let mut rounded: Vec<Observation> = self
            .rows
            .iter()
            .map(|r| Observation::new(freq.round(r.time), r.values.clone()))
            .collect();
        rounded.dedup_by(|later, earlier| later.time == earlier.time);

        Self {
            columns: self.columns.clone(),
            rows: Self::fill_grid(rounded, freq, self.columns.len()),
        }
    }

    /// Reindexes onto the `freq` grid without rounding. Off-grid rows are lost.
    pub fn asfreq(&self, freq: Frequency) -> Self {
        let on_grid: Vec<Observation> = self
            .rows
            .iter()
            .filter(|r| freq.offset_from_grid(r.time).is_zero())
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows: Self::fill_grid(on_grid, freq, self.columns.len()),
        }
    }

    fn fill_grid(rows: Vec<Observation>, freq: Frequency, width: usize) -> Vec<Observation> {
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return rows;
        };
        let (start, end) = (first.time, last.time);
        let mut by_time: BTreeMap<NaiveDateTime, Vec<Option<f64>>> =
            rows.into_iter().map(|r| (r.time, r.values)).collect();

        let step = freq.as_duration();
        let mut filled = Vec::new();
        let mut t = start;
        while t <= end {
            let values = by_time.remove(&t).unwrap_or_else(|| vec![None; width]);
            filled.push(Observation::new(t, values));
            t += step;
        }
        filled
    }

    pub fn split_by_year(&self) -> BTreeMap<i32, TimeSeries> {
        let mut years: BTreeMap<i32, TimeSeries> = BTreeMap::new();
        for row in &self.rows {
            years
                .entry(row.time.year())
                .or_insert_with(|| TimeSeries::new(self.columns.clone()))
                .rows
                .push(row.clone());
        }
        years
    }

    pub fn count_missing_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.is_missing()).count()
    }
}

pub(crate) fn infer_constant_spacing(times: &[NaiveDateTime]) -> Option<Frequency> {
    if times.len() < 2 {
        return None;
    }
    let first = (times[1] - times[0]).num_seconds();
    if first <= 0 {
        return None;
    }
    let constant = times
        .windows(2)
        .all(|w| (w[1] - w[0]).num_seconds() == first);
    if constant {
        Frequency::from_seconds(first).ok()
    } else {
        None
    }
}
