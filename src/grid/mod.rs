//! Hyperparameter grids and grid cross-validation
//!
//! A [`ParamGrid`] stores named, equal-length columns of [`ParamValue`]s, every row being one
//! combination of hyperparameters. The grid engines in this module refit a model per
//! (replication, segment, combination) and aggregate the scores into a [`CvResult`].

use std::fmt;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Float;

mod cv;

pub use cv::{grid_cv, grid_cv_lambda, grid_cv_lv, grid_cv_mb, grid_score, CvRecord, CvResult};

/// A single hyperparameter value
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Named parallel columns of hyperparameter values
///
/// Row `i` across all columns is the `i`-th combination. A grid without columns holds exactly
/// one (empty) combination, which lets the engines run a model without tunable parameters.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamGrid {
    names: Vec<String>,
    columns: Vec<Vec<ParamValue>>,
}

impl ParamGrid {
    /// Grid with a single empty combination
    pub fn new() -> Self {
        ParamGrid::default()
    }

    /// Grid from explicit columns, all columns must have the same length
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<ParamValue>)>) -> Result<Self> {
        let mut grid = ParamGrid::new();
        for (name, values) in columns {
            grid = grid.with_column(name, values)?;
        }
        Ok(grid)
    }

    /// Cartesian product of the candidate values of each parameter
    ///
    /// The last column varies fastest.
    pub fn expand<S: Into<String>>(candidates: Vec<(S, Vec<ParamValue>)>) -> Result<Self> {
        let mut grid = ParamGrid::new();
        for (name, values) in candidates {
            grid = grid.product(name, &values)?;
        }
        Ok(grid)
    }

    /// Add an explicit column
    pub fn with_column<S: Into<String>>(mut self, name: S, values: Vec<ParamValue>) -> Result<Self> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::Parameters(format!("duplicate grid column `{}`", name)));
        }
        if !self.columns.is_empty() {
            Error::check_rows("grid column length", self.len(), values.len())?;
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(self)
    }

    /// Repeat every combination once per value of a new parameter
    pub fn product<S: Into<String>>(self, name: S, values: &[ParamValue]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Parameters("empty candidate list".into()));
        }
        let nrows = self.len();
        let mut columns: Vec<Vec<ParamValue>> = self
            .columns
            .iter()
            .map(|col| {
                col.iter()
                    .flat_map(|v| std::iter::repeat(v.clone()).take(values.len()))
                    .collect()
            })
            .collect();
        let added = (0..nrows).flat_map(|_| values.iter().cloned()).collect();

        let mut names = self.names;
        let name = name.into();
        if names.contains(&name) {
            return Err(Error::Parameters(format!("duplicate grid column `{}`", name)));
        }
        names.push(name);
        columns.push(added);
        Ok(ParamGrid { names, columns })
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values of column `name`
    pub fn column(&self, name: &str) -> Option<&[ParamValue]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// The combination at row `row`
    pub fn get(&self, row: usize) -> ParamSet<'_> {
        ParamSet { grid: self, row }
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamSet<'_>> {
        (0..self.len()).map(move |row| self.get(row))
    }
}

/// One row of a [`ParamGrid`]
#[derive(Debug, Clone, Copy)]
pub struct ParamSet<'a> {
    grid: &'a ParamGrid,
    row: usize,
}

impl<'a> ParamSet<'a> {
    /// Row of this combination in its grid
    pub fn index(&self) -> usize {
        self.row
    }

    pub fn get(&self, name: &str) -> Result<&'a ParamValue> {
        self.grid
            .column(name)
            .map(|col| &col[self.row])
            .ok_or_else(|| Error::Parameters(format!("unknown grid parameter `{}`", name)))
    }

    fn mismatch(name: &str, expected: &str, value: &ParamValue) -> Error {
        Error::Parameters(format!(
            "grid parameter `{}` is {:?}, expected {}",
            name, value, expected
        ))
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "an integer", other)),
        }
    }

    /// Non-negative integer parameter, such as a number of neighbors
    pub fn usize(&self, name: &str) -> Result<usize> {
        let v = self.int(name)?;
        if v < 0 {
            return Err(Error::Parameters(format!(
                "grid parameter `{}` must be non-negative, got {}",
                name, v
            )));
        }
        Ok(v as usize)
    }

    /// Floating point parameter, integers are converted
    pub fn float<F: Float>(&self, name: &str) -> Result<F> {
        match self.get(name)? {
            ParamValue::Float(v) => Ok(F::cast(*v)),
            ParamValue::Int(v) => Ok(F::cast(*v)),
            other => Err(Self::mismatch(name, "a number", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.get(name)? {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(name, "a boolean", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&'a str> {
        match self.get(name)? {
            ParamValue::Text(v) => Ok(v.as_str()),
            other => Err(Self::mismatch(name, "a string", other)),
        }
    }
}

impl fmt::Display for ParamSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (name, col) in self.grid.names.iter().zip(self.grid.columns.iter()) {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, col[self.row])?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_columns_must_have_equal_length() {
        let grid = ParamGrid::from_columns(vec![
            ("nlv", vec![1usize.into(), 2usize.into()]),
            ("h", vec![1.0.into(), 2.0.into()]),
        ])
        .unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.get(1).usize("nlv").unwrap(), 2);
        assert_eq!(grid.get(1).float::<f64>("h").unwrap(), 2.);

        let res = ParamGrid::from_columns(vec![
            ("nlv", vec![1usize.into(), 2usize.into()]),
            ("h", vec![1.0.into()]),
        ]);
        assert!(matches!(res, Err(Error::Dimension { .. })));
    }

    #[test]
    fn expansion_is_a_cartesian_product() {
        let grid = ParamGrid::expand(vec![
            ("k", vec![10usize.into(), 20usize.into(), 30usize.into()]),
            ("scale", vec![false.into(), true.into()]),
        ])
        .unwrap();
        assert_eq!(grid.len(), 6);
        let rows: Vec<(usize, bool)> = grid
            .iter()
            .map(|p| (p.usize("k").unwrap(), p.bool("scale").unwrap()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (10, false),
                (10, true),
                (20, false),
                (20, true),
                (30, false),
                (30, true)
            ]
        );
        assert_eq!(grid.get(3).to_string(), "k=20, scale=true");
    }

    #[test]
    fn empty_grid_has_one_combination() {
        let grid = ParamGrid::new();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(0).to_string(), "");
    }

    #[test]
    fn typed_getters_check_the_variant() {
        let grid = ParamGrid::from_columns(vec![("kernel", vec!["bisquare".into()])]).unwrap();
        let params = grid.get(0);
        assert_eq!(params.text("kernel").unwrap(), "bisquare");
        assert!(params.int("kernel").is_err());
        assert!(params.get("missing").is_err());
    }
}
