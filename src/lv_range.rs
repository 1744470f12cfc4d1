//! Ranges of latent-variable counts
//!
//! Ensembles and grid searches iterate over a contiguous range of model complexities. The range
//! is validated when it is constructed (`low <= high`) and again against the data at fit time,
//! where the upper bound must not exceed `min(n - 1, p)`.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An inclusive, ascending range of latent-variable counts
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LvRange {
    low: usize,
    high: usize,
}

impl LvRange {
    /// Create the range `low..=high`, fails if the range is empty
    pub fn new(low: usize, high: usize) -> Result<Self> {
        if low > high {
            return Err(Error::Range {
                low,
                high,
                max: high,
            });
        }
        Ok(LvRange { low, high })
    }

    /// The range holding a single count
    pub fn single(nlv: usize) -> Self {
        LvRange {
            low: nlv,
            high: nlv,
        }
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    /// Number of counts in the range
    pub fn len(&self) -> usize {
        self.high - self.low + 1
    }

    /// A valid range is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.low..=self.high
    }

    /// Checks the upper bound against the admissible maximum
    pub fn check_max(&self, max: usize) -> Result<()> {
        if self.high > max {
            Err(Error::Range {
                low: self.low,
                high: self.high,
                max,
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for LvRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Parses `"5:15"` (or a single count `"5"`)
impl FromStr for LvRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |v: &str| {
            v.trim().parse::<usize>().map_err(|_| {
                Error::InvalidRange(format!("malformed latent-variable range `{}`", s))
            })
        };
        match s.split_once(':') {
            Some((low, high)) => LvRange::new(parse(low)?, parse(high)?),
            None => Ok(LvRange::single(parse(s)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges() {
        let range: LvRange = "5:15".parse().unwrap();
        assert_eq!((range.low(), range.high(), range.len()), (5, 15, 11));
        assert_eq!(range.to_string(), "5:15");

        let single: LvRange = " 3 ".parse().unwrap();
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn rejects_invalid_ranges() {
        assert!(matches!("15:5".parse::<LvRange>(), Err(Error::Range { .. })));
        assert!(matches!("a:5".parse::<LvRange>(), Err(Error::InvalidRange(_))));
        assert!(matches!("-1:5".parse::<LvRange>(), Err(Error::InvalidRange(_))));
        assert!(matches!("".parse::<LvRange>(), Err(Error::InvalidRange(_))));
        assert!(matches!(
            LvRange::new(0, 8).unwrap().check_max(7),
            Err(Error::Range { max: 7, .. })
        ));
    }
}
