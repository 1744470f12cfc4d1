//! Segment generation for cross-validation
//!
//! A [`Segments`] plan holds `rep` replications, each a list of index segments over the rows of a
//! dataset. K-fold plans partition the rows within every replication, held-out plans draw a
//! single test segment per replication. With grouped sampling the rows sharing a group label are
//! always assigned together.
//!
//! All indices are 0-based and every segment is sorted ascending. The random generator is passed
//! in explicitly, so a seeded generator reproduces the same plan.

use std::collections::HashMap;

use rand::seq::{index, SliceRandom};
use rand::Rng;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Label;

/// Replicated index segments
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    replications: Vec<Vec<Vec<usize>>>,
}

impl Segments {
    /// Wrap user supplied segments, every index must be smaller than `n`
    pub fn from_replications(n: usize, replications: Vec<Vec<Vec<usize>>>) -> Result<Self> {
        let segments = Segments { replications };
        segments.check_bounds(n)?;
        Ok(segments)
    }

    /// Number of replications
    pub fn nrep(&self) -> usize {
        self.replications.len()
    }

    pub fn replications(&self) -> &[Vec<Vec<usize>>] {
        &self.replications
    }

    /// Segments of replication `rep`
    pub fn replication(&self, rep: usize) -> &[Vec<usize>] {
        &self.replications[rep]
    }

    /// Iterate over `(replication, segment, indices)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &[usize])> {
        self.replications.iter().enumerate().flat_map(|(rep, segs)| {
            segs.iter()
                .enumerate()
                .map(move |(seg, idx)| (rep, seg, idx.as_slice()))
        })
    }

    /// Total number of segments over all replications
    pub fn len(&self) -> usize {
        self.replications.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every index addresses one of `n` observations
    pub fn check_bounds(&self, n: usize) -> Result<()> {
        match self.iter().flat_map(|(_, _, idx)| idx.iter()).find(|&&i| i >= n) {
            Some(&i) => Err(Error::Parameters(format!(
                "segment index {} out of bounds for {} observations",
                i, n
            ))),
            None => Ok(()),
        }
    }
}

/// Groups as lists of member rows, in order of first appearance of their label
fn group_members<L: Label>(groups: &[L]) -> Vec<Vec<usize>> {
    let mut position = HashMap::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for (i, label) in groups.iter().enumerate() {
        let slot = *position.entry(label).or_insert_with(|| {
            members.push(Vec::new());
            members.len() - 1
        });
        members[slot].push(i);
    }
    members
}

fn expand(units: &[usize], members: Option<&[Vec<usize>]>) -> Vec<usize> {
    let mut idx: Vec<usize> = match members {
        Some(members) => units.iter().flat_map(|&u| members[u].iter().cloned()).collect(),
        None => units.to_vec(),
    };
    idx.sort_unstable();
    idx
}

fn k_fold_units<R: Rng>(
    nunits: usize,
    k: usize,
    rep: usize,
    members: Option<&[Vec<usize>]>,
    rng: &mut R,
) -> Result<Segments> {
    if k < 2 {
        return Err(Error::Parameters(format!(
            "number of folds must be at least 2, got {}",
            k
        )));
    }
    if k > nunits {
        return Err(Error::Parameters(format!(
            "{} folds requested for {} sampling units",
            k, nunits
        )));
    }

    let replications = (0..rep)
        .map(|_| {
            let mut perm: Vec<usize> = (0..nunits).collect();
            perm.shuffle(rng);

            // column-major reshape of the padded permutation into k rows
            let mut folds = vec![Vec::with_capacity(nunits / k + 1); k];
            for (i, unit) in perm.into_iter().enumerate() {
                folds[i % k].push(unit);
            }
            folds.iter().map(|units| expand(units, members)).collect()
        })
        .collect();

    Ok(Segments { replications })
}

fn held_out_units<R: Rng>(
    nunits: usize,
    m: usize,
    rep: usize,
    members: Option<&[Vec<usize>]>,
    rng: &mut R,
) -> Result<Segments> {
    if m == 0 || m >= nunits {
        return Err(Error::Parameters(format!(
            "held-out size must lie in 1..{}, got {}",
            nunits, m
        )));
    }

    let replications = (0..rep)
        .map(|_| {
            let units = index::sample(rng, nunits, m).into_vec();
            vec![expand(&units, members)]
        })
        .collect();

    Ok(Segments { replications })
}

/// K-fold segments over `n` observations, repeated `rep` times
///
/// Within a replication the segments partition `0..n` and their sizes differ by at most one.
pub fn k_fold<R: Rng>(n: usize, k: usize, rep: usize, rng: &mut R) -> Result<Segments> {
    k_fold_units(n, k, rep, None, rng)
}

/// K-fold segments that never split a group
///
/// The `k` folds are drawn over the distinct labels of `groups`, then expanded to their member
/// rows. Fold sizes differ by at most one group.
pub fn k_fold_grouped<L: Label, R: Rng>(
    n: usize,
    groups: &[L],
    k: usize,
    rep: usize,
    rng: &mut R,
) -> Result<Segments> {
    Error::check_rows("group labels", n, groups.len())?;
    let members = group_members(groups);
    k_fold_units(members.len(), k, rep, Some(&members), rng)
}

/// One held-out segment of `m` observations per replication
pub fn held_out<R: Rng>(n: usize, m: usize, rep: usize, rng: &mut R) -> Result<Segments> {
    held_out_units(n, m, rep, None, rng)
}

/// One held-out segment per replication made of `m` whole groups
pub fn held_out_grouped<L: Label, R: Rng>(
    n: usize,
    groups: &[L],
    m: usize,
    rep: usize,
    rng: &mut R,
) -> Result<Segments> {
    Error::check_rows("group labels", n, groups.len())?;
    let members = group_members(groups);
    held_out_units(members.len(), m, rep, Some(&members), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn assert_partition(segments: &[Vec<usize>], n: usize) {
        let mut all: Vec<usize> = segments.iter().flatten().cloned().collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn k_fold_partitions_every_replication() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        for n in 2..25 {
            for k in 2..=n.min(7) {
                let segments = k_fold(n, k, 1, &mut rng).unwrap();
                let segs = segments.replication(0);
                assert_eq!(segs.len(), k);
                assert_partition(segs, n);

                let sizes: Vec<usize> = segs.iter().map(Vec::len).collect();
                let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
                assert!(max - min <= 1);
                for seg in segs {
                    assert!(seg.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }

    #[test]
    fn ten_rows_three_folds_two_replications() {
        let segments = k_fold(10, 3, 2, &mut Xoshiro256Plus::seed_from_u64(1)).unwrap();
        assert_eq!(segments.nrep(), 2);
        assert_eq!(segments.len(), 6);
        for segs in segments.replications() {
            assert_partition(segs, 10);
            let mut sizes: Vec<usize> = segs.iter().map(Vec::len).collect();
            sizes.sort_unstable();
            assert_eq!(sizes, vec![3, 3, 4]);
        }

        let again = k_fold(10, 3, 2, &mut Xoshiro256Plus::seed_from_u64(1)).unwrap();
        assert_eq!(segments, again);
    }

    #[test]
    fn groups_are_never_split() {
        let groups = ["a", "a", "b", "c", "c", "c", "d", "e", "e", "f", "b"];
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let segments = k_fold_grouped(groups.len(), &groups, 3, 4, &mut rng).unwrap();

        for segs in segments.replications() {
            assert_partition(segs, groups.len());
            for label in groups.iter() {
                let holding: Vec<usize> = segs
                    .iter()
                    .enumerate()
                    .filter(|(_, seg)| seg.iter().any(|&i| groups[i] == *label))
                    .map(|(j, _)| j)
                    .collect();
                assert_eq!(holding.len(), 1, "group {} was split", label);
            }
        }
    }

    #[test]
    fn held_out_samples_without_replacement() {
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        let segments = held_out(20, 6, 5, &mut rng).unwrap();
        assert_eq!(segments.nrep(), 5);
        for (_, _, idx) in segments.iter() {
            assert_eq!(idx.len(), 6);
            assert!(idx.windows(2).all(|w| w[0] < w[1]));
            assert!(idx.iter().all(|&i| i < 20));
        }

        let groups = [0, 0, 1, 1, 2, 2, 3, 3];
        let segments = held_out_grouped(8, &groups, 2, 3, &mut rng).unwrap();
        for (_, _, idx) in segments.iter() {
            assert_eq!(idx.len(), 4);
        }
    }

    #[test]
    fn invalid_requests_fail() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        assert!(k_fold(10, 1, 1, &mut rng).is_err());
        assert!(k_fold(3, 4, 1, &mut rng).is_err());
        assert!(held_out(5, 5, 1, &mut rng).is_err());
        assert!(k_fold_grouped(4, &[1, 1, 2], 2, 1, &mut rng).is_err());
        assert!(k_fold_grouped(4, &[1, 1, 2, 2], 3, 1, &mut rng).is_err());
        assert!(Segments::from_replications(3, vec![vec![vec![0, 3]]]).is_err());
    }
}
