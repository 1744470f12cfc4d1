use chemolv::{Float, Label};
use ndarray::{Array1, Array2, ArrayBase, Data, DataMut, Ix1, Zip};

pub fn outer<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix1>,
    b: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Array2<F> {
    let mut outer = Array2::zeros((a.len(), b.len()));
    Zip::from(outer.rows_mut()).and(a).for_each(|mut out, ai| {
        out.assign(&b.mapv(|v| *ai * v));
    });
    outer
}

/// Make the largest absolute entry positive
pub fn svd_flip_1d<F: Float>(weights: &mut ArrayBase<impl DataMut<Elem = F>, Ix1>) {
    let biggest = weights
        .iter()
        .fold(F::zero(), |acc, v| if v.abs() > acc.abs() { *v } else { acc });
    if biggest < F::zero() {
        weights.map_inplace(|v| *v = -*v);
    }
}

/// Index of the largest entry, the first one on ties
pub fn argmax<F: Float>(row: &ArrayBase<impl Data<Elem = F>, Ix1>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, F::neg_infinity()), |(best, max), (i, v)| {
            if *v > max {
                (i, *v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Sorted distinct labels and the class index of every observation
pub fn encode_labels<L: Label>(labels: &ArrayBase<impl Data<Elem = L>, Ix1>) -> (Vec<L>, Vec<usize>) {
    let mut classes: Vec<L> = labels.iter().cloned().collect();
    classes.sort();
    classes.dedup();
    let index = labels
        .iter()
        .map(|l| classes.binary_search(l).unwrap_or(0))
        .collect();
    (classes, index)
}

/// Dummy (one-hot) coding of class indices
pub fn dummy<F: Float>(index: &[usize], nclasses: usize) -> Array2<F> {
    let mut y = Array2::zeros((index.len(), nclasses));
    for (i, &c) in index.iter().enumerate() {
        y[[i, c]] = F::one();
    }
    y
}

/// Total weight per class
pub fn class_weights<F: Float>(index: &[usize], weights: &Array1<F>, nclasses: usize) -> Array1<F> {
    let mut totals = Array1::zeros(nclasses);
    for (&c, &w) in index.iter().zip(weights.iter()) {
        totals[c] += w;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_outer() {
        let a = array![1., 2., 3.];
        let b = array![2., 3.];
        let expected = array![[2., 3.], [4., 6.], [6., 9.]];
        assert_abs_diff_eq!(expected, outer(&a, &b));
    }

    #[test]
    fn flip_makes_the_largest_entry_positive() {
        let mut w = array![0.5, -2., 1.];
        svd_flip_1d(&mut w);
        assert_abs_diff_eq!(w, array![-0.5, 2., -1.]);
    }

    #[test]
    fn labels_are_coded_in_sorted_order() {
        let (classes, index) = encode_labels(&array!["b", "a", "c", "a"]);
        assert_eq!(classes, vec!["a", "b", "c"]);
        assert_eq!(index, vec![1, 0, 2, 0]);
        assert_abs_diff_eq!(
            dummy::<f64>(&index, 3),
            array![[0., 1., 0.], [1., 0., 0.], [0., 0., 1.], [1., 0., 0.]]
        );
        assert_eq!(argmax(&array![0.2, 0.7, 0.7]), 1);
    }
}
