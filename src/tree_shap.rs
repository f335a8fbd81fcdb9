//! Path-dependent TreeSHAP (Lundberg, Erion & Lee 2018, Algorithm 2).
//!
//! Computes exact Shapley values for a single tree in O(L·D²) by tracking, for
//! every root-to-leaf path, the proportion of feature subsets that flow down it.
//! "Missing" features follow both children weighted by training cover.

use crate::model_artifact::Tree;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the synthetic root element
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add the attributions of `tree` for `values` into `phi` (one slot per
/// feature, margin space).
pub fn accumulate(tree: &Tree, values: &[f64], phi: &mut [f64]) {
    recurse(tree, values, phi, 0, &[], 1.0, 1.0, None);
}

/// Attributions of a single tree.
pub fn tree_shap(tree: &Tree, values: &[f64]) -> Vec<f64> {
    let mut phi = vec![0.0; values.len()];
    accumulate(tree, values, &mut phi);
    phi
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    values: &[f64],
    phi: &mut [f64],
    index: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = Vec::with_capacity(parent_path.len() + 1);
    path.extend_from_slice(parent_path);
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    let node = tree.node(index);
    let (left, right) = match node.children {
        None => {
            let depth = path.len() - 1;
            for i in 1..=depth {
                let weight = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += weight * (el.one_fraction - el.zero_fraction) * node.leaf_value;
                }
            }
            return;
        }
        Some(children) => children,
    };

    let hot = tree.next_node(index, values);
    let cold = if hot == left { right } else { left };
    let split = node.split_feature;

    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(split)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind_path(&mut path, k);
    }

    let hot_zero = tree.cover_fraction(index, hot);
    let cold_zero = tree.cover_fraction(index, cold);

    recurse(
        tree,
        values,
        phi,
        hot,
        &path,
        hot_zero * incoming_zero,
        incoming_one,
        Some(split),
    );
    recurse(
        tree,
        values,
        phi,
        cold,
        &path,
        cold_zero * incoming_zero,
        0.0,
        Some(split),
    );
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let w = path[i].pweight;
        path[i + 1].pweight += one_fraction * w * (i as f64 + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * w * (d - i as f64) / (d + 1.0);
    }
}

/// Undo the extension that introduced `path[index]`.
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - i as f64) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - i as f64));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.truncate(depth);
}

/// Total permutation weight of the path with `path[index]` unwound, without
/// modifying it.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    if one_fraction != 0.0 {
        for i in (0..depth).rev() {
            let tmp = next_one_portion * (d + 1.0) / ((i as f64 + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (d - i as f64) / (d + 1.0);
        }
    } else if zero_fraction != 0.0 {
        for i in (0..depth).rev() {
            total += path[i].pweight / zero_fraction / ((d - i as f64) / (d + 1.0));
        }
    }

    total
}
