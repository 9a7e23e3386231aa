use crate::error::{NsgaError, Result};
use crate::normalization::{normalize, ExtremePointMethod};
use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

//-----------------------------------------------------------------------------
// Reference-point association and niche-preserving selection
//-----------------------------------------------------------------------------

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Index of the nearest reference point of each normalized record
///
/// Equidistant reference points resolve to the lowest index. A record whose distance
/// cannot be computed (non-finite values) stays associated to reference point 0.
pub fn associate(normalized: &[Vec<f64>], reference_points: &[Vec<f64>]) -> Vec<usize> {
    normalized
        .iter()
        .map(|point| {
            let mut best_ref = 0;
            let mut best_dist = f64::INFINITY;
            for (j, rp) in reference_points.iter().enumerate() {
                let d = euclidean_distance(point, rp);
                if d < best_dist {
                    best_dist = d;
                    best_ref = j;
                }
            }
            best_ref
        })
        .collect()
}

/// Number of records associated to each reference point
pub fn occupancy(associations: &[usize], n_reference_points: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_reference_points];
    for &r in associations {
        counts[r] += 1;
    }
    counts
}

/// Selects `k` individuals of a boundary front, spreading them over the reference points
///
/// # Arguments
///
/// * `ids` - Ids of the boundary front
/// * `values` - Fitness rows of the boundary front, minimize convention, aligned with `ids`
/// * `k` - Number of individuals to select
/// * `reference_points` - Reference directions of the run
/// * `method` - Extreme point method used by the normalization
/// * `rng` - Random number generator
///
/// # Returns
///
/// Exactly `k` distinct ids of the front
///
/// # Errors
///
/// SelectionUnderflow if the front is empty or holds fewer than `k` individuals
pub fn niche_select(
    ids: &[u64],
    values: &[Vec<f64>],
    k: usize,
    reference_points: &[Vec<f64>],
    method: ExtremePointMethod,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<u64>> {
    if ids.is_empty() || k > ids.len() || values.len() != ids.len() {
        return Err(NsgaError::SelectionUnderflow {
            requested: k,
            available: ids.len().min(values.len()),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }
    if reference_points.is_empty() {
        return Err(NsgaError::Config("niching requires at least one reference point".to_string()));
    }

    let normalization = normalize(values, method);
    let associations = associate(&normalization.normalized, reference_points);
    let counts = occupancy(&associations, reference_points.len());

    // candidates[r]: rows of the front associated to reference point r
    let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); reference_points.len()];
    for (row, &r) in associations.iter().enumerate() {
        candidates[r].push(row);
    }

    let mut visit_order: Vec<usize> = (0..reference_points.len()).collect();
    visit_order.sort_by_key(|&r| counts[r]);

    let mut selected: Vec<u64> = Vec::with_capacity(k);
    while selected.len() < k {
        for &r in &visit_order {
            if selected.len() == k {
                break;
            }
            if candidates[r].is_empty() {
                continue;
            }
            let pick = rng.gen_range(0..candidates[r].len());
            let row = candidates[r].swap_remove(pick);
            selected.push(ids[row]);
        }
    }

    debug!(
        "Niching kept {}/{} individuals over {} occupied reference points",
        k,
        ids.len(),
        counts.iter().filter(|c| **c > 0).count()
    );
    Ok(selected)
}
