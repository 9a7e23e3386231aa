use serde::{Deserialize, Serialize};

/// Denominator used in place of a null intercept
pub const INTERCEPT_EPSILON: f64 = 1e-10;

/// Weight given to the non-emphasized axes by the achievement scalarizing function
const ASF_WEIGHT_EPSILON: f64 = 1e-6;

/// How the extreme point of each axis is picked among the translated records
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum ExtremePointMethod {
    /// Record with the largest translated value on the axis
    axis_max,
    /// Record minimizing the achievement scalarizing function emphasizing the axis
    asf,
}

/// Outcome of a front normalization, all points in minimize convention
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub ideal_point: Vec<f64>,
    pub extreme_points: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    /// Normalized records, same cardinality and order as the input
    pub normalized: Vec<Vec<f64>>,
}

/// Componentwise minimum of a set of records
pub fn ideal_point(values: &[Vec<f64>]) -> Vec<f64> {
    let n_obj = values.first().map_or(0, |v| v.len());
    let mut ideal = vec![f64::INFINITY; n_obj];
    for row in values {
        for (i, &v) in row.iter().enumerate() {
            if v < ideal[i] {
                ideal[i] = v;
            }
        }
    }
    ideal
}

fn asf(point: &[f64], weight: &[f64]) -> f64 {
    point
        .iter()
        .zip(weight)
        .map(|(&p, &w)| p / w)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Index of the extreme record of `axis` among translated records
fn extreme_index(translated: &[Vec<f64>], axis: usize, method: ExtremePointMethod) -> usize {
    let mut best_idx = 0;
    match method {
        ExtremePointMethod::axis_max => {
            let mut best = f64::NEG_INFINITY;
            for (i, row) in translated.iter().enumerate() {
                if row[axis] > best {
                    best = row[axis];
                    best_idx = i;
                }
            }
        }
        ExtremePointMethod::asf => {
            let mut weight = vec![ASF_WEIGHT_EPSILON; translated[0].len()];
            weight[axis] = 1.0;
            let mut best = f64::INFINITY;
            for (i, row) in translated.iter().enumerate() {
                let a = asf(row, &weight);
                if a < best {
                    best = a;
                    best_idx = i;
                }
            }
        }
    }
    best_idx
}

/// Normalizes a set of records (already in minimize convention)
///
/// # Arguments
///
/// * `values` - Records of the front, one row per individual
/// * `method` - How extreme points are chosen
///
/// # Returns
///
/// The ideal point, the extreme point and intercept of each axis, and the records translated
/// by the ideal point and divided by the intercepts
pub fn normalize(values: &[Vec<f64>], method: ExtremePointMethod) -> Normalization {
    if values.is_empty() {
        return Normalization {
            ideal_point: Vec::new(),
            extreme_points: Vec::new(),
            intercepts: Vec::new(),
            normalized: Vec::new(),
        };
    }

    let ideal = ideal_point(values);
    let translated: Vec<Vec<f64>> = values
        .iter()
        .map(|row| row.iter().zip(&ideal).map(|(&v, &z)| v - z).collect())
        .collect();

    let n_obj = ideal.len();
    let extreme_points: Vec<Vec<f64>> = (0..n_obj)
        .map(|axis| translated[extreme_index(&translated, axis, method)].clone())
        .collect();

    let intercepts: Vec<f64> = (0..n_obj).map(|axis| extreme_points[axis][axis]).collect();

    let normalized = translated
        .iter()
        .map(|row| {
            row.iter()
                .zip(&intercepts)
                .map(|(&t, &a)| {
                    let denominator = if a == 0.0 { INTERCEPT_EPSILON } else { a };
                    t / denominator
                })
                .collect()
        })
        .collect();

    Normalization {
        ideal_point: ideal,
        extreme_points,
        intercepts,
        normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_translated_minimum_is_exactly_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let values: Vec<Vec<f64>> = (0..30)
            .map(|_| vec![rng.gen_range(-3.0..7.0), rng.gen_range(0.1..0.9), rng.gen_range(10.0..200.0)])
            .collect();
        let ideal = ideal_point(&values);
        for axis in 0..3 {
            let min = values.iter().map(|row| row[axis] - ideal[axis]).fold(f64::INFINITY, f64::min);
            assert_eq!(min, 0.0, "translated minimum of axis {} should be exactly zero", axis);
        }

        let normalization = normalize(&values, ExtremePointMethod::axis_max);
        for axis in 0..3 {
            let min = normalization.normalized.iter().map(|row| row[axis]).fold(f64::INFINITY, f64::min);
            let max = normalization.normalized.iter().map(|row| row[axis]).fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min, 0.0);
            assert!((max - 1.0).abs() < 1e-12, "axis_max intercepts should map the extreme value to 1");
        }
    }

    #[test]
    fn test_normalize_keeps_order_and_cardinality() {
        let values = vec![vec![1.0, 4.0], vec![3.0, 2.0], vec![2.0, 3.0]];
        let normalization = normalize(&values, ExtremePointMethod::axis_max);

        assert_eq!(normalization.ideal_point, vec![1.0, 2.0]);
        assert_eq!(normalization.extreme_points, vec![vec![2.0, 0.0], vec![0.0, 2.0]]);
        assert_eq!(normalization.intercepts, vec![2.0, 2.0]);
        assert_eq!(
            normalization.normalized,
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]]
        );
    }

    #[test]
    fn test_null_intercept_uses_epsilon() {
        // second objective is constant over the front
        let values = vec![vec![1.0, 5.0], vec![2.0, 5.0]];
        let normalization = normalize(&values, ExtremePointMethod::axis_max);
        assert_eq!(normalization.intercepts[1], 0.0);
        assert!(normalization.normalized.iter().all(|row| row[1] == 0.0 && row.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_asf_extreme_points() {
        let values = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.6, 0.6]];
        let normalization = normalize(&values, ExtremePointMethod::asf);
        assert_eq!(normalization.extreme_points[0], vec![1.0, 0.0]);
        assert_eq!(normalization.extreme_points[1], vec![0.0, 1.0]);
        assert_eq!(normalization.intercepts, vec![1.0, 1.0]);
    }

    #[test]
    fn test_empty_front() {
        let normalization = normalize(&[], ExtremePointMethod::asf);
        assert!(normalization.normalized.is_empty());
    }
}
