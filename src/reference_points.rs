use crate::error::{NsgaError, Result};
use log::debug;

/// Step between two consecutive points of the bi-objective reference line
const BI_OBJECTIVE_STEP: f64 = 0.05;
/// Coordinate sum of the bi-objective reference line
const BI_OBJECTIVE_SUM: f64 = 0.5;

/// Binomial coefficient C(n, k), None when it does not fit in a usize
fn binomial(n: usize, k: usize) -> Option<usize> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    usize::try_from(result).ok()
}

/// Number of divisions of the simplex lattice used above two objectives
pub fn divisions(n_objectives: usize) -> usize {
    n_objectives + 1
}

/// Number of points `generate_reference_points` produces, None on overflow
pub fn reference_point_count(n_objectives: usize) -> Option<usize> {
    match n_objectives {
        0 => Some(0),
        1 => Some(1),
        2 => Some((BI_OBJECTIVE_SUM / BI_OBJECTIVE_STEP).round() as usize + 1),
        m => {
            let p = divisions(m);
            binomial(m + p - 1, p)
        }
    }
}

/// Generates the reference directions of a run
///
/// * one objective: the single point `[1.0]`
/// * two objectives: the line from (0, 0.5) to (0.5, 0) with a 0.05 step
/// * more objectives: the Das-Dennis lattice with M + 1 divisions, coordinates summing to 1
///
/// # Errors
///
/// GenerationTimeout if the lattice would hold more than `max_points` points
pub fn generate_reference_points(n_objectives: usize, max_points: usize) -> Result<Vec<Vec<f64>>> {
    if n_objectives == 0 {
        return Err(NsgaError::Config("reference points require at least one objective".to_string()));
    }

    let required = reference_point_count(n_objectives).unwrap_or(usize::MAX);
    if required > max_points {
        return Err(NsgaError::GenerationTimeout {
            n_objectives,
            required,
            limit: max_points,
        });
    }

    let points = match n_objectives {
        1 => vec![vec![1.0]],
        2 => (0..required)
            .map(|i| {
                let x = i as f64 * BI_OBJECTIVE_STEP;
                vec![x, BI_OBJECTIVE_SUM - x]
            })
            .collect(),
        m => das_dennis(m, divisions(m)),
    };

    debug!("{} reference points generated for {} objectives", points.len(), n_objectives);
    Ok(points)
}

/// Simplex lattice: every point whose coordinates are multiples of 1/divisions and sum to 1
fn das_dennis(n_objectives: usize, divisions: usize) -> Vec<Vec<f64>> {
    let mut points = Vec::new();
    let mut point = vec![0.0_f64; n_objectives];
    das_dennis_recursive(n_objectives, divisions, 0, divisions, &mut point, &mut points);
    points
}

fn das_dennis_recursive(
    n_objectives: usize,
    divisions: usize,
    depth: usize,
    remaining: usize,
    current: &mut Vec<f64>,
    result: &mut Vec<Vec<f64>>,
) {
    if depth == n_objectives - 1 {
        current[depth] = remaining as f64 / divisions as f64;
        result.push(current.clone());
        return;
    }

    for i in 0..=remaining {
        current[depth] = i as f64 / divisions as f64;
        das_dennis_recursive(n_objectives, divisions, depth + 1, remaining - i, current, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_objective() {
        assert_eq!(generate_reference_points(1, 10).unwrap(), vec![vec![1.0]]);
    }

    #[test]
    fn test_bi_objective_line() {
        let points = generate_reference_points(2, 100).unwrap();
        assert_eq!(points.len(), 11);
        assert_eq!(points[0], vec![0.0, 0.5]);
        assert!((points[10][0] - 0.5).abs() < 1e-12 && points[10][1].abs() < 1e-12);
        for pair in points.windows(2) {
            assert!((pair[1][0] - pair[0][0] - 0.05).abs() < 1e-9, "points should be spaced by 0.05");
        }
        for p in &points {
            assert!((p[0] + p[1] - 0.5).abs() < 1e-9, "{:?} should sum to 0.5", p);
        }
    }

    #[test]
    fn test_das_dennis_count_and_simplex() {
        // M = 3, p = 4: C(6, 4) = 15
        let points = generate_reference_points(3, 100).unwrap();
        assert_eq!(points.len(), 15);
        assert_eq!(reference_point_count(3), Some(15));
        for p in &points {
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            for &c in p {
                let scaled = c * 4.0;
                assert!((scaled - scaled.round()).abs() < 1e-9, "coordinates are multiples of 1/p");
            }
        }
        let mut unique = points.clone();
        unique.dedup();
        assert_eq!(unique.len(), 15);

        // M = 4, p = 5: C(8, 5) = 56
        assert_eq!(generate_reference_points(4, 100).unwrap().len(), 56);
    }

    #[test]
    fn test_too_many_points_is_a_timeout() {
        match generate_reference_points(4, 55) {
            Err(NsgaError::GenerationTimeout { required, limit, .. }) => {
                assert_eq!(required, 56);
                assert_eq!(limit, 55);
            }
            other => panic!("expected GenerationTimeout, got {:?}", other),
        }
        assert!(matches!(
            generate_reference_points(200, 100_000),
            Err(NsgaError::GenerationTimeout { .. })
        ));
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(6, 4), Some(15));
        assert_eq!(binomial(5, 0), Some(1));
        assert_eq!(binomial(3, 5), Some(0));
    }
}
