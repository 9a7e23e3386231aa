use serde::{Deserialize, Serialize};

//-----------------------------------------------------------------------------
// Pareto dominance and non-dominated sorting
//-----------------------------------------------------------------------------

/// Optimization direction of an objective
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Direction {
    minimize,
    maximize,
}

impl Direction {
    /// Worst possible value of an objective in this direction
    pub fn worst(&self) -> f64 {
        match self {
            Direction::minimize => f64::INFINITY,
            Direction::maximize => f64::NEG_INFINITY,
        }
    }
}

/// Returns true if `a` dominates `b`: at least as good on every objective and strictly
/// better on at least one, under the given directions
pub fn dominates(a: &[f64], b: &[f64], directions: &[Direction]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), directions.len());

    let mut strictly_better = false;
    for ((&av, &bv), direction) in a.iter().zip(b.iter()).zip(directions.iter()) {
        let (better, worse) = match direction {
            Direction::minimize => (av < bv, av > bv),
            Direction::maximize => (av > bv, av < bv),
        };
        if worse {
            return false;
        }
        if better {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Ranks the rows of a fitness table into Pareto fronts
///
/// # Arguments
///
/// * `values` - Fitness table, one row per individual
/// * `directions` - Direction of each column
///
/// # Returns
///
/// The front rank of each row (1 = non-dominated), in row order
pub fn non_dominated_sort(values: &[Vec<f64>], directions: &[Direction]) -> Vec<usize> {
    let n = values.len();
    let mut ranks = vec![0usize; n];
    if n == 0 {
        return ranks;
    }

    // dominated_by[p]: rows dominated by p, domination_count[p]: rows dominating p
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count: Vec<usize> = vec![0; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&values[i], &values[j], directions) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&values[j], &values[i], directions) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    // Peel fronts one after the other
    let mut rank = 1;
    let mut current_front: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current_front.is_empty() {
        let mut next_front: Vec<usize> = Vec::new();
        for &p in &current_front {
            ranks[p] = rank;
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next_front.push(q);
                }
            }
        }
        next_front.sort_unstable();
        current_front = next_front;
        rank += 1;
    }

    ranks
}

/// Groups row indices by front: `fronts[0]` holds the rows of rank 1, in row order
pub fn fronts_from_ranks(ranks: &[usize]) -> Vec<Vec<usize>> {
    let n_fronts = ranks.iter().copied().max().unwrap_or(0);
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new(); n_fronts];
    for (row, &rank) in ranks.iter().enumerate() {
        if rank > 0 {
            fronts[rank - 1].push(row);
        }
    }
    fronts
}

/// Rows of the first (non-dominated) front
pub fn pareto_front_indices(values: &[Vec<f64>], directions: &[Direction]) -> Vec<usize> {
    fronts_from_ranks(&non_dominated_sort(values, directions))
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// Converts a row to the minimize convention by negating maximized objectives
pub fn to_minimize_space(values: &[f64], directions: &[Direction]) -> Vec<f64> {
    values
        .iter()
        .zip(directions)
        .map(|(&v, d)| match d {
            Direction::minimize => v,
            Direction::maximize => -v,
        })
        .collect()
}
