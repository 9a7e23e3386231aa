use crate::error::Result;
use crate::individual::Individual;
use crate::normalization::{normalize, ExtremePointMethod};
use crate::pareto::{pareto_front_indices, to_minimize_space, Direction};
use crate::population::Population;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//-----------------------------------------------------------------------------
// Result aggregation over the first Pareto front
//-----------------------------------------------------------------------------

/// Non-dominated individuals of the terminal population
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ParetoFront {
    pub individuals: Vec<Individual>,
    /// Raw objective values, one row per individual, objective name order
    pub fitness_table: Vec<Vec<f64>>,
    /// Normalized values (minimize convention), aligned with `fitness_table`
    pub normalized: Vec<Vec<f64>>,
}

/// Readable view of a front individual
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct IndividualView {
    pub id: u64,
    pub objective_values: Vec<(String, f64)>,
    pub selected_feature_names: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FeatureVote {
    pub feature: String,
    /// Fraction of front individuals selecting the feature
    pub vote: f64,
}

/// Per-feature selection frequency over the front
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MajorityVote {
    /// One entry per dataset feature, in feature order
    pub votes: Vec<FeatureVote>,
    pub threshold: f64,
    pub features_above_threshold: Vec<String>,
}

impl MajorityVote {
    /// Counts, for each feature, the fraction of `individuals` that select it
    pub fn compute(individuals: &[Individual], feature_names: &[String], threshold: f64) -> MajorityVote {
        let n = individuals.len();
        let votes: Vec<FeatureVote> = feature_names
            .iter()
            .enumerate()
            .map(|(j, feature)| {
                let count = individuals
                    .iter()
                    .filter(|i| i.genes.get(j).map_or(false, |g| *g != 0))
                    .count();
                FeatureVote {
                    feature: feature.clone(),
                    vote: if n > 0 { count as f64 / n as f64 } else { 0.0 },
                }
            })
            .collect();

        let features_above_threshold = votes
            .iter()
            .filter(|v| n > 0 && v.vote >= threshold)
            .map(|v| v.feature.clone())
            .collect();

        MajorityVote {
            votes,
            threshold,
            features_above_threshold,
        }
    }

    pub fn display(&self) -> String {
        let mut ranked: Vec<&FeatureVote> = self.votes.iter().collect();
        ranked.sort_by(|a, b| b.vote.total_cmp(&a.vote));

        let mut text = format!(
            "\x1b[1;93mMajority vote\x1b[0m (threshold {:.2}): {} feature(s) retained\n",
            self.threshold,
            self.features_above_threshold.len()
        );
        for v in ranked.iter().filter(|v| v.vote >= self.threshold) {
            text.push_str(&format!("  {:<30} {:>6.1}%\n", v.feature, v.vote * 100.0));
        }
        text
    }
}

/// Distribution of an objective over the front
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ObjectiveSummary {
    pub name: String,
    pub direction: Direction,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ObjectiveSummary {
    fn from_column(name: &str, direction: Direction, column: &[f64]) -> ObjectiveSummary {
        if column.is_empty() {
            return ObjectiveSummary {
                name: name.to_string(),
                direction,
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        ObjectiveSummary {
            name: name.to_string(),
            direction,
            mean: column.iter().mean(),
            std: if column.len() > 1 { column.iter().std_dev() } else { 0.0 },
            min: column.iter().copied().fold(f64::INFINITY, f64::min),
            max: column.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Everything reported about the terminal population
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FrontResult {
    pub front: ParetoFront,
    pub per_individual: Vec<IndividualView>,
    pub majority_vote: MajorityVote,
    pub objective_summary: Vec<ObjectiveSummary>,
}

impl FrontResult {
    /// Extracts and describes the first front of an evaluated population
    ///
    /// # Arguments
    ///
    /// * `population` - Terminal population, every individual evaluated
    /// * `feature_names` - Dataset feature names, in gene order
    /// * `objective_names` - Objective names, in fitness column order
    /// * `directions` - Objective directions, in fitness column order
    /// * `threshold` - Minimal vote of a reported feature
    /// * `method` - Extreme point method used to normalize the front
    pub fn new(
        population: &Population,
        feature_names: &[String],
        objective_names: &[String],
        directions: &[Direction],
        threshold: f64,
        method: ExtremePointMethod,
    ) -> Result<FrontResult> {
        let table = population.fitness_table()?;
        let front_rows = pareto_front_indices(&table, directions);

        let individuals: Vec<Individual> =
            front_rows.iter().map(|&row| population.individuals[row].clone()).collect();
        let fitness_table: Vec<Vec<f64>> = front_rows.iter().map(|&row| table[row].clone()).collect();
        let minimize_space: Vec<Vec<f64>> =
            fitness_table.iter().map(|row| to_minimize_space(row, directions)).collect();
        let normalized = normalize(&minimize_space, method).normalized;

        let per_individual = individuals
            .iter()
            .zip(&fitness_table)
            .map(|(individual, row)| IndividualView {
                id: individual.id,
                objective_values: objective_names.iter().cloned().zip(row.iter().copied()).collect(),
                selected_feature_names: individual.selected_feature_names(feature_names),
            })
            .collect();

        let objective_summary = objective_names
            .iter()
            .zip(directions)
            .enumerate()
            .map(|(i, (name, direction))| {
                let column: Vec<f64> = fitness_table.iter().map(|row| row[i]).collect();
                ObjectiveSummary::from_column(name, *direction, &column)
            })
            .collect();

        let majority_vote = MajorityVote::compute(&individuals, feature_names, threshold);

        Ok(FrontResult {
            front: ParetoFront {
                individuals,
                fitness_table,
                normalized,
            },
            per_individual,
            majority_vote,
            objective_summary,
        })
    }

    pub fn len(&self) -> usize {
        self.front.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.front.individuals.is_empty()
    }

    pub fn display(&self) -> String {
        let mut text = format!("\x1b[1;93mPareto front\x1b[0m: {} individual(s)\n", self.len());
        for view in &self.per_individual {
            let objectives: Vec<String> = view
                .objective_values
                .iter()
                .map(|(name, value)| format!("{}={:.3}", name, value))
                .collect();
            text.push_str(&format!(
                "  #{:<6} | {} | [{}]\n",
                view.id,
                objectives.join(" "),
                view.selected_feature_names.join(", ")
            ));
        }

        text.push_str("\n\x1b[1;93mObjectives over the front\x1b[0m\n");
        for s in &self.objective_summary {
            text.push_str(&format!(
                "  {:<16} ({:?}) mean {:.3} ± {:.3} | min {:.3} | max {:.3}\n",
                s.name, s.direction, s.mean, s.std, s.min, s.max
            ));
        }

        text.push('\n');
        text.push_str(&self.majority_vote.display());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_population() -> Population {
        // objectives: error (minimize), num_features (minimize)
        let mut pop = Population::new();
        let records: Vec<(Vec<u8>, Vec<f64>)> = vec![
            (vec![1, 0, 0, 0], vec![0.30, 1.0]),
            (vec![1, 1, 0, 0], vec![0.20, 2.0]),
            (vec![1, 1, 1, 0], vec![0.10, 3.0]),
            (vec![0, 1, 1, 1], vec![0.40, 3.0]), // dominated
        ];
        for (genes, fitness) in records {
            let id = pop.allocate_id();
            pop.push(Individual::new(id, genes));
            pop.set_fitness(id, fitness);
        }
        pop
    }

    fn names() -> Vec<String> {
        crate::string_vec!["a", "b", "c", "d"]
    }

    #[test]
    fn test_front_result_extracts_first_front() {
        let pop = front_population();
        let objectives: Vec<String> = crate::string_vec!["error", "num_features"];
        let directions = [Direction::minimize, Direction::minimize];
        let result = FrontResult::new(&pop, &names(), &objectives, &directions, 0.5, ExtremePointMethod::axis_max).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.front.fitness_table[2], vec![0.10, 3.0]);
        assert_eq!(result.front.normalized.len(), 3);
        assert_eq!(result.per_individual[1].selected_feature_names, vec!["a", "b"]);
        assert_eq!(result.per_individual[0].objective_values[1], ("num_features".to_string(), 1.0));

        let summary = &result.objective_summary[1];
        assert_eq!(summary.mean, 2.0);
        assert_eq!((summary.min, summary.max), (1.0, 3.0));
        assert!((summary.std - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_majority_vote() {
        let pop = front_population();
        let objectives: Vec<String> = crate::string_vec!["error", "num_features"];
        let directions = [Direction::minimize, Direction::minimize];
        let result = FrontResult::new(&pop, &names(), &objectives, &directions, 0.5, ExtremePointMethod::axis_max).unwrap();
        let vote = &result.majority_vote;

        assert_eq!(vote.votes.len(), 4, "one vote per feature");
        let values: Vec<f64> = vote.votes.iter().map(|v| v.vote).collect();
        assert_eq!(values, vec![1.0, 2.0 / 3.0, 1.0 / 3.0, 0.0]);
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(vote.features_above_threshold, vec!["a", "b"]);
    }

    #[test]
    fn test_majority_vote_of_an_empty_front() {
        let vote = MajorityVote::compute(&[], &names(), 0.0);
        assert_eq!(vote.votes.len(), 4);
        assert!(vote.votes.iter().all(|v| v.vote == 0.0));
        assert!(vote.features_above_threshold.is_empty());
    }

    #[test]
    fn test_display_lists_front_and_votes() {
        let pop = front_population();
        let objectives: Vec<String> = crate::string_vec!["error", "num_features"];
        let directions = [Direction::minimize, Direction::minimize];
        let result = FrontResult::new(&pop, &names(), &objectives, &directions, 0.5, ExtremePointMethod::axis_max).unwrap();
        let text = crate::utils::strip_ansi(&result.display());
        assert!(text.contains("Pareto front: 3 individual(s)"));
        assert!(text.contains("error=0.100"));
        assert!(text.contains("2 feature(s) retained"));
    }
}
