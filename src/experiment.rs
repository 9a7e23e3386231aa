use crate::error::{NsgaError, Result};
use crate::ga::{Evolution, GenerationEvent};
use crate::param::Param;
use crate::pareto::Direction;
use crate::voting::FrontResult;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timing and counting figures of a run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RuntimeStats {
    /// Wall time of the whole run, in seconds
    pub execution_time: f64,
    /// Time spent in evaluation barriers, in seconds
    pub evaluation_time: f64,
    pub generations: usize,
    pub evaluations: usize,
    /// Evaluations that ended with the penalty fitness
    pub failures: usize,
    pub reference_points: usize,
    /// true when the run was stopped before `max_generations`
    pub interrupted: bool,
}

impl RuntimeStats {
    pub fn from_evolution(evolution: &Evolution, execution_time: f64) -> RuntimeStats {
        // generation 0 evaluates the initial population, later ones the children
        RuntimeStats {
            execution_time,
            evaluation_time: evolution.events.iter().map(|e| e.evaluation_time).sum(),
            generations: evolution.generations,
            evaluations: evolution.events.iter().map(|e| e.population_size).sum(),
            failures: evolution.events.iter().map(|e| e.failures).sum(),
            reference_points: evolution.reference_points.len(),
            interrupted: evolution.interrupted,
        }
    }
}

/// Complete run data and results
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Experiment {
    /// Experiment ID, i.e., timestamp and crate name
    pub id: String,
    /// Timestamp of the experiment
    pub timestamp: String,
    /// Crate version and git hash used
    pub version: String,
    /// Parameters used
    pub parameters: Param,

    /// Dataset feature names, in gene order
    pub feature_names: Vec<String>,
    /// Objective names, in fitness column order
    pub objective_names: Vec<String>,
    pub directions: Vec<Direction>,

    /// First front of the terminal population and its aggregates
    pub result: FrontResult,
    pub runtime_stats: RuntimeStats,
    /// Generation events, kept when `general.keep_trace` is set
    pub trace: Option<Vec<GenerationEvent>>,
}

impl Experiment {
    pub fn display_results(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("\n=============== Experiment {} ===============\n\n", self.id));
        text.push_str(&format!("nsga3fs version: v{}\n", self.version));
        text.push_str(&format!("Timestamp: {}\n", self.timestamp));
        text.push_str(&format!(
            "Execution time: {:.2}s ({:.2}s evaluating)\n",
            self.runtime_stats.execution_time, self.runtime_stats.evaluation_time
        ));
        text.push_str(&format!(
            "Generations: {}{} | evaluations: {} | failures: {} | reference points: {}\n",
            self.runtime_stats.generations,
            if self.runtime_stats.interrupted { " (interrupted)" } else { "" },
            self.runtime_stats.evaluations,
            self.runtime_stats.failures,
            self.runtime_stats.reference_points
        ));
        let objectives: Vec<String> = self
            .objective_names
            .iter()
            .zip(&self.directions)
            .map(|(name, direction)| format!("{} ({:?})", name, direction))
            .collect();
        text.push_str(&format!("Objectives: {}\n", objectives.join(", ")));
        text.push_str(&format!("Parameters: \x1b[2;97m{:?}\x1b[0m\n\n", &self.parameters));
        text.push_str(&self.result.display());
        text
    }

    /// Saves the experiment in a suitable format based on file extension.
    pub fn save_auto<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "json" => self.save_json(path),
            "yaml" | "yml" => self.save_yaml(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving experiment in bincode.");
                self.save_bincode(path.with_extension("bin"))
            }
        }
    }

    /// true when a front value or summary is infinite or NaN (penalized individuals)
    pub fn has_non_finite_values(&self) -> bool {
        let front = &self.result.front;
        front.fitness_table.iter().chain(&front.normalized).flatten().any(|v| !v.is_finite())
            || self
                .result
                .objective_summary
                .iter()
                .any(|s| ![s.mean, s.std, s.min, s.max].iter().all(|v| v.is_finite()))
    }

    /// Saves to JSON (non finite objective values are written as null)
    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.has_non_finite_values() {
            warn!("The experiment holds non-finite values, JSON writes them as null and cannot load them back. Use YAML or bincode to keep them.");
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn save_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves as Bincode (compact binary, Rust-only)
    fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads the experiment from a file, automatically detecting the format based on file extension.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the experiment file.
    ///
    /// # Returns
    ///
    /// Result containing the loaded Experiment or an error.
    pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading experiment {}...", path.display());
        match extension(path).as_str() {
            "json" => Self::load_json(path),
            "yaml" | "yml" => Self::load_yaml(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_with_fallback(path),
        }
    }

    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Tries Bincode, then JSON, and finally YAML.
    fn load_with_fallback(path: &Path) -> Result<Self> {
        if let Ok(experiment) = Self::load_bincode(path) {
            return Ok(experiment);
        }
        if let Ok(experiment) = Self::load_json(path) {
            return Ok(experiment);
        }
        if let Ok(experiment) = Self::load_yaml(path) {
            return Ok(experiment);
        }
        Err(NsgaError::Data(format!("unable to load the experiment {}", path.display())))
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Individual;
    use crate::normalization::ExtremePointMethod;
    use crate::population::Population;

    impl Experiment {
        pub fn test() -> Experiment {
            let mut pop = Population::new();
            for (genes, fitness) in [(vec![1, 0, 1], vec![0.8, 2.0]), (vec![0, 1, 0], vec![0.6, 1.0])] {
                let id = pop.allocate_id();
                pop.push(Individual::new(id, genes));
                pop.set_fitness(id, fitness);
            }
            let feature_names: Vec<String> = crate::string_vec!["f1", "f2", "f3"];
            let objective_names: Vec<String> = crate::string_vec!["auc", "num_features"];
            let directions = vec![Direction::maximize, Direction::minimize];
            let result = FrontResult::new(
                &pop,
                &feature_names,
                &objective_names,
                &directions,
                0.5,
                ExtremePointMethod::axis_max,
            )
            .unwrap();

            Experiment {
                id: "test_experiment".to_string(),
                timestamp: "2024-01-01 00:00:00".to_string(),
                version: "0.1.0#test".to_string(),
                parameters: Param::default(),
                feature_names,
                objective_names,
                directions,
                result,
                runtime_stats: RuntimeStats {
                    execution_time: 1.5,
                    evaluation_time: 1.0,
                    generations: 3,
                    evaluations: 8,
                    failures: 0,
                    reference_points: 11,
                    interrupted: false,
                },
                trace: None,
            }
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("nsga3fs_experiment_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_save_and_load_each_format() {
        let experiment = Experiment::test();
        for name in ["exp.yaml", "exp.bin"] {
            let path = temp_path(name);
            experiment.save_auto(&path).unwrap();
            let loaded = Experiment::load_auto(&path).unwrap();
            assert_eq!(loaded, experiment, "{} should restore the experiment", name);
            std::fs::remove_file(&path).ok();
        }
    }

    #[test]
    fn test_save_and_load_json() {
        let experiment = Experiment::test();
        let path = temp_path("exp.json");
        experiment.save_auto(&path).unwrap();
        let loaded = Experiment::load_auto(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.id, experiment.id);
        assert_eq!(loaded.parameters, experiment.parameters);
        assert_eq!(loaded.result.front.individuals, experiment.result.front.individuals);
        assert_eq!(loaded.result.majority_vote.features_above_threshold, experiment.result.majority_vote.features_above_threshold);
        for (a, b) in loaded.result.objective_summary.iter().zip(&experiment.result.objective_summary) {
            assert!((a.mean - b.mean).abs() < 1e-12 && (a.std - b.std).abs() < 1e-12);
        }
    }

    #[test]
    fn test_non_finite_values_are_detected() {
        let mut experiment = Experiment::test();
        assert!(!experiment.has_non_finite_values());

        experiment.result.front.fitness_table[1][0] = f64::NEG_INFINITY;
        assert!(experiment.has_non_finite_values());

        let path = temp_path("penalized.json");
        experiment.save_auto(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(content.contains("null"), "JSON writes non-finite values as null");

        let mut experiment = Experiment::test();
        experiment.result.objective_summary[0].std = f64::NAN;
        assert!(experiment.has_non_finite_values());
    }

    #[test]
    fn test_unknown_extension_falls_back_to_bincode() {
        let experiment = Experiment::test();
        let path = temp_path("exp.unknown");
        experiment.save_auto(&path).unwrap();
        let saved = path.with_extension("bin");
        assert!(saved.exists());

        let renamed = temp_path("exp.data");
        std::fs::rename(&saved, &renamed).unwrap();
        assert_eq!(Experiment::load_auto(&renamed).unwrap(), experiment);
        std::fs::remove_file(&renamed).ok();
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(Experiment::load_auto(temp_path("missing.json")).is_err());
    }

    #[test]
    fn test_display_results() {
        let text = crate::utils::strip_ansi(&Experiment::test().display_results());
        assert!(text.contains("Experiment test_experiment"));
        assert!(text.contains("Objectives: auc (maximize), num_features (minimize)"));
        assert!(text.contains("Pareto front: 2 individual(s)"));
    }
}
