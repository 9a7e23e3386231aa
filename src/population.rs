use crate::error::{NsgaError, Result};
use crate::individual::Individual;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::mem;

/// Ordered collection of individuals and the arena of their fitness records
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct Population {
    pub individuals: Vec<Individual>,
    /// Objective vector of each evaluated individual, keyed by individual id
    pub fitness: HashMap<u64, Vec<f64>>,
    next_id: u64,
}

impl Population {
    pub fn new() -> Population {
        Population {
            individuals: Vec::new(),
            fitness: HashMap::new(),
            next_id: 0,
        }
    }

    /// Empty population whose first allocated id is `first_id`
    pub fn starting_at(first_id: u64) -> Population {
        let mut pop = Population::new();
        pop.next_id = first_id;
        pop
    }

    /// Reserves a fresh individual id
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// First id that has not been handed out yet
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.individuals.iter().map(|i| i.id).collect()
    }

    /// Generates `population_size` individuals whose gene inclusion probability ramps
    /// linearly from 0.1 (first individual) to 0.9 (last individual)
    ///
    /// # Arguments
    ///
    /// * `population_size` - Number of individuals to add
    /// * `feature_len` - Number of genes per individual
    /// * `rng` - Random number generator
    pub fn generate(&mut self, population_size: usize, feature_len: usize, rng: &mut ChaCha8Rng) {
        for i in 0..population_size {
            let density = if population_size > 1 {
                0.1 + 0.8 * i as f64 / (population_size - 1) as f64
            } else {
                0.1
            };
            let id = self.allocate_id();
            self.individuals.push(Individual::random(id, feature_len, density, rng));
        }
    }

    /// Appends an individual built elsewhere, keeping the id counter ahead of its id
    pub fn push(&mut self, individual: Individual) {
        self.next_id = self.next_id.max(individual.id + 1);
        self.individuals.push(individual);
    }

    /// Moves all individuals and fitness records of `population` into `self`
    pub fn add(&mut self, population: Population) {
        self.next_id = self.next_id.max(population.next_id);
        for individual in population.individuals {
            self.push(individual);
        }
        self.fitness.extend(population.fitness);
    }

    pub fn set_fitness(&mut self, id: u64, objectives: Vec<f64>) {
        self.fitness.insert(id, objectives);
    }

    /// Fitness table in population order, one row per individual
    ///
    /// # Errors
    ///
    /// Returns a Data error if an individual has not been evaluated
    pub fn fitness_table(&self) -> Result<Vec<Vec<f64>>> {
        self.individuals
            .iter()
            .map(|i| {
                self.fitness
                    .get(&i.id)
                    .cloned()
                    .ok_or_else(|| NsgaError::Data(format!("individual #{} has no fitness record", i.id)))
            })
            .collect()
    }

    /// Individuals not evaluated yet
    pub fn unevaluated(&self) -> Vec<&Individual> {
        self.individuals.iter().filter(|i| !self.fitness.contains_key(&i.id)).collect()
    }

    /// Keeps only the listed ids, in the order of `ids`, and retires the fitness records of the others
    ///
    /// # Returns
    ///
    /// The number of individuals retired
    pub fn retain_ids(&mut self, ids: &[u64]) -> usize {
        let individuals = mem::take(&mut self.individuals);
        let before = individuals.len();
        let mut by_id: HashMap<u64, Individual> = individuals.into_iter().map(|i| (i.id, i)).collect();

        self.individuals = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        let kept: HashSet<u64> = self.individuals.iter().map(|i| i.id).collect();
        self.fitness.retain(|id, _| kept.contains(id));

        before - self.individuals.len()
    }

}
