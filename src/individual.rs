use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature subset encoded as a binary vector, one gene per feature
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    /// Stable identifier aligning the individual with its fitness record
    pub id: u64,
    /// Gene j is 1 when feature j is selected, 0 otherwise
    pub genes: Vec<u8>,
    /// Generation that led to the emergence of the individual (0 for the initial population)
    pub epoch: usize,
    /// Parents of the individual in the generation context
    pub parents: Option<[u64; 2]>,
}

impl Individual {
    pub fn new(id: u64, genes: Vec<u8>) -> Individual {
        Individual {
            id,
            genes,
            epoch: 0,
            parents: None,
        }
    }

    /// Draws each gene independently with probability `density` of being selected
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier of the new individual
    /// * `feature_len` - Number of genes
    /// * `density` - Inclusion probability of each gene, clamped to [0, 1]
    /// * `rng` - Random number generator
    ///
    /// # Returns
    ///
    /// A repaired Individual, i.e. with at least one selected feature when `feature_len > 0`
    pub fn random(id: u64, feature_len: usize, density: f64, rng: &mut ChaCha8Rng) -> Individual {
        let density = density.clamp(0.0, 1.0);
        let genes = (0..feature_len).map(|_| rng.gen_bool(density) as u8).collect();
        let mut individual = Individual::new(id, genes);
        individual.repair(rng);
        individual
    }

    /// Number of selected features
    pub fn k(&self) -> usize {
        self.genes.iter().filter(|g| **g != 0).count()
    }

    /// Forces one random gene to 1 when no feature is selected
    ///
    /// # Returns
    ///
    /// true if the individual had to be repaired
    pub fn repair(&mut self, rng: &mut ChaCha8Rng) -> bool {
        if self.genes.is_empty() || self.k() > 0 {
            return false;
        }
        let idx = rng.gen_range(0..self.genes.len());
        self.genes[idx] = 1;
        true
    }

    /// Indices of the selected features, in increasing order
    pub fn selected_features(&self) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter(|(_, g)| **g != 0)
            .map(|(j, _)| j)
            .collect()
    }

    /// Names of the selected features
    pub fn selected_feature_names(&self, feature_names: &[String]) -> Vec<String> {
        self.selected_features()
            .into_iter()
            .filter_map(|j| feature_names.get(j).cloned())
            .collect()
    }
}

impl fmt::Debug for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genes: String = self.genes.iter().map(|g| if *g != 0 { '1' } else { '0' }).collect();
        write!(f, "#{} [{}] k={} epoch={}", self.id, genes, self.k(), self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_k_and_selected_features() {
        let individual = Individual::new(7, vec![1, 0, 1, 1, 0]);
        assert_eq!(individual.k(), 3);
        assert_eq!(individual.selected_features(), vec![0, 2, 3]);
        let names: Vec<String> = crate::string_vec!["a", "b", "c", "d", "e"];
        assert_eq!(individual.selected_feature_names(&names), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_repair_sets_exactly_one_gene() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut individual = Individual::new(0, vec![0; 6]);
        assert!(individual.repair(&mut rng));
        assert_eq!(individual.k(), 1);
        assert!(!individual.repair(&mut rng), "a valid individual must be left untouched");
        assert_eq!(individual.k(), 1);
    }

    #[test]
    fn test_random_never_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for id in 0..200 {
            let individual = Individual::random(id, 3, 0.0, &mut rng);
            assert_eq!(individual.k(), 1, "density 0 draws must be repaired to a single feature");
        }
        let full = Individual::random(0, 5, 1.0, &mut rng);
        assert_eq!(full.k(), 5);
    }

    #[test]
    fn test_debug_display() {
        let individual = Individual::new(3, vec![1, 0, 1]);
        assert_eq!(format!("{:?}", individual), "#3 [101] k=2 epoch=0");
    }
}
