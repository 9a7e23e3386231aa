use crate::cinfo;
use crate::error::{NsgaError, Result};
use crate::evaluator::{EvaluationPool, Evaluator};
use crate::individual::Individual;
use crate::niching::niche_select;
use crate::normalization::ExtremePointMethod;
use crate::param::Param;
use crate::pareto::{fronts_from_ranks, non_dominated_sort, to_minimize_space, Direction};
use crate::population::Population;
use crate::reference_points::generate_reference_points;
use log::{debug, info};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//-----------------------------------------------------------------------------
// Generation events
//-----------------------------------------------------------------------------

/// Summary of one completed generation
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct GenerationEvent {
    /// Generation index, 0 for the evaluation of the initial population
    pub generation: usize,
    /// Time spent on the whole generation, in seconds
    pub elapsed: f64,
    /// Time spent waiting for the evaluation barrier, in seconds
    pub evaluation_time: f64,
    /// Size of each front of the combined parent + children pool
    pub front_sizes: Vec<usize>,
    /// Individuals of the boundary front kept by niching
    pub niched: usize,
    /// Individuals that received the penalty fitness
    pub failures: usize,
    pub population_size: usize,
}

/// Receives an event after every generation
pub trait GenerationObserver {
    fn on_generation(&mut self, event: &GenerationEvent);
}

/// Logs a one-line summary of each generation
pub struct LogObserver {
    pub colorful: bool,
}

impl LogObserver {
    pub fn new(colorful: bool) -> LogObserver {
        LogObserver { colorful }
    }
}

impl GenerationObserver for LogObserver {
    fn on_generation(&mut self, event: &GenerationEvent) {
        cinfo!(self.colorful, "{}", display_generation(event));
    }
}

/// Formats a generation summary with ANSI colors
pub fn display_generation(event: &GenerationEvent) -> String {
    let first_front = event.front_sizes.first().copied().unwrap_or(0);
    let failures = if event.failures > 0 {
        format!(" | \x1b[1;91m{} failed evaluation(s)\x1b[0m", event.failures)
    } else {
        String::new()
    };
    format!(
        "\x1b[1;93m#{:<4}\x1b[0m | population {} | front 1: \x1b[1;92m{}\x1b[0m | {} fronts | niched {} | evaluation {:.3}s / {:.3}s{}",
        event.generation,
        event.population_size,
        first_front,
        event.front_sizes.len(),
        event.niched,
        event.evaluation_time,
        event.elapsed,
        failures
    )
}

/// Outcome of a run of the generational loop
#[derive(Clone, Debug)]
pub struct Evolution {
    /// Terminal population, evaluated, of exactly `population_size` individuals
    pub population: Population,
    pub events: Vec<GenerationEvent>,
    pub reference_points: Vec<Vec<f64>>,
    /// Number of completed generations
    pub generations: usize,
    /// true when the loop was stopped by the running flag
    pub interrupted: bool,
}

//-----------------------------------------------------------------------------
// Generational loop
//-----------------------------------------------------------------------------

/// Main function to run the NSGA-III loop
///
/// # Arguments
///
/// * `evaluator` - Computes the objective vector of an individual (objectives of `directions`)
/// * `feature_len` - Number of genes of each individual
/// * `directions` - Direction of each objective
/// * `param` - Parameters of the run
/// * `observer` - Receives an event after every generation
/// * `running` - Cleared to stop the loop at the next generation boundary
///
/// # Returns
///
/// The terminal population and the generation events
///
/// # Errors
///
/// Config errors, GenerationTimeout from the reference points, evaluation errors under the
/// `abort` failure policy
pub fn ga<E: Evaluator + ?Sized>(
    evaluator: &E,
    feature_len: usize,
    directions: &[Direction],
    param: &Param,
    observer: &mut dyn GenerationObserver,
    running: Arc<AtomicBool>,
) -> Result<Evolution> {
    let time = Instant::now();
    let population_size = param.nsga.population_size;

    if feature_len == 0 {
        return Err(NsgaError::Config("feature selection requires at least one feature".to_string()));
    }
    if directions.is_empty() {
        return Err(NsgaError::Config("at least one objective is required".to_string()));
    }
    if population_size < 2 {
        return Err(NsgaError::Config(format!(
            "population_size={} is below the 2 individuals required for cross-over",
            population_size
        )));
    }

    let reference_points = generate_reference_points(directions.len(), param.nsga.max_reference_points)?;
    info!(
        "{} objectives, {} reference points, {} individuals over {} features",
        directions.len(),
        reference_points.len(),
        population_size,
        feature_len
    );

    let pool = EvaluationPool::new(param.general.thread_number, param.nsga.failure_policy)?;
    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);

    // Initial population
    let mut pop = Population::new();
    pop.generate(population_size, feature_len, &mut rng);
    let (failures, evaluation_time) = evaluate_population(&pool, evaluator, &mut pop, directions)?;

    let initial_ranks = non_dominated_sort(&pop.fitness_table()?, directions);
    let initial_event = GenerationEvent {
        generation: 0,
        elapsed: time.elapsed().as_secs_f64(),
        evaluation_time,
        front_sizes: fronts_from_ranks(&initial_ranks).iter().map(|f| f.len()).collect(),
        niched: 0,
        failures,
        population_size: pop.len(),
    };
    observer.on_generation(&initial_event);
    let mut events = vec![initial_event];

    let mut generation = 0;
    let mut interrupted = false;

    while generation < param.nsga.max_generations {
        if !running.load(Ordering::Relaxed) {
            info!("Signal received, stopping after generation {}", generation);
            interrupted = true;
            break;
        }
        generation += 1;

        let event = evolve(
            &mut pop,
            evaluator,
            &pool,
            directions,
            &reference_points,
            param,
            generation,
            &mut rng,
        )?;
        observer.on_generation(&event);
        events.push(event);
    }

    if !interrupted {
        info!("Reach max generation");
    }
    debug!("Evolution completed in {:.3}s", time.elapsed().as_secs_f64());

    Ok(Evolution {
        population: pop,
        events,
        reference_points,
        generations: generation,
        interrupted,
    })
}

/// Evaluates the individuals without fitness record and stores their records
///
/// # Returns
///
/// The number of penalized individuals and the time spent, in seconds
pub fn evaluate_population<E: Evaluator + ?Sized>(
    pool: &EvaluationPool,
    evaluator: &E,
    pop: &mut Population,
    directions: &[Direction],
) -> Result<(usize, f64)> {
    let time = Instant::now();
    let report = {
        let pending = pop.unevaluated();
        pool.evaluate_all(evaluator, &pending, directions)?
    };
    for (id, objectives) in report.fitness {
        pop.set_fitness(id, objectives);
    }
    Ok((report.failures, time.elapsed().as_secs_f64()))
}

/// Run one generation: cross-over, mutation, evaluation and environmental selection
///
/// # Arguments
///
/// * `pop` - Evaluated population of N individuals, replaced by the N survivors
/// * `evaluator` - Objective evaluator
/// * `pool` - Worker pool evaluating the children
/// * `directions` - Direction of each objective
/// * `reference_points` - Reference directions of the run
/// * `param` - Parameters of the run
/// * `generation` - Index of the generation, stored in the children
/// * `rng` - Random number generator
///
/// # Returns
///
/// The event describing the generation
#[allow(clippy::too_many_arguments)]
pub fn evolve<E: Evaluator + ?Sized>(
    pop: &mut Population,
    evaluator: &E,
    pool: &EvaluationPool,
    directions: &[Direction],
    reference_points: &[Vec<f64>],
    param: &Param,
    generation: usize,
    rng: &mut ChaCha8Rng,
) -> Result<GenerationEvent> {
    let time = Instant::now();
    let population_size = pop.len();

    let mut children = cross_over(pop, rng);
    for child in children.individuals.iter_mut() {
        child.epoch = generation;
    }
    mutate(&mut children, param.nsga.mutation_rate, rng);

    let (failures, evaluation_time) = evaluate_population(pool, evaluator, &mut children, directions)?;
    pop.add(children);

    let selection = environmental_selection(
        pop,
        population_size,
        directions,
        reference_points,
        param.nsga.extreme_point_method,
        rng,
    )?;

    Ok(GenerationEvent {
        generation,
        elapsed: time.elapsed().as_secs_f64(),
        evaluation_time,
        front_sizes: selection.front_sizes,
        niched: selection.niched,
        failures,
        population_size: pop.len(),
    })
}

/// Builds one child per parent position: the shuffled parent at position i is paired with the
/// one at position N-1-i, and each gene of the child comes from either parent with probability 0.5
///
/// # Arguments
///
/// * `parents` - Parents population
/// * `rng` - Random number generator
///
/// # Returns
///
/// A population of `parents.len()` children with fresh ids, not evaluated yet
pub fn cross_over(parents: &Population, rng: &mut ChaCha8Rng) -> Population {
    let n = parents.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut children = Population::starting_at(parents.next_id());
    for i in 0..n {
        let p1 = &parents.individuals[order[i]];
        let p2 = &parents.individuals[order[n - 1 - i]];

        let genes = p1
            .genes
            .iter()
            .zip(p2.genes.iter())
            .map(|(g1, g2)| if rng.gen_bool(0.5) { *g1 } else { *g2 })
            .collect();

        let id = children.allocate_id();
        let mut child = Individual::new(id, genes);
        child.parents = Some([p1.id, p2.id]);
        children.push(child);
    }

    children
}

/// Mutates each child, gene by gene, then repairs the children left without any feature
pub fn mutate(children: &mut Population, mutation_rate: f64, rng: &mut ChaCha8Rng) {
    let mut repaired = 0;
    for individual in children.individuals.iter_mut() {
        mutate_binary(individual, mutation_rate, rng);
        if individual.repair(rng) {
            repaired += 1;
        }
    }
    if repaired > 0 {
        debug!("{} children repaired after mutation", repaired);
    }
}

/// Flips each gene with probability `mutation_rate`
pub fn mutate_binary(individual: &mut Individual, mutation_rate: f64, rng: &mut ChaCha8Rng) {
    let p = mutation_rate.clamp(0.0, 1.0);
    for gene in individual.genes.iter_mut() {
        if rng.gen_bool(p) {
            *gene = 1 - (*gene).min(1);
        }
    }
}

/// Sizes reported by an environmental selection
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionOutcome {
    pub front_sizes: Vec<usize>,
    /// Individuals of the boundary front kept by niching
    pub niched: usize,
}

/// Reduces an evaluated pool to `n` survivors: whole fronts in rank order while they fit,
/// then a niching selection on the first front that does not
///
/// # Errors
///
/// Data error if an individual has no fitness record, SelectionUnderflow if fewer than `n`
/// individuals survive
pub fn environmental_selection(
    pop: &mut Population,
    n: usize,
    directions: &[Direction],
    reference_points: &[Vec<f64>],
    method: ExtremePointMethod,
    rng: &mut ChaCha8Rng,
) -> Result<SelectionOutcome> {
    if pop.len() < n {
        return Err(NsgaError::SelectionUnderflow {
            requested: n,
            available: pop.len(),
        });
    }

    let ids = pop.ids();
    let table = pop.fitness_table()?;
    let fronts = fronts_from_ranks(&non_dominated_sort(&table, directions));
    let front_sizes: Vec<usize> = fronts.iter().map(|f| f.len()).collect();

    let mut survivors: Vec<u64> = Vec::with_capacity(n);
    let mut niched = 0;
    for front in &fronts {
        if survivors.len() + front.len() <= n {
            survivors.extend(front.iter().map(|&row| ids[row]));
            continue;
        }

        let remaining = n - survivors.len();
        if remaining > 0 {
            let boundary_ids: Vec<u64> = front.iter().map(|&row| ids[row]).collect();
            let boundary_values: Vec<Vec<f64>> = front
                .iter()
                .map(|&row| to_minimize_space(&table[row], directions))
                .collect();
            let chosen = niche_select(&boundary_ids, &boundary_values, remaining, reference_points, method, rng)?;
            niched = chosen.len();
            survivors.extend(chosen);
        }
        break;
    }

    let retired = pop.retain_ids(&survivors);
    debug!("{} individuals retired, {} survivors", retired, pop.len());
    if pop.len() != n {
        return Err(NsgaError::SelectionUnderflow {
            requested: n,
            available: pop.len(),
        });
    }

    Ok(SelectionOutcome { front_sizes, niched })
}
