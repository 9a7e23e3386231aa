use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// a macro to declare simple Vec<String>
#[macro_export]
macro_rules! string_vec {
    ($($x:expr),*) => {
        vec![$($x.into()),*]
    };
}

/// info! that keeps ANSI colors only when colorful display is requested
#[macro_export]
macro_rules! cinfo {
    ($colorful:expr, $($arg:tt)+) => {
        if $colorful {
            log::info!($($arg)+);
        } else {
            log::info!("{}", $crate::utils::strip_ansi(&format!($($arg)+)));
        }
    };
}

/// Removes ANSI escape sequences (e.g. "\x1b[1;93m") from a string
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // parameters end with a letter
            while let Some(&n) = chars.peek() {
                chars.next();
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// a function used essentially in resampling that split randomly a Vec<T> into p Vec<T> of approximatively the same size
pub fn split_into_balanced_random_chunks<T: std::clone::Clone>(vec: Vec<T>, p: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<T>> {
    // Step 1: Shuffle the original vector
    let mut shuffled = vec;
    shuffled.shuffle(rng);

    // Step 2: Determine sizes for balanced chunks
    let n = shuffled.len();
    let base_size = n / p; // Minimum size for each chunk
    let extra_elements = n % p; // Remaining elements to distribute

    // Step 3: Create chunks with balanced sizes
    let mut chunks = Vec::new();
    let mut start = 0;

    for i in 0..p {
        let chunk_size = base_size + if i < extra_elements { 1 } else { 0 }; // Add one extra element to the first `extra_elements` chunks
        let end = start + chunk_size;
        chunks.push(shuffled[start..end].to_vec());
        start = end;
    }

    chunks
}

//-----------------------------------------------------------------------------
// Binary classification metrics
//-----------------------------------------------------------------------------

/// Counts of a binary prediction against its ground truth (class 2 samples are ignored)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_count: usize,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

impl ConfusionMatrix {
    /// Classifies `value[i] > threshold` as class 1
    pub fn from_value(value: &[f64], y: &[u8], threshold: f64) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::default();
        for (v, class) in value.iter().zip(y.iter()) {
            match (*class, *v > threshold) {
                (1, true) => cm.tp += 1,
                (1, false) => cm.fn_count += 1,
                (0, true) => cm.fp += 1,
                (0, false) => cm.tn += 1,
                _ => {}
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_count
    }

    pub fn accuracy(&self) -> f64 {
        ratio((self.tp + self.tn) as f64, self.total() as f64)
    }

    pub fn sensitivity(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_count) as f64)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fp) as f64)
    }

    pub fn ppv(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fp) as f64)
    }

    pub fn npv(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fn_count) as f64)
    }

    pub fn f1_score(&self) -> f64 {
        let (precision, recall) = (self.ppv(), self.sensitivity());
        ratio(2.0 * precision * recall, precision + recall)
    }

    pub fn g_mean(&self) -> f64 {
        (self.sensitivity() * self.specificity()).sqrt()
    }

    /// Matthews correlation coefficient, 0 when a margin is empty
    pub fn mcc(&self) -> f64 {
        let (tp, fp, tn, fn_count) = (self.tp as f64, self.fp as f64, self.tn as f64, self.fn_count as f64);
        let den = ((tp + fp) * (tp + fn_count) * (tn + fp) * (tn + fn_count)).sqrt();
        ratio(tp * tn - fp * fn_count, den)
    }
}

/// Area under the ROC curve of a score against the classes (Mann-Whitney formulation, ties count for half)
pub fn compute_auc_from_value(value: &[f64], y: &[u8]) -> f64 {
    let mut scored: Vec<(f64, u8)> = value.iter().zip(y.iter())
        .filter(|(_, &class)| class == 0 || class == 1)
        .map(|(&v, &class)| (v, class))
        .collect();

    let n1 = scored.iter().filter(|(_, c)| *c == 1).count() as f64;
    let n0 = scored.len() as f64 - n1;
    if n0 == 0.0 || n1 == 0.0 {
        return 0.5;
    }

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Average ranks over ties
    let mut rank_sum_1 = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let start = i;
        while i + 1 < scored.len() && scored[i].0 == scored[i + 1].0 {
            i += 1;
        }
        let rank = (start + i + 2) as f64 / 2.0;
        for j in start..=i {
            if scored[j].1 == 1 {
                rank_sum_1 += rank;
            }
        }
        i += 1;
    }

    (rank_sum_1 - n1 * (n1 + 1.0) / 2.0) / (n0 * n1)
}

/// Threshold maximizing Youden's index (sensitivity + specificity - 1) for the rule `value > threshold`
///
/// Candidate thresholds are the observed values and one value below the minimum, so that
/// the "everything positive" rule is also considered. Ties keep the lowest threshold.
pub fn youden_threshold(value: &[f64], y: &[u8]) -> f64 {
    let mut candidates: Vec<f64> = value.iter().copied().filter(|v| v.is_finite()).collect();
    candidates.sort_by(|a, b| a.total_cmp(b));
    candidates.dedup();

    let Some(&lowest) = candidates.first() else {
        return 0.0;
    };

    let mut best_threshold = lowest - 1.0;
    let mut best_youden = f64::NEG_INFINITY;
    for threshold in std::iter::once(lowest - 1.0).chain(candidates.into_iter()) {
        let cm = ConfusionMatrix::from_value(value, y, threshold);
        let youden = cm.sensitivity() + cm.specificity() - 1.0;
        if youden > best_youden {
            best_youden = youden;
            best_threshold = threshold;
        }
    }
    best_threshold
}
