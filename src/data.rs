use crate::error::{NsgaError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[allow(non_snake_case)]
pub struct Data {
    pub X: Vec<Vec<f64>>,      // Feature values, one row per sample
    pub y: Vec<u8>,            // Binary target values
    pub features: Vec<String>, // Feature names (header of the data file)
    pub samples: Vec<String>,
    pub target: String,
    pub feature_len: usize,
    pub sample_len: usize,
}

impl Data {
    /// Create a new `Data` instance with default values
    pub fn new() -> Data {
        Data {
            X: Vec::new(),
            y: Vec::new(),
            features: Vec::new(),
            samples: Vec::new(),
            target: String::new(),
            feature_len: 0,
            sample_len: 0,
        }
    }

    /// Build a dataset from in-memory values; `X` holds one row per sample
    #[allow(non_snake_case)]
    pub fn from_matrix(features: Vec<String>, X: Vec<Vec<f64>>, y: Vec<u8>) -> Result<Data> {
        if X.len() != y.len() {
            return Err(NsgaError::Data(format!("{} rows of features for {} target values", X.len(), y.len())));
        }
        if let Some((i, row)) = X.iter().enumerate().find(|(_, row)| row.len() != features.len()) {
            return Err(NsgaError::Data(format!(
                "sample #{} has {} values for {} features",
                i,
                row.len(),
                features.len()
            )));
        }

        let data = Data {
            samples: (0..X.len()).map(|i| format!("sample_{}", i + 1)).collect(),
            feature_len: features.len(),
            sample_len: X.len(),
            target: "class".to_string(),
            features,
            X,
            y,
        };
        data.check_target()?;
        Ok(data)
    }

    /// Load a delimited file where each row is a sample, `target` names the class column and
    /// `sample_column`, if not empty, names the column holding sample identifiers.
    /// All other columns are features.
    pub fn load_data(&mut self, path: &str, target: &str, delimiter: &str, sample_column: &str) -> Result<()> {
        info!("Loading file {}...", path);
        let delimiter = match delimiter.as_bytes() {
            [d] => *d,
            _ => return Err(NsgaError::Data(format!("delimiter {:?} must be a single byte", delimiter))),
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let target_idx = headers
            .iter()
            .position(|h| h == target)
            .ok_or_else(|| NsgaError::Data(format!("target column '{}' is absent from {}", target, path)))?;
        let sample_idx = if sample_column.is_empty() {
            None
        } else {
            Some(headers.iter().position(|h| h == sample_column).ok_or_else(|| {
                NsgaError::Data(format!("sample column '{}' is absent from {}", sample_column, path))
            })?)
        };

        let feature_idx: Vec<usize> = (0..headers.len())
            .filter(|i| *i != target_idx && Some(*i) != sample_idx)
            .collect();

        self.features = feature_idx.iter().map(|i| headers[*i].clone()).collect();
        self.target = target.to_string();
        self.X = Vec::new();
        self.y = Vec::new();
        self.samples = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("");

            let class = match field(target_idx) {
                "0" | "0.0" => 0,
                "1" | "1.0" => 1,
                other => {
                    return Err(NsgaError::Data(format!(
                        "row {}: target value '{}' is not a binary class (0/1)",
                        row + 1,
                        other
                    )))
                }
            };

            let mut values = Vec::with_capacity(feature_idx.len());
            for &i in &feature_idx {
                let value: f64 = field(i).parse().map_err(|_| {
                    NsgaError::Data(format!("row {}: value '{}' of {} is not numeric", row + 1, field(i), headers[i]))
                })?;
                values.push(value);
            }

            self.samples.push(match sample_idx {
                Some(i) => field(i).to_string(),
                None => format!("sample_{}", row + 1),
            });
            self.X.push(values);
            self.y.push(class);
        }

        self.feature_len = self.features.len();
        self.sample_len = self.samples.len();

        if self.sample_len == 0 || self.feature_len == 0 {
            return Err(NsgaError::Data(format!(
                "{} holds {} samples and {} features",
                path, self.sample_len, self.feature_len
            )));
        }
        self.check_target()?;

        Ok(())
    }

    fn check_target(&self) -> Result<()> {
        if let Some(v) = self.y.iter().find(|v| **v > 1) {
            return Err(NsgaError::Data(format!("target value {} is not a binary class (0/1)", v)));
        }
        let positives = self.y.iter().filter(|v| **v == 1).count();
        if positives == 0 || positives == self.sample_len {
            warn!("Only one class is present in {}: classification metrics will be uninformative.", self.target);
        }
        Ok(())
    }

    /// Indices of class 0 and class 1 samples
    pub fn class_indices(&self) -> (Vec<usize>, Vec<usize>) {
        let mut indices_class0: Vec<usize> = Vec::new();
        let mut indices_class1: Vec<usize> = Vec::new();
        for (i, f) in self.y.iter().enumerate() {
            if *f == 0 {
                indices_class0.push(i)
            } else if *f == 1 {
                indices_class1.push(i)
            }
        }
        (indices_class0, indices_class1)
    }

    /// Score of each listed sample for a feature subset: sum of the selected feature values
    pub fn subset_scores(&self, selected: &[usize], samples: &[usize]) -> Vec<f64> {
        samples
            .iter()
            .map(|&s| selected.iter().map(|&j| self.X[s][j]).sum())
            .collect()
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positives = self.y.iter().filter(|v| **v == 1).count();
        write!(
            f,
            "Data: {} samples x {} features | target '{}': {} class 1, {} class 0",
            self.sample_len,
            self.feature_len,
            self.target,
            positives,
            self.sample_len - positives
        )
    }
}
