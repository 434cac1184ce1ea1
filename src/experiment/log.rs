use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainErr};

/// An append-only metric history with a fixed key set.
///
/// The key set is established by the first appended row; every later row must
/// carry exactly the same keys, in the same order. This keeps per-key columns
/// rectangular so they can be read back, exported, or compared epoch by epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricLog {
    keys: Vec<String>,
    epochs: Vec<usize>,
    rows: Vec<Vec<f32>>,
}

impl MetricLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows logged so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn epochs(&self) -> &[usize] {
        &self.epochs
    }

    /// Appends one row of values under the given keys.
    ///
    /// # Errors
    /// Returns `TrainErr::MetricKeysMismatch` when the keys differ from the
    /// log's established keys, and `TrainErr::SizeMismatch` when the value
    /// count differs from the key count.
    pub fn append(&mut self, keys: &[String], epoch: usize, values: Vec<f32>) -> Result<()> {
        if self.keys.is_empty() && self.rows.is_empty() {
            self.keys = keys.to_vec();
        } else if self.keys != keys {
            return Err(TrainErr::MetricKeysMismatch {
                expected: self.keys.clone(),
                got: keys.to_vec(),
            });
        }

        if values.len() != self.keys.len() {
            return Err(TrainErr::SizeMismatch {
                what: "metric values",
                got: values.len(),
                expected: self.keys.len(),
            });
        }

        self.epochs.push(epoch);
        self.rows.push(values);

        Ok(())
    }

    /// The column of values logged under `key`, if the key exists.
    pub fn column(&self, key: &str) -> Option<Vec<f32>> {
        let index = self.keys.iter().position(|k| k == key)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    /// The last logged epoch and its values.
    pub fn last(&self) -> Option<(usize, &[f32])> {
        let row = self.rows.last()?;
        Some((*self.epochs.last()?, row.as_slice()))
    }

    /// Writes the history as CSV with an `epoch` column followed by one
    /// column per key.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["epoch".to_string()];
        header.extend(self.keys.iter().cloned());
        writer.write_record(&header)?;

        for (epoch, row) in self.epochs.iter().zip(&self.rows) {
            let mut record = vec![epoch.to_string()];
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush().map_err(TrainErr::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn first_append_fixes_the_keys() {
        let mut log = MetricLog::new();

        log.append(&keys(&["loss", "accuracy"]), 1, vec![0.5, 0.7])
            .unwrap();

        assert_eq!(log.keys(), keys(&["loss", "accuracy"]));

        let got = log.append(&keys(&["loss"]), 2, vec![0.4]);
        assert!(matches!(got, Err(TrainErr::MetricKeysMismatch { .. })));
    }

    #[test]
    fn value_count_must_match_keys() {
        let mut log = MetricLog::new();

        let got = log.append(&keys(&["loss", "accuracy"]), 1, vec![0.5]);
        assert!(matches!(got, Err(TrainErr::SizeMismatch { .. })));
    }

    #[test]
    fn columns_read_back_by_key() {
        let mut log = MetricLog::new();
        let ks = keys(&["loss", "accuracy"]);

        log.append(&ks, 1, vec![0.5, 0.6]).unwrap();
        log.append(&ks, 2, vec![0.3, 0.8]).unwrap();

        assert_eq!(log.column("loss"), Some(vec![0.5, 0.3]));
        assert_eq!(log.column("accuracy"), Some(vec![0.6, 0.8]));
        assert_eq!(log.column("missing"), None);
        assert_eq!(log.last(), Some((2, [0.3, 0.8].as_slice())));
    }

    #[test]
    fn json_round_trip_preserves_everything() {
        let mut log = MetricLog::new();
        log.append(&keys(&["loss"]), 1, vec![0.9]).unwrap();
        log.append(&keys(&["loss"]), 2, vec![0.7]).unwrap();

        let json = serde_json::to_string(&log).unwrap();
        let back: MetricLog = serde_json::from_str(&json).unwrap();

        assert_eq!(back, log);
    }
}
