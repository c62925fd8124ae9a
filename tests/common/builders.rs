//! Test data builders for creating test objects

use dataprep_rs::action::{ActionStep, Parameters};
use dataprep_rs::source::VecSource;
use serde_json::Value;

/// Builder for in-memory datasets of string columns
pub struct DatasetBuilder {
    names: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DatasetBuilder {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows.push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// One column, one row per value
    pub fn column(name: &str, values: &[&str]) -> Self {
        values
            .iter()
            .fold(Self::new(&[name]), |builder, value| builder.row(&[value]))
    }

    pub fn build(self) -> VecSource {
        let rows: Vec<Vec<&str>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        VecSource::from_values(&self.names, &rows)
    }
}

/// Builder for action steps
pub struct StepBuilder {
    action: String,
    parameters: Parameters,
}

impl StepBuilder {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            parameters: Parameters::new(),
        }
    }

    pub fn column(self, id: &str) -> Self {
        self.param("column_id", id)
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn build(self) -> ActionStep {
        ActionStep::new(self.action, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataprep_rs::source::RowSource;

    #[test]
    fn test_dataset_builder() {
        let mut source = DatasetBuilder::new(&["a", "b"]).row(&["1", "2"]).build();
        assert_eq!(source.metadata().len(), 2);
        let row = source.next_row().unwrap().unwrap();
        assert_eq!(row.get("0001"), Some("2"));
    }
}
