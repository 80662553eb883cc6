//! Built-in training task profiles
//!
//! The rotation and vertical pipelines share all of their logic; a task
//! carries only the input filename, the column names, and the artifact
//! names it writes.

use std::fmt;
use std::path::PathBuf;

use crate::DataConfig;

/// Fixed file and column names for one training task
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub csv_filename: &'static str,
    pub feature_column: &'static str,
    pub label_column: &'static str,
    /// Stem shared by the checkpoint and history artifacts
    pub model_stem: &'static str,
    pub quantized_filename: &'static str,
    pub encoder_filename: &'static str,
}

impl TaskSpec {
    pub fn csv_path(&self, data: &DataConfig) -> PathBuf {
        PathBuf::from(&data.data_dir).join(self.csv_filename)
    }

    /// Checkpoint path stem; Burn appends the .mpk extension
    pub fn checkpoint_stem(&self, data: &DataConfig) -> PathBuf {
        PathBuf::from(&data.model_dir).join(self.model_stem)
    }

    pub fn quantized_path(&self, data: &DataConfig) -> PathBuf {
        PathBuf::from(&data.model_dir).join(self.quantized_filename)
    }

    pub fn encoder_path(&self, data: &DataConfig) -> PathBuf {
        PathBuf::from(&data.model_dir).join(self.encoder_filename)
    }

    pub fn history_path(&self, data: &DataConfig) -> PathBuf {
        PathBuf::from(&data.model_dir).join(format!("{}_history.csv", self.model_stem))
    }
}

const ROTATION: TaskSpec = TaskSpec {
    name: "rotation",
    csv_filename: "rep_data_minimal.csv",
    feature_column: "rep_metric",
    label_column: "label",
    model_stem: "model_minimal",
    quantized_filename: "model_minimal.qrn",
    encoder_filename: "label_encoder_minimal.json",
};

const VERTICAL: TaskSpec = TaskSpec {
    name: "vertical",
    csv_filename: "vertical_data.csv",
    feature_column: "value",
    label_column: "label",
    model_stem: "vertical_model",
    quantized_filename: "vertical_model.qrn",
    encoder_filename: "vertical_label_encoder.json",
};

/// A built-in training task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Rotation-style exercises keyed on the rep metric column
    Rotation,
    /// Vertical presses keyed on the raw press value
    Vertical,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Rotation, Task::Vertical];

    pub fn spec(&self) -> &'static TaskSpec {
        match self {
            Task::Rotation => &ROTATION,
            Task::Vertical => &VERTICAL,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().name)
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rotation" => Ok(Task::Rotation),
            "vertical" => Ok(Task::Vertical),
            _ => Err(format!("Unknown task: {}. Use rotation or vertical.", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_str() {
        assert_eq!("rotation".parse::<Task>().unwrap(), Task::Rotation);
        assert_eq!("VERTICAL".parse::<Task>().unwrap(), Task::Vertical);
        assert!("lateral".parse::<Task>().is_err());
    }

    #[test]
    fn test_specs_are_distinct() {
        let rotation = Task::Rotation.spec();
        let vertical = Task::Vertical.spec();

        assert_eq!(rotation.feature_column, "rep_metric");
        assert_eq!(vertical.feature_column, "value");
        assert_ne!(rotation.csv_filename, vertical.csv_filename);
        assert_ne!(rotation.quantized_filename, vertical.quantized_filename);
        assert_ne!(rotation.encoder_filename, vertical.encoder_filename);
    }

    #[test]
    fn test_artifact_paths() {
        let data = DataConfig {
            data_dir: "data".to_string(),
            model_dir: "model".to_string(),
        };
        let spec = Task::Rotation.spec();

        assert_eq!(
            spec.csv_path(&data),
            PathBuf::from("data/rep_data_minimal.csv")
        );
        assert_eq!(
            spec.quantized_path(&data),
            PathBuf::from("model/model_minimal.qrn")
        );
        assert_eq!(
            spec.history_path(&data),
            PathBuf::from("model/model_minimal_history.csv")
        );
    }
}
