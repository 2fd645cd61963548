//! Training hand-off: derive the label set from a dataset and start the
//! external trainer.
//!
//! The trainer itself (loss, optimizer, checkpoints) lives outside this
//! crate. What is fixed here is the contract it trains against: the dense
//! label set built from `tags.json`, checked against every metadata `tags`
//! vector and written to `labels.json` in the Hugging Face config layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::TrainConfig;
use crate::dataset::{load_items, TAGS_FILE};
use crate::error::DatasetError;
use crate::vocabulary::{LabelVocabulary, TagTree};

pub const LABELS_FILE: &str = "labels.json";
/// Environment variable pointing the trainer at `labels.json`.
pub const LABELS_ENV: &str = "TAGSENSE_LABELS";
pub const PROBLEM_TYPE: &str = "multi_label_classification";

/// The label set a model is trained against. Index == label id.
pub type LabelSet = LabelVocabulary;

/// Contents of `labels.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelFile {
    pub problem_type: String,
    pub num_labels: usize,
    pub id2label: BTreeMap<String, String>,
    pub label2id: BTreeMap<String, u32>,
    pub base_model: String,
}

impl LabelFile {
    pub fn new(labels: &LabelSet, base_model: &str) -> Self {
        Self {
            problem_type: PROBLEM_TYPE.to_string(),
            num_labels: labels.len(),
            id2label: labels
                .id2label()
                .into_iter()
                .map(|(id, name)| (id.to_string(), name))
                .collect(),
            label2id: labels.label2id(),
            base_model: base_model.to_string(),
        }
    }
}

/// How a training run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    /// No trainer configured; `labels.json` is ready for one.
    LabelsWritten(PathBuf),
    /// The configured trainer exited successfully.
    Trained(PathBuf),
}

/// A validated dataset plus the label set derived from it.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    input: PathBuf,
    output: PathBuf,
    labels: LabelSet,
    config: TrainConfig,
}

impl TrainingPlan {
    /// Load the label set and check every metadata entry against it.
    pub fn prepare(input: &Path, output: &Path, config: &TrainConfig) -> Result<Self, DatasetError> {
        let tags_path = input.join(TAGS_FILE);
        if !tags_path.is_file() {
            return Err(DatasetError::MissingTags(tags_path));
        }
        let tree = TagTree::load(&tags_path).map_err(|source| DatasetError::Tags {
            path: tags_path.clone(),
            source,
        })?;
        let labels = LabelSet::from_tree(&tree).map_err(|source| DatasetError::Tags {
            path: tags_path.clone(),
            source,
        })?;

        let items = load_items(input)?;
        for item in &items {
            let metadata_path = item.metadata.clone();
            match item.entry.tags() {
                Some(flags) if flags.len() == labels.len() => {}
                Some(flags) => {
                    return Err(DatasetError::LabelWidth {
                        path: metadata_path,
                        file_name: item.entry.file_name.clone(),
                        expected: labels.len(),
                        actual: flags.len(),
                    })
                }
                None => {
                    return Err(DatasetError::Metadata {
                        path: metadata_path,
                        line: item.line,
                        message: format!("{} has no tags vector", item.entry.file_name),
                    })
                }
            }
        }

        tracing::info!(
            "Dataset {:?}: {} images, {} labels",
            input,
            items.len(),
            labels.len()
        );

        Ok(Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            labels,
            config: config.clone(),
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Write `labels.json` into the output directory.
    pub fn write_labels(&self) -> Result<PathBuf, DatasetError> {
        std::fs::create_dir_all(&self.output).map_err(|e| DatasetError::io(&self.output, e))?;
        let path = self.output.join(LABELS_FILE);
        let file = LabelFile::new(&self.labels, &self.config.base_model);
        let json = serde_json::to_string_pretty(&file).map_err(|e| DatasetError::Metadata {
            path: path.clone(),
            line: 0,
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| DatasetError::io(&path, e))?;
        Ok(path)
    }

    /// Write the labels and, when configured, run the trainer.
    pub async fn run(&self) -> Result<TrainOutcome, DatasetError> {
        let labels_path = self.write_labels()?;

        let Some((program, args)) = self.config.command.split_first() else {
            tracing::info!(
                "No trainer configured; labels written to {:?} for base model {}",
                labels_path,
                self.config.base_model
            );
            return Ok(TrainOutcome::LabelsWritten(labels_path));
        };

        tracing::info!("Starting trainer: {} {:?}", program, args);
        let status = tokio::process::Command::new(program)
            .args(args)
            .arg(&self.input)
            .arg(&self.output)
            .env(LABELS_ENV, &labels_path)
            .status()
            .await
            .map_err(|e| DatasetError::Trainer(format!("failed to start {program}: {e}")))?;

        if !status.success() {
            return Err(DatasetError::Trainer(format!("{program} exited with {status}")));
        }
        tracing::info!("Trainer finished; model written to {:?}", self.output);
        Ok(TrainOutcome::Trained(self.output.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TAGS: &str = r#"[
        {"id": 1, "name": "Animals", "children": [{"id": 2, "name": "Cat"}]},
        {"id": 3, "name": "Places"}
    ]"#;

    fn dataset(flags: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TAGS_FILE), TAGS).unwrap();
        let train = dir.path().join("train");
        fs::create_dir(&train).unwrap();
        fs::write(
            train.join(crate::dataset::METADATA_FILE),
            format!("{{\"file_name\": \"a.jpg\", \"tags\": {flags}}}\n"),
        )
        .unwrap();
        dir
    }

    fn config(command: &[&str]) -> TrainConfig {
        TrainConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_label_file() {
        let input = dataset("[0, 1, 1, 0]");
        let output = tempfile::tempdir().unwrap();
        let plan = TrainingPlan::prepare(input.path(), output.path(), &config(&[])).unwrap();
        assert_eq!(plan.labels().len(), 4);

        let path = plan.write_labels().unwrap();
        let file: LabelFile = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(file.problem_type, PROBLEM_TYPE);
        assert_eq!(file.num_labels, 4);
        assert_eq!(file.id2label["2"], "Cat");
        assert_eq!(file.id2label["0"], "");
        assert_eq!(file.label2id.len(), 3);
        assert_eq!(file.label2id["Places"], 3);
        assert_eq!(file.base_model, "google/vit-base-patch16-224");
    }

    #[test]
    fn test_label_width_checked() {
        let input = dataset("[0, 1]");
        let output = tempfile::tempdir().unwrap();
        let err = TrainingPlan::prepare(input.path(), output.path(), &config(&[])).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::LabelWidth {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_tags_json() {
        let input = dataset("[0, 1, 1, 0]");
        fs::remove_file(input.path().join(TAGS_FILE)).unwrap();
        let output = tempfile::tempdir().unwrap();
        let err = TrainingPlan::prepare(input.path(), output.path(), &config(&[])).unwrap_err();
        assert!(matches!(err, DatasetError::MissingTags(_)));
    }

    #[tokio::test]
    async fn test_without_trainer() {
        let input = dataset("[0, 1, 1, 0]");
        let output = tempfile::tempdir().unwrap();
        let plan = TrainingPlan::prepare(input.path(), output.path(), &config(&[])).unwrap();
        let outcome = plan.run().await.unwrap();
        assert_eq!(
            outcome,
            TrainOutcome::LabelsWritten(output.path().join(LABELS_FILE))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_trainer_sees_labels() {
        let input = dataset("[0, 1, 1, 0]");
        let output = tempfile::tempdir().unwrap();
        let plan = TrainingPlan::prepare(
            input.path(),
            output.path(),
            &config(&["sh", "-c", "test -f \"$TAGSENSE_LABELS\""]),
        )
        .unwrap();
        assert!(matches!(plan.run().await.unwrap(), TrainOutcome::Trained(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_trainer_failure() {
        let input = dataset("[0, 1, 1, 0]");
        let output = tempfile::tempdir().unwrap();
        let plan =
            TrainingPlan::prepare(input.path(), output.path(), &config(&["sh", "-c", "exit 3"]))
                .unwrap();
        assert!(matches!(plan.run().await, Err(DatasetError::Trainer(_))));
    }
}
