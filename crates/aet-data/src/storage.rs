use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use aet_optimizer::{SearchResult, SearchSpace};
use aet_types::{
    AetResult, ArchitectureDescriptor, Checkpoint, Hyperparameters, ModelFamily,
    PersistenceError, TuningConfig,
};

use crate::records::{format_timestamp, ModelDescriptor, SearchRecord};

/// Marker between the family tag and the timestamp in result file names.
pub const RESULTS_FILE_MARKER: &str = "_hyperparam_search_";

pub fn results_file_name(family: ModelFamily, timestamp: &str) -> String {
    format!("{}{}{}.json", family, RESULTS_FILE_MARKER, timestamp)
}

pub fn weights_file_name(family: ModelFamily, timestamp: &str) -> String {
    format!("best_{}_{}.pth", family, timestamp)
}

pub fn descriptor_file_name(family: ModelFamily, timestamp: &str) -> String {
    format!("best_{}_{}_config.json", family, timestamp)
}

/// Writes search results and best-model artifacts under timestamped names.
///
/// Files are created exclusively: saving twice for the same family within
/// one second fails with [`PersistenceError::AlreadyExists`] instead of
/// overwriting the earlier run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    pub models_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(models_dir: P, results_dir: Q) -> AetResult<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        let results_dir = results_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&models_dir)?;
        std::fs::create_dir_all(&results_dir)?;

        Ok(Self {
            models_dir,
            results_dir,
        })
    }

    pub fn from_config(config: &TuningConfig) -> AetResult<Self> {
        Self::new(&config.models_dir, &config.results_dir)
    }

    /// Save every configuration's score, stamped with the current local time.
    pub fn save_search_results(
        &self,
        results: &[SearchResult],
        family: ModelFamily,
        search_space: &SearchSpace,
    ) -> AetResult<PathBuf> {
        self.save_search_results_at(results, family, search_space, Local::now().naive_local())
    }

    pub fn save_search_results_at(
        &self,
        results: &[SearchResult],
        family: ModelFamily,
        search_space: &SearchSpace,
        at: NaiveDateTime,
    ) -> AetResult<PathBuf> {
        let timestamp = format_timestamp(&at);
        let path = self.results_dir.join(results_file_name(family, &timestamp));
        let record = SearchRecord::new(family, search_space, timestamp, results);

        write_json_new(&path, &record)?;

        info!("Hyper param search results saved to: {}", path.display());
        Ok(path)
    }

    /// Save the winning model's weights and a descriptor that points at them.
    pub fn save_best_model<M: Checkpoint>(
        &self,
        model: &M,
        config: &Hyperparameters,
        score: f64,
        family: ModelFamily,
        architecture: &ArchitectureDescriptor,
    ) -> AetResult<(PathBuf, PathBuf)> {
        self.save_best_model_at(
            model,
            config,
            score,
            family,
            architecture,
            Local::now().naive_local(),
        )
    }

    pub fn save_best_model_at<M: Checkpoint>(
        &self,
        model: &M,
        config: &Hyperparameters,
        score: f64,
        family: ModelFamily,
        architecture: &ArchitectureDescriptor,
        at: NaiveDateTime,
    ) -> AetResult<(PathBuf, PathBuf)> {
        let timestamp = format_timestamp(&at);
        let model_file = weights_file_name(family, &timestamp);
        let model_path = self.models_dir.join(&model_file);
        let config_path = self.models_dir.join(descriptor_file_name(family, &timestamp));

        // A collision fails before anything is written; any later failure removes
        // the files this call created.
        for path in [&model_path, &config_path] {
            if path.exists() {
                return Err(already_exists(path));
            }
        }

        let descriptor = ModelDescriptor {
            model_type: family,
            best_config: config.clone(),
            best_val_score: score,
            timestamp,
            model_file,
            architecture: architecture.clone(),
        };

        let mut created = Vec::with_capacity(2);
        if let Err(e) = write_model_pair(model, &model_path, &config_path, &descriptor, &mut created)
        {
            for path in &created {
                remove_partial(path);
            }
            return Err(e);
        }

        info!("Best model saved to: {}", model_path.display());
        info!("Best config saved to: {}", config_path.display());
        Ok((model_path, config_path))
    }
}

/// Parse a result file written by [`ArtifactStore::save_search_results`].
pub fn load_search_results<P: AsRef<Path>>(path: P) -> AetResult<SearchRecord> {
    read_json(path.as_ref())
}

/// Parse a descriptor written by [`ArtifactStore::save_best_model`].
pub fn load_model_descriptor<P: AsRef<Path>>(path: P) -> AetResult<ModelDescriptor> {
    read_json(path.as_ref())
}

fn already_exists(path: &Path) -> aet_types::AetError {
    PersistenceError::AlreadyExists {
        path: path.display().to_string(),
    }
    .into()
}

fn create_new(path: &Path) -> AetResult<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => already_exists(path),
            _ => e.into(),
        })
}

fn write_json_new<T: Serialize>(path: &Path, value: &T) -> AetResult<()> {
    let file = create_new(path)?;
    write_json(file, value).inspect_err(|_| remove_partial(path))
}

fn remove_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Could not remove partial artifact {}: {}", path.display(), e);
    }
}

fn write_json<T: Serialize>(file: File, value: &T) -> AetResult<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write weights then descriptor, recording each file as soon as it exists so
/// the caller can remove them if a later step fails.
fn write_model_pair<M: Checkpoint>(
    model: &M,
    model_path: &Path,
    config_path: &Path,
    descriptor: &ModelDescriptor,
    created: &mut Vec<PathBuf>,
) -> AetResult<()> {
    let weights = create_new(model_path)?;
    created.push(model_path.to_path_buf());
    let mut writer = BufWriter::new(weights);
    model.write_parameters(&mut writer)?;
    writer.flush()?;

    let config_file = create_new(config_path)?;
    created.push(config_path.to_path_buf());
    write_json(config_file, descriptor)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AetResult<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        PersistenceError::InvalidRecord {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aet_types::AetError;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    struct BytesModel(Vec<u8>);

    impl Checkpoint for BytesModel {
        fn write_parameters(&self, writer: &mut dyn Write) -> AetResult<()> {
            writer.write_all(&self.0)?;
            Ok(())
        }
    }

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 3)
            .unwrap()
            .and_hms_opt(14, 5, second)
            .unwrap()
    }

    fn space() -> SearchSpace {
        SearchSpace::new()
            .add_ints("latent_dim", &[4, 8])
            .add_floats("dropout_rate", &[0.1])
    }

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult::scored(
                Hyperparameters::new().with("latent_dim", 4).with("dropout_rate", 0.1),
                0.70,
            ),
            SearchResult::scored(
                Hyperparameters::new().with("latent_dim", 8).with("dropout_rate", 0.1),
                0.85,
            ),
        ]
    }

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(root.join("models"), root.join("results")).unwrap()
    }

    #[test]
    fn search_results_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let path = store
            .save_search_results_at(&results(), ModelFamily::UnsupervisedAe, &space(), at(9))
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "unsupervised_ae_hyperparam_search_20241103_140509.json"
        );

        let record = load_search_results(&path).unwrap();
        assert_eq!(record.model_type, ModelFamily::UnsupervisedAe);
        assert_eq!(record.timestamp, "20241103_140509");
        assert_eq!(record.search_space, space());
        assert_eq!(record.results.len(), 2);
        for (entry, expected) in record.results.iter().zip(results()) {
            assert!((entry.val_roc_auc - expected.score.unwrap()).abs() < 1e-12);
            assert_eq!(entry.hyperparams, expected.hyperparams);
        }
    }

    #[test]
    fn same_second_save_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let family = ModelFamily::SemisupervisedAe;

        let first = store.save_search_results_at(&results(), family, &space(), at(1)).unwrap();
        let err = store
            .save_search_results_at(&results()[..1], family, &space(), at(1))
            .unwrap_err();
        assert!(matches!(
            err,
            AetError::Persistence(PersistenceError::AlreadyExists { .. })
        ));
        assert_eq!(load_search_results(&first).unwrap().results.len(), 2);

        // a different second is a different file
        assert!(store.save_search_results_at(&results(), family, &space(), at(2)).is_ok());
    }

    #[test]
    fn best_model_writes_weights_and_descriptor() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let config = Hyperparameters::new().with("latent_dim", 8).with("dropout_rate", 0.1);
        let arch = ArchitectureDescriptor::new("UnsupervisedAutoencoder")
            .with_input_dim(256)
            .with_latent_dim(8);

        let (model_path, config_path) = store
            .save_best_model_at(
                &BytesModel(vec![1, 2, 3, 4]),
                &config,
                0.85,
                ModelFamily::UnsupervisedAe,
                &arch,
                at(30),
            )
            .unwrap();

        assert_eq!(std::fs::read(&model_path).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(
            model_path.file_name().unwrap().to_str().unwrap(),
            "best_unsupervised_ae_20241103_140530.pth"
        );

        let descriptor = load_model_descriptor(&config_path).unwrap();
        assert_eq!(descriptor.model_file, "best_unsupervised_ae_20241103_140530.pth");
        assert_eq!(descriptor.best_config, config);
        assert_eq!(descriptor.best_val_score, 0.85);
        assert_eq!(descriptor.architecture, arch);
        assert_eq!(descriptor.timestamp, "20241103_140530");
    }

    #[test]
    fn unknown_architecture_fields_are_null() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let (_, config_path) = store
            .save_best_model_at(
                &BytesModel(vec![]),
                &Hyperparameters::new().with("latent_dim", 8),
                0.5,
                ModelFamily::SemisupervisedRvae,
                &ArchitectureDescriptor::new("SemiSupervisedRvae"),
                at(0),
            )
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(config_path).unwrap()).unwrap();
        assert_eq!(raw["architecture"]["input_dim"], serde_json::Value::Null);
        assert_eq!(raw["architecture"]["latent_dim"], serde_json::Value::Null);
        assert_eq!(raw["model_type"], "semisupervised_rvae");
    }

    #[test]
    fn colliding_model_save_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let family = ModelFamily::UnsupervisedAe;
        let stamp = format_timestamp(&at(5));
        std::fs::write(
            store.models_dir.join(descriptor_file_name(family, &stamp)),
            "{}",
        )
        .unwrap();

        let err = store
            .save_best_model_at(
                &BytesModel(vec![9]),
                &Hyperparameters::new(),
                0.1,
                family,
                &ArchitectureDescriptor::default(),
                at(5),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AetError::Persistence(PersistenceError::AlreadyExists { .. })
        ));
        assert!(!store.models_dir.join(weights_file_name(family, &stamp)).exists());
    }

    struct FailingModel;

    impl Checkpoint for FailingModel {
        fn write_parameters(&self, writer: &mut dyn Write) -> AetResult<()> {
            writer.write_all(&[1, 2, 3])?;
            writer.flush()?;
            Err(aet_types::internal_error!("device lost mid-write"))
        }
    }

    #[test]
    fn failed_weights_write_leaves_no_files_and_allows_retry() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let family = ModelFamily::UnsupervisedAe;
        let config = Hyperparameters::new().with("latent_dim", 8);
        let arch = ArchitectureDescriptor::new("UnsupervisedAutoencoder");

        let err = store
            .save_best_model_at(&FailingModel, &config, 0.8, family, &arch, at(12))
            .unwrap_err();
        assert!(matches!(err, AetError::Internal(ref m) if m.contains("device lost")));
        assert_eq!(std::fs::read_dir(&store.models_dir).unwrap().count(), 0);

        let (model_path, config_path) = store
            .save_best_model_at(&BytesModel(vec![7]), &config, 0.8, family, &arch, at(12))
            .unwrap();
        assert_eq!(std::fs::read(model_path).unwrap(), vec![7]);
        assert!(config_path.exists());
    }

    #[test]
    fn malformed_record_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"model_type": "unsupervised_ae"}"#).unwrap();
        assert!(matches!(
            load_search_results(&path),
            Err(AetError::Persistence(PersistenceError::InvalidRecord { .. }))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_model_descriptor(dir.path().join("absent.json")),
            Err(AetError::Io(_))
        ));
    }
}
