//! On-disk record formats for search results and best-model descriptors.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use aet_optimizer::{SearchResult, SearchSpace};
use aet_types::{ArchitectureDescriptor, Hyperparameters, ModelFamily};

/// `strftime` pattern of the timestamp embedded in artifact names and records.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// One line of a result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub hyperparams: Hyperparameters,
    pub val_roc_auc: f64,
    /// Present only for configurations that failed under the skip policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SearchResult> for ResultEntry {
    /// Missing and non-finite scores are written as 0.0 so the file stays
    /// plain JSON numbers.
    fn from(result: &SearchResult) -> Self {
        Self {
            hyperparams: result.hyperparams.clone(),
            val_roc_auc: result.score.filter(|s| s.is_finite()).unwrap_or(0.0),
            error: result.error.clone(),
        }
    }
}

/// Contents of `{model_type}_hyperparam_search_{timestamp}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub model_type: ModelFamily,
    pub search_space: SearchSpace,
    pub timestamp: String,
    pub results: Vec<ResultEntry>,
}

impl SearchRecord {
    pub fn new(
        model_type: ModelFamily,
        search_space: &SearchSpace,
        timestamp: String,
        results: &[SearchResult],
    ) -> Self {
        Self {
            model_type,
            search_space: search_space.clone(),
            timestamp,
            results: results.iter().map(ResultEntry::from).collect(),
        }
    }

    /// Earliest successful entry with the highest score, with its position.
    pub fn best_entry(&self) -> Option<(usize, &ResultEntry)> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.error.is_none())
            .fold(None, |best: Option<(usize, &ResultEntry)>, (i, entry)| match best {
                Some((_, b)) if entry.val_roc_auc <= b.val_roc_auc => best,
                _ => Some((i, entry)),
            })
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|e| e.error.is_some()).count()
    }
}

/// Contents of `best_{model_type}_{timestamp}_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_type: ModelFamily,
    pub best_config: Hyperparameters,
    pub best_val_score: f64,
    pub timestamp: String,
    /// File name of the weights blob, relative to the descriptor's directory.
    pub model_file: String,
    pub architecture: ArchitectureDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(latent_dim: i64, score: f64) -> SearchResult {
        SearchResult::scored(Hyperparameters::new().with("latent_dim", latent_dim), score)
    }

    fn record(results: &[SearchResult]) -> SearchRecord {
        let space = SearchSpace::new().add_ints("latent_dim", &[4, 8, 16]);
        SearchRecord::new(ModelFamily::UnsupervisedAe, &space, "20240501_093000".into(), results)
    }

    #[test]
    fn timestamp_format_matches_file_names() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 3, 7)
            .unwrap();
        assert_eq!(format_timestamp(&at), "20240501_090307");
    }

    #[test]
    fn failed_results_are_written_as_zero_with_error() {
        let failed =
            SearchResult::failed(Hyperparameters::new().with("latent_dim", 4), "nan loss".into());
        let written = ResultEntry::from(&failed);
        assert_eq!(written.val_roc_auc, 0.0);
        assert_eq!(written.error.as_deref(), Some("nan loss"));

        let nan = ResultEntry::from(&entry(8, f64::NAN));
        assert_eq!(nan.val_roc_auc, 0.0);
        assert!(nan.error.is_none());
    }

    #[test]
    fn record_json_shape() {
        let rec = record(&[entry(4, 0.7), entry(8, 0.85)]);
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["model_type"], "unsupervised_ae");
        assert_eq!(value["timestamp"], "20240501_093000");
        assert_eq!(value["search_space"]["latent_dim"], serde_json::json!([4, 8, 16]));
        assert_eq!(value["results"][1]["hyperparams"]["latent_dim"], 8);
        assert_eq!(value["results"][1]["val_roc_auc"], 0.85);
        assert!(value["results"][0].get("error").is_none());
    }

    #[test]
    fn best_entry_prefers_earliest_maximum() {
        let rec = record(&[entry(4, 0.7), entry(8, 0.9), entry(16, 0.9)]);
        let (index, best) = rec.best_entry().unwrap();
        assert_eq!(index, 1);
        assert_eq!(best.hyperparams.get_int("latent_dim").unwrap(), 8);
    }

    #[test]
    fn best_entry_ignores_failures() {
        let failed =
            SearchResult::failed(Hyperparameters::new().with("latent_dim", 4), "boom".into());
        let rec = record(&[failed, entry(8, 0.0)]);
        assert_eq!(rec.best_entry().unwrap().0, 1);
        assert_eq!(rec.failed_count(), 1);

        assert!(record(&[]).best_entry().is_none());
    }
}
