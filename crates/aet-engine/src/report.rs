//! Plain-text renderings used by the `aet-tune` binary.

use aet_data::{RunEntry, SearchRecord, TIMESTAMP_FORMAT};
use aet_optimizer::{GridSearch, SearchSpace};
use aet_types::AetResult;

/// Every configuration of `space`, numbered in enumeration order.
pub fn render_plan(space: &SearchSpace) -> AetResult<Vec<String>> {
    let grid = GridSearch::new(space.clone())?;
    let total = grid.total();

    let mut lines = Vec::with_capacity(total + 1);
    lines.push(format!("Num configurations: {total}"));
    for (i, params) in grid.enumerate() {
        lines.push(format!("{:>5}/{}  {}", i + 1, total, params.display()));
    }
    Ok(lines)
}

pub fn render_run_entry(run: &RunEntry) -> String {
    format!(
        "{:<22} {}  {}",
        run.family.as_str(),
        run.timestamp.format(TIMESTAMP_FORMAT),
        run.path.display()
    )
}

pub fn render_record(record: &SearchRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Model type:      {}", record.model_type),
        format!("Timestamp:       {}", record.timestamp),
        format!("Configurations:  {}", record.results.len()),
    ];
    let failed = record.failed_count();
    if failed > 0 {
        lines.push(format!("Failed:          {failed}"));
    }
    match record.best_entry() {
        Some((index, best)) => {
            lines.push(format!("Best (#{}):       {}", index + 1, best.hyperparams.display()));
            lines.push(format!("Validation ROC-AUC: {:.3}", best.val_roc_auc));
        }
        None => lines.push("No successful configurations".to_string()),
    }
    lines
}
