use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};

/// Mean of every numeric metric over one epoch, per phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub epoch_total: usize,
    pub train: BTreeMap<String, f64>,
    pub valid: BTreeMap<String, f64>,
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = |metrics: &BTreeMap<String, f64>| {
            metrics
                .iter()
                .map(|(name, value)| format!("{name} {value:.4}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "Epoch {}/{} - train: {} | valid: {}",
            self.epoch,
            self.epoch_total,
            phase(&self.train),
            phase(&self.valid)
        )
    }
}

pub type EpochHistory = Arc<Mutex<Vec<EpochSummary>>>;

#[derive(Debug, Default, Clone, Copy)]
struct Running {
    sum: f64,
    count: usize,
}

impl Running {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Learner renderer that prints one line per finished epoch instead of
/// drawing a terminal dashboard.
pub struct EpochReporter {
    epoch: usize,
    epoch_total: usize,
    train: BTreeMap<String, Running>,
    valid: BTreeMap<String, Running>,
    history: EpochHistory,
}

impl EpochReporter {
    pub fn new(history: EpochHistory) -> Self {
        Self {
            epoch: 0,
            epoch_total: 0,
            train: BTreeMap::new(),
            valid: BTreeMap::new(),
            history,
        }
    }

    fn record(metrics: &mut BTreeMap<String, Running>, state: MetricState) {
        if let MetricState::Numeric(entry, value) = state {
            metrics.entry(entry.name).or_default().push(value);
        }
    }

    // Metric updates for an item arrive before its progress, so an epoch is
    // only closed once its validation pass reports completion.
    fn track(&mut self, progress: &TrainingProgress) {
        self.epoch = progress.epoch;
        self.epoch_total = progress.epoch_total;
    }

    fn flush(&mut self) {
        if self.train.is_empty() && self.valid.is_empty() {
            return;
        }
        let means = |metrics: &mut BTreeMap<String, Running>| -> BTreeMap<String, f64> {
            std::mem::take(metrics)
                .into_iter()
                .map(|(name, running)| (name, running.mean()))
                .collect()
        };
        let summary = EpochSummary {
            epoch: self.epoch,
            epoch_total: self.epoch_total,
            train: means(&mut self.train),
            valid: means(&mut self.valid),
        };

        println!("{summary}");
        log::info!("{summary}");
        match self.history.lock() {
            Ok(mut history) => history.push(summary),
            Err(_) => log::error!("epoch history lock poisoned"),
        }
    }
}

impl MetricsRenderer for EpochReporter {
    fn update_train(&mut self, state: MetricState) {
        Self::record(&mut self.train, state);
    }

    fn update_valid(&mut self, state: MetricState) {
        Self::record(&mut self.valid, state);
    }

    fn render_train(&mut self, item: TrainingProgress) {
        self.track(&item);
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        self.track(&item);
        if item.progress.items_processed >= item.progress.items_total {
            self.flush();
        }
    }
}

impl Drop for EpochReporter {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use burn::{data::dataloader::Progress, train::metric::MetricEntry};

    use super::*;

    fn numeric(name: &str, value: f64) -> MetricState {
        MetricState::Numeric(
            MetricEntry::new(name.to_string(), format!("{value}"), format!("{value}")),
            value,
        )
    }

    fn progress(epoch: usize, processed: usize, total: usize) -> TrainingProgress {
        TrainingProgress {
            progress: Progress {
                items_processed: processed,
                items_total: total,
            },
            epoch,
            epoch_total: 2,
            iteration: processed,
        }
    }

    #[test]
    fn averages_each_phase_once_validation_completes() {
        let history = EpochHistory::default();
        let mut reporter = EpochReporter::new(history.clone());

        reporter.update_train(numeric("Loss", 2.0));
        reporter.render_train(progress(1, 1, 2));
        reporter.update_train(numeric("Loss", 1.0));
        reporter.render_train(progress(1, 2, 2));
        reporter.update_valid(numeric("Accuracy", 50.0));
        reporter.render_valid(progress(1, 1, 1));

        let summaries = history.lock().unwrap().clone();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].epoch, 1);
        assert_eq!(summaries[0].train["Loss"], 1.5);
        assert_eq!(summaries[0].valid["Accuracy"], 50.0);
        assert_eq!(
            summaries[0].to_string(),
            "Epoch 1/2 - train: Loss 1.5000 | valid: Accuracy 50.0000"
        );
    }

    #[test]
    fn pending_epoch_is_flushed_on_drop() {
        let history = EpochHistory::default();
        {
            let mut reporter = EpochReporter::new(history.clone());
            reporter.update_train(numeric("Loss", 0.5));
            reporter.render_train(progress(2, 1, 4));
        }
        let summaries = history.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].epoch, 2);
        assert!(summaries[0].valid.is_empty());
    }

    #[test]
    fn generic_metrics_are_ignored() {
        let history = EpochHistory::default();
        let mut reporter = EpochReporter::new(history.clone());
        reporter.update_train(MetricState::Generic(MetricEntry::new(
            "Learning Rate".to_string(),
            "1e-3".to_string(),
            "1e-3".to_string(),
        )));
        drop(reporter);
        assert!(history.lock().unwrap().is_empty());
    }
}
