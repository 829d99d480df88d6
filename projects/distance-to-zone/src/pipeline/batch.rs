// Batch runner: a bounded pool of worker threads, each analyzing whole plays
// independently. Plays share no mutable state, so results arrive in arbitrary
// order and are re-sorted by play id at the end.

use crate::pipeline::engine::DistanceEngine;
use crate::pipeline::types::{AnalysisFlag, BatchProgress, EngineConfig, PlayMetadata, PlayResult};
use crate::source::{DetectorSet, FrameSource};
use anyhow::Result;
use crossbeam::channel;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// One play queued for analysis. The id is provisional (file stem); the
/// opener may refine it and supplies the metadata.
#[derive(Debug, Clone)]
pub struct PlayJob {
    pub play_id: String,
    pub path: PathBuf,
}

/// Everything a worker needs to analyze one play. Built per play by the
/// opener, so any cross-play caching (loaded model weights, sessions) lives
/// inside the opener's captured state, not in the pipeline.
pub struct PreparedPlay {
    pub play_id: String,
    pub metadata: PlayMetadata,
    pub source: Box<dyn FrameSource>,
    pub detectors: DetectorSet,
}

/// Run a batch over a fixed worker pool.
///
/// Every job yields exactly one `PlayResult`: opener failures become
/// `SourceReadFailure` results at the play boundary and never abort the
/// batch. `progress` is shared with the caller for live reporting.
pub fn run_batch<F>(
    jobs: Vec<PlayJob>,
    config: EngineConfig,
    workers: usize,
    progress: Arc<BatchProgress>,
    open: F,
) -> Result<Vec<PlayResult>>
where
    F: Fn(&PlayJob) -> Result<PreparedPlay> + Send + Sync,
{
    let workers = workers.max(1).min(jobs.len().max(1));
    let total = jobs.len();

    let (job_tx, job_rx) = channel::unbounded::<PlayJob>();
    let (result_tx, result_rx) = channel::unbounded::<PlayResult>();
    for job in jobs {
        job_tx.send(job).expect("job channel open");
    }
    drop(job_tx);

    let open = &open;
    let mut results: Vec<PlayResult> = std::thread::scope(|scope| {
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let progress = progress.clone();
            let engine = DistanceEngine::new(config.clone());
            scope.spawn(move || {
                progress.active_workers.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Batch worker {} started", worker_id);

                for job in job_rx {
                    let result = analyze_job(&engine, &job, open);
                    progress.record(&result);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }

                progress.active_workers.fetch_sub(1, Ordering::Relaxed);
                tracing::debug!("Batch worker {} finished", worker_id);
            });
        }
        drop(result_tx);

        result_rx.iter().collect()
    });

    progress.is_active.store(false, Ordering::Relaxed);

    if results.len() != total {
        tracing::warn!(
            "Batch produced {} results for {} jobs",
            results.len(),
            total
        );
    }

    results.sort_by(|a, b| a.play_id.cmp(&b.play_id));
    Ok(results)
}

fn analyze_job<F>(engine: &DistanceEngine, job: &PlayJob, open: &F) -> PlayResult
where
    F: Fn(&PlayJob) -> Result<PreparedPlay>,
{
    let mut prepared = match open(job) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Play {}: failed to open: {:#}", job.play_id, e);
            return PlayResult::incomplete(
                job.play_id.clone(),
                PlayMetadata::default(),
                AnalysisFlag::SourceReadFailure,
            );
        }
    };

    engine.analyze_play(
        &prepared.play_id,
        prepared.metadata.clone(),
        prepared.source.as_mut(),
        &mut prepared.detectors,
    )
}
