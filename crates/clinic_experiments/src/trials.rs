//! Independent trials: seed selection and parallel runs using rayon.

use std::collections::HashSet;

use clinic_core::runner::{run_scenario, RunOutcome};
use clinic_core::scenario::ClinicParams;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::ExperimentError;

/// Trial seeds are drawn from `1..=MAX_TRIAL_SEED`.
pub const MAX_TRIAL_SEED: u64 = 1000;

#[derive(Debug, Clone)]
pub struct TrialResult {
    pub seed: u64,
    pub outcome: RunOutcome,
}

/// Draws `n` distinct seeds in `1..=1000`, in draw order, from a generator
/// seeded with `master_seed`.
pub fn pick_seeds(n: usize, master_seed: u64) -> Result<Vec<u64>, ExperimentError> {
    let available = MAX_TRIAL_SEED as usize;
    if n > available {
        return Err(ExperimentError::TooManyTrials {
            requested: n,
            available,
        });
    }
    let mut rng = StdRng::seed_from_u64(master_seed);
    let mut seen = HashSet::with_capacity(n);
    let mut seeds = Vec::with_capacity(n);
    while seeds.len() < n {
        let seed = rng.gen_range(1..=MAX_TRIAL_SEED);
        if seen.insert(seed) {
            seeds.push(seed);
        }
    }
    Ok(seeds)
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Runs `params` once per seed in parallel. Each trial builds its own world;
/// results come back in seed order.
///
/// # Errors
///
/// Fails if `params` is rejected or the thread pool cannot be built.
pub fn run_trials(
    params: &ClinicParams,
    seeds: &[u64],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<TrialResult>, ExperimentError> {
    params.validate()?;

    let pb = (show_progress && !seeds.is_empty()).then(|| progress_bar(seeds.len()));

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let results: Result<Vec<TrialResult>, ExperimentError> = pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| {
                let outcome = run_scenario(params.clone().with_seed(seed))?;
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                Ok(TrialResult { seed, outcome })
            })
            .collect()
    });

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    let results = results?;
    tracing::info!(
        trials = results.len(),
        patients = results.iter().map(|r| r.outcome.records.len()).sum::<usize>(),
        "trials complete"
    );
    Ok(results)
}
