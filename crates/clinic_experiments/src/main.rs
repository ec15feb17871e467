use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clinic_core::config::load_params;
use clinic_core::routing::AiWindow;
use clinic_core::scenario::{ClinicParams, WorkflowMode, WorkflowPolicy};
use clinic_experiments::{
    load_exam_mix, load_hourly_arrivals, pick_seeds, run_trials, write_patient_log_csv,
    ExperimentError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Diagnostic imaging clinic simulation.
///
/// Runs one clinic day per seed and writes a patient log CSV for each run.
///
/// Example usage:
///   clinic_sim --num-iterations 20
///   clinic_sim --same-visit --ai-time morning --dedicated-radiologist
///   clinic_sim --config clinic.toml --arrivals data/arrivals.csv --exam-mix data/exam_mix.csv
#[derive(Parser, Debug)]
#[command(name = "clinic_sim", version, about, long_about = None)]
struct Cli {
    /// Number of independent trials (distinct seeds in 1..=1000)
    #[arg(long, default_value_t = 100)]
    num_iterations: usize,

    /// Run the same-visit workflow (AI assessment after screening). Applies
    /// the same-visit staffing and service-time presets.
    #[arg(long)]
    same_visit: bool,

    /// Hours during which AI triage is active
    #[arg(long, value_enum, default_value_t = AiTime::None)]
    ai_time: AiTime,

    /// Dedicate one radiologist to AI assessments and same-visit reviews
    #[arg(long)]
    dedicated_radiologist: bool,

    /// Let ordinary dx reviews use the dedicated radiologist when it is idle
    #[arg(long)]
    share_dedicated_radiologist: bool,

    /// TOML file overriding clinic parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hourly arrivals CSV (`avg` column); the last hour is doubled
    #[arg(long)]
    arrivals: Option<PathBuf>,

    /// Exam mix CSV (`exam_type` plus `h_<hour>` columns)
    #[arg(long)]
    exam_mix: Option<PathBuf>,

    /// Directory for patient log CSVs
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Master seed used to pick trial seeds
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info", env = "CLINIC_LOG_LEVEL")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AiTime {
    None,
    Morning,
    Afternoon,
    Any,
}

impl From<AiTime> for AiWindow {
    fn from(value: AiTime) -> Self {
        match value {
            AiTime::None => AiWindow::None,
            AiTime::Morning => AiWindow::Morning,
            AiTime::Afternoon => AiWindow::Afternoon,
            AiTime::Any => AiWindow::Any,
        }
    }
}

impl Cli {
    fn workflow_policy(&self) -> Result<WorkflowPolicy, ExperimentError> {
        if self.share_dedicated_radiologist && !self.dedicated_radiologist {
            return Err(ExperimentError::ConflictingFlags(
                "--share-dedicated-radiologist requires --dedicated-radiologist",
            ));
        }
        if self.dedicated_radiologist && !self.same_visit {
            return Err(ExperimentError::ConflictingFlags(
                "--dedicated-radiologist requires --same-visit",
            ));
        }
        if self.ai_time != AiTime::None && !self.same_visit {
            return Err(ExperimentError::ConflictingFlags(
                "--ai-time other than none requires --same-visit",
            ));
        }
        Ok(WorkflowPolicy {
            mode: if self.same_visit {
                WorkflowMode::SameVisit
            } else {
                WorkflowMode::Baseline
            },
            dedicated_same_visit_radiologist: self.dedicated_radiologist,
            share_dedicated_with_dx_review: self.share_dedicated_radiologist,
        })
    }

    /// Config file (or defaults), then workflow flags, then input tables.
    fn clinic_params(&self) -> Result<ClinicParams, ExperimentError> {
        let policy = self.workflow_policy()?;
        let mut params = match &self.config {
            Some(path) => {
                let loaded = load_params(path)?;
                if self.same_visit {
                    let preset = ClinicParams::for_workflow(policy);
                    ClinicParams {
                        workflow: preset.workflow,
                        capacities: preset.capacities,
                        service_times: preset.service_times,
                        ..loaded
                    }
                } else {
                    loaded
                }
            }
            None => ClinicParams::for_workflow(policy),
        };

        if self.ai_time != AiTime::None {
            params = params.with_ai_window(self.ai_time.into());
        }
        if let Some(path) = &self.arrivals {
            params = params.with_arrival_rates(load_hourly_arrivals(path)?);
        }
        if let Some(path) = &self.exam_mix {
            params = params.with_exam_mix(load_exam_mix(path)?);
        }
        params.validate()?;
        Ok(params)
    }
}

fn main() -> Result<(), ExperimentError> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let params = cli.clinic_params()?;
    let seeds = pick_seeds(cli.num_iterations, cli.seed)?;
    tracing::info!(
        trials = seeds.len(),
        workflow = ?params.workflow.mode,
        dedicated_radiologist = params.workflow.dedicated_same_visit_radiologist,
        share_dedicated_radiologist = params.workflow.share_dedicated_with_dx_review,
        ai_window = ?params.ai_window,
        "starting trials"
    );

    let results = run_trials(&params, &seeds, cli.threads, !cli.no_progress)?;

    let log_dir = cli.output_dir.join(match params.workflow.mode {
        WorkflowMode::Baseline => "log_baseline",
        WorkflowMode::SameVisit => "log_same_visit",
    });
    for (index, trial) in results.iter().enumerate() {
        let path = log_dir.join(format!("clinic_patient_log_seed_{}.csv", trial.seed));
        if trial.outcome.records.is_empty() {
            tracing::warn!(seed = trial.seed, "no patients completed; log skipped");
            continue;
        }
        write_patient_log_csv(&trial.outcome.records, &path)?;
        tracing::info!(
            trial = index + 1,
            seed = trial.seed,
            end_time = trial.outcome.end_time,
            patients = trial.outcome.records.len(),
            "simulation completed"
        );
    }
    tracing::info!(output_dir = %log_dir.display(), "patient logs written");
    Ok(())
}
