//! Command-line parsing for the credit-risk scorer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the scoring/training code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{HomeOwnership, LoanGrade};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "risk", version, about = "Credit risk scoring: random forest over a CSV applicant dataset")]
pub struct Cli {
    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard (default when no subcommand is given).
    ///
    /// Enter an applicant, run "Predict & Save", and browse the dataset charts.
    Tui(TuiArgs),
    /// Score one applicant, print the verdict, and append the row to the dataset.
    Score(ScoreArgs),
    /// Train the scaler + random forest on the dataset and write the model file.
    Train(TrainArgs),
    /// Score every dataset row and write labels/probabilities back.
    Rescore(RescoreArgs),
    /// Print the dashboard charts (class, label, feature importance) as text.
    Report(ReportArgs),
    /// Write a seeded synthetic applicant dataset.
    Sample(SampleArgs),
}

/// Dataset and model locations shared by every command.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Applicant dataset CSV.
    #[arg(long, env = "RISK_DATASET", default_value = "credit_risk_dataset.csv")]
    pub dataset: PathBuf,

    /// Model artifact produced by `risk train`.
    #[arg(long, env = "RISK_MODEL", default_value = "model.rkm")]
    pub model: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Log file (the terminal is owned by the dashboard).
    #[arg(long, env = "RISK_LOG_FILE", default_value = "risk.log")]
    pub log_file: PathBuf,

    /// Number of recent dataset rows shown in the table.
    #[arg(long, default_value_t = 12)]
    pub recent: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Applicant age in years (18-70).
    #[arg(long)]
    pub age: u32,

    /// Annual income (USD).
    #[arg(long)]
    pub income: f64,

    /// Requested loan amount (USD).
    #[arg(long = "loan")]
    pub loan_amount: f64,

    /// Interest rate in percent, e.g. 11.5.
    #[arg(long)]
    pub rate: f64,

    /// Loan grade A-G.
    #[arg(long)]
    pub grade: LoanGrade,

    /// Home ownership: RENT, MORTGAGE, OWN or OTHER.
    #[arg(long = "home")]
    pub home_ownership: HomeOwnership,

    /// Print the verdict without appending to the dataset.
    #[arg(long)]
    pub no_save: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Number of trees.
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Seed for the split, bootstrap draws and feature sampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of labeled rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Features examined per split.
    #[arg(long, default_value_t = 2)]
    pub max_features: usize,

    /// Maximum tree depth (unlimited when omitted).
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum samples per leaf.
    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Print the training report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RescoreArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Bar width (columns).
    #[arg(long, default_value_t = 40)]
    pub width: usize,

    /// Number of recent rows listed.
    #[arg(long, default_value_t = 10)]
    pub recent: usize,

    /// Print the report data as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Number of applicants to generate.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Shift of the default log-odds (positive = more defaults).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub default_bias: f64,

    /// Output CSV (defaults to `--dataset`).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
