//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - dispatches to scoring, training, rescoring, reporting or the dashboard
//! - prints reports (text or JSON)

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::cli::{Command, ReportArgs, RescoreArgs, SampleArgs, ScoreArgs, TrainArgs};
use crate::data::{SampleParams, generate_applicants};
use crate::domain::ApplicantInput;
use crate::error::AppError;
use crate::fit::TrainParams;
use crate::io::{DatasetStore, load_model};
use crate::logging::LogTarget;
use crate::models::ForestParams;

pub mod pipeline;

/// Entry point for the `risk` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `risk` and `risk --dataset x.csv` behave like `risk tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let target = match &cli.command {
        Command::Tui(args) => LogTarget::File(&args.log_file),
        _ => LogTarget::Stderr,
    };
    crate::logging::init(cli.verbose, target)?;

    match cli.command {
        Command::Tui(args) => crate::tui::run(args),
        Command::Score(args) => handle_score(args),
        Command::Train(args) => handle_train(args),
        Command::Rescore(args) => handle_rescore(args),
        Command::Report(args) => handle_report(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let bundle = load_model(&args.store.model)?;
    let input = applicant_from_args(&args);

    let (outcome, saved_to) = if args.no_save {
        (pipeline::score(&bundle, &input)?, None)
    } else {
        let mut store = DatasetStore::open(&args.store.dataset)?;
        let outcome = pipeline::score_and_save(&bundle, &mut store, &input)?;
        (outcome, Some(args.store.dataset.as_path()))
    };

    if args.json {
        print_json(&outcome)
    } else {
        print!("{}", crate::report::format_score(&outcome, saved_to));
        Ok(())
    }
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let params = train_params_from_args(&args);
    let outcome = pipeline::train_and_save(&args.store.dataset, &args.store.model, &params)?;

    if args.json {
        print_json(&outcome.report)
    } else {
        print!(
            "{}",
            crate::report::format_training_report(&outcome.report, &args.store.model)
        );
        Ok(())
    }
}

fn handle_rescore(args: RescoreArgs) -> Result<(), AppError> {
    let bundle = load_model(&args.store.model)?;
    let mut store = DatasetStore::open(&args.store.dataset)?;
    let summary = pipeline::rescore(&bundle, &mut store)?;
    print!("{}", crate::report::format_rescore(&summary, &args.store.dataset));
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let store = DatasetStore::open(&args.store.dataset)?;
    if store.total_rows() == 0 {
        return Err(AppError::new(
            3,
            format!("Dataset '{}' is empty or missing.", args.store.dataset.display()),
        ));
    }

    // Charts work without a model; importances are simply omitted.
    let bundle = if args.store.model.exists() {
        Some(load_model(&args.store.model)?)
    } else {
        info!(path = %args.store.model.display(), "no model file; skipping feature importance");
        None
    };

    let summary = crate::report::summarize(&store, bundle.as_ref());
    if args.json {
        return print_json(&summary);
    }

    println!("{}", crate::report::format_dashboard(&summary, args.width));
    if args.recent > 0 {
        println!("Most recent rows:");
        print!(
            "{}",
            crate::report::format_recent(&crate::report::recent_records(&store, args.recent))
        );
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let out = args.out.clone().unwrap_or_else(|| args.store.dataset.clone());
    if out.exists() && !args.force {
        return Err(AppError::invalid(format!(
            "'{}' already exists; pass --force to overwrite.",
            out.display()
        )));
    }

    let params = SampleParams {
        count: args.count,
        seed: args.seed,
        default_bias: args.default_bias,
    };
    let records = generate_applicants(&params)?;
    let store = DatasetStore::create(&out, &records)?;
    let classes = crate::report::class_distribution(store.applicants());

    println!(
        "Wrote {} applicants to {} (current={}, default={})",
        records.len(),
        out.display(),
        classes.current,
        classes.default
    );
    Ok(())
}

pub fn applicant_from_args(args: &ScoreArgs) -> ApplicantInput {
    ApplicantInput {
        age: args.age,
        annual_income: args.income,
        loan_amount: args.loan_amount,
        interest_rate: args.rate,
        loan_grade: args.grade,
        home_ownership: args.home_ownership,
    }
}

pub fn train_params_from_args(args: &TrainArgs) -> TrainParams {
    TrainParams {
        test_fraction: args.test_fraction,
        forest: ForestParams {
            n_trees: args.trees,
            seed: args.seed,
            max_features: args.max_features,
            max_depth: args.max_depth,
            min_samples_leaf: args.min_samples_leaf,
            ..ForestParams::default()
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(4, format!("Failed to serialize JSON output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Rewrite argv so `risk` defaults to `risk tui`.
///
/// Rules:
/// - `risk`                        -> `risk tui`
/// - `risk --dataset x.csv ...`    -> `risk tui --dataset x.csv ...`
/// - `risk --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    // First non-flag token; lets `risk -v train` through untouched.
    let first_positional = argv.iter().skip(1).find(|a| !a.starts_with('-'));
    let is_subcommand = first_positional.is_some_and(|a| {
        matches!(
            a.as_str(),
            "tui" | "score" | "train" | "rescore" | "report" | "sample"
        )
    });
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_dashboard() {
        assert_eq!(rewrite_args(args(&["risk"])), args(&["risk", "tui"]));
        assert_eq!(
            rewrite_args(args(&["risk", "--dataset", "d.csv"])),
            args(&["risk", "tui", "--dataset", "d.csv"])
        );
        assert_eq!(rewrite_args(args(&["risk", "--help"])), args(&["risk", "--help"]));
        assert_eq!(rewrite_args(args(&["risk", "-v", "report"])), args(&["risk", "-v", "report"]));
        assert_eq!(
            rewrite_args(args(&["risk", "train", "--trees", "10"])),
            args(&["risk", "train", "--trees", "10"])
        );
    }

    #[test]
    fn score_flags_parse_into_an_applicant() {
        let cli = crate::cli::Cli::parse_from(args(&[
            "risk", "score", "--age", "35", "--income", "60000", "--loan", "10000", "--rate", "11.5", "--grade",
            "b", "--home", "OWN", "--no-save",
        ]));
        let Command::Score(score) = cli.command else {
            panic!("expected score command");
        };
        let input = applicant_from_args(&score);
        assert_eq!(input.age, 35);
        assert_eq!(input.loan_grade, crate::domain::LoanGrade::B);
        assert_eq!(input.home_ownership, crate::domain::HomeOwnership::Own);
        assert!(score.no_save);
    }

    #[test]
    fn train_flags_map_to_forest_params() {
        let cli = crate::cli::Cli::parse_from(args(&["risk", "train", "--trees", "7", "--max-depth", "4"]));
        let Command::Train(train) = cli.command else {
            panic!("expected train command");
        };
        let params = train_params_from_args(&train);
        assert_eq!(params.forest.n_trees, 7);
        assert_eq!(params.forest.max_depth, Some(4));
        assert_eq!(params.forest.seed, 42);
        assert_eq!(params.test_fraction, 0.2);
    }
}
