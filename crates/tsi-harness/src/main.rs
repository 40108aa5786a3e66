use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tsi_harness::{init_tracing, FailureKind, Harness, HarnessConfig, HarnessError, OutcomeStatus, Scenario};
use tsi_instant::Instant;
use tsi_store::{ResetStrategy, TimestampEncoding};

#[tokio::main]
async fn main() {
    let cli = Command::new("tsi")
        .version(tsi_harness::VERSION)
        .about("Timestamp round-trip harness")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("database")
                .long("database")
                .global(true)
                .env("DATABASE_URL")
                .help("Database location (:memory:, sqlite://path or a plain path)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .help("Default log filter when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("run")
                .about("Run round-trip scenarios")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .default_value("all")
                        .value_parser(["storage", "session", "all"])
                        .help("Scenario to run"),
                )
                .arg(
                    Arg::new("encoding")
                        .long("encoding")
                        .value_parser(value_parser!(TimestampEncoding))
                        .help("Instant column encoding (aware or naive)"),
                )
                .arg(
                    Arg::new("create-tz")
                        .long("create-tz")
                        .help("Zone in effect when instants are captured"),
                )
                .arg(
                    Arg::new("read-tz")
                        .long("read-tz")
                        .help("Zone in effect when instants are read back"),
                )
                .arg(
                    Arg::new("at")
                        .long("at")
                        .value_parser(value_parser!(i64))
                        .help("Pin \"now\" to this many milliseconds since the epoch"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output report as JSON"),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Reset the database")
                .arg(
                    Arg::new("strategy")
                        .long("strategy")
                        .default_value("truncate")
                        .value_parser(["truncate", "recreate"])
                        .help("Empty every table, or recreate the record table only"),
                ),
        );

    let matches = cli.get_matches();

    let code = match execute(&matches).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            e.downcast_ref::<HarnessError>()
                .map_or(FailureKind::Config.exit_code(), HarnessError::exit_code)
        }
    };

    std::process::exit(code);
}

async fn execute(matches: &ArgMatches) -> anyhow::Result<i32> {
    let log_level = matches
        .get_one::<String>("log-level")
        .map_or("info", String::as_str);
    init_tracing(log_level, matches.get_flag("log-json"))?;

    let mut config = load_config(matches)?;

    match matches.subcommand() {
        Some(("run", args)) => {
            config = apply_run_overrides(config, args);
            let selection = args.get_one::<String>("scenario").map_or("all", String::as_str);
            let scenarios = Scenario::parse_selection(selection)?;

            let harness = Harness::bootstrap(&config)
                .await
                .context("failed to start harness")?;
            let report = harness.run(&scenarios).await;

            if args.get_flag("json") {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.generate_text());
            }

            if let Some(failure) = report.first_failure() {
                if let OutcomeStatus::Failed { kind, message, .. } = &failure.status {
                    eprintln!(
                        "FAILED scenario={} layer={} kind={}: {}",
                        failure.scenario, failure.layer, kind, message
                    );
                }
            }

            Ok(report.exit_code())
        }
        Some(("reset", args)) => {
            let strategy = match args.get_one::<String>("strategy").map(String::as_str) {
                Some("recreate") => ResetStrategy::RecreateTable,
                _ => ResetStrategy::FullTruncate,
            };

            let harness = Harness::bootstrap(&config)
                .await
                .context("failed to open database")?;
            let result = harness.reset(strategy).await;
            harness.close().await;

            let report = result?;
            println!("Reset ({}): {}", report.strategy, report.tables.join(", "));
            Ok(0)
        }
        _ => Ok(0),
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<HarnessConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::from_toml_file(path)?,
        None => HarnessConfig::new(),
    };

    if let Some(url) = matches.get_one::<String>("database") {
        config = config.with_database_url(url.clone());
    }

    Ok(config)
}

fn apply_run_overrides(mut config: HarnessConfig, args: &ArgMatches) -> HarnessConfig {
    if let Some(encoding) = args.get_one::<TimestampEncoding>("encoding") {
        config = config.with_encoding(*encoding);
    }
    if let Some(create) = args.get_one::<String>("create-tz") {
        config.create_timezone = create.clone();
    }
    if let Some(read) = args.get_one::<String>("read-tz") {
        config.read_timezone = read.clone();
    }
    if let Some(millis) = args.get_one::<i64>("at") {
        config = config.with_fixed_instant(Instant::from_millis(*millis));
    }
    config
}
