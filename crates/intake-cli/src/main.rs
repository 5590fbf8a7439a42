// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use intake_app::BuilderState;
use intake_db::Store;
use intake_testkit::IntakeFaker;
use intake_tracker::{BoardColumn, Client, IssueFilter, Member, Priority, Team};
use runtime::DbRuntime;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEMO_SEED: u64 = 2026;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `intake --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging()?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or INTAKE_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let client = config.tracker_client().with_context(|| {
        format!(
            "invalid [tracker] config in {}; fix endpoint/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    if options.list_teams {
        let client = require_client(client, &config)?;
        print!("{}", format_teams(&client.list_teams()?));
        return Ok(());
    }

    if let Some(team) = &options.board_team {
        let client = require_client(client, &config)?;
        let team = resolve_team(&client.list_teams()?, team)?;
        let states = client.list_workflow_states(&team.id)?;
        let filters = if options
            .board_filters
            .iter()
            .any(|filter| matches!(filter, IssueFilter::Assignee(_)))
        {
            resolve_assignees(&client.list_members(&team.id)?, &options.board_filters)?
        } else {
            options.board_filters.clone()
        };
        let issues = client.list_issues(&team.id, None, &filters)?;
        print!(
            "{}",
            format_board(&team, &intake_tracker::board_columns(&states, issues))
        );
        return Ok(());
    }

    let mut runtime = DbRuntime::new(&store).with_client(client);
    let (form, settings) = if options.demo {
        let mut faker = IntakeFaker::new(DEMO_SEED);
        let form = faker.form(4);
        let settings = faker.settings();
        runtime = runtime.with_offline_candidates(faker.tracker_candidates());
        (form, settings)
    } else if let Some(latest) = store.list_forms()?.first() {
        let stored = store.load_form(latest.id)?;
        tracing::info!(form = latest.id.get(), name = %latest.name, "resuming form");
        runtime = runtime.editing(Some(stored.id));
        (stored.form, stored.settings)
    } else {
        Default::default()
    };

    let mut state = BuilderState::new(form, settings, config.picker_options());
    intake_tui::run_app(&mut state, &mut runtime)
}

/// Sends `tracing` output to a file in the data directory; stdout belongs to
/// the terminal UI. `INTAKE_LOG` takes an `EnvFilter` directive.
fn init_logging() -> Result<()> {
    let log_path = intake_db::data_dir()?.join("intake.log");
    let log_file = File::create(&log_path)
        .with_context(|| format!("create log file {}", log_path.display()))?;
    let filter = EnvFilter::try_from_env("INTAKE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

fn require_client(client: Option<Client>, config: &Config) -> Result<Client> {
    client.ok_or_else(|| {
        anyhow!(
            "no tracker API key found -- export {} or set [tracker].api_key_env",
            config.tracker_api_key_env()
        )
    })
}

/// Finds a team by id or by case-insensitive name.
fn resolve_team(teams: &[Team], wanted: &str) -> Result<Team> {
    teams
        .iter()
        .find(|team| team.id == wanted)
        .or_else(|| {
            teams
                .iter()
                .find(|team| team.name.eq_ignore_ascii_case(wanted))
        })
        .cloned()
        .ok_or_else(|| {
            anyhow!("no team named {wanted:?} -- run `intake --list-teams` to see team names")
        })
}

/// Swaps assignee names for member ids; ids pass through unchanged.
fn resolve_assignees(members: &[Member], filters: &[IssueFilter]) -> Result<Vec<IssueFilter>> {
    filters
        .iter()
        .map(|filter| match filter {
            IssueFilter::Assignee(wanted) => members
                .iter()
                .find(|member| member.id == *wanted)
                .or_else(|| {
                    members.iter().find(|member| {
                        member.name.eq_ignore_ascii_case(wanted)
                            || member.shown_name().eq_ignore_ascii_case(wanted)
                    })
                })
                .map(|member| IssueFilter::Assignee(member.id.clone()))
                .ok_or_else(|| anyhow!("no team member named {wanted:?} -- check the spelling")),
            other => Ok(other.clone()),
        })
        .collect()
}

fn format_teams(teams: &[Team]) -> String {
    if teams.is_empty() {
        return "no teams\n".to_owned();
    }
    let width = teams.iter().map(|team| team.id.len()).max().unwrap_or(0);
    teams
        .iter()
        .map(|team| format!("{:<width$}  {}\n", team.id, team.name))
        .collect()
}

fn format_board(team: &Team, columns: &[BoardColumn]) -> String {
    let mut out = format!("{}\n", team.name);
    for column in columns {
        out.push_str(&format!(
            "\n{} ({})\n",
            column.state.name,
            column.issues.len()
        ));
        for issue in &column.issues {
            let priority = match issue.priority {
                Priority::None => String::new(),
                level => format!("  [{}]", level.as_str()),
            };
            let assignee = issue
                .assignee
                .as_ref()
                .map(|member| format!("  @{}", member.shown_name()))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {}  {}{}{}\n",
                issue.identifier, issue.title, priority, assignee
            ));
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    list_teams: bool,
    board_team: Option<String>,
    board_filters: Vec<IssueFilter>,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        list_teams: false,
        board_team: None,
        board_filters: Vec::new(),
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--list-teams" => {
                options.list_teams = true;
            }
            "--board" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--board requires a team id or name"))?;
                options.board_team = Some(value.as_ref().to_owned());
            }
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires key=value, for example label=Bug"))?;
                options.board_filters.push(IssueFilter::parse(value.as_ref())?);
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if !options.board_filters.is_empty() && options.board_team.is_none() {
        return Err(anyhow!("--filter only applies to --board -- add --board <team>"));
    }
    Ok(options)
}

fn print_help() {
    println!("intake");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with a generated form (in-memory)");
    println!("  --check                  Validate config + DB + tracker settings");
    println!("  --list-teams             Print tracker teams and exit");
    println!("  --board <team>           Print a team's issues grouped by workflow state");
    println!("  --filter <key=value>     Narrow --board by state, priority, label, or assignee");
    println!("  --help                   Show this help");
}
