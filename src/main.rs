//! ocf CLI - Push applications to OpenShift the way `cf push` does.

use clap::Parser;
use ocf::app::Orchestrator;
use ocf::cli::{Cli, Commands, ConfigCommands};
use ocf::commands::{self, CommandResult};
use ocf::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use ocf::exec::DefaultRunner;
use ocf::manifest::PushFlags;
use ocf::platform::OcClient;
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = match resolve(&cli) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, !cli.json),
    };
    let human = config.output_format() == OutputFormat::Human;

    if let Err(e) = run_command(cli.command, &config, human) {
        exit_with_error(&e, human);
    }
}

/// Install the stderr subscriber. `--debug` wins over `RUST_LOG`.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve configuration: flag > environment > config.kdl > defaults.
fn resolve(cli: &Cli) -> Result<ResolvedConfig, ocf::Error> {
    let mut overrides = ConfigOverrides::new().with_process_env();
    if let Some(ref binary) = cli.oc_binary {
        overrides = overrides.with_oc_binary(binary.clone());
    }
    if let Commands::Push {
        image: Some(ref image),
        ..
    } = cli.command
    {
        overrides = overrides.with_image(image.clone());
    }
    if cli.json {
        overrides = overrides.with_output_format(OutputFormat::Json);
    }
    resolve_config(cli.config.as_deref(), &overrides)
}

fn orchestrator(config: &ResolvedConfig) -> Orchestrator<OcClient<DefaultRunner>> {
    Orchestrator::new(OcClient::new(DefaultRunner::new(config.oc_binary())))
}

fn run_command(
    command: Commands,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), ocf::Error> {
    match command {
        Commands::Push {
            name,
            buildpack,
            command,
            manifest_path,
            memory,
            path,
            image: _,
        } => {
            let flags = PushFlags {
                name,
                buildpack,
                command,
                manifest_path,
                memory,
                path,
            };
            let cwd = env::current_dir()?;
            let summary = commands::push(&orchestrator(config), &flags, config.image(), &cwd)?;
            output(&summary, human);
        }

        Commands::BindService { app, service } => {
            let report = commands::bind_service(&orchestrator(config), &app, &service)?;
            output(&report, human);
        }

        Commands::UnbindService { app, service } => {
            let report = commands::unbind_service(&orchestrator(config), &app, &service)?;
            output(&report, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(config), human),
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn exit_with_error(error: &ocf::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
    process::exit(1);
}
