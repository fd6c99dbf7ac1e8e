use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use maskforge::config::MaskConfig;
use maskforge::MaskResult;
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with mask settings; explicit flags override it.
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Generate(cmd::generate::GenerateArgs),
    Crack(cmd::crack::CrackArgs),
    Inspect(cmd::inspect::InspectArgs),
    Encodings,
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    // Candidates own stdout, so all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let sub_matches = matches.subcommand().map(|(_, m)| m).unwrap_or(&matches);

    let result = match &cli.command {
        Commands::Generate(args) => resolve_config(&args.mask, cli.config.as_deref(), sub_matches)
            .and_then(|config| cmd::generate::run(args, config)),
        Commands::Crack(args) => resolve_config(&args.mask, cli.config.as_deref(), sub_matches)
            .and_then(|config| cmd::crack::run(args, config)),
        Commands::Inspect(args) => resolve_config(&args.mask, cli.config.as_deref(), sub_matches)
            .and_then(|config| cmd::inspect::run(args, config)),
        Commands::Encodings => {
            reports::print_encodings();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn resolve_config(
    cli_config: &MaskConfig,
    path: Option<&str>,
    matches: &ArgMatches,
) -> MaskResult<MaskConfig> {
    let Some(path) = path else {
        return Ok(cli_config.clone());
    };
    info!("Loading mask settings from {}", path);
    let mut config = MaskConfig::load_from_file(path)?;
    config.merge_from_cli(cli_config, matches);
    Ok(config)
}
