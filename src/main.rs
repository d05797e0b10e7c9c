use anyhow::Result;
use clap::Parser;
use feedman::commands::{self, Config, GlobalOptions};
use feedman::feed::{ListVersionsOptions, OrderBy, SearchOptions, VersionExpansion};
use log::warn;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// feedman - NuGet v3 feed manager
///
/// Search a feed, list package versions, push packages and delete versions.
///
/// The feed URL and API key come from the command line, the environment or
/// the settings file written by `feedman config set`, in that order.
///
/// Examples:
///   feedman --feed-url https://feed.example search json
///   feedman versions Example.Package --include-unlisted
///   feedman push ./nupkgs
#[derive(Parser, Debug)]
#[command(author, version = env!("FEEDMAN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Feed URL, either the service index or its base
    #[arg(long = "feed-url", env = "FEEDMAN_FEED_URL", value_name = "URL", global = true)]
    pub feed_url: Option<String>,

    /// API key for push and delete
    #[arg(
        long = "api-key",
        env = "FEEDMAN_API_KEY",
        hide_env_values = true,
        value_name = "KEY",
        global = true
    )]
    pub api_key: Option<String>,

    /// Settings file (defaults to the user config directory)
    #[arg(long = "settings", env = "FEEDMAN_SETTINGS", value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search the feed for packages
    Search(SearchArgs),

    /// List the versions of one package
    Versions(VersionsArgs),

    /// Push package files to the feed
    Push(PushArgs),

    /// Delete (unlist) versions of a package
    Delete(DeleteArgs),

    /// Pack a project, or every project in a solution, with `dotnet pack`
    Pack(PackArgs),

    /// Show or change stored settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Id,
    Relevance,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search terms; omit to list everything
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// How many packages to return
    #[arg(long, default_value_t = 20)]
    pub take: usize,

    /// Leave out prerelease versions
    #[arg(long)]
    pub stable_only: bool,

    /// Include packages the feed reports as delisted
    #[arg(long)]
    pub include_delisted: bool,

    #[arg(long, value_enum, default_value = "relevance")]
    order_by: SortOrder,

    /// Show every version of each package
    #[arg(long)]
    pub with_versions: bool,
}

#[derive(clap::Args, Debug)]
pub struct VersionsArgs {
    #[arg(value_name = "PACKAGE_ID")]
    pub id: String,

    /// Leave out prerelease versions
    #[arg(long)]
    pub stable_only: bool,

    /// Include unlisted versions
    #[arg(long)]
    pub include_unlisted: bool,
}

#[derive(clap::Args, Debug)]
pub struct PushArgs {
    /// Package files, directories or glob patterns
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    #[arg(value_name = "PACKAGE_ID")]
    pub id: String,

    #[arg(value_name = "VERSION", required = true)]
    pub versions: Vec<String>,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct PackArgs {
    /// A project file or a .sln
    #[arg(value_name = "PROJECT")]
    pub target: PathBuf,

    /// Output directory (defaults to ../nupkgs next to each project)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Package version to stamp
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigCommands {
    /// Print the stored settings
    Show,

    /// Store the given --feed-url and --api-key
    Set,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling...");
            ctrl_c.cancel();
        }
    });

    let options = GlobalOptions {
        feed_url: cli.feed_url,
        api_key: cli.api_key,
        settings_path: cli.settings,
    };

    match cli.command {
        Commands::Search(args) => {
            let search_options = SearchOptions {
                include_prerelease: !args.stable_only,
                include_delisted: args.include_delisted,
                order_by: match args.order_by {
                    SortOrder::Id => OrderBy::Id,
                    SortOrder::Relevance => OrderBy::Relevance,
                },
                expand: if args.with_versions {
                    VersionExpansion::Inline
                } else {
                    VersionExpansion::None
                },
                ..SearchOptions::default()
            };
            let query = args.query.unwrap_or_default();
            commands::search(
                Config::new(&options)?,
                &query,
                args.take,
                &search_options,
                &cancel,
            )
            .await?
        }
        Commands::Versions(args) => {
            let list_options = ListVersionsOptions {
                include_prerelease: !args.stable_only,
                include_unlisted: args.include_unlisted,
            };
            commands::versions(Config::new(&options)?, &args.id, list_options, &cancel).await?
        }
        Commands::Push(args) => commands::push(Config::new(&options)?, &args.paths, &cancel).await?,
        Commands::Delete(args) => {
            commands::delete(
                Config::new(&options)?,
                &args.id,
                &args.versions,
                args.yes,
                &cancel,
            )
            .await?
        }
        Commands::Pack(args) => {
            commands::pack(&args.target, args.output, args.version, &cancel).await?
        }
        Commands::Config(ConfigCommands::Show) => commands::settings::show(&options)?,
        Commands::Config(ConfigCommands::Set) => commands::settings::set(&options)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_search_parsing() {
        let cli = Cli::try_parse_from([
            "feedman",
            "search",
            "json",
            "--take",
            "250",
            "--order-by",
            "id",
        ])
        .unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query.as_deref(), Some("json"));
                assert_eq!(args.take, 250);
                assert_eq!(args.order_by, SortOrder::Id);
                assert!(!args.stable_only);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::try_parse_from(["feedman", "search"]).unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, None);
                assert_eq!(args.take, 20);
                assert_eq!(args.order_by, SortOrder::Relevance);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_feed_url_after_subcommand() {
        let cli = Cli::try_parse_from([
            "feedman",
            "versions",
            "Example.Package",
            "--feed-url",
            "https://feed.example",
        ])
        .unwrap();
        assert_eq!(cli.feed_url.as_deref(), Some("https://feed.example"));
        match cli.command {
            Commands::Versions(args) => assert_eq!(args.id, "Example.Package"),
            _ => panic!("Expected Versions command"),
        }
    }

    #[test]
    fn test_cli_delete_parsing() {
        let cli =
            Cli::try_parse_from(["feedman", "delete", "Example.Package", "1.0.0", "2.0.0", "-y"])
                .unwrap();
        match cli.command {
            Commands::Delete(args) => {
                assert_eq!(args.versions, vec!["1.0.0", "2.0.0"]);
                assert!(args.yes);
            }
            _ => panic!("Expected Delete command"),
        }
    }

    #[test]
    fn test_cli_delete_requires_version() {
        assert!(Cli::try_parse_from(["feedman", "delete", "Example.Package"]).is_err());
    }

    #[test]
    fn test_cli_push_requires_path() {
        assert!(Cli::try_parse_from(["feedman", "push"]).is_err());
    }

    #[test]
    fn test_cli_config_set_parsing() {
        let cli = Cli::try_parse_from([
            "feedman",
            "config",
            "set",
            "--feed-url",
            "https://feed.example",
            "--settings",
            "/tmp/settings.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Set)));
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/settings.json")));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["feedman"]).is_err());
    }
}
