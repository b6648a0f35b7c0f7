use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mranchor::config::Config;
use mranchor::context::render_plain;
use mranchor::git::{CachedGitRepository, GitClient};
use mranchor::gitlab::{GitLabClient, MergeRequestKey};
use mranchor::position::difftool_relative_path;
use mranchor::{DiffRefs, LineObservation, Pane, ResolvedPosition, ReviewSession, Side};

#[derive(Parser, Debug)]
#[command(name = "mra")]
#[command(about = "Anchor diff-tool observations to GitLab merge request discussions")]
#[command(version)]
struct Cli {
    /// Local clone of the reviewed project (overrides config)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// GitLab base URL (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve two diff-tool pane observations into a diff position (JSON)
    Resolve {
        #[command(flatten)]
        refs: RefsArgs,

        #[command(flatten)]
        observations: ObservationArgs,
    },
    /// Print lines of context around a line of a file
    Context {
        #[command(flatten)]
        refs: RefsArgs,

        /// Repository-relative file path
        #[arg(long)]
        path: String,

        /// Target line number
        #[arg(long)]
        line: u32,

        /// Numbering of --line: left (old) or right (new)
        #[arg(long, value_enum, default_value = "right")]
        side: SideArg,

        /// Lines of context above and below (default from config)
        #[arg(long)]
        depth: Option<usize>,

        /// Print the window as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Create a discussion, anchored at a position printed by `resolve`
    Post {
        /// Project id or namespace/path
        #[arg(long)]
        project: String,

        /// Merge request iid
        #[arg(long)]
        mr: u64,

        /// Discussion text
        #[arg(long)]
        body: String,

        /// JSON file with a resolved position (`-` for stdin)
        #[arg(long)]
        position: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Args, Debug)]
struct RefsArgs {
    #[arg(long)]
    base_sha: String,
    #[arg(long)]
    start_sha: String,
    #[arg(long)]
    head_sha: String,
}

impl From<RefsArgs> for DiffRefs {
    fn from(args: RefsArgs) -> Self {
        Self {
            base_sha: args.base_sha,
            start_sha: args.start_sha,
            head_sha: args.head_sha,
        }
    }
}

#[derive(Args, Debug)]
struct ObservationArgs {
    /// File shown in the pane that was clicked
    #[arg(long)]
    current_path: String,
    #[arg(long)]
    current_line: u32,
    /// File shown in the other pane
    #[arg(long)]
    next_path: String,
    #[arg(long)]
    next_line: u32,
    /// Temporary directory of `git difftool --dir-diff`; paths are made
    /// repository-relative when given
    #[arg(long)]
    difftool_root: Option<PathBuf>,
}

impl ObservationArgs {
    fn into_observations(self) -> Result<(LineObservation, LineObservation)> {
        let relative = |path: String| -> Result<String> {
            match &self.difftool_root {
                Some(root) => Ok(difftool_relative_path(root, &path)?),
                None => Ok(path),
            }
        };
        let current = LineObservation::new(
            relative(self.current_path.clone())?,
            self.current_line,
            Pane::Current,
        );
        let next = LineObservation::new(
            relative(self.next_path.clone())?,
            self.next_line,
            Pane::Next,
        );
        Ok((current, next))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MRANCHOR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_position(path: &Path) -> Result<ResolvedPosition> {
    let content = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read position from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read position file {}", path.display()))?
    };
    serde_json::from_str(&content).context("Failed to parse position JSON")
}

fn git(config: &Config) -> Result<CachedGitRepository<GitClient>> {
    let client = GitClient::discover(&config.git.repository)?;
    Ok(CachedGitRepository::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(repo) = cli.repo {
        config.git.repository = repo;
    }
    if let Some(host) = cli.host {
        config.gitlab.host = host;
    }

    match cli.command {
        Command::Resolve { refs, observations } => {
            let (current, next) = observations.into_observations()?;
            let session = ReviewSession::local(git(&config)?)
                .with_diff_context(config.git.diff_context);

            let position = session
                .resolve_discussion_position(&current, &next, &refs.into())
                .await?;
            println!("{}", serde_json::to_string_pretty(&position)?);
        }
        Command::Context {
            refs,
            path,
            line,
            side,
            depth,
            json,
        } => {
            let session = ReviewSession::local(git(&config)?);
            let depth = depth.unwrap_or(config.context.depth);

            let window = session
                .render_context_window(&path, &refs.into(), side.into(), line, depth)
                .await?;
            match window {
                Some(window) if json => println!("{}", serde_json::to_string_pretty(&window)?),
                Some(window) => print!("{}", render_plain(&window)),
                None => eprintln!("No context available for {path}:{line}"),
            }
        }
        Command::Post {
            project,
            mr,
            body,
            position,
        } => {
            let position = match position {
                Some(path) if config.discussion.include_position => Some(read_position(&path)?),
                _ => None,
            };
            let server = GitLabClient::new(&config.gitlab.host, config.gitlab_token()?)?;
            let session = ReviewSession::remote(server);

            let outcome = session
                .post_anchored_comment(&MergeRequestKey::new(project, mr), &body, position)
                .await?;
            if outcome.is_degraded() {
                eprintln!("GitLab rejected the position; posted without it");
            }
            println!("{}", serde_json::to_string_pretty(outcome.discussion())?);
        }
    }

    Ok(())
}
