use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use graphkit::ErrorStrategy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lattice")]
#[command(version)]
#[command(about = "Declarative resource graphs for cloud networking", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what would change without touching anything
    Plan(PlanArgs),

    /// Converge the cloud onto the desired graph
    Apply(ApplyArgs),

    /// Print the planned action graph in Graphviz dot format
    Graph(PlanArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Desired graph spec (JSON)
    #[arg(long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Cloud state seed for the offline cloud (JSON)
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Don't make changes, just walk the plan
    #[arg(long)]
    pub dry_run: bool,

    /// What to do when an action fails
    #[arg(long, value_enum, default_value_t = ErrorStrategyArg::Continue)]
    pub error_strategy: ErrorStrategyArg,

    /// Overall execution timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Post-error cleanup timeout in seconds (parallel only)
    #[arg(long, default_value_t = 60)]
    pub wait_orphans_timeout: u64,

    /// Run independent actions concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Concurrent worker bound for --parallel (default: unbounded)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorStrategyArg {
    /// Stop dispatching after the first failure
    Stop,
    /// Keep running unaffected branches
    Continue,
}

impl From<ErrorStrategyArg> for ErrorStrategy {
    fn from(arg: ErrorStrategyArg) -> ErrorStrategy {
        match arg {
            ErrorStrategyArg::Stop => ErrorStrategy::StopOnError,
            ErrorStrategyArg::Continue => ErrorStrategy::ContinueOnError,
        }
    }
}
