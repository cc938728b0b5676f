use blueprint::cli::{Cli, Commands};
use clap::Parser;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(global.verbose);

    match cli.command {
        Commands::Init(args) => blueprint::cli::commands::init::run(args),
        Commands::Lint(args) => blueprint::cli::commands::lint::run(args, &global),
        Commands::List(args) => blueprint::cli::commands::list::run(args, &global),
        Commands::Describe(args) => blueprint::cli::commands::describe::run(args, &global),
        Commands::Schema(args) => blueprint::cli::commands::schema::run(args, &global),
        Commands::New(args) => blueprint::cli::commands::new::run(args, &global),
        Commands::Build(args) => blueprint::cli::commands::build::run(args, &global),
        Commands::Completions(args) => blueprint::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr so command output stays pipeable; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,blueprint=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
