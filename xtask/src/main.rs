use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for planeworks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests, or only those of one crate
    Test {
        /// Crate to test, e.g. planeworks-stream
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Run the chunk scan bench
    Bench,
    /// Run a short headless simulation through the CLI
    Smoke {
        #[arg(short, long, default_value = "30")]
        ticks: u64,
    },
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests(None)?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test { package } => run_tests(package.as_deref())?,
        Commands::Bench => run_bench()?,
        Commands::Smoke { ticks } => run_smoke(ticks)?,
        Commands::Doc => run_doc()?,
        Commands::Build => cargo(&["build", "--workspace"])?,
    }

    Ok(())
}

/// Run cargo with `args`, failing if it exits unsuccessfully.
fn cargo(args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
}

fn run_tests(package: Option<&str>) -> Result<()> {
    match package {
        Some(p) => cargo(&["test", "-p", p]),
        None => cargo(&["test", "--workspace"]),
    }
}

fn run_bench() -> Result<()> {
    cargo(&["bench", "-p", "planeworks-stream", "--bench", "bench_chunk_scan"])
}

fn run_smoke(ticks: u64) -> Result<()> {
    let ticks = ticks.to_string();
    cargo(&[
        "run",
        "-p",
        "planeworks-cli",
        "--",
        "simulate",
        "--ticks",
        &ticks,
        "--objects",
        "500",
    ])
}

fn run_doc() -> Result<()> {
    cargo(&["doc", "--workspace", "--no-deps"])
}
