use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct JustLoad {
    filename: std::path::PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = JustLoad::parse();

    let db = dwdump::DumpDb::open(&args.filename, None)?;
    println!(
        "{} types, {} functions, {} variables",
        db.types.len(),
        db.functions.len(),
        db.variables.len(),
    );

    Ok(())
}
