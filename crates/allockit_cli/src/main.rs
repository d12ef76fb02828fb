use std::io::IsTerminal;
use std::path::PathBuf;

use allockit_merge::{
    EnumKeyConflictPolicy, EnumNullStoreRule, SpecConsolidateOptions, consolidate_to_file,
};
use anyhow::Context;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "allocmerge",
    about = "Consolidate allocation exports into one Master Allocation workbook"
)]
struct Args {
    /// Allocation exports, consolidated in the order given.
    files: Vec<PathBuf>,

    /// Output workbook path (overrides --out-dir).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Directory for the default `Consolidated_Allocation_<stamp>.xlsx`.
    #[arg(long = "out-dir", env = "ALLOCMERGE_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Reconciliation of store attributes that differ between rows.
    #[arg(
        long = "key-conflict",
        env = "ALLOCMERGE_KEY_CONFLICT",
        value_enum,
        default_value_t = KeyConflictArg::First
    )]
    key_conflict: KeyConflictArg,

    /// Handling of rows without a valid store number.
    #[arg(
        long = "null-store",
        env = "ALLOCMERGE_NULL_STORE",
        value_enum,
        default_value_t = NullStoreArg::Drop
    )]
    null_store: NullStoreArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyConflictArg {
    First,
    Strict,
}

impl From<KeyConflictArg> for EnumKeyConflictPolicy {
    fn from(value: KeyConflictArg) -> Self {
        match value {
            KeyConflictArg::First => Self::First,
            KeyConflictArg::Strict => Self::Strict,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NullStoreArg {
    Drop,
    Error,
    Bucket,
}

impl From<NullStoreArg> for EnumNullStoreRule {
    fn from(value: NullStoreArg) -> Self {
        match value {
            NullStoreArg::Drop => Self::Drop,
            NullStoreArg::Error => Self::Error,
            NullStoreArg::Bucket => Self::Bucket,
        }
    }
}

/// Parse args, initialize logging, consolidate and write the workbook.
fn main() -> anyhow::Result<()> {
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "allockit=info,warn".into()),
        )
        .init();

    let args = Args::parse();
    let options = SpecConsolidateOptions {
        rule_key_conflict: args.key_conflict.into(),
        rule_null_store: args.null_store.into(),
        ..Default::default()
    };

    let path_out = match args.output {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&args.out_dir).with_context(|| {
                format!("failed to create output directory {}", args.out_dir.display())
            })?;
            args.out_dir
        }
    };

    let (path_written, result) = consolidate_to_file(&args.files, &path_out, &options)
        .context("consolidation failed")?;

    println!("{}", result.report.summary());
    for warning in &result.report.warnings {
        println!("warning: {warning}");
    }
    println!("Wrote {}", path_written.display());
    tracing::debug!("{}", result.report);
    Ok(())
}
