//! The `tagsense extract` command.

use std::path::PathBuf;

use clap::Args;

use super::expand_path;

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Dataset directory
    pub data_dir: PathBuf,

    /// Directory the PNGs are written to
    #[arg(short, long, default_value = "debug")]
    pub output: PathBuf,
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs) -> anyhow::Result<()> {
    let data_dir = expand_path(&args.data_dir);
    let output = expand_path(&args.output);

    let report =
        tokio::task::spawn_blocking(move || tagsense_core::dataset::extract(&data_dir, &output))
            .await??;

    println!("Wrote {} images ({} skipped)", report.written, report.skipped);
    Ok(())
}
