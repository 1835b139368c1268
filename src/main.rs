use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linkmend::config::Settings;
use linkmend::corpus::{AssetId, Corpus};
use linkmend::finder;
use linkmend::guard::{RenameGuard, RenameTransition};
use linkmend::rewrite;

#[derive(Parser)]
#[command(name = "linkmend", about = "Keep image links in a markdown vault intact across asset renames", version)]
struct Cli {
    /// Vault root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every document position that references an asset
    Refs {
        /// Vault-relative path of the asset
        asset: PathBuf,
    },
    /// Move an asset and rewrite every reference to it
    Rename {
        /// Current vault-relative path of the asset
        old: PathBuf,
        /// New vault-relative path
        new: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("vault root {} not found", cli.root.display()))?;

    let settings = Settings::new(&root)?;
    let mut corpus = Corpus::scan(&settings, &root)
        .with_context(|| format!("failed to scan vault at {}", root.display()))?;

    match cli.command {
        Command::Refs { asset } => {
            let id = AssetId::from(asset.as_path());
            if !corpus.contains_asset(&id) {
                bail!("no asset {} in vault", id);
            }

            let refs = finder::find_references(&corpus, &settings, &id);
            for reference in &refs {
                println!(
                    "{}:{}:{}\t{}",
                    reference.file.display(),
                    reference.line + 1,
                    reference.start_col + 1,
                    reference.raw
                );
            }
            eprintln!("{} reference(s) to {}", refs.len(), id);
        }
        Command::Rename { old, new } => {
            let old_id = AssetId::from(old.as_path());
            let new_id = AssetId::from(new.as_path());
            if !corpus.contains_asset(&old_id) {
                bail!("no asset {} in vault", old_id);
            }
            if corpus.contains_asset(&new_id) {
                bail!("asset {} already exists", new_id);
            }

            // Move the file first; the rewrite only touches document text.
            let to = root.join(new_id.as_path());
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(root.join(old_id.as_path()), to)?;
            corpus.rename_asset(&old_id, new_id.clone());

            let mut guard = RenameGuard::new();
            let transition = RenameTransition::new(old_id, new_id);
            match rewrite::handle_rename(&mut corpus, &settings, &mut guard, &transition) {
                Some(outcome) => {
                    for doc in &outcome.touched {
                        println!("{}", doc.display());
                    }
                    eprintln!("updated {} file(s)", outcome.updated_files);
                }
                None => eprintln!("rename already processed"),
            }
        }
    }

    Ok(())
}
