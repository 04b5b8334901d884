//! The default command: process and publish files.

use crate::cli::UploadArgs;
use crate::command::{backend, refresher};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ferry_cache::{UploadCache, manifest_path};
use ferry_config::error::ErrorKind as ConfigErrorKind;
use ferry_config::{Config, user_identity};
use ferry_publish::{Naming, Outcome, Pipeline, Publisher, data_uri, read_inputs};
use ferry_storage::backend::LocalBackend;
use ferry_storage::{PutObject, StorageBackend};
use ferry_transform::{Asset, Stage};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Reject argument combinations that can't name their output.
fn check_usage(args: &UploadArgs) -> Result<()> {
    if args.files.len() > 1 && args.concat && args.name.is_none() {
        exn::bail!(ErrorKind::Usage("--concat with several files needs --name".to_string()));
    }
    if args.files.len() > 1 && !args.concat && args.name.is_some() {
        exn::bail!(ErrorKind::Usage("--name with several files needs --concat".to_string()));
    }
    Ok(())
}

fn destination(dest: &Path) -> Result<LocalBackend> {
    let root = std::path::absolute(dest).or_raise(|| ErrorKind::Storage)?;
    LocalBackend::new("dest", root).or_raise(|| ErrorKind::Storage)
}

fn naming(args: &UploadArgs) -> Naming {
    let naming = match &args.prefix {
        Some(prefix) => Naming::custom(prefix),
        None => Naming::default(),
    };
    naming.with_name(args.name.clone())
}

#[tracing::instrument(skip_all, fields(files = args.files.len()))]
pub async fn run(config: Option<&Path>, args: &UploadArgs) -> Result<ExitCode> {
    check_usage(args)?;
    let assets = read_inputs(&args.files, args.concat, args.name.as_deref()).await;
    if assets.is_empty() {
        exn::bail!(ErrorKind::Usage("no readable input files".to_string()));
    }
    if args.base64 {
        return base64(args, assets).await;
    }

    let dest = args.dest.as_deref().map(destination).transpose()?;
    let config = match Config::load(config) {
        Ok(config) => config,
        Err(err) if dest.is_some() && matches!(&*err, ConfigErrorKind::NotFound(_)) => {
            tracing::warn!("no config, references are left as they are");
            let mut pipeline = Pipeline::new(args.transform_options());
            if let Some(dest) = dest {
                pipeline = pipeline.with_destination(dest);
            }
            return Ok(report(args, &pipeline, assets).await);
        },
        Err(err) => return Err(err.raise(ErrorKind::Config)),
    };

    let cache = UploadCache::open(manifest_path(&user_identity(), &config.identity()));
    let cached = cache.load().await;
    tracing::debug!(path = %cache.path().display(), entries = cached, "upload cache loaded");

    let publisher =
        Publisher::new(backend(&config)?, &cache, &config.url_prefix).with_refresher(refresher(&config)?);
    let mut pipeline = Pipeline::new(args.transform_options())
        .with_extensions(config.extensions.clone().unwrap_or_default())
        .with_publisher(publisher);
    if let Some(dest) = dest {
        pipeline = pipeline.with_destination(dest);
    }
    let code = report(args, &pipeline, assets).await;

    if let Err(err) = cache.flush().await {
        tracing::error!(path = %cache.path().display(), error = ?err, "could not save upload cache");
    }
    Ok(code)
}

/// Run every asset through the pipeline and print where each one ended up.
async fn report(args: &UploadArgs, pipeline: &Pipeline<'_>, assets: Vec<Asset>) -> ExitCode {
    let naming = naming(args);
    let mut failed = 0usize;
    let mut results = std::pin::pin!(pipeline.process_all(assets, &naming));
    while let Some((path, outcome)) = results.next().await {
        let location = match &outcome {
            Outcome::Written(written) => Some(written.display().to_string()),
            outcome => outcome.value().map(str::to_string),
        };
        match (location, args.output_simple) {
            (Some(location), true) => println!("{location}"),
            (Some(location), false) => println!("OK: {} -> {location}", path.display()),
            (None, _) => {
                failed += 1;
                if !args.output_simple {
                    println!("FAILED: {}", path.display());
                }
            },
        }
    }
    if !args.output_simple {
        tracing::info!(failed, "done");
    }
    match failed {
        0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Replace each input with its data URI, then print it or write it to the
/// destination.
async fn base64(args: &UploadArgs, assets: Vec<Asset>) -> Result<ExitCode> {
    let options = args.transform_options();
    let dest = args.dest.as_deref().map(destination).transpose()?;
    for asset in assets {
        let asset = ferry_transform::run(Stage::Before, &options, asset);
        let asset = ferry_transform::run(Stage::After, &options, asset);
        let uri = data_uri(&asset.path, &asset.contents);
        let Some(dest) = &dest else {
            println!("{uri}");
            continue;
        };
        let key = args.name.clone().unwrap_or_else(|| asset.file_name());
        let written: PathBuf = dest.root().join(&key);
        dest.put(PutObject::new(&key, uri.into_bytes()).with_content_type("text/plain; charset=utf-8"))
            .await
            .or_raise(|| ErrorKind::Storage)?;
        println!("{}", written.display());
    }
    Ok(ExitCode::SUCCESS)
}
