pub mod init;
pub mod refresh;
pub mod upload;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ferry_config::Config;
use ferry_storage::backend::S3Backend;
use ferry_storage::cdn::HttpRefresher;
use ferry_storage::{BackendHandle, RefresherHandle};
use std::sync::Arc;

fn backend(config: &Config) -> Result<BackendHandle> {
    let backend = S3Backend::new(
        "s3",
        &config.bucket,
        None,
        &config.region,
        config.endpoint.as_deref(),
        &config.access_key_id,
        &config.secret_access_key,
    )
    .or_raise(|| ErrorKind::Storage)?;
    Ok(Arc::new(backend))
}

fn refresher(config: &Config) -> Result<Option<RefresherHandle>> {
    let Some(cdn) = &config.cdn else {
        return Ok(None);
    };
    let refresher = HttpRefresher::new(&cdn.endpoint, &cdn.token).or_raise(|| ErrorKind::Storage)?;
    Ok(Some(Arc::new(refresher)))
}
