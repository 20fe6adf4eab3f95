//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{debug, warn};

/// Ensure the directory holding the local cache file exists.
pub async fn ensure_env(cache_path: &str) -> anyhow::Result<()> {
    let Some(parent) = Path::new(cache_path).parent().filter(|p| !p.as_os_str().is_empty()) else {
        debug!(%cache_path, "local cache lives in the working directory");
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_err() {
        warn!(dir = %parent.display(), "local cache directory missing; creating it");
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_cache_dir() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("watch_admin_env_{}", uuid::Uuid::new_v4()));
        let cache = dir.join("nested").join("cache.json");
        ensure_env(&cache.to_string_lossy()).await?;
        assert!(tokio::fs::metadata(dir.join("nested")).await?.is_dir());
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn bare_file_name_needs_no_dir() -> anyhow::Result<()> {
        ensure_env("cache.json").await
    }
}
