use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub fn app_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("app", "merch-studio", "merch-studio")
        .ok_or_else(|| anyhow!("cannot resolve project dirs"))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dirs = app_dirs()?;
    let data_dir = dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir).context("create data dir")?;
    Ok(data_dir)
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Downloads go to the configured directory, else the working directory.
pub fn resolve_output_dir(explicit: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    explicit
        .or(configured)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_output_dir_wins() {
        let out = resolve_output_dir(Some(Path::new("a")), Some(Path::new("b")));
        assert_eq!(out, PathBuf::from("a"));
        let out = resolve_output_dir(None, Some(Path::new("b")));
        assert_eq!(out, PathBuf::from("b"));
        assert_eq!(resolve_output_dir(None, None), PathBuf::from("."));
    }

    #[test]
    fn logs_live_under_data_dir() {
        assert_eq!(log_dir(Path::new("/data")), PathBuf::from("/data/logs"));
    }
}
