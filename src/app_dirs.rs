use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("cogscreen"),
            )
        } else {
            ProjectDirs::from("", "", "cogscreen")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("cogscreen.log")
    }
}
