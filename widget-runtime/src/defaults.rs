use std::path::PathBuf;

use widget_core::config::{VoiceSettings, WidgetConfig};

pub const CONFIG_FILE_NAME: &str = "widget.json";
pub const STORAGE_FILE_NAME: &str = "contact_sessions.json";
pub const LOCAL_BACKEND_URL: &str = "http://127.0.0.1:3210";

pub fn default_widget_config() -> WidgetConfig {
    WidgetConfig {
        voice: VoiceSettings {
            public_key: String::new(),
            assistant_id: String::new(),
        },
        backend_url: LOCAL_BACKEND_URL.into(),
        storage_path: Some(STORAGE_FILE_NAME.into()),
    }
}

/// Resolves a configured storage path. Relative paths live next to the
/// config file.
pub fn resolve_storage_path(config_path: &std::path::Path, storage_path: &str) -> PathBuf {
    let path = PathBuf::from(storage_path);
    if path.is_absolute() {
        return path;
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn relative_storage_sits_next_to_config() {
        let resolved = resolve_storage_path(Path::new("/etc/widget/widget.json"), "s.json");
        assert_eq!(resolved, PathBuf::from("/etc/widget/s.json"));
    }

    #[test]
    fn absolute_storage_is_kept() {
        let resolved = resolve_storage_path(Path::new("/etc/widget/widget.json"), "/var/s.json");
        assert_eq!(resolved, PathBuf::from("/var/s.json"));
    }
}
