use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Replaces `dst` with `tmp`, keeping the previous file until the rename
/// succeeds.
pub fn replace_file(tmp: &Path, dst: &Path) -> anyhow::Result<()> {
    let backup = dst.with_extension("bak");

    if dst.exists() {
        let _ = fs::remove_file(&backup);
        fs::rename(dst, &backup)
            .with_context(|| format!("failed rename {} -> {}", dst.display(), backup.display()))?;
    }

    if let Err(e) = fs::rename(tmp, dst) {
        if backup.exists() {
            let _ = fs::rename(&backup, dst);
        }
        let _ = fs::remove_file(tmp);
        return Err(anyhow::Error::new(e).context(format!(
            "failed rename {} -> {}",
            tmp.display(),
            dst.display()
        )));
    }

    let _ = fs::remove_file(&backup);
    Ok(())
}

/// Writes `value` as pretty JSON next to `path`, then swaps it in.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(value).context("encode JSON")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory: {}", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
    replace_file(&tmp, path).with_context(|| format!("replace file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("data.json");
        fs::write(&dst, "old").unwrap();

        write_json_atomic(&dst, &serde_json::json!({"k": "v"})).unwrap();

        let raw = fs::read_to_string(&dst).unwrap();
        assert!(raw.contains("\"k\""));
        assert!(!dst.with_extension("bak").exists());
        assert!(!dst.with_extension("json.tmp").exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("nested").join("deeper").join("data.json");
        write_json_atomic(&dst, &vec![1, 2, 3]).unwrap();
        assert!(dst.exists());
    }
}
