use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use widget_core::config::WidgetConfig;
use widget_core::types::OrganizationId;
use widget_engine::context::{WidgetContext, WidgetServices};
use widget_engine::traits::KeyValueStorage;
use widget_providers::convex::ConvexConfig;

use crate::backend::ConvexBackend;
use crate::defaults::resolve_storage_path;
use crate::storage::FileStorage;

/// Build a widget mount wired to the configured backend and storage.
///
/// `config_path` anchors a relative `storage_path`.
pub fn build_widget_from_config(
    cfg: &WidgetConfig,
    config_path: &Path,
    organization_id: Option<OrganizationId>,
) -> anyhow::Result<WidgetContext> {
    if cfg.backend_url.trim().is_empty() {
        return Err(anyhow!("backend_url is not configured"));
    }

    let backend = Arc::new(ConvexBackend::new(ConvexConfig::new(cfg.backend_url.trim())));

    let storage: Option<Arc<dyn KeyValueStorage>> = match cfg.storage_path.as_deref() {
        Some(p) if !p.trim().is_empty() => {
            let path = resolve_storage_path(config_path, p.trim());
            log::info!("contact sessions stored at {}", path.display());
            Some(Arc::new(FileStorage::at_path(path)))
        }
        _ => {
            log::info!("no storage_path configured; contact sessions will not persist");
            None
        }
    };

    let services = WidgetServices {
        organizations: backend.clone(),
        sessions: backend.clone(),
        contact_sessions: backend,
        storage,
    };

    Ok(WidgetContext::new(
        organization_id,
        cfg.voice.assistant_id.clone(),
        services,
    ))
}
