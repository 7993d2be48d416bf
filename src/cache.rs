// CDN invalidation for already uploaded assets.

use crate::api::{ApiError, MediaStore, Resource};
use anyhow::{Context, Result};

/// Folder argument meaning "everything under the root folder".
pub const ALL: &str = "all";

#[derive(Debug, Default)]
pub struct InvalidateReport {
    pub prefix: String,
    pub total: usize,
    pub invalidated: usize,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug)]
pub enum InvalidateEvent<'a> {
    Listed { total: usize },
    Resource {
        resource: &'a Resource,
        result: &'a Result<(), ApiError>,
    },
}

/// Map the user's folder argument to a listing prefix. Empty or `all`
/// selects the root folder.
pub fn resolve_prefix(root: &str, folder: Option<&str>) -> String {
    match folder.map(str::trim).filter(|f| !f.is_empty()) {
        None => root.to_string(),
        Some(f) if f.eq_ignore_ascii_case(ALL) => root.to_string(),
        Some(f) => f.trim_matches('/').to_string(),
    }
}

/// One entry of the interactive folder pick list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderChoice {
    pub label: String,
    pub prefix: String,
}

/// Pick list for interactive invalidation: everything, the root folder,
/// then each direct subfolder of the root as reported by the store.
pub fn folder_choices<S>(store: &S, root: &str) -> Result<Vec<FolderChoice>>
where
    S: MediaStore + ?Sized,
{
    let folders = store
        .list_folders(root)
        .with_context(|| format!("Failed to list folders under {}", root))?;

    let mut choices = vec![
        FolderChoice {
            label: format!("All folders ({}/*)", root),
            prefix: root.to_string(),
        },
        FolderChoice {
            label: format!("Root folder ({})", root),
            prefix: root.to_string(),
        },
    ];
    choices.extend(folders.into_iter().map(|f| FolderChoice {
        label: f.path.clone(),
        prefix: f.path,
    }));
    Ok(choices)
}

/// Invalidate every resource whose public id starts with `prefix`. A failed
/// listing aborts; a failed resource is recorded and skipped.
pub fn invalidate_folder<S, F>(store: &S, prefix: &str, mut on_event: F) -> Result<InvalidateReport>
where
    S: MediaStore + ?Sized,
    F: FnMut(InvalidateEvent<'_>),
{
    let resources = store
        .list_resources(prefix)
        .with_context(|| format!("Failed to list resources under {}", prefix))?;
    on_event(InvalidateEvent::Listed {
        total: resources.len(),
    });

    let mut report = InvalidateReport {
        prefix: prefix.to_string(),
        total: resources.len(),
        ..Default::default()
    };
    for resource in &resources {
        let result = store.invalidate(&resource.public_id);
        on_event(InvalidateEvent::Resource {
            resource,
            result: &result,
        });
        match result {
            Ok(()) => report.invalidated += 1,
            Err(e) => {
                tracing::warn!(public_id = %resource.public_id, error = %e, "invalidation failed");
                report.failed.push((resource.public_id.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}
