// Screenshot publisher: picks the images out of a local folder, names them
// after the site's `app-screen-<n>[-dark]` convention and pushes them to
// `<root>/apps/<app-id>/` on the media store.

use crate::api::{ApiError, FolderStatus, MediaStore, UploadResult, UploadTarget};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Accepted extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

const DARK_MARKER: &str = "dark";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("app id must not be empty")]
    EmptyAppId,

    #[error("screenshots path must not be empty")]
    EmptyPath,

    #[error("directory {0} not found")]
    DirectoryNotFound(PathBuf),

    #[error("both APP_ID and PATH are required")]
    MissingArgument,
}

/// Validated publisher input.
#[derive(Debug, Clone)]
pub struct ScreenshotRequest {
    pub app_id: String,
    pub dir: PathBuf,
}

impl ScreenshotRequest {
    /// Normalise raw user input (quotes, whitespace, `~`) and check that
    /// both values are present and the directory exists.
    pub fn new(app_id: &str, path: &str) -> Result<Self, InputError> {
        let app_id = normalize_input(app_id);
        if app_id.is_empty() {
            return Err(InputError::EmptyAppId);
        }
        let path = normalize_input(path);
        if path.is_empty() {
            return Err(InputError::EmptyPath);
        }
        let dir = expand_tilde(&path);
        if !dir.is_dir() {
            return Err(InputError::DirectoryNotFound(dir));
        }
        Ok(ScreenshotRequest { app_id, dir })
    }
}

/// Command-line arguments of the publisher. Both values mean no prompts,
/// neither means interactive input (`Ok(None)`), one alone is an error.
pub fn request_from_args(
    app_id: Option<String>,
    path: Option<String>,
) -> Result<Option<ScreenshotRequest>, InputError> {
    match (app_id, path) {
        (Some(app_id), Some(path)) => ScreenshotRequest::new(&app_id, &path).map(Some),
        (None, None) => Ok(None),
        _ => Err(InputError::MissingArgument),
    }
}

/// Trim and drop one matching pair of surrounding quotes, as pasted from a
/// file manager.
pub fn normalize_input(raw: &str) -> String {
    let s = raw.trim();
    let unquoted = ['"', '\''].iter().find_map(|&q| s.strip_prefix(q)?.strip_suffix(q));
    unquoted.unwrap_or(s).trim().to_string()
}

/// Expand a bare `~` or a `~/` prefix to the home directory. `~user` forms
/// are left as they are.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(['/', '\\']) => rest.trim_start_matches(['/', '\\']),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Regular,
    Dark,
}

/// One asset with the name it gets on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub source: PathBuf,
    pub variant: Variant,
    /// 1-based rank within the variant group.
    pub index: usize,
    pub target: UploadTarget,
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

pub fn is_dark(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains(DARK_MARKER))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by file name.
pub fn collect_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        // `Path::is_file` follows symlinks
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

pub fn app_folder(root: &str, app_id: &str) -> String {
    format!("{}/apps/{}", root, app_id)
}

pub fn public_id(index: usize, variant: Variant) -> String {
    match variant {
        Variant::Regular => format!("app-screen-{}", index),
        Variant::Dark => format!("app-screen-{}-dark", index),
    }
}

/// Assign targets: regular files first, then dark ones, each group numbered
/// from 1 in the order given. `files` is expected to be sorted already.
pub fn plan(root: &str, app_id: &str, files: &[PathBuf]) -> Vec<PlannedUpload> {
    let folder = app_folder(root, app_id);
    let (dark, regular): (Vec<&PathBuf>, Vec<&PathBuf>) = files.iter().partition(|p| is_dark(p));

    let mut planned = Vec::with_capacity(files.len());
    for (group, variant) in [(regular, Variant::Regular), (dark, Variant::Dark)] {
        for (i, source) in group.into_iter().enumerate() {
            planned.push(PlannedUpload {
                source: source.clone(),
                variant,
                index: i + 1,
                target: UploadTarget {
                    folder: folder.clone(),
                    public_id: public_id(i + 1, variant),
                },
            });
        }
    }
    planned
}

/// The `screenshots` value to paste into the app record: `[1, 2, ..., n]`.
pub fn screenshot_index(regular_count: usize) -> String {
    let items: Vec<String> = (1..=regular_count).map(|i| i.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Progress notifications emitted while publishing.
#[derive(Debug)]
pub enum PublishEvent<'a> {
    Folder {
        path: &'a str,
        result: &'a Result<FolderStatus, ApiError>,
    },
    Found {
        total: usize,
    },
    Upload {
        planned: &'a PlannedUpload,
        result: &'a Result<UploadResult, ApiError>,
    },
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub found: usize,
    pub regular: usize,
    pub dark: usize,
    pub uploaded: Vec<(PlannedUpload, UploadResult)>,
    /// Uploads that failed, with the error text.
    pub failed: Vec<(PlannedUpload, String)>,
    /// Folders that could not be ensured, with the error text.
    pub folder_errors: Vec<(String, String)>,
}

impl PublishReport {
    pub fn index_list(&self) -> String {
        screenshot_index(self.regular)
    }
}

/// Ensure the folder chain for the app, then upload every image in
/// `request.dir`. Failing folders and failing uploads are recorded in the
/// report and do not stop the run; only an unreadable directory does.
pub fn publish<S, F>(store: &S, root: &str, request: &ScreenshotRequest, mut on_event: F) -> Result<PublishReport>
where
    S: MediaStore + ?Sized,
    F: FnMut(PublishEvent<'_>),
{
    let mut report = PublishReport::default();

    let apps = format!("{}/apps", root);
    let app = app_folder(root, &request.app_id);
    for path in [root, apps.as_str(), app.as_str()] {
        let result = store.create_folder(path);
        on_event(PublishEvent::Folder { path, result: &result });
        match &result {
            Ok(status) => tracing::info!(folder = path, ?status, "folder ready"),
            Err(e) => {
                tracing::warn!(folder = path, error = %e, "folder creation failed");
                report.folder_errors.push((path.to_string(), e.to_string()));
            }
        }
    }

    let files = collect_images(&request.dir)
        .with_context(|| format!("Failed to read directory {}", request.dir.display()))?;
    report.found = files.len();
    on_event(PublishEvent::Found { total: files.len() });

    for planned in plan(root, &request.app_id, &files) {
        match planned.variant {
            Variant::Regular => report.regular += 1,
            Variant::Dark => report.dark += 1,
        }
        let result = store.upload(&planned.source, &planned.target);
        on_event(PublishEvent::Upload {
            planned: &planned,
            result: &result,
        });
        match result {
            Ok(uploaded) => {
                tracing::info!(remote = %planned.target.path(), url = %uploaded.secure_url, "uploaded");
                report.uploaded.push((planned, uploaded));
            }
            Err(e) => {
                tracing::warn!(file = %planned.source.display(), error = %e, "upload failed");
                report.failed.push((planned, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/shots").join(n)).collect()
    }

    #[test]
    fn plan_partitions_and_numbers_groups() {
        let planned = plan("website", "time-capsule", &paths(&["a-dark.png", "b.png", "c-DARK.jpg"]));
        let ids: Vec<(&str, &str)> = planned
            .iter()
            .map(|p| {
                (
                    p.source.file_name().unwrap().to_str().unwrap(),
                    p.target.public_id.as_str(),
                )
            })
            .collect();

        assert_eq!(
            ids,
            vec![
                ("b.png", "app-screen-1"),
                ("a-dark.png", "app-screen-1-dark"),
                ("c-DARK.jpg", "app-screen-2-dark"),
            ]
        );
        assert!(planned
            .iter()
            .all(|p| p.target.folder == "website/apps/time-capsule"));
    }

    #[test]
    fn indices_are_consecutive_per_group() {
        let planned = plan(
            "website",
            "x",
            &paths(&["1.png", "2-dark.png", "3.png", "4.png", "5-dark.png"]),
        );
        let regular: Vec<usize> = planned
            .iter()
            .filter(|p| p.variant == Variant::Regular)
            .map(|p| p.index)
            .collect();
        let dark: Vec<usize> = planned
            .iter()
            .filter(|p| p.variant == Variant::Dark)
            .map(|p| p.index)
            .collect();
        assert_eq!(regular, vec![1, 2, 3]);
        assert_eq!(dark, vec![1, 2]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        for name in ["a.jpg", "a.JPEG", "a.Png", "a.GIF"] {
            assert!(is_image(Path::new(name)), "{}", name);
        }
        for name in ["a.webp", "a.svg", "png", ".DS_Store", "a.png.txt"] {
            assert!(!is_image(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn dark_looks_at_file_name_only() {
        assert!(is_dark(Path::new("/tmp/Screen-Dark-1.png")));
        assert!(!is_dark(Path::new("/dark-mode/screen.png")));
    }

    #[test]
    fn collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.PNG", "a.jpg", "notes.txt", "b.gif", ".DS_Store"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.gif", "c.PNG"]);
    }

    #[test]
    fn screenshot_index_lists_regular_numbers() {
        assert_eq!(screenshot_index(0), "[]");
        assert_eq!(screenshot_index(3), "[1, 2, 3]");
    }

    #[cfg(unix)]
    #[test]
    fn collect_images_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.png"), b"x").unwrap();
        fs::write(elsewhere.path().join("real.png"), b"x").unwrap();
        std::os::unix::fs::symlink(elsewhere.path().join("real.png"), dir.path().join("2.png")).unwrap();
        // dangling links are not files
        std::os::unix::fs::symlink(elsewhere.path().join("gone.png"), dir.path().join("3.png")).unwrap();

        let names: Vec<String> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.png", "2.png"]);
    }

    #[test]
    fn normalize_strips_quotes_and_whitespace() {
        assert_eq!(normalize_input("  '/Users/me/Shots' "), "/Users/me/Shots");
        assert_eq!(normalize_input("\"time-capsule\""), "time-capsule");
        assert_eq!(normalize_input("   "), "");
    }

    #[test]
    fn normalize_keeps_unmatched_quotes() {
        assert_eq!(normalize_input("'abc"), "'abc");
        assert_eq!(normalize_input("abc\""), "abc\"");
        assert_eq!(normalize_input("'abc\""), "'abc\"");
    }

    #[test]
    fn args_select_prompt_or_direct_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        assert!(request_from_args(None, None).unwrap().is_none());

        let request = request_from_args(Some("time-capsule".into()), Some(path.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(request.app_id, "time-capsule");
        assert_eq!(request.dir, dir.path());

        assert_eq!(
            request_from_args(Some("time-capsule".into()), None).unwrap_err(),
            InputError::MissingArgument
        );
        assert_eq!(
            request_from_args(None, Some(path.clone())).unwrap_err(),
            InputError::MissingArgument
        );
        assert_eq!(
            request_from_args(Some(" ".into()), Some(path)).unwrap_err(),
            InputError::EmptyAppId
        );
        assert_eq!(
            request_from_args(Some("time-capsule".into()), Some("".into())).unwrap_err(),
            InputError::EmptyPath
        );
    }

    #[test]
    fn request_rejects_bad_input() {
        assert_eq!(ScreenshotRequest::new("", "/tmp").unwrap_err(), InputError::EmptyAppId);
        assert_eq!(ScreenshotRequest::new("app", "''").unwrap_err(), InputError::EmptyPath);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(
            ScreenshotRequest::new("app", missing.to_str().unwrap()).unwrap_err(),
            InputError::DirectoryNotFound(missing)
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/shots"), home.join("shots"));
            assert_eq!(expand_tilde("~"), home);
        }
        assert_eq!(expand_tilde("/abs/shots"), PathBuf::from("/abs/shots"));
    }

    #[test]
    fn tilde_user_form_is_left_alone() {
        assert_eq!(expand_tilde("~other/shots"), PathBuf::from("~other/shots"));
    }
}
