// API client module: a small blocking HTTP client for Cloudinary's Admin
// API (folders, resource listing) and Upload API (upload, explicit). Calls
// are synchronous, one request at a time.

use crate::config::{Credentials, Settings};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Parameters that are sent with a request but never part of its signature.
const UNSIGNED_PARAMS: &[&str] = &["file", "api_key", "resource_type", "cloud_name"];

/// Upper bound of a single resource listing page.
const MAX_RESULTS: &str = "500";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cloudinary returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("failed to open {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Outcome of a folder creation call. Both variants mean the folder exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    AlreadyExists,
}

/// Where an asset lands: `folder/public_id` on the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub folder: String,
    pub public_id: String,
}

impl UploadTarget {
    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.public_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    pub public_id: String,
    pub secure_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub public_id: String,
}

/// A remote folder as listed by the Admin API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub path: String,
}

#[derive(Deserialize)]
struct FolderList {
    #[serde(default)]
    folders: Vec<Folder>,
}

#[derive(Deserialize)]
struct ResourceList {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Deserialize)]
struct FolderResponse {
    #[serde(default)]
    existing: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// The remote object store as seen by the publisher and the cache commands.
pub trait MediaStore {
    /// Create a folder. Pre-existence is reported as `AlreadyExists`, not
    /// as an error.
    fn create_folder(&self, path: &str) -> Result<FolderStatus, ApiError>;

    /// Upload a local file to `target`, overwriting whatever is there and
    /// without deriving the name from the local filename.
    fn upload(&self, file: &Path, target: &UploadTarget) -> Result<UploadResult, ApiError>;

    /// Direct subfolders of `path`.
    fn list_folders(&self, path: &str) -> Result<Vec<Folder>, ApiError>;

    /// List uploaded images whose public id starts with `prefix`.
    fn list_resources(&self, prefix: &str) -> Result<Vec<Resource>, ApiError>;

    /// Drop CDN-cached copies of a resource.
    fn invalidate(&self, public_id: &str) -> Result<(), ApiError>;
}

/// Blocking Cloudinary client holding the credentials for signed calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(ApiClient {
            client,
            base_url: settings.api_base.clone(),
            credentials: settings.credentials.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.credentials.cloud_name, path)
    }

    /// Basic auth header used by the Admin API.
    fn auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let raw = format!("{}:{}", self.credentials.api_key, self.credentials.api_secret);
        let val = format!("Basic {}", STANDARD.encode(raw));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&val)?);
        Ok(headers)
    }

    /// Adds `timestamp`, `signature` and `api_key` to a parameter set.
    fn signed(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", unix_timestamp().to_string());
        let signature = sign(&params, &self.credentials.api_secret);
        params.insert("signature", signature);
        params.insert("api_key", self.credentials.api_key.clone());
        params
    }
}

impl MediaStore for ApiClient {
    fn create_folder(&self, path: &str) -> Result<FolderStatus, ApiError> {
        let url = self.url(&format!("folders/{}", path));
        tracing::debug!(%url, "creating folder");
        let res = self.client.post(&url).headers(self.auth_headers()?).send()?;

        if res.status() == StatusCode::CONFLICT {
            return Ok(FolderStatus::AlreadyExists);
        }
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        let body: FolderResponse = res.json()?;
        Ok(if body.existing {
            FolderStatus::AlreadyExists
        } else {
            FolderStatus::Created
        })
    }

    fn upload(&self, file: &Path, target: &UploadTarget) -> Result<UploadResult, ApiError> {
        let url = self.url("image/upload");

        let mut params = BTreeMap::new();
        params.insert("folder", target.folder.clone());
        params.insert("public_id", target.public_id.clone());
        params.insert("overwrite", "true".to_string());
        params.insert("use_filename", "false".to_string());
        params.insert("unique_filename", "false".to_string());
        let params = self.signed(params);

        let handle = File::open(file).map_err(|source| ApiError::File {
            path: file.to_path_buf(),
            source,
        })?;
        let file_name = file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        let part = multipart::Part::reader(handle)
            .file_name(file_name)
            .mime_str(mime_for(file))?;

        let form = params
            .into_iter()
            .fold(multipart::Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", part);

        tracing::debug!(%url, remote = %target.path(), "uploading");
        let res = self.client.post(&url).multipart(form).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(res.json()?)
    }

    fn list_folders(&self, path: &str) -> Result<Vec<Folder>, ApiError> {
        let url = self.url(&format!("folders/{}", path));
        tracing::debug!(%url, "listing folders");
        let res = self.client.get(&url).headers(self.auth_headers()?).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        let list: FolderList = res.json()?;
        Ok(list.folders)
    }

    fn list_resources(&self, prefix: &str) -> Result<Vec<Resource>, ApiError> {
        let url = self.url("resources/image/upload");
        tracing::debug!(%url, prefix, "listing resources");
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&[("type", "upload"), ("prefix", prefix), ("max_results", MAX_RESULTS)])
            .send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        let list: ResourceList = res.json()?;
        Ok(list.resources)
    }

    fn invalidate(&self, public_id: &str) -> Result<(), ApiError> {
        let url = self.url("image/explicit");

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("type", "upload".to_string());
        params.insert("invalidate", "true".to_string());
        let params = self.signed(params);

        let res = self.client.post(&url).form(&params).send()?;
        if !res.status().is_success() {
            return Err(status_error(res));
        }
        Ok(())
    }
}

/// Cloudinary request signature: signed params sorted by key, joined as
/// `k=v` with `&`, the API secret appended, SHA-1 in lowercase hex.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(k, _)| !UNSIGNED_PARAMS.contains(k))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Turn a non-success response into `ApiError::Status`, preferring the
/// message from Cloudinary's `{"error": {"message": ..}}` body.
fn status_error(res: Response) -> ApiError {
    let status = res.status();
    let txt = res.text().unwrap_or_default();
    ApiError::Status {
        status,
        message: error_message(&txt),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
