// UI layer: the command flows and the interactive menu, built on
// `dialoguer` prompts and an `indicatif` progress bar. Every flow prints a
// human-readable report to stdout.

use crate::api::{ApiClient, FolderStatus, MediaStore};
use crate::cache::{self, InvalidateEvent};
use crate::config::{self, Settings};
use crate::redact;
use crate::screenshots::{self, PublishEvent, ScreenshotRequest};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// A configured client plus the root folder every remote path hangs off.
pub struct Remote {
    pub client: ApiClient,
    pub root_folder: String,
}

impl Remote {
    /// Load credentials from `env_file` and the environment.
    pub fn connect(env_file: &Path) -> Result<Self> {
        config::load_env_file(env_file)?;
        let settings = Settings::from_env()
            .with_context(|| format!("Cloudinary credentials missing (looked in {})", env_file.display()))?;
        tracing::debug!(cloud = %settings.credentials.cloud_name, root = %settings.root_folder, "configured");
        let client = ApiClient::new(&settings).context("Failed to build HTTP client")?;
        Ok(Remote {
            client,
            root_folder: settings.root_folder,
        })
    }
}

/// Interactive menu shown when no subcommand is given. Errors of a single
/// action are printed and the menu comes back.
pub fn main_menu(env_file: &Path) -> Result<()> {
    loop {
        let items = vec![
            "Upload screenshots",
            "Prepare public apps.json",
            "Invalidate CDN cache",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome = match selection {
            0 => upload_screenshots(env_file, None, None),
            1 => prepare_json(Path::new(redact::DEFAULT_SOURCE), Path::new(redact::DEFAULT_DEST)),
            2 => invalidate_interactive(env_file),
            3 => break,
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            println!("{} {:#}", "Error:".red(), e);
        }
    }
    Ok(())
}

/// Questions the interactive flows ask. `Terminal` answers them with
/// `dialoguer`.
pub trait Prompter {
    fn text(&mut self, prompt: &str) -> Result<String>;

    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// Index of the chosen item, `None` when the user backs out.
    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>>;
}

pub struct Terminal;

impl Prompter for Terminal {
    fn text(&mut self, prompt: &str) -> Result<String> {
        Ok(Input::<String>::new().with_prompt(prompt).allow_empty(true).interact_text()?)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }

    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>> {
        Ok(Select::new().with_prompt(prompt).items(items).default(0).interact_opt()?)
    }
}

/// Screenshot upload. With both arguments no prompt is shown; with none
/// the values are asked for and confirmed before anything is sent.
pub fn upload_screenshots(env_file: &Path, app_id: Option<String>, path: Option<String>) -> Result<()> {
    upload_screenshots_with(&mut Terminal, env_file, app_id, path)
}

pub fn upload_screenshots_with<P: Prompter + ?Sized>(
    prompter: &mut P,
    env_file: &Path,
    app_id: Option<String>,
    path: Option<String>,
) -> Result<()> {
    let Some(request) = screenshot_request(prompter, app_id, path)? else {
        return Ok(());
    };
    let remote = Remote::connect(env_file)?;
    run_publish(&remote, &request)
}

/// Resolve the publisher input from arguments or prompts. `Ok(None)` means
/// the user declined the confirmation.
pub fn screenshot_request<P: Prompter + ?Sized>(
    prompter: &mut P,
    app_id: Option<String>,
    path: Option<String>,
) -> Result<Option<ScreenshotRequest>> {
    if let Some(request) = screenshots::request_from_args(app_id, path)? {
        println!("\nUsing command-line arguments");
        println!("App: {}", request.app_id);
        println!("Screenshots: {}\n", request.dir.display());
        return Ok(Some(request));
    }

    println!("Upload screenshots to Cloudinary");
    println!("================================");
    let app_id = prompter.text("App ID (e.g. time-capsule)")?;
    let path = prompter.text("Screenshots folder")?;
    let request = ScreenshotRequest::new(&app_id, &path)?;

    println!("\nUploading screenshots for app: {}", request.app_id);
    println!("From folder: {}\n", request.dir.display());
    if !prompter.confirm("Continue?")? {
        println!("Operation cancelled");
        return Ok(None);
    }
    Ok(Some(request))
}

fn run_publish(remote: &Remote, request: &ScreenshotRequest) -> Result<()> {
    let style = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")?;
    let mut bar: Option<ProgressBar> = None;

    let report = screenshots::publish(&remote.client, &remote.root_folder, request, |event| match event {
        PublishEvent::Folder { path, result } => match result {
            Ok(FolderStatus::Created) => println!("Folder {} created", path),
            Ok(FolderStatus::AlreadyExists) => println!("Folder {} already exists", path),
            Err(e) => println!("{} folder {}: {}", "Failed".red(), path, e),
        },
        PublishEvent::Found { total } => {
            println!("Found {} images to upload", total);
            let pb = ProgressBar::new(total as u64);
            pb.set_style(style.clone());
            bar = Some(pb);
        }
        PublishEvent::Upload { planned, result } => {
            let line = match result {
                Ok(uploaded) => format!(
                    "{} {} -> {}",
                    "Uploaded".green(),
                    uploaded.public_id,
                    uploaded.secure_url
                ),
                Err(e) => format!("{} {}: {}", "Failed".red(), planned.source.display(), e),
            };
            match &bar {
                Some(pb) => {
                    pb.println(line);
                    pb.set_message(planned.target.public_id.clone());
                    pb.inc(1);
                }
                None => println!("{}", line),
            }
        }
    })?;
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    println!(
        "\nUploaded {} of {} screenshots ({} regular, {} dark)",
        report.uploaded.len(),
        report.found,
        report.regular,
        report.dark
    );
    if !report.failed.is_empty() {
        println!("{} {} uploads failed:", "Warning:".yellow(), report.failed.len());
        for (planned, err) in &report.failed {
            println!("  {}: {}", planned.source.display(), err);
        }
    }
    println!(
        "\nTo use these screenshots, update `screenshots` in apps.json for {}:",
        request.app_id
    );
    println!("\nFor example: {}", report.index_list());
    Ok(())
}

/// Redaction of the apps dataset. Needs no credentials.
pub fn prepare_json(source: &Path, dest: &Path) -> Result<()> {
    let summary = redact::prepare_public_json(source, dest)?;
    println!(
        "{} {} ({} records, {} private fields removed)",
        "Public version created:".green(),
        summary.dest.display(),
        summary.records,
        summary.removed
    );
    Ok(())
}

/// Non-interactive invalidation, as used by the `invalidate` command.
pub fn invalidate(env_file: &Path, folder: Option<&str>) -> Result<()> {
    let remote = Remote::connect(env_file)?;
    let prefix = cache::resolve_prefix(&remote.root_folder, folder);
    run_invalidate(&remote, &prefix)
}

fn invalidate_interactive(env_file: &Path) -> Result<()> {
    let remote = Remote::connect(env_file)?;
    println!("Invalidate cached Cloudinary resources");
    println!("--------------------------------------");
    match choose_invalidation_prefix(&mut Terminal, &remote.client, &remote.root_folder)? {
        Some(prefix) => run_invalidate(&remote, &prefix),
        None => Ok(()),
    }
}

/// Offer the folders that exist under `root` and confirm the choice.
/// `Ok(None)` means the user backed out.
pub fn choose_invalidation_prefix<P, S>(prompter: &mut P, store: &S, root: &str) -> Result<Option<String>>
where
    P: Prompter + ?Sized,
    S: MediaStore + ?Sized,
{
    let choices = cache::folder_choices(store, root)?;
    let labels: Vec<String> = choices.iter().map(|c| c.label.clone()).collect();
    let picked = prompter
        .select("Folder to invalidate", &labels)?
        .and_then(|i| choices.into_iter().nth(i));
    let Some(choice) = picked else {
        println!("Operation cancelled");
        return Ok(None);
    };

    println!("\nAbout to invalidate the cache for: {}", choice.prefix);
    if !prompter.confirm("Continue?")? {
        println!("Operation cancelled");
        return Ok(None);
    }
    Ok(Some(choice.prefix))
}

fn run_invalidate(remote: &Remote, prefix: &str) -> Result<()> {
    println!("Invalidating resources under {}", prefix);
    let report = cache::invalidate_folder(&remote.client, prefix, |event| match event {
        InvalidateEvent::Listed { total } => println!("Found {} resources", total),
        InvalidateEvent::Resource { resource, result } => match result {
            Ok(()) => println!("{} {}", "Invalidated".green(), resource.public_id),
            Err(e) => println!("{} {}: {}", "Failed".red(), resource.public_id, e),
        },
    })?;
    println!(
        "\nInvalidated {} of {} resources in {}",
        report.invalidated, report.total, report.prefix
    );
    Ok(())
}
