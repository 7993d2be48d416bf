use crate::config::DEFAULT_ENV_FILE;
use crate::redact::{DEFAULT_DEST, DEFAULT_SOURCE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-assets")]
#[command(about = "Publish app screenshots to Cloudinary and prepare the public apps.json", long_about = None)]
#[command(version)]
pub struct Cli {
    /// dotenv file with the Cloudinary credentials
    #[arg(long, global = true, env = "SITE_ASSETS_ENV_FILE", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload an app's screenshots as app-screen-<n>[-dark]
    ///
    /// Without arguments the app id and folder are asked for interactively.
    UploadScreenshots {
        /// App identifier, e.g. time-capsule
        app_id: Option<String>,

        /// Folder holding the screenshots
        path: Option<String>,
    },

    /// Write apps-public.json without the private fields
    PrepareJson {
        #[arg(long, default_value = DEFAULT_SOURCE)]
        source: PathBuf,

        #[arg(long, default_value = DEFAULT_DEST)]
        dest: PathBuf,
    },

    /// Invalidate CDN caches for a folder (default: all)
    Invalidate {
        /// Folder prefix such as website/apps/time-capsule, or "all"
        folder: Option<String>,
    },
}
