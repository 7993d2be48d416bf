// Library root
// -----------
// The binary (`main.rs`) parses the command line and hands off to `ui`.
//
// Module responsibilities:
// - `api`: blocking Cloudinary client (folders, upload, listing, explicit)
//   behind the `MediaStore` trait.
// - `config`: credentials from the dotenv file and environment.
// - `screenshots`: image discovery, app-screen naming and the upload run.
// - `redact`: the public apps.json builder.
// - `cache`: CDN invalidation of uploaded folders.
// - `cli` / `ui`: argument parsing, prompts and report printing.
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod redact;
pub mod screenshots;
pub mod ui;
