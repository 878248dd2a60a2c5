//! Command-line surface: argument parsing and dispatch onto the
//! [`Filesystem`] facade.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use graphdrive_fs::config::KEY_MIMETYPE;
use graphdrive_fs::{
    Config, DriveManager, Filesystem, FilesystemAdapter, ReadStream, UrlProvider, UserInviter,
};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Files in SharePoint document libraries, through Microsoft Graph.
///
/// Credentials come from `graphdrive.toml` (or `--config`) and the
/// `GRAPHDRIVE_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "graphdrive", version, about)]
pub struct Cli {
    /// TOML file with connection settings.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Document library to bind; without one, paths start with the
    /// library name.
    #[arg(long, global = true)]
    pub drive: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a file; fails if it already exists.
    Write {
        path: String,
        /// Read contents from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Content type to store.
        #[arg(long)]
        mimetype: Option<String>,
    },
    /// Create or replace a file.
    Put {
        path: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a file, or save it with --out.
    Read {
        path: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Delete {
        path: String,
    },
    /// Delete a folder and everything in it.
    DeleteDir {
        path: String,
    },
    /// Create a folder and its missing parents.
    Mkdir {
        path: String,
    },
    /// Print `true` or `false`.
    Has {
        path: String,
    },
    /// Print metadata as JSON.
    Meta {
        path: String,
    },
    /// List a folder as JSON.
    Ls {
        #[arg(default_value = "")]
        dir: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the browser URL of an item.
    Url {
        path: String,
    },
    /// Move or rename.
    Mv {
        from: String,
        to: String,
    },
    Cp {
        from: String,
        to: String,
    },
    /// Create a document library.
    CreateDrive {
        name: String,
    },
    /// Delete a document library and its contents.
    DeleteDrive {
        name: String,
    },
    /// Give an e-mail address write access to an item.
    Invite {
        path: String,
        email: String,
    },
}

async fn open_input(file: Option<&PathBuf>) -> Result<ReadStream> {
    match file {
        Some(p) => {
            let f = tokio::fs::File::open(p)
                .await
                .with_context(|| format!("opening {}", p.display()))?;
            Ok(Box::pin(f))
        }
        None => Ok(Box::pin(tokio::io::stdin())),
    }
}

async fn print<W>(out: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}

/// Run commands that every backend supports.
pub async fn execute_core<A, W>(fs: &Filesystem<A>, command: Command, out: &mut W) -> Result<()>
where
    A: FilesystemAdapter,
    W: AsyncWrite + Unpin + Send,
{
    match command {
        Command::Write {
            path,
            file,
            mimetype,
        } => {
            let mut config = Config::new();
            if let Some(m) = mimetype {
                config.set(KEY_MIMETYPE, m);
            }
            let input = open_input(file.as_ref()).await?;
            let meta = fs.write_stream_with_config(&path, input, &config).await?;
            tracing::info!(path = %meta.path, size = ?meta.size, "written");
        }
        Command::Put { path, file } => {
            let mut contents = Vec::new();
            open_input(file.as_ref())
                .await?
                .read_to_end(&mut contents)
                .await?;
            fs.put(&path, &contents).await?;
            tracing::info!(path = %path, size = contents.len(), "stored");
        }
        Command::Read { path, out: target } => {
            let mut stream = fs.read_stream(&path).await?;
            match target {
                Some(p) => {
                    let mut f = tokio::fs::File::create(&p)
                        .await
                        .with_context(|| format!("creating {}", p.display()))?;
                    let n = tokio::io::copy(&mut stream, &mut f).await?;
                    f.flush().await?;
                    tracing::info!(path = %path, bytes = n, "saved to {}", p.display());
                }
                None => {
                    tokio::io::copy(&mut stream, out).await?;
                }
            }
        }
        Command::Delete { path } => fs.delete(&path).await?,
        Command::DeleteDir { path } => fs.delete_dir(&path).await?,
        Command::Mkdir { path } => {
            fs.create_dir(&path).await?;
        }
        Command::Has { path } => {
            let found = fs.has(&path).await?;
            print(out, if found { "true" } else { "false" }).await?;
        }
        Command::Meta { path } => {
            let meta = fs.get_metadata(&path).await?;
            print(out, &serde_json::to_string_pretty(&meta)?).await?;
        }
        Command::Ls { dir, recursive } => {
            let listing = fs.list_contents(&dir, recursive).await?;
            print(out, &serde_json::to_string_pretty(&listing)?).await?;
        }
        Command::Mv { from, to } => fs.rename(&from, &to).await?,
        Command::Cp { from, to } => fs.copy(&from, &to).await?,
        Command::Url { .. }
        | Command::CreateDrive { .. }
        | Command::DeleteDrive { .. }
        | Command::Invite { .. } => bail!("this backend does not support {:?}", command),
    }
    out.flush().await?;
    Ok(())
}

/// Run any command against a backend with every extension.
pub async fn execute<A, W>(fs: &Filesystem<A>, command: Command, out: &mut W) -> Result<()>
where
    A: UrlProvider + DriveManager + UserInviter,
    W: AsyncWrite + Unpin + Send,
{
    match command {
        Command::Url { path } => {
            let url = fs.get_url(&path).await?;
            print(out, &url).await?;
        }
        Command::CreateDrive { name } => {
            let drive = fs.create_drive(&name).await?;
            print(out, &serde_json::to_string_pretty(&drive)?).await?;
        }
        Command::DeleteDrive { name } => {
            fs.delete_drive(&name).await?;
            tracing::info!(drive = %name, "deleted");
        }
        Command::Invite { path, email } => {
            let invitation = fs.invite_user(&path, &email).await?;
            print(out, &serde_json::to_string_pretty(&invitation)?).await?;
        }
        other => return execute_core(fs, other, out).await,
    }
    out.flush().await?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
