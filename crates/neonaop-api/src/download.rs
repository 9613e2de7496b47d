//! Pluggable download strategies.
//!
//! A strategy receives a `file name -> URL` mapping, a target directory, and
//! optional credentials. Files are transferred one at a time in name order;
//! the first failure stops the batch and is returned to the caller.

use crate::DownloadError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Strategy for moving published files to storage.
pub trait Downloader {
    /// Transfer every file and return where each one ended up.
    fn download(
        &self,
        files: &BTreeMap<String, String>,
        target_dir: &Path,
        credentials: Option<&str>,
    ) -> Result<Vec<PathBuf>, DownloadError>;
}

/// Build the client used for file transfers.
///
/// `transfer` bounds a whole transfer; `None` lets large tiles take as long
/// as they need once connected.
fn transfer_client(connect: Duration, transfer: Option<Duration>) -> Result<reqwest::blocking::Client, DownloadError> {
    Ok(reqwest::blocking::Client::builder()
        .connect_timeout(connect)
        .timeout(transfer)
        .build()?)
}

/// Stream a URL's body into `dest`.
///
/// A partially written file is removed when the transfer fails.
fn fetch_to_file(
    client: &reqwest::blocking::Client,
    name: &str,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let mut response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            file: name.to_string(),
            status: response.status().as_u16(),
        });
    }
    let mut file = fs::File::create(dest)?;
    match response.copy_to(&mut file) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            drop(file);
            if let Err(cleanup) = fs::remove_file(dest) {
                warn!(file = %dest.display(), error = %cleanup, "Failed to remove partial download");
            }
            Err(e.into())
        }
    }
}

/// Saves files into a local directory.
///
/// Credentials are accepted for signature compatibility and ignored.
pub struct LocalDownloader {
    client: reqwest::blocking::Client,
    connect_timeout: Duration,
    transfer_timeout: Option<Duration>,
}

impl std::fmt::Debug for LocalDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDownloader")
            .field("connect_timeout", &self.connect_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}

impl LocalDownloader {
    /// Create a downloader with the default connect timeout and no transfer limit.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, None)
    }

    /// Create a downloader with custom connect and per-file transfer timeouts.
    pub fn with_timeouts(connect: Duration, transfer: Option<Duration>) -> Result<Self, DownloadError> {
        Ok(Self {
            client: transfer_client(connect, transfer)?,
            connect_timeout: connect,
            transfer_timeout: transfer,
        })
    }
}

impl Downloader for LocalDownloader {
    fn download(
        &self,
        files: &BTreeMap<String, String>,
        target_dir: &Path,
        _credentials: Option<&str>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        fs::create_dir_all(target_dir)?;

        let mut saved = Vec::with_capacity(files.len());
        for (name, url) in files {
            let dest = target_dir.join(name);
            let bytes = fetch_to_file(&self.client, name, url, &dest)?;
            debug!(file = %name, bytes, "Saved file");
            saved.push(dest);
        }
        info!(count = saved.len(), dir = %target_dir.display(), "Downloaded files");
        Ok(saved)
    }
}

/// Copies files to an iRODS data store (e.g. CyVerse) with the icommands tools.
///
/// Each file is staged locally, pushed with `iput -KPf`, and the staged copy
/// removed. A session must already be open (`iinit`). The credentials
/// argument is the data store username and is required.
pub struct IrodsDownloader {
    client: reqwest::blocking::Client,
    connect_timeout: Duration,
    transfer_timeout: Option<Duration>,
    /// Local directory for staged files.
    staging_dir: PathBuf,
    /// Remote home collection root, e.g. `/iplant/home`.
    home_root: String,
    /// Upload command.
    put_command: String,
    /// Remote directory creation command.
    mkdir_command: String,
}

impl std::fmt::Debug for IrodsDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrodsDownloader")
            .field("staging_dir", &self.staging_dir)
            .field("home_root", &self.home_root)
            .field("connect_timeout", &self.connect_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .finish()
    }
}

impl IrodsDownloader {
    /// Create a downloader for the CyVerse data store.
    pub fn new<P: AsRef<Path>>(staging_dir: P) -> Result<Self, DownloadError> {
        Self::with_commands(staging_dir, "/iplant/home", "iput", "imkdir")
    }

    /// Create a downloader with a custom home root and icommands binaries.
    pub fn with_commands<P: AsRef<Path>>(
        staging_dir: P,
        home_root: &str,
        put_command: &str,
        mkdir_command: &str,
    ) -> Result<Self, DownloadError> {
        Ok(Self {
            client: transfer_client(DEFAULT_CONNECT_TIMEOUT, None)?,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transfer_timeout: None,
            staging_dir: staging_dir.as_ref().to_path_buf(),
            home_root: home_root.trim_end_matches('/').to_string(),
            put_command: put_command.to_string(),
            mkdir_command: mkdir_command.to_string(),
        })
    }

    /// Replace the connect and per-file transfer timeouts used while staging.
    pub fn with_timeouts(mut self, connect: Duration, transfer: Option<Duration>) -> Result<Self, DownloadError> {
        self.client = transfer_client(connect, transfer)?;
        self.connect_timeout = connect;
        self.transfer_timeout = transfer;
        Ok(self)
    }

    /// Remote collection for a target directory, e.g. `/iplant/home/alice/data`.
    pub fn remote_dir(&self, username: &str, target_dir: &Path) -> String {
        let relative = target_dir.to_string_lossy();
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            format!("{}/{}", self.home_root, username)
        } else {
            format!("{}/{}/{}", self.home_root, username, relative)
        }
    }

    fn run(&self, command: &str, args: &[&str], file: &str) -> Result<(), DownloadError> {
        let status = Command::new(command)
            .args(args)
            .status()
            .map_err(|source| DownloadError::Spawn {
                command: command.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(DownloadError::Transfer {
                command: command.to_string(),
                file: file.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Downloader for IrodsDownloader {
    fn download(
        &self,
        files: &BTreeMap<String, String>,
        target_dir: &Path,
        credentials: Option<&str>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let username = credentials.ok_or(DownloadError::MissingCredentials("iRODS transfer"))?;
        let remote_dir = self.remote_dir(username, target_dir);

        fs::create_dir_all(&self.staging_dir)?;
        self.run(&self.mkdir_command, &["-p", &remote_dir], &remote_dir)?;

        let mut copied = Vec::with_capacity(files.len());
        for (name, url) in files {
            let staged = self.staging_dir.join(name);
            fetch_to_file(&self.client, name, url, &staged)?;

            let remote = format!("{}/{}", remote_dir, name);
            let local = staged.to_string_lossy();
            let result = self.run(&self.put_command, &["-KPf", &local, &remote], name);
            if let Err(e) = fs::remove_file(&staged) {
                warn!(file = %staged.display(), error = %e, "Failed to remove staged file");
            }
            result?;

            debug!(file = %name, remote = %remote, "Copied file to data store");
            copied.push(PathBuf::from(remote));
        }
        info!(count = copied.len(), remote = %remote_dir, "Transferred files");
        Ok(copied)
    }
}
