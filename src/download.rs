//! Downloads the BOM spatial products into the local cache.

use std::{
    fs::{self, File},
    io::{self, Write},
    net::ToSocketAddrs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Error, Result};
use serde::Serialize;
use suppaftp::{types::FileType, FtpStream};
use tracing::{debug, info, warn};

use crate::{
    catalog::{SpatialSource, FTP_SERVER, OPTIONAL_EXTENSIONS, SHAPEFILE_EXTENSIONS, SOURCES, SPATIAL_ROOT},
    settings::Settings,
};

/// A remote directory files can be copied out of.
pub trait RemoteFiles {
    /// Writes the remote file `name` into `dest`, returning the number of bytes copied.
    fn retrieve(&mut self, name: &str, dest: &mut dyn Write) -> Result<u64>;
}

/// Anonymous FTP session, opened on the first retrieval.
pub struct FtpFiles {
    server: String,
    directory: String,
    timeout: Duration,
    stream: Option<FtpStream>,
}

impl FtpFiles {
    pub fn new(server: &str, directory: &str, timeout: Duration) -> Self {
        FtpFiles {
            server: server.to_string(),
            directory: directory.to_string(),
            timeout,
            stream: None,
        }
    }

    /// The BOM spatial directory on `ftp.bom.gov.au`.
    pub fn bom(timeout: Duration) -> Self {
        Self::new(FTP_SERVER, SPATIAL_ROOT, timeout)
    }

    fn connect(&mut self) -> Result<&mut FtpStream> {
        if self.stream.is_none() {
            let address = (self.server.as_str(), 21)
                .to_socket_addrs()
                .with_context(|| format!("Failed to resolve {}", self.server))?
                .next()
                .ok_or_else(|| anyhow!("No address for {}", self.server))?;

            debug!("Connecting to {} ({})", self.server, address);
            let mut stream = FtpStream::connect_timeout(address, self.timeout)
                .with_context(|| format!("Failed to connect to {}", self.server))?;
            stream
                .login("anonymous", "")
                .with_context(|| format!("Anonymous login to {} refused", self.server))?;
            stream.transfer_type(FileType::Binary)?;
            stream
                .cwd(&self.directory)
                .with_context(|| format!("No directory {} on {}", self.directory, self.server))?;

            self.stream = Some(stream);
        }

        self.stream
            .as_mut()
            .ok_or_else(|| anyhow!("FTP session to {} is closed", self.server))
    }
}

impl RemoteFiles for FtpFiles {
    fn retrieve(&mut self, name: &str, dest: &mut dyn Write) -> Result<u64> {
        let stream = self.connect()?;
        let mut buffer = stream
            .retr_as_buffer(name)
            .with_context(|| format!("Failed to retrieve {}", name))?;

        Ok(io::copy(&mut buffer, dest)?)
    }
}

impl Drop for FtpFiles {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.quit();
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct FetchSummary {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Optional components the server did not have.
    pub missing_optional: Vec<String>,
}

enum Fetched {
    Downloaded(PathBuf),
    Skipped(PathBuf),
}

impl FetchSummary {
    fn record(&mut self, fetched: Fetched) {
        match fetched {
            Fetched::Downloaded(path) => self.downloaded.push(path),
            Fetched::Skipped(path) => self.skipped.push(path),
        }
    }
}

fn fetch_file(
    source: &SpatialSource,
    extension: &str,
    settings: &Settings,
    remote: &mut dyn RemoteFiles,
) -> Result<Fetched> {
    let target = source.local_path(settings, extension);
    if target.exists() && !settings.overwrite {
        debug!("{} already exists, skipping", target.display());
        return Ok(Fetched::Skipped(target));
    }

    let part = part_path(&target);
    let result = File::create(&part)
        .map_err(Error::from)
        .and_then(|mut file| {
            let bytes = remote.retrieve(&source.file_name(extension), &mut file)?;
            file.flush()?;
            Ok(bytes)
        });

    match result {
        Ok(bytes) => {
            fs::rename(&part, &target)
                .with_context(|| format!("Failed to move {} into place", part.display()))?;
            debug!("Downloaded {} ({} bytes)", target.display(), bytes);
            Ok(Fetched::Downloaded(target))
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Fetches every product's shapefile components into the spatial cache.
///
/// Existing files are kept unless `settings.overwrite` is set.
pub fn fetch_spatial_data(settings: &Settings, remote: &mut dyn RemoteFiles) -> Result<FetchSummary> {
    let cache = settings.spatial_cache();
    fs::create_dir_all(&cache).with_context(|| format!("Failed to create {}", cache.display()))?;

    let mut summary = FetchSummary::default();

    for source in &SOURCES {
        info!("Fetching {}", source.description);

        for extension in SHAPEFILE_EXTENSIONS {
            let fetched = fetch_file(source, extension, settings, remote)
                .with_context(|| format!("Failed to fetch {} for {}", extension, source.name))?;
            summary.record(fetched);
        }

        for extension in OPTIONAL_EXTENSIONS {
            match fetch_file(source, extension, settings, remote) {
                Ok(fetched) => summary.record(fetched),
                Err(e) => {
                    warn!("No {} file for {}: {:#}", extension, source.name, e);
                    summary.missing_optional.push(source.file_name(extension));
                }
            }
        }
    }

    Ok(summary)
}

/// Runs the fetch against the BOM FTP server on a blocking thread.
pub async fn fetch_from_bom(settings: Settings) -> Result<FetchSummary> {
    tokio::task::spawn_blocking(move || {
        let mut remote = FtpFiles::bom(settings.ftp_timeout);
        fetch_spatial_data(&settings, &mut remote)
    })
    .await?
}

// -- Tests -------------------------------------------------------------------
