//! Appcast model: the JSON manifest describing the latest release
//!
//! An update server publishes a small JSON document per platform:
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "date": "01/01/2021",
//!   "checksum": "65a8e27d8879283831b664bd8b7f0ad4",
//!   "checksumType": "md5",
//!   "installerUrl": "https://example.com/win/installer-2.0.exe",
//!   "changelogUrl": "https://example.com/changelog-2.0.md"
//! }
//! ```
//!
//! [`AppcastDocument`] is the raw wire shape with every field optional.
//! [`AppcastManifest`] is the validated form: parsing either yields a fully
//! valid manifest or a [`ManifestError`] naming the offending field.
//! [`UpdateRecord`] pairs a manifest with the local artifacts downloaded for it.
//!
//! # Validation rules
//!
//! - `version` is required and must parse (see [`version::parse_version`])
//! - `date` is required, formatted `dd/mm/yyyy`
//! - `installerUrl` and `changelogUrl` are each empty or a well-formed http(s) URL
//! - when `checksumType` names an algorithm, `checksum` must be exactly
//!   twice the digest length in hex characters

pub mod record;
pub mod version;

pub use record::UpdateRecord;

use crate::constants::{APPCAST_DATE_FORMAT, FALLBACK_MANIFEST_NAME};
use crate::core::ManifestError;
use crate::downloader::{ChecksumAlgorithm, file_name_of};
use crate::utils::fs::atomic_write;
use chrono::NaiveDate;
use reqwest::Url;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raw appcast document as exchanged on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppcastDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog_url: Option<String>,
}

/// A validated appcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppcastManifest {
    pub version: Version,
    pub date: NaiveDate,
    pub installer_url: Option<Url>,
    pub changelog_url: Option<Url>,
    pub checksum: String,
    pub checksum_algorithm: ChecksumAlgorithm,
}

impl AppcastManifest {
    /// Parse and validate raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let document: AppcastDocument = serde_json::from_slice(bytes)?;
        Self::from_document(document)
    }

    /// Read and validate a previously saved appcast.
    pub async fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_document(document: AppcastDocument) -> Result<Self, ManifestError> {
        let raw_version = document
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ManifestError::MissingVersion)?;
        let version = version::parse_version(raw_version)
            .ok_or_else(|| ManifestError::InvalidVersion(raw_version.to_string()))?;

        let raw_date = document.date.as_deref().unwrap_or_default().trim();
        let date = parse_date(raw_date).ok_or_else(|| ManifestError::InvalidDate(raw_date.to_string()))?;

        let installer_url = parse_optional_url("installer URL", document.installer_url.as_deref())?;
        let changelog_url = parse_optional_url("changelog URL", document.changelog_url.as_deref())?;

        let checksum_algorithm = ChecksumAlgorithm::from_wire(document.checksum_type.as_deref());
        let checksum = document.checksum.unwrap_or_default().trim().to_string();
        if !checksum_algorithm.accepts(&checksum) {
            return Err(ManifestError::InvalidChecksum {
                checksum,
                algorithm: checksum_algorithm.to_string(),
            });
        }

        Ok(Self {
            version,
            date,
            installer_url,
            changelog_url,
            checksum,
            checksum_algorithm,
        })
    }

    /// Re-check the validation rules, for manifests assembled by hand.
    pub fn is_valid(&self) -> bool {
        let web = |url: &Option<Url>| url.as_ref().is_none_or(|u| matches!(u.scheme(), "http" | "https"));
        web(&self.installer_url)
            && web(&self.changelog_url)
            && self.checksum_algorithm.accepts(&self.checksum)
    }

    pub fn to_document(&self) -> AppcastDocument {
        AppcastDocument {
            version: Some(self.version.to_string()),
            date: Some(self.date.format(APPCAST_DATE_FORMAT).to_string()),
            checksum: Some(self.checksum.clone()).filter(|c| !c.is_empty()),
            checksum_type: self.checksum_algorithm.as_wire().map(str::to_string),
            installer_url: self.installer_url.as_ref().map(Url::to_string),
            changelog_url: self.changelog_url.as_ref().map(Url::to_string),
        }
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// File name of the installer as published, e.g. `installer-2.0.exe`.
    pub fn installer_file_name(&self) -> Option<String> {
        self.installer_url.as_ref().and_then(file_name_of)
    }

    pub fn changelog_file_name(&self) -> Option<String> {
        self.changelog_url.as_ref().and_then(file_name_of)
    }

    /// Name the appcast is saved under: the installer base name plus `.json`.
    pub fn manifest_file_name(&self) -> String {
        let base = self
            .installer_file_name()
            .and_then(|name| {
                Path::new(&name)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| FALLBACK_MANIFEST_NAME.to_string());
        format!("{base}.json")
    }

    /// Save the appcast into `dir`, replacing any previous copy.
    pub fn save_to_file(&self, dir: &Path) -> Result<PathBuf, ManifestError> {
        let path = dir.join(self.manifest_file_name());
        let json = self.to_json()?;

        atomic_write(&path, json.as_bytes()).map_err(|e| ManifestError::Write {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;

        debug!("Saved appcast {} to {}", self.version, path.display());
        Ok(path)
    }
}

/// Parse a `dd/mm/yyyy` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), APPCAST_DATE_FORMAT).ok()
}

fn parse_optional_url(field: &'static str, raw: Option<&str>) -> Result<Option<Url>, ManifestError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(url)),
            _ => Err(ManifestError::InvalidUrl {
                field,
                url: raw.to_string(),
            }),
        },
    }
}
