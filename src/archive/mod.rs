//! Package artifact inspection.
//!
//! A package file is a zip archive with a `.nuspec` manifest at its root. Only
//! the manifest's `package/metadata/id` and `package/metadata/version` are
//! read; nothing is extracted.

use anyhow::{Context, Result, anyhow};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::model::FeedVersion;

/// File extension of package artifacts.
pub const PACKAGE_EXTENSION: &str = "nupkg";

/// Only this much of a manifest is read.
const MAX_MANIFEST_LEN: u64 = 1024 * 1024;

/// The id and version a package artifact declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub id: String,
    pub version: FeedVersion,
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// Whether `path` names a package artifact, judging by extension only.
pub fn is_package_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PACKAGE_EXTENSION))
}

/// Reads the identity from the root manifest of an in-memory package.
pub fn read_identity(package: &[u8]) -> Result<PackageIdentity> {
    let mut archive =
        ZipArchive::new(Cursor::new(package)).context("not a valid package archive")?;

    let manifest_name = archive
        .file_names()
        .find(|name| is_root_manifest(name))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no .nuspec manifest at the archive root"))?;
    debug!("Reading identity from {}", manifest_name);

    let entry = archive
        .by_name(&manifest_name)
        .with_context(|| format!("Failed to open {}", manifest_name))?;
    let mut manifest = String::new();
    entry
        .take(MAX_MANIFEST_LEN)
        .read_to_string(&mut manifest)
        .with_context(|| format!("Failed to read {}", manifest_name))?;

    parse_manifest(&manifest).with_context(|| format!("Invalid manifest {}", manifest_name))
}

fn is_root_manifest(name: &str) -> bool {
    !name.contains('/') && name.to_ascii_lowercase().ends_with(".nuspec")
}

#[derive(Clone, Copy)]
enum Field {
    Id,
    Version,
}

/// The identity field an element path names, if any.
fn field_at(path: &[Vec<u8>]) -> Option<Field> {
    match path {
        [root, metadata, leaf]
            if root.as_slice() == b"package" && metadata.as_slice() == b"metadata" =>
        {
            match leaf.as_slice() {
                b"id" => Some(Field::Id),
                b"version" => Some(Field::Version),
                _ => None,
            }
        }
        _ => None,
    }
}

fn parse_manifest(xml: &str) -> Result<PackageIdentity> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut id = String::new();
    let mut version = String::new();

    loop {
        let event = reader
            .read_event()
            .context("manifest is not well-formed XML")?;
        let text = match event {
            Event::Start(e) => {
                path.push(e.local_name().as_ref().to_vec());
                continue;
            }
            Event::End(_) => {
                path.pop();
                continue;
            }
            Event::Text(t) => t.unescape()?.into_owned(),
            Event::CData(c) => String::from_utf8_lossy(&c.into_inner()).into_owned(),
            Event::Eof => break,
            _ => continue,
        };
        match field_at(&path) {
            Some(Field::Id) => id.push_str(&text),
            Some(Field::Version) => version.push_str(&text),
            None => {}
        }
    }

    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow!("manifest has no <id>"));
    }
    let version = version.trim();
    if version.is_empty() {
        return Err(anyhow!("manifest has no <version>"));
    }
    let version = FeedVersion::parse(version)
        .with_context(|| format!("manifest version {:?} is not valid", version))?;

    Ok(PackageIdentity {
        id: id.to_string(),
        version,
    })
}
