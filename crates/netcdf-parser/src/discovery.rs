//! Resolution of input locations into NetCDF files.
//!
//! A location is one of:
//! - a NetCDF file path
//! - a directory, searched recursively for `*.nc` / `*.nc4`
//! - a pattern whose final component contains `*` or `?`
//!   (e.g. `input_data/air.2m.gauss.*.nc`)
//! - an `http://` or `https://` URL

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{NetCdfError, NetCdfResult};

/// A resolved input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

/// Check whether a location string is a remote URL.
pub fn is_url(location: &str) -> bool {
    let lower = location.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Expand location strings into concrete inputs.
///
/// Local paths are returned sorted and de-duplicated, followed by remote
/// URLs in the order given. Fails with `NotFound` if nothing matched.
pub fn resolve_locations(locations: &[String]) -> NetCdfResult<Vec<Location>> {
    let mut local: Vec<PathBuf> = Vec::new();
    let mut remote: Vec<String> = Vec::new();

    for location in locations {
        let location = location.trim();
        if location.is_empty() {
            continue;
        }
        if is_url(location) {
            remote.push(location.to_string());
            continue;
        }

        let path = Path::new(location);
        let found = if has_wildcard(location) {
            expand_pattern(path)
        } else if path.is_dir() {
            netcdf_files_in(path)
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };

        debug!(location = %location, matches = found.len(), "Resolved input location");
        local.extend(found);
    }

    local.sort();
    local.dedup();

    if local.is_empty() && remote.is_empty() {
        return Err(NetCdfError::NotFound(format!(
            "no files matched {:?}; check the path or pattern",
            locations
        )));
    }

    Ok(local
        .into_iter()
        .map(Location::Local)
        .chain(remote.into_iter().map(Location::Remote))
        .collect())
}

fn has_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

fn is_netcdf_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("nc") | Some("nc4")
    )
}

/// All NetCDF files below a directory.
fn netcdf_files_in(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_netcdf_file(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Files in the pattern's parent directory whose name matches the pattern.
fn expand_pattern(pattern: &Path) -> Vec<PathBuf> {
    let name_pattern = match pattern.file_name().and_then(|n| n.to_str()) {
        Some(p) => p,
        None => return Vec::new(),
    };
    let parent = match pattern.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    WalkDir::new(&parent)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|name| wildcard_match(name_pattern, name))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}

/// Match `name` against a pattern where `*` matches any run of characters
/// and `?` matches exactly one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ni = 0usize;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ni = ni;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ni += 1;
            ni = star_ni;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
