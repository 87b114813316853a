//! Multi-file NetCDF temperature sources.

use std::ops::Range;
use std::path::PathBuf;

use climate_common::source::check_slab;
use climate_common::{
    ClimateError, GridAxes, GridSource, Result, TemperatureUnit, DEFAULT_TIME_CHUNK,
};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::discovery::{resolve_locations, Location};
use crate::error::{NetCdfError, NetCdfResult};
use crate::fetch::fetch_remote;
use crate::native::{read_file_info, read_slab, FileInfo};

/// A temperature grid spread over one or more NetCDF files along time.
///
/// Only coordinates are held in memory; values are read per slab.
#[derive(Debug)]
pub struct NetCdfSource {
    axes: GridAxes,
    files: Vec<FileInfo>,
    /// Index of the first time step of each file on the combined axis.
    offsets: Vec<usize>,
    variable: String,
    units: TemperatureUnit,
    time_chunk: usize,
    _downloads: Option<TempDir>,
}

impl NetCdfSource {
    /// Combine per-file metadata into one source.
    fn from_files(
        mut files: Vec<FileInfo>,
        variable: &str,
        time_chunk: usize,
        downloads: Option<TempDir>,
    ) -> NetCdfResult<Self> {
        if files.is_empty() {
            return Err(NetCdfError::NotFound("no NetCDF files to open".to_string()));
        }
        files.sort_by_key(|f| f.times.first().copied());

        let first = &files[0];
        let units = first.units;
        for f in &files[1..] {
            if f.lats != first.lats || f.lons != first.lons {
                return Err(NetCdfError::MissingData(format!(
                    "lat/lon labels of {} differ from {}",
                    f.path.display(),
                    first.path.display()
                )));
            }
            if f.units != units {
                return Err(NetCdfError::InvalidFormat(format!(
                    "units of {} ({}) differ from {} ({})",
                    f.path.display(),
                    f.units,
                    first.path.display(),
                    units
                )));
            }
        }

        let mut offsets = Vec::with_capacity(files.len());
        let mut times = Vec::new();
        for f in &files {
            offsets.push(times.len());
            times.extend_from_slice(&f.times);
        }

        let axes = GridAxes::new(times, first.lats.clone(), first.lons.clone())
            .map_err(|e| NetCdfError::InvalidFormat(e.to_string()))?;

        info!(
            variable = %variable,
            files = files.len(),
            times = axes.times.len(),
            lats = axes.lats.len(),
            lons = axes.lons.len(),
            "Opened NetCDF source"
        );

        Ok(Self {
            axes,
            files,
            offsets,
            variable: variable.to_string(),
            units,
            time_chunk: time_chunk.max(1),
            _downloads: downloads,
        })
    }

    /// Paths of the underlying files, in time order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

impl GridSource for NetCdfSource {
    fn axes(&self) -> &GridAxes {
        &self.axes
    }

    fn variable(&self) -> &str {
        &self.variable
    }

    fn units(&self) -> TemperatureUnit {
        self.units
    }

    fn time_chunk(&self) -> usize {
        self.time_chunk
    }

    fn read_time_slab(&self, range: Range<usize>) -> Result<Vec<f32>> {
        check_slab(&range, self.axes.times.len())?;
        let mut out = Vec::with_capacity(range.len() * self.axes.cells());

        for (file, &offset) in self.files.iter().zip(&self.offsets) {
            let file_end = offset + file.times.len();
            let start = range.start.max(offset);
            let end = range.end.min(file_end);
            if start >= end {
                continue;
            }
            debug!(path = %file.path.display(), start = start, end = end, "Reading slab");
            let part = read_slab(file, (start - offset)..(end - offset))
                .map_err(ClimateError::from)?;
            out.extend(part);
        }
        Ok(out)
    }
}

/// Opens NetCDF temperature sources from location strings.
#[derive(Debug, Clone)]
pub struct NetCdfLoader {
    pub variable: String,
    pub time_chunk: usize,
}

impl Default for NetCdfLoader {
    fn default() -> Self {
        Self {
            variable: "air".to_string(),
            time_chunk: DEFAULT_TIME_CHUNK,
        }
    }
}

impl NetCdfLoader {
    pub fn new(variable: impl Into<String>, time_chunk: usize) -> Self {
        Self {
            variable: variable.into(),
            time_chunk,
        }
    }

    /// Open local files, directories or patterns.
    ///
    /// Remote URLs are rejected here; use [`load`](Self::load).
    pub fn open(&self, locations: &[String]) -> NetCdfResult<NetCdfSource> {
        let resolved = resolve_locations(locations)?;
        let mut paths = Vec::with_capacity(resolved.len());
        for loc in resolved {
            match loc {
                Location::Local(p) => paths.push(p),
                Location::Remote(url) => {
                    return Err(NetCdfError::Remote(format!(
                        "{} is remote; use the async loader",
                        url
                    )))
                }
            }
        }
        self.open_files(&paths, None)
    }

    /// Open any mix of local and remote locations.
    ///
    /// Remote inputs are downloaded into a temporary directory that lives
    /// as long as the returned source.
    pub async fn load(&self, locations: &[String]) -> NetCdfResult<NetCdfSource> {
        let resolved = resolve_locations(locations)?;
        if !resolved.iter().any(Location::is_remote) {
            let paths: Vec<PathBuf> = resolved
                .into_iter()
                .filter_map(|l| match l {
                    Location::Local(p) => Some(p),
                    Location::Remote(_) => None,
                })
                .collect();
            return self.open_files(&paths, None);
        }

        let dir = tempfile::tempdir()?;
        let client = reqwest::Client::new();
        let mut paths = Vec::with_capacity(resolved.len());
        for (index, loc) in resolved.into_iter().enumerate() {
            match loc {
                Location::Local(p) => paths.push(p),
                Location::Remote(url) => {
                    paths.push(fetch_remote(&client, &url, dir.path(), index).await?)
                }
            }
        }
        self.open_files(&paths, Some(dir))
    }

    /// Open an explicit list of files.
    pub fn open_files(
        &self,
        paths: &[PathBuf],
        downloads: Option<TempDir>,
    ) -> NetCdfResult<NetCdfSource> {
        let files = paths
            .iter()
            .map(|p| read_file_info(p, &self.variable))
            .collect::<NetCdfResult<Vec<_>>>()?;
        NetCdfSource::from_files(files, &self.variable, self.time_chunk, downloads)
    }
}
