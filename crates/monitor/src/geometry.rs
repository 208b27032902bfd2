//! KML/KMZ line geometry.
//!
//! Only `<coordinates>` lists are read; styles, folders and placemark names in
//! the documents are ignored. Each list becomes one path. Loading runs on the
//! I/O task pool and reports back through `GeometryLoaded` / `GeometryFailed`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use bevy::prelude::*;
use bevy::tasks::{block_on, IoTaskPool, Task};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::GeometryLoadError;
use crate::lines::{LineCatalog, LineKey};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl GeoBounds {
    pub fn from_point(p: GeoPoint) -> Self {
        Self { min: p, max: p }
    }

    pub fn include(&mut self, p: GeoPoint) {
        self.min.lat = self.min.lat.min(p.lat);
        self.min.lon = self.min.lon.min(p.lon);
        self.max.lat = self.max.lat.max(p.lat);
        self.max.lon = self.max.lon.max(p.lon);
    }

    pub fn union(mut self, other: GeoBounds) -> Self {
        self.include(other.min);
        self.include(other.max);
        self
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min.lat + self.max.lat) / 2.0,
            (self.min.lon + self.max.lon) / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineGeometry {
    pub paths: Vec<Vec<GeoPoint>>,
}

impl LineGeometry {
    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut points = self.paths.iter().flatten();
        let first = points.next()?;
        let mut bounds = GeoBounds::from_point(*first);
        for p in points {
            bounds.include(*p);
        }
        Some(bounds)
    }

    /// Where the probability marker sits: the middle vertex of the longest path.
    pub fn label_anchor(&self) -> Option<GeoPoint> {
        let path = self.paths.iter().max_by_key(|p| p.len())?;
        path.get(path.len() / 2).copied()
    }

    pub fn point_count(&self) -> usize {
        self.paths.iter().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a KML `<coordinates>` body: whitespace-separated `lon,lat[,alt]`
/// tuples. Tuples that do not parse are skipped.
pub fn parse_coordinates(text: &str) -> Vec<GeoPoint> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let mut parts = tuple.split(',');
            let lon: f64 = parts.next()?.trim().parse().ok()?;
            let lat: f64 = parts.next()?.trim().parse().ok()?;
            let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
            valid.then(|| GeoPoint::new(lat, lon))
        })
        .collect()
}

pub fn parse_kml(xml: &str) -> Result<LineGeometry, GeometryLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut paths = Vec::new();
    let mut in_coordinates = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"coordinates" => {
                in_coordinates = true;
                text.clear();
            }
            Event::Text(t) if in_coordinates => {
                text.push_str(&t.unescape()?);
                text.push(' ');
            }
            Event::CData(c) if in_coordinates => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                text.push(' ');
            }
            Event::End(e) if e.local_name().as_ref() == b"coordinates" => {
                in_coordinates = false;
                let path = parse_coordinates(&text);
                if !path.is_empty() {
                    paths.push(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if paths.is_empty() {
        return Err(GeometryLoadError::NoCoordinates);
    }
    Ok(LineGeometry { paths })
}

/// Load a `.kml` file, or the main document of a `.kmz` archive.
pub fn load_geometry(path: &Path) -> Result<LineGeometry, GeometryLoadError> {
    let is_kmz = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("kmz"));

    let xml = if is_kmz {
        read_kmz_document(path)?
    } else {
        std::fs::read_to_string(path)?
    };
    parse_kml(&xml)
}

/// `doc.kml` when present, otherwise the first `.kml` entry.
fn read_kmz_document(path: &Path) -> Result<String, GeometryLoadError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let name = names
        .iter()
        .find(|n| n.eq_ignore_ascii_case("doc.kml"))
        .or_else(|| names.iter().find(|n| n.to_ascii_lowercase().ends_with(".kml")))
        .cloned()
        .ok_or_else(|| GeometryLoadError::Archive("no .kml document in archive".to_string()))?;

    let mut entry = archive.by_name(&name)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

// ---------------------------------------------------------------------------
// Store and loading systems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryStatus {
    Loading,
    Ready(LineGeometry),
    Failed(String),
}

#[derive(Resource, Debug, Default)]
pub struct GeometryStore {
    statuses: BTreeMap<LineKey, GeometryStatus>,
}

impl GeometryStore {
    pub fn status(&self, key: &LineKey) -> Option<&GeometryStatus> {
        self.statuses.get(key)
    }

    pub fn ready(&self, key: &LineKey) -> Option<&LineGeometry> {
        match self.statuses.get(key) {
            Some(GeometryStatus::Ready(geometry)) => Some(geometry),
            _ => None,
        }
    }

    /// Union of the bounds of every ready geometry.
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.statuses
            .values()
            .filter_map(|s| match s {
                GeometryStatus::Ready(g) => g.bounds(),
                _ => None,
            })
            .reduce(GeoBounds::union)
    }

    pub fn ready_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| matches!(s, GeometryStatus::Ready(_)))
            .count()
    }

    pub fn set(&mut self, key: LineKey, status: GeometryStatus) {
        self.statuses.insert(key, status);
    }
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct GeometryLoaded {
    pub key: LineKey,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct GeometryFailed {
    pub key: LineKey,
    pub reason: String,
}

#[derive(Resource, Default)]
pub struct PendingGeometryLoads(Vec<(LineKey, Task<Result<LineGeometry, GeometryLoadError>>)>);

impl PendingGeometryLoads {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Start a load for every catalog line that has no status yet.
pub fn begin_geometry_loads(
    catalog: Res<LineCatalog>,
    mut store: ResMut<GeometryStore>,
    mut pending: ResMut<PendingGeometryLoads>,
) {
    if !catalog.is_changed() {
        return;
    }
    let pool = IoTaskPool::get();
    for line in catalog.lines() {
        if store.status(&line.key).is_some() {
            continue;
        }
        let path = line.geometry.path().to_path_buf();
        let task = pool.spawn(async move { load_geometry(&path) });
        store.set(line.key.clone(), GeometryStatus::Loading);
        pending.0.push((line.key.clone(), task));
    }
}

pub fn collect_geometry_loads(
    catalog: Res<LineCatalog>,
    mut store: ResMut<GeometryStore>,
    mut pending: ResMut<PendingGeometryLoads>,
    mut loaded: EventWriter<GeometryLoaded>,
    mut failed: EventWriter<GeometryFailed>,
) {
    if pending.0.is_empty() {
        return;
    }
    let mut finished = Vec::new();
    pending.0.retain_mut(|(key, task)| {
        match block_on(futures_lite::future::poll_once(task)) {
            Some(result) => {
                finished.push((key.clone(), result));
                false
            }
            None => true,
        }
    });

    for (key, result) in finished {
        let source = catalog
            .get(&key)
            .map(|l| l.geometry.path().display().to_string())
            .unwrap_or_default();
        match result {
            Ok(geometry) => {
                info!(
                    "Loaded geometry for {} from '{}' ({} paths, {} points)",
                    key,
                    source,
                    geometry.paths.len(),
                    geometry.point_count()
                );
                store.set(key.clone(), GeometryStatus::Ready(geometry));
                loaded.send(GeometryLoaded { key });
            }
            Err(e) => {
                error!("Failed to load geometry for {} from '{}': {e}", key, source);
                let reason = e.to_string();
                store.set(key.clone(), GeometryStatus::Failed(reason.clone()));
                failed.send(GeometryFailed { key, reason });
            }
        }
    }
}
