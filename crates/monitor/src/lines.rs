//! Static transmission-line catalog.
//!
//! Lines are immutable once the catalog is built. Each line's *slot* is its
//! position among the lines of its group, in catalog order; the probability
//! feed sends one value per slot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Colors and groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineColor {
    Lime,
    Yellow,
    Red,
    Orange,
    Cyan,
    Magenta,
    Blue,
    White,
}

impl LineColor {
    /// sRGB components in [0, 1].
    pub fn rgb(self) -> [f32; 3] {
        match self {
            LineColor::Lime => [0.20, 0.95, 0.20],
            LineColor::Yellow => [1.00, 0.90, 0.10],
            LineColor::Red => [0.95, 0.10, 0.10],
            LineColor::Orange => [1.00, 0.55, 0.05],
            LineColor::Cyan => [0.10, 0.85, 0.95],
            LineColor::Magenta => [0.90, 0.20, 0.85],
            LineColor::Blue => [0.20, 0.40, 1.00],
            LineColor::White => [1.00, 1.00, 1.00],
        }
    }

    /// Color a blinking line alternates with. Red lines flash white instead
    /// so the alternation stays visible.
    pub fn alert_partner(self) -> LineColor {
        if self == LineColor::Red {
            LineColor::White
        } else {
            LineColor::Red
        }
    }
}

/// Voltage tier a line belongs to. The wire key is the serde name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LineGroup {
    #[serde(rename = "66kV")]
    Kv66,
    #[serde(rename = "110kV")]
    Kv110,
    #[serde(rename = "220kV")]
    Kv220,
    #[serde(rename = "500kV")]
    Kv500,
}

impl LineGroup {
    pub const ALL: [LineGroup; 4] = [
        LineGroup::Kv66,
        LineGroup::Kv110,
        LineGroup::Kv220,
        LineGroup::Kv500,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LineGroup::Kv66 => "66kV",
            LineGroup::Kv110 => "110kV",
            LineGroup::Kv220 => "220kV",
            LineGroup::Kv500 => "500kV",
        }
    }

    pub fn from_key(key: &str) -> Option<LineGroup> {
        LineGroup::ALL.into_iter().find(|g| g.key() == key)
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Identity of a line: ids are only unique inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub group: LineGroup,
    pub id: String,
}

impl LineKey {
    pub fn new(group: LineGroup, id: impl Into<String>) -> Self {
        Self {
            group,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group.key(), self.id)
    }
}

/// Where a line's geometry lives. Opaque to everything but the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySource(pub PathBuf);

impl GeometrySource {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionLine {
    pub key: LineKey,
    pub display_name: String,
    pub geometry: GeometrySource,
    pub base_color: LineColor,
    slot: usize,
}

impl TransmissionLine {
    pub fn group(&self) -> LineGroup {
        self.key.group
    }

    /// Index of this line's probability inside its group's array.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// One catalog entry as written in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub id: String,
    pub name: String,
    pub geometry: PathBuf,
    pub color: LineColor,
    pub group: LineGroup,
}

impl LineSpec {
    pub fn new(
        group: LineGroup,
        id: &str,
        name: &str,
        geometry: impl Into<PathBuf>,
        color: LineColor,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            geometry: geometry.into(),
            color,
            group,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct LineCatalog {
    lines: Vec<TransmissionLine>,
}

impl LineCatalog {
    /// Build a catalog, assigning slots in order and rejecting duplicate keys.
    pub fn new(specs: Vec<LineSpec>) -> Result<Self, CatalogError> {
        let mut next_slot: BTreeMap<LineGroup, usize> = BTreeMap::new();
        let mut lines: Vec<TransmissionLine> = Vec::with_capacity(specs.len());

        for spec in specs {
            let key = LineKey::new(spec.group, spec.id);
            if lines.iter().any(|l| l.key == key) {
                return Err(CatalogError::DuplicateLine {
                    group: key.group.key().to_string(),
                    id: key.id,
                });
            }
            let slot = next_slot.entry(key.group).or_insert(0);
            lines.push(TransmissionLine {
                key,
                display_name: spec.name,
                geometry: GeometrySource(spec.geometry),
                base_color: spec.color,
                slot: *slot,
            });
            *slot += 1;
        }

        Ok(Self { lines })
    }

    /// Parse a JSON manifest (`[{id, name, geometry, color, group}, ...]`).
    pub fn from_manifest_json(json: &str) -> Result<Self, CatalogError> {
        let specs: Vec<LineSpec> = serde_json::from_str(json)?;
        Self::new(specs)
    }

    pub fn from_manifest_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Manifest(format!("{}: {e}", path.display())))?;
        Self::from_manifest_json(&json)
    }

    /// Lines shipped with the viewer under `assets/kml/`.
    pub fn builtin() -> Self {
        let specs = vec![
            LineSpec::new(
                LineGroup::Kv110,
                "LT26",
                "Peñablanca - Miraflores C2 110kV",
                "assets/kml/LT26_Penablanca_-_Miraflores_C2_110kV_R01.kml",
                LineColor::Lime,
            ),
            LineSpec::new(
                LineGroup::Kv110,
                "LT27",
                "Miraflores - Placilla 110kV",
                "assets/kml/LT27_Miraflores_-_Placilla_110kV.kml",
                LineColor::Yellow,
            ),
            LineSpec::new(
                LineGroup::Kv220,
                "LT08",
                "Agua Santa - Quillota 220kV",
                "assets/kml/LT08_Agua_Santa_-_Quillota_220kV.kml",
                LineColor::Orange,
            ),
            LineSpec::new(
                LineGroup::Kv66,
                "LT41",
                "Concón - Viña del Mar 66kV",
                "assets/kml/LT41_Concon_-_Vina_del_Mar_66kV.kmz",
                LineColor::Cyan,
            ),
        ];
        // Built-in keys are distinct, so construction cannot fail.
        Self::new(specs).unwrap_or_default()
    }

    pub fn lines(&self) -> &[TransmissionLine] {
        &self.lines
    }

    pub fn get(&self, key: &LineKey) -> Option<&TransmissionLine> {
        self.lines.iter().find(|l| &l.key == key)
    }

    pub fn in_group(&self, group: LineGroup) -> impl Iterator<Item = &TransmissionLine> {
        self.lines.iter().filter(move |l| l.key.group == group)
    }

    /// Groups that have at least one line, in group order.
    pub fn groups(&self) -> Vec<LineGroup> {
        LineGroup::ALL
            .into_iter()
            .filter(|g| self.lines.iter().any(|l| l.key.group == *g))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
