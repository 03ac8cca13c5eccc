use serde::{Deserialize, Serialize};

/// Axis-aligned dimensions in millimeters. `w` runs across the sheet's
/// width axis, `h` along its length axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Grain direction constraint. Parts are authored in their grain-correct
/// orientation, so `Length` and `Width` both pin the natural orientation
/// (no rotation regardless of the global flag); the variant records which
/// physical axis carries the grain for the caller's benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grain {
    #[default]
    Any,
    Length,
    Width,
}

impl Grain {
    pub fn allows_rotation(&self) -> bool {
        matches!(self, Grain::Any)
    }
}

/// Lamination treatment for a part. `SameBoard` means the raw part list
/// carries two physical pieces per finished part; `WithBacker` means the
/// part gets a duplicate placement pass on separate backer stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lamination {
    #[default]
    None,
    SameBoard,
    WithBacker,
    Custom,
}

impl Lamination {
    /// Laminated parts take 32mm edge banding; plain parts take 16mm.
    pub fn banding_is_32mm(&self) -> bool {
        !matches!(self, Lamination::None)
    }
}

/// Which edges of a part receive edge banding, relative to the unrotated
/// orientation. Top/bottom edges contribute `length_mm` each, left/right
/// contribute `width_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BandEdges {
    #[serde(default)]
    pub top: bool,
    #[serde(default)]
    pub bottom: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

impl BandEdges {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            top: true,
            bottom: true,
            left: true,
            right: true,
        }
    }

    pub fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

/// One part type to place, expanded by `qty` during packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length_mm: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width_mm: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(default)]
    pub grain: Grain,
    #[serde(default)]
    pub band_edges: BandEdges,
    #[serde(default)]
    pub lamination: Lamination,
    /// Opaque reference for the caller's cost aggregation; not interpreted
    /// by the packing engine.
    #[serde(default)]
    pub material_id: Option<String>,
}

impl PartSpec {
    /// Natural (unrotated) footprint: width across the sheet, length along it.
    pub fn rect(&self) -> Rect {
        Rect::new(self.width_mm, self.length_mm)
    }

    pub fn is_valid(&self) -> bool {
        self.length_mm > 0 && self.width_mm > 0 && self.qty > 0
    }

    /// Banding length of one finished part in mm.
    pub fn banding_per_part(&self) -> u64 {
        let mut total = 0u64;
        if self.band_edges.top {
            total += self.length_mm as u64;
        }
        if self.band_edges.bottom {
            total += self.length_mm as u64;
        }
        if self.band_edges.left {
            total += self.width_mm as u64;
        }
        if self.band_edges.right {
            total += self.width_mm as u64;
        }
        total
    }
}

/// One class of stock material: outer dimensions, how many physical sheets
/// may be opened, and the saw kerf reserved between adjacent parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSheetSpec {
    pub id: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub length_mm: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width_mm: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    #[serde(default, deserialize_with = "deserialize_u32_from_number")]
    pub kerf_mm: u32,
}

impl StockSheetSpec {
    pub fn rect(&self) -> Rect {
        Rect::new(self.width_mm, self.length_mm)
    }
}

/// Result of a successful placement. `w`/`h` are post-rotation, so an
/// unrotated placement has `h == length_mm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub part_id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub rotated: bool,
}

impl Placement {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// One opened physical sheet with its placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    /// Stock class this sheet was opened from.
    pub sheet_id: String,
    /// Opening order within the run, starting at 0.
    pub index: usize,
    pub length_mm: u32,
    pub width_mm: u32,
    pub placements: Vec<Placement>,
    pub used_area_mm2: u64,
    pub waste_area_mm2: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutStats {
    pub used_area_mm2: u64,
    pub waste_area_mm2: u64,
    pub edgebanding_16mm_mm: u64,
    pub edgebanding_32mm_mm: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    /// No allowed orientation fits the dimensions of any stock class.
    TooLargeForSheet,
    /// Would fit on stock, but every sheet's capacity is exhausted.
    NoCapacity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unplaced {
    pub part_id: String,
    pub count: u32,
    pub reason: UnplacedReason,
}

/// Sole output of a packing run. Immutable once returned; the engine holds
/// no state between calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    pub sheets: Vec<SheetLayout>,
    pub stats: LayoutStats,
    pub unplaced: Vec<Unplaced>,
}

impl LayoutResult {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn placed_count(&self) -> usize {
        self.sheets.iter().map(|s| s.placements.len()).sum()
    }

    pub fn waste_percent(&self) -> f64 {
        let total = self.stats.used_area_mm2 + self.stats.waste_area_mm2;
        if total == 0 {
            return 0.0;
        }
        self.stats.waste_area_mm2 as f64 / total as f64 * 100.0
    }
}

/// Accepts JSON numbers like `600.0` from JS callers while still rejecting
/// negatives and genuine fractions.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {value}"
        )));
    }
    Ok(value as u32)
}
