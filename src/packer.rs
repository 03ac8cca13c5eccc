use serde::{Deserialize, Serialize};

use crate::guillotine::{GuillotineSheet, ScoreStrategy, ScoredPlacement};
use crate::types::{
    LayoutResult, LayoutStats, PartSpec, Rect, SheetLayout, StockSheetSpec, Unplaced,
    UnplacedReason,
};

/// Run-level packing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOptions {
    /// Rotate grain-free parts 90° when it fits better.
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    /// Never open more than one physical sheet.
    #[serde(default)]
    pub single_sheet_only: bool,
    #[serde(default)]
    pub strategy: ScoreStrategy,
}

fn default_true() -> bool {
    true
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            allow_rotation: true,
            single_sheet_only: false,
            strategy: ScoreStrategy::default(),
        }
    }
}

/// One expanded physical piece awaiting placement.
#[derive(Debug, Clone, Copy)]
struct Piece {
    part_idx: usize,
    rect: Rect,
    allow_rotate: bool,
}

/// One opened physical sheet and the stock class it came from.
struct OpenSheet {
    class_idx: usize,
    sheet: GuillotineSheet,
}

/// Pure packing entry point: place every part unit onto stock sheets, open
/// sheets lazily within each class's qty cap, and report what would not fit.
/// Deterministic over its inputs; holds no state between calls. Callers are
/// expected to pre-filter parts with non-positive dimensions or qty.
pub fn pack(parts: &[PartSpec], stock: &[StockSheetSpec], options: PackOptions) -> LayoutResult {
    let mut too_large = vec![0u32; parts.len()];
    let mut no_capacity = vec![0u32; parts.len()];

    let any_capacity = stock.iter().any(|s| s.qty > 0);

    let mut pieces: Vec<Piece> = Vec::new();
    for (part_idx, part) in parts.iter().enumerate() {
        let allow_rotate = options.allow_rotation && part.grain.allows_rotation();
        if !any_capacity {
            no_capacity[part_idx] += part.qty;
            continue;
        }
        // Dimensions are checked against every declared class: a part that
        // would fit a class whose qty is exhausted is a capacity failure,
        // not an oversize one
        let fits_some_class = stock
            .iter()
            .any(|s| fits_class(part.rect(), allow_rotate, s.rect()));
        if !fits_some_class {
            // Exceeds every stock class outright; never costs a sheet
            too_large[part_idx] += part.qty;
            continue;
        }
        for _ in 0..part.qty {
            pieces.push(Piece {
                part_idx,
                rect: part.rect(),
                allow_rotate,
            });
        }
    }

    // Largest-area-first so big parts claim space before filler. Stable sort
    // keeps submission order among equal areas, which keeps runs deterministic.
    pieces.sort_by(|a, b| b.rect.area().cmp(&a.rect.area()));

    let mut remaining: Vec<u32> = stock.iter().map(|s| s.qty).collect();
    let mut open: Vec<OpenSheet> = Vec::new();

    for piece in &pieces {
        let best = find_best_across_sheets(&open, piece, options.strategy);

        match best {
            Some((sheet_idx, scored)) => {
                open[sheet_idx]
                    .sheet
                    .place(scored, &parts[piece.part_idx].id, piece.rect);
            }
            None => {
                if options.single_sheet_only && !open.is_empty() {
                    no_capacity[piece.part_idx] += 1;
                    continue;
                }
                match choose_class(stock, &remaining, piece) {
                    Some(class_idx) => {
                        let spec = &stock[class_idx];
                        let mut sheet = GuillotineSheet::new(spec.rect(), spec.kerf_mm);
                        if let Some(scored) =
                            sheet.find_best(piece.rect, piece.allow_rotate, options.strategy)
                        {
                            sheet.place(scored, &parts[piece.part_idx].id, piece.rect);
                            remaining[class_idx] -= 1;
                            open.push(OpenSheet { class_idx, sheet });
                        } else {
                            // choose_class guarantees a geometric fit
                            no_capacity[piece.part_idx] += 1;
                        }
                    }
                    None => {
                        no_capacity[piece.part_idx] += 1;
                    }
                }
            }
        }
    }

    build_result(parts, stock, open, &too_large, &no_capacity)
}

fn fits_class(rect: Rect, allow_rotate: bool, sheet: Rect) -> bool {
    rect.fits_in(&sheet) || (allow_rotate && rect.rotated().fits_in(&sheet))
}

/// Best (sheet, free rect, orientation) across all open sheets. Score ties
/// go to the lower sheet index; within a sheet `find_best` already resolves
/// them top-left, row-major.
fn find_best_across_sheets(
    open: &[OpenSheet],
    piece: &Piece,
    strategy: ScoreStrategy,
) -> Option<(usize, ScoredPlacement)> {
    let mut best: Option<(usize, ScoredPlacement)> = None;
    for (sheet_idx, os) in open.iter().enumerate() {
        if let Some(scored) = os.sheet.find_best(piece.rect, piece.allow_rotate, strategy)
            && best
                .as_ref()
                .is_none_or(|(bi, b)| (scored.score, sheet_idx) < (b.score, *bi))
        {
            best = Some((sheet_idx, scored));
        }
    }
    best
}

/// Best-matching stock class for a piece that no open sheet can take:
/// smallest sheet area that fits, ties to declaration order.
fn choose_class(stock: &[StockSheetSpec], remaining: &[u32], piece: &Piece) -> Option<usize> {
    let mut best: Option<(u64, usize)> = None;
    for (class_idx, spec) in stock.iter().enumerate() {
        if remaining[class_idx] == 0 {
            continue;
        }
        if !fits_class(piece.rect, piece.allow_rotate, spec.rect()) {
            continue;
        }
        let key = (spec.rect().area(), class_idx);
        if best.is_none_or(|b| key < b) {
            best = Some(key);
        }
    }
    best.map(|(_, class_idx)| class_idx)
}

fn build_result(
    parts: &[PartSpec],
    stock: &[StockSheetSpec],
    open: Vec<OpenSheet>,
    too_large: &[u32],
    no_capacity: &[u32],
) -> LayoutResult {
    let mut sheets = Vec::with_capacity(open.len());
    let mut stats = LayoutStats::default();

    for (index, os) in open.into_iter().enumerate() {
        let spec = &stock[os.class_idx];
        let used = os.sheet.used_area();
        let waste = os.sheet.stock().area() - used;
        stats.used_area_mm2 += used;
        stats.waste_area_mm2 += waste;
        sheets.push(SheetLayout {
            sheet_id: spec.id.clone(),
            index,
            length_mm: spec.length_mm,
            width_mm: spec.width_mm,
            placements: os.sheet.placements,
            used_area_mm2: used,
            waste_area_mm2: waste,
        });
    }

    let mut unplaced = Vec::new();
    for (part_idx, part) in parts.iter().enumerate() {
        if too_large[part_idx] > 0 {
            unplaced.push(Unplaced {
                part_id: part.id.clone(),
                count: too_large[part_idx],
                reason: UnplacedReason::TooLargeForSheet,
            });
        }
        if no_capacity[part_idx] > 0 {
            unplaced.push(Unplaced {
                part_id: part.id.clone(),
                count: no_capacity[part_idx],
                reason: UnplacedReason::NoCapacity,
            });
        }
    }

    LayoutResult {
        sheets,
        stats,
        unplaced,
    }
}
