//! Cutlist-domain rules applied around the generic packing core: part
//! sanitization, lamination pairing, edge-banding accounting, and the
//! backer-stock second pass.

use serde::{Deserialize, Serialize};

use crate::packer::{PackOptions, pack};
use crate::types::{BandEdges, Grain, Lamination, LayoutResult, PartSpec, StockSheetSpec};

/// A full layout plan: the primary stock pass plus, when any part is
/// laminated `WithBacker`, a second pass simulating the backer-material run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutlistPlan {
    pub primary: LayoutResult,
    pub backer: Option<LayoutResult>,
}

/// Drops parts with non-positive dimensions or qty. Malformed parts are not
/// an error; they simply never reach the packer.
pub fn sanitize_parts(parts: &[PartSpec]) -> Vec<PartSpec> {
    parts.iter().filter(|p| p.is_valid()).cloned().collect()
}

/// Finished-part count for billing and banding. `SameBoard` doubles consume
/// two raw pieces per finished part, so the submitted qty halves (floor).
pub fn finished_count(part: &PartSpec) -> u32 {
    match part.lamination {
        Lamination::SameBoard => part.qty / 2,
        _ => part.qty,
    }
}

/// Total edge-banding length over the submitted part list, bucketed into
/// 16mm (no lamination) and 32mm (any lamination) in mm. Billing quantities:
/// placement failures do not reduce them.
pub fn edge_banding_totals(parts: &[PartSpec]) -> (u64, u64) {
    let mut banding_16mm = 0u64;
    let mut banding_32mm = 0u64;
    for part in parts {
        let total = part.banding_per_part() * finished_count(part) as u64;
        if part.lamination.banding_is_32mm() {
            banding_32mm += total;
        } else {
            banding_16mm += total;
        }
    }
    (banding_16mm, banding_32mm)
}

/// Runs the full cutlist layout: sanitize, pack the primary pass, fill in
/// banding totals, then pack the `WithBacker` subset a second time against
/// the same stock with grain and banding constraints stripped.
pub fn plan(parts: &[PartSpec], stock: &[StockSheetSpec], options: PackOptions) -> CutlistPlan {
    let clean = sanitize_parts(parts);

    let mut primary = pack(&clean, stock, options);
    let (banding_16mm, banding_32mm) = edge_banding_totals(&clean);
    primary.stats.edgebanding_16mm_mm = banding_16mm;
    primary.stats.edgebanding_32mm_mm = banding_32mm;

    let backer_parts: Vec<PartSpec> = clean
        .iter()
        .filter(|p| p.lamination == Lamination::WithBacker)
        .map(|p| PartSpec {
            grain: Grain::Any,
            band_edges: BandEdges::none(),
            ..p.clone()
        })
        .collect();
    let backer = if backer_parts.is_empty() {
        None
    } else {
        Some(pack(&backer_parts, stock, options))
    };

    CutlistPlan { primary, backer }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str, length: u32, width: u32, qty: u32) -> PartSpec {
        PartSpec {
            id: id.to_string(),
            length_mm: length,
            width_mm: width,
            qty,
            grain: Grain::Any,
            band_edges: BandEdges::none(),
            lamination: Lamination::None,
            material_id: None,
        }
    }

    fn board() -> Vec<StockSheetSpec> {
        vec![StockSheetSpec {
            id: "board".to_string(),
            length_mm: 2750,
            width_mm: 1830,
            qty: 10,
            kerf_mm: 3,
        }]
    }

    #[test]
    fn test_sanitize_drops_malformed_parts() {
        let parts = vec![
            part("ok", 600, 400, 1),
            part("zero-length", 0, 400, 1),
            part("zero-width", 600, 0, 1),
            part("zero-qty", 600, 400, 0),
        ];
        let clean = sanitize_parts(&parts);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].id, "ok");
    }

    #[test]
    fn test_malformed_parts_never_surface_in_plan() {
        let parts = vec![part("ok", 600, 400, 1), part("bad", 0, 400, 3)];
        let result = plan(&parts, &board(), PackOptions::default());
        assert!(
            result
                .primary
                .sheets
                .iter()
                .flat_map(|s| &s.placements)
                .all(|p| p.part_id != "bad")
        );
        assert!(result.primary.unplaced.iter().all(|u| u.part_id != "bad"));
    }

    #[test]
    fn test_finished_count_halves_same_board() {
        let mut p = part("a", 600, 400, 4);
        p.lamination = Lamination::SameBoard;
        assert_eq!(finished_count(&p), 2);
        p.qty = 1;
        assert_eq!(finished_count(&p), 0);
        p.lamination = Lamination::Custom;
        assert_eq!(finished_count(&p), 1);
        p.lamination = Lamination::None;
        assert_eq!(finished_count(&p), 1);
    }

    #[test]
    fn test_same_board_single_raw_piece_contributes_no_banding() {
        // One raw piece of a same-board double is floor(1/2) = 0 finished
        // parts: it still gets placed, but bands and bills as nothing.
        let mut p = part("a", 600, 400, 1);
        p.lamination = Lamination::SameBoard;
        p.band_edges = BandEdges::all();
        let result = plan(&[p], &board(), PackOptions::default());
        assert_eq!(result.primary.placed_count(), 1);
        assert_eq!(result.primary.stats.edgebanding_16mm_mm, 0);
        assert_eq!(result.primary.stats.edgebanding_32mm_mm, 0);
    }

    #[test]
    fn test_banding_buckets_by_lamination() {
        let mut plain = part("plain", 600, 400, 2);
        plain.band_edges = BandEdges {
            top: true,
            bottom: true,
            ..BandEdges::none()
        };
        let mut laminated = part("lam", 500, 300, 3);
        laminated.lamination = Lamination::Custom;
        laminated.band_edges = BandEdges {
            left: true,
            ..BandEdges::none()
        };
        let (banding_16mm, banding_32mm) = edge_banding_totals(&[plain, laminated]);
        // plain: 2 edges x 600mm x 2 parts
        assert_eq!(banding_16mm, 2 * 600 * 2);
        // laminated: 1 edge x 300mm x 3 parts
        assert_eq!(banding_32mm, 300 * 3);
    }

    #[test]
    fn test_with_backer_runs_second_pass() {
        let mut p = part("a", 600, 400, 2);
        p.lamination = Lamination::WithBacker;
        p.band_edges = BandEdges::all();
        let plain = part("b", 500, 300, 1);
        let result = plan(&[p, plain], &board(), PackOptions::default());

        // Primary pass places all three pieces
        assert_eq!(result.primary.placed_count(), 3);
        // Backer pass re-places only the with-backer subset
        let backer = result.backer.expect("backer pass expected");
        assert_eq!(backer.placed_count(), 2);
        assert!(
            backer
                .sheets
                .iter()
                .flat_map(|s| &s.placements)
                .all(|pl| pl.part_id == "a")
        );
        // Backer stats carry no banding
        assert_eq!(backer.stats.edgebanding_16mm_mm, 0);
        assert_eq!(backer.stats.edgebanding_32mm_mm, 0);
        // With-backer banding lands in the 32mm bucket on the primary stats
        assert_eq!(
            result.primary.stats.edgebanding_32mm_mm,
            2 * (600 + 400) * 2
        );
    }

    #[test]
    fn test_backer_pass_frees_grain() {
        // Natural orientation is 2000 across a 1830 sheet; grain pins it on
        // the primary pass, but the backer pass may rotate.
        let mut p = part("a", 500, 2000, 1);
        p.grain = Grain::Width;
        p.lamination = Lamination::WithBacker;
        let result = plan(&[p], &board(), PackOptions::default());

        assert_eq!(result.primary.placed_count(), 0);
        assert_eq!(
            result.primary.unplaced[0].reason,
            crate::types::UnplacedReason::TooLargeForSheet
        );
        let backer = result.backer.expect("backer pass expected");
        assert_eq!(backer.placed_count(), 1);
        assert!(backer.sheets[0].placements[0].rotated);
    }

    #[test]
    fn test_no_backer_pass_without_backer_parts() {
        let result = plan(&[part("a", 600, 400, 1)], &board(), PackOptions::default());
        assert!(result.backer.is_none());
    }

    #[test]
    fn test_empty_input_yields_empty_plan() {
        let result = plan(&[], &board(), PackOptions::default());
        assert_eq!(result.primary, LayoutResult::default());
        assert!(result.backer.is_none());
    }
}
