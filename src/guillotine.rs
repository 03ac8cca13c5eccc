use serde::{Deserialize, Serialize};

use crate::types::{Placement, Rect};

/// An unplaced region of a sheet. Free rects belonging to one sheet are
/// disjoint once a placement's split/prune pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRect {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
}

impl FreeRect {
    fn contains(&self, other: &FreeRect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.x + self.rect.w >= other.x + other.rect.w
            && self.y + self.rect.h >= other.y + other.rect.h
    }
}

/// Fit-quality heuristic for choosing among candidate free rectangles.
/// Scores are lexicographic tuples, lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(clippy::enum_variant_names)]
pub enum ScoreStrategy {
    /// Minimize leftover area, then the longer leftover dimension.
    #[default]
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub rotated: bool,
    pub score: (u64, u64),
    pub x: u32,
    pub y: u32,
}

/// Free-rectangle bookkeeping for one opened physical sheet.
#[derive(Debug, Clone)]
pub struct GuillotineSheet {
    stock: Rect,
    kerf: u32,
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<Placement>,
}

impl GuillotineSheet {
    pub fn new(stock: Rect, kerf: u32) -> Self {
        Self {
            stock,
            kerf,
            free_rects: vec![FreeRect {
                x: 0,
                y: 0,
                rect: stock,
            }],
            placements: Vec::new(),
        }
    }

    pub fn stock(&self) -> Rect {
        self.stock
    }

    pub fn used_area(&self) -> u64 {
        self.placements.iter().map(|p| p.area()).sum()
    }

    /// Best free rect and orientation for a piece, or None if nothing fits.
    /// Within a sheet, score ties resolve to the top-left candidate
    /// (row-major) so runs are deterministic.
    pub fn find_best(
        &self,
        piece: Rect,
        allow_rotate: bool,
        strategy: ScoreStrategy,
    ) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        for (idx, free) in self.free_rects.iter().enumerate() {
            if piece.fits_in(&free.rect) {
                let candidate = ScoredPlacement {
                    free_idx: idx,
                    rotated: false,
                    score: Self::score(piece, free.rect, strategy),
                    x: free.x,
                    y: free.y,
                };
                if Self::better(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
            if allow_rotate && piece.w != piece.h {
                let rotated = piece.rotated();
                if rotated.fits_in(&free.rect) {
                    let candidate = ScoredPlacement {
                        free_idx: idx,
                        rotated: true,
                        score: Self::score(rotated, free.rect, strategy),
                        x: free.x,
                        y: free.y,
                    };
                    if Self::better(&candidate, best.as_ref()) {
                        best = Some(candidate);
                    }
                }
            }
        }

        best
    }

    fn better(candidate: &ScoredPlacement, best: Option<&ScoredPlacement>) -> bool {
        match best {
            None => true,
            Some(b) => (candidate.score, candidate.y, candidate.x) < (b.score, b.y, b.x),
        }
    }

    fn score(piece: Rect, free: Rect, strategy: ScoreStrategy) -> (u64, u64) {
        let leftover_w = (free.w - piece.w) as u64;
        let leftover_h = (free.h - piece.h) as u64;
        match strategy {
            ScoreStrategy::BestAreaFit => {
                let area_diff = free.area() - piece.area();
                (area_diff, std::cmp::max(leftover_w, leftover_h))
            }
            ScoreStrategy::BestShortSideFit => (
                std::cmp::min(leftover_w, leftover_h),
                std::cmp::max(leftover_w, leftover_h),
            ),
            ScoreStrategy::BestLongSideFit => (
                std::cmp::max(leftover_w, leftover_h),
                std::cmp::min(leftover_w, leftover_h),
            ),
        }
    }

    pub fn place(&mut self, scored: ScoredPlacement, part_id: &str, piece: Rect) -> Placement {
        let free = self.free_rects[scored.free_idx];
        let placed = if scored.rotated {
            piece.rotated()
        } else {
            piece
        };

        let placement = Placement {
            part_id: part_id.to_string(),
            x: free.x,
            y: free.y,
            w: placed.w,
            h: placed.h,
            rotated: scored.rotated,
        };

        self.free_rects.swap_remove(scored.free_idx);
        self.split(free, placed);
        self.merge_free_rects();
        self.prune_contained();
        self.placements.push(placement.clone());

        placement
    }

    /// Guillotine split of the consumed free rect. Kerf is reserved on the
    /// two consuming edges only. The cut runs so the larger leftover stays
    /// one contiguous remnant (split along the longer leftover axis).
    fn split(&mut self, free: FreeRect, placed: Rect) {
        let right_w = free.rect.w.saturating_sub(placed.w + self.kerf);
        let bottom_h = free.rect.h.saturating_sub(placed.h + self.kerf);

        if right_w > 0 && bottom_h > 0 {
            if free.rect.w - placed.w > free.rect.h - placed.h {
                // Wider leftover: right remnant keeps full height
                self.free_rects.push(FreeRect {
                    x: free.x + placed.w + self.kerf,
                    y: free.y,
                    rect: Rect::new(right_w, free.rect.h),
                });
                self.free_rects.push(FreeRect {
                    x: free.x,
                    y: free.y + placed.h + self.kerf,
                    rect: Rect::new(placed.w, bottom_h),
                });
            } else {
                // Taller leftover: bottom remnant keeps full width
                self.free_rects.push(FreeRect {
                    x: free.x + placed.w + self.kerf,
                    y: free.y,
                    rect: Rect::new(right_w, placed.h),
                });
                self.free_rects.push(FreeRect {
                    x: free.x,
                    y: free.y + placed.h + self.kerf,
                    rect: Rect::new(free.rect.w, bottom_h),
                });
            }
        } else if right_w > 0 {
            self.free_rects.push(FreeRect {
                x: free.x + placed.w + self.kerf,
                y: free.y,
                rect: Rect::new(right_w, free.rect.h),
            });
        } else if bottom_h > 0 {
            self.free_rects.push(FreeRect {
                x: free.x,
                y: free.y + placed.h + self.kerf,
                rect: Rect::new(free.rect.w, bottom_h),
            });
        }
    }

    fn merge_free_rects(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.free_rects.len() {
                for j in (i + 1)..self.free_rects.len() {
                    if let Some(m) = Self::try_merge(self.free_rects[i], self.free_rects[j]) {
                        self.free_rects[i] = m;
                        self.free_rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    fn try_merge(a: FreeRect, b: FreeRect) -> Option<FreeRect> {
        // Horizontally adjacent, same vertical span
        if a.y == b.y && a.rect.h == b.rect.h {
            if a.x + a.rect.w == b.x {
                return Some(FreeRect {
                    x: a.x,
                    y: a.y,
                    rect: Rect::new(a.rect.w + b.rect.w, a.rect.h),
                });
            }
            if b.x + b.rect.w == a.x {
                return Some(FreeRect {
                    x: b.x,
                    y: b.y,
                    rect: Rect::new(a.rect.w + b.rect.w, a.rect.h),
                });
            }
        }
        // Vertically adjacent, same horizontal span
        if a.x == b.x && a.rect.w == b.rect.w {
            if a.y + a.rect.h == b.y {
                return Some(FreeRect {
                    x: a.x,
                    y: a.y,
                    rect: Rect::new(a.rect.w, a.rect.h + b.rect.h),
                });
            }
            if b.y + b.rect.h == a.y {
                return Some(FreeRect {
                    x: b.x,
                    y: b.y,
                    rect: Rect::new(a.rect.w, a.rect.h + b.rect.h),
                });
            }
        }
        None
    }

    /// Drop fragments fully contained in another free rect so the free list
    /// stays bounded. Duplicates keep their first occurrence.
    fn prune_contained(&mut self) {
        let mut i = 0;
        while i < self.free_rects.len() {
            let a = self.free_rects[i];
            let dominated = self.free_rects.iter().enumerate().any(|(j, b)| {
                j != i && b.contains(&a) && (*b != a || j < i)
            });
            if dominated {
                self.free_rects.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_single_piece() {
        let mut sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        let piece = Rect::new(50, 30);
        let scored = sheet
            .find_best(piece, false, ScoreStrategy::BestAreaFit)
            .unwrap();
        let p = sheet.place(scored, "a", piece);
        assert_eq!(p.x, 0);
        assert_eq!(p.y, 0);
        assert_eq!(p.w, 50);
        assert_eq!(p.h, 30);
        assert_eq!(p.part_id, "a");
        assert!(!sheet.free_rects.is_empty());
    }

    #[test]
    fn test_piece_too_large() {
        let sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        let piece = Rect::new(200, 50);
        assert!(
            sheet
                .find_best(piece, false, ScoreStrategy::BestAreaFit)
                .is_none()
        );
    }

    #[test]
    fn test_rotation_fit() {
        let sheet = GuillotineSheet::new(Rect::new(100, 50), 0);
        let piece = Rect::new(50, 100);
        assert!(
            sheet
                .find_best(piece, false, ScoreStrategy::BestAreaFit)
                .is_none()
        );
        let scored = sheet
            .find_best(piece, true, ScoreStrategy::BestAreaFit)
            .unwrap();
        assert!(scored.rotated);
    }

    #[test]
    fn test_square_piece_tries_one_orientation() {
        let sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        let piece = Rect::new(60, 60);
        let scored = sheet
            .find_best(piece, true, ScoreStrategy::BestAreaFit)
            .unwrap();
        assert!(!scored.rotated);
    }

    #[test]
    fn test_kerf_reserved_on_consuming_edges() {
        let mut sheet = GuillotineSheet::new(Rect::new(100, 100), 5);
        let piece = Rect::new(50, 100);
        let scored = sheet
            .find_best(piece, false, ScoreStrategy::BestAreaFit)
            .unwrap();
        sheet.place(scored, "a", piece);
        // Remaining width is 100 - 50 - 5 = 45
        assert!(sheet.free_rects.iter().any(|f| f.rect.w == 45));
    }

    #[test]
    fn test_fill_exact() {
        let mut sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        let piece = Rect::new(100, 100);
        let scored = sheet
            .find_best(piece, false, ScoreStrategy::BestAreaFit)
            .unwrap();
        sheet.place(scored, "a", piece);
        assert!(sheet.free_rects.is_empty());
    }

    #[test]
    fn test_split_keeps_larger_remnant_contiguous() {
        // 100 wide, 200 tall sheet; 60x50 piece leaves a taller leftover,
        // so the bottom remnant must span the full width.
        let mut sheet = GuillotineSheet::new(Rect::new(100, 200), 0);
        let piece = Rect::new(60, 50);
        let scored = sheet
            .find_best(piece, false, ScoreStrategy::BestAreaFit)
            .unwrap();
        sheet.place(scored, "a", piece);
        assert!(
            sheet
                .free_rects
                .iter()
                .any(|f| f.x == 0 && f.y == 50 && f.rect == Rect::new(100, 150))
        );
        assert!(
            sheet
                .free_rects
                .iter()
                .any(|f| f.x == 60 && f.y == 0 && f.rect == Rect::new(40, 50))
        );
    }

    #[test]
    fn test_split_wider_leftover() {
        // 200 wide, 100 tall; 50x60 piece leaves a wider leftover, so the
        // right remnant keeps full height.
        let mut sheet = GuillotineSheet::new(Rect::new(200, 100), 0);
        let piece = Rect::new(50, 60);
        let scored = sheet
            .find_best(piece, false, ScoreStrategy::BestAreaFit)
            .unwrap();
        sheet.place(scored, "a", piece);
        assert!(
            sheet
                .free_rects
                .iter()
                .any(|f| f.x == 50 && f.y == 0 && f.rect == Rect::new(150, 100))
        );
        assert!(
            sheet
                .free_rects
                .iter()
                .any(|f| f.x == 0 && f.y == 60 && f.rect == Rect::new(50, 40))
        );
    }

    #[test]
    fn test_free_rects_stay_disjoint() {
        let mut sheet = GuillotineSheet::new(Rect::new(300, 300), 0);
        for (id, piece) in [
            ("a", Rect::new(120, 80)),
            ("b", Rect::new(90, 90)),
            ("c", Rect::new(60, 150)),
        ] {
            let scored = sheet
                .find_best(piece, true, ScoreStrategy::BestAreaFit)
                .unwrap();
            sheet.place(scored, id, piece);
        }
        for i in 0..sheet.free_rects.len() {
            for j in (i + 1)..sheet.free_rects.len() {
                let a = sheet.free_rects[i];
                let b = sheet.free_rects[j];
                let overlaps = a.x < b.x + b.rect.w
                    && b.x < a.x + a.rect.w
                    && a.y < b.y + b.rect.h
                    && b.y < a.y + a.rect.h;
                assert!(!overlaps, "free rects {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn test_prune_drops_contained_fragment() {
        let mut sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        sheet.free_rects = vec![
            FreeRect {
                x: 0,
                y: 0,
                rect: Rect::new(100, 100),
            },
            FreeRect {
                x: 10,
                y: 10,
                rect: Rect::new(20, 20),
            },
        ];
        sheet.prune_contained();
        assert_eq!(sheet.free_rects.len(), 1);
        assert_eq!(sheet.free_rects[0].rect, Rect::new(100, 100));
    }

    #[test]
    fn test_prune_keeps_one_of_equal_rects() {
        let mut sheet = GuillotineSheet::new(Rect::new(100, 100), 0);
        let dup = FreeRect {
            x: 5,
            y: 5,
            rect: Rect::new(10, 10),
        };
        sheet.free_rects = vec![dup, dup];
        sheet.prune_contained();
        assert_eq!(sheet.free_rects.len(), 1);
    }
}
