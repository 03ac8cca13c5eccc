//! Guillotine cutlist layout engine: places rectangular parts onto bounded
//! stock sheets, tracking waste, grain constraints, lamination pairing, and
//! edge-banding totals.
//!
//! The core entry points are [`packer::pack`] (the pure placement engine)
//! and [`cutlist::plan`] (the domain wrapper adding sanitization, banding
//! accounting, and the backer-stock second pass).

pub mod cutlist;
pub mod guillotine;
pub mod packer;
pub mod render;
pub mod types;
