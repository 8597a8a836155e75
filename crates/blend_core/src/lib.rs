//! `blend_core`: ratio-to-mass blend calculation.
//!
//! No IO beyond in-memory CSV rendering. Every edit and calculation runs to
//! completion synchronously against one owned [`BlendSession`].

mod component_set;
mod export;
mod session;
mod solver;
mod types;

pub use component_set::{parse_ratio, ComponentSet};
pub use export::{
    export_csv, format_mass, CsvExport, ExportFormat, CSV_FILE_NAME, CSV_HEADER, CSV_MIME_TYPE,
};
pub use session::{BlendSession, SessionSnapshot};
pub use solver::{parse_target_mass, round_mass, solve, solve_mass};
pub use types::*;

#[cfg(test)]
mod tests;
