//! Pure transformations over fetched analyses.
//!
//! Nothing here touches the network or view state: discrepancy scoring,
//! display ordering, and calendar grouping are plain functions over slices
//! so they can be recomputed on every render.

pub mod discrepancy;
pub mod grouping;
pub mod ranking;
