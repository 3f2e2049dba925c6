//! Item-memory CSV/binary I/O and the predicted-labels side channel — spec §6.

pub mod binary;
pub mod csv;
pub mod predictions;

pub use csv::StoreFormat;
pub use predictions::PredictionRow;
