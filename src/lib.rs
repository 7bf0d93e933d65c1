//! Harmonizes raw electricity time-series files from European grid
//! operators and data portals into a single UTC-indexed, gap-exposing
//! frame with canonical column keys.
//!
//! The pipeline: a per-source adapter parses one raw file and normalizes
//! its local timestamps to UTC under the source's DST convention; files of
//! one logical series merge left-biased; the result is reindexed onto a
//! regular grid so outages become visible missing rows, then trimmed to
//! the caller's civil-date window.

pub mod dst;
pub mod error;
pub mod frame;
pub mod keys;
pub mod reader;
pub mod sources;

pub use dst::{DstPolicy, DstSide};
pub use error::{FileFailure, ReadError, ReadWarning, TimestampAmbiguityError};
pub use frame::{trim_range, CanonicalFrame, FrameColumn, Resolution};
pub use keys::{ColumnDescription, ColumnKey, ColumnKeySchema};
pub use reader::{read, read_with_progress, Progress, ReadReport, ReadRequest};
pub use sources::{adapter_for, AdaptRequest, SourceAdapter};
