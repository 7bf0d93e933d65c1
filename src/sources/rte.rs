//! RTE (French TSO): registered but not implemented. The corpus references
//! this source without a working reader; its format is not guessed.

use std::path::Path;

use super::{AdaptRequest, SourceAdapter};
use crate::error::ReadError;
use crate::frame::CanonicalFrame;

pub struct Rte;

impl SourceAdapter for Rte {
    fn source_name(&self) -> &'static str {
        "RTE"
    }

    fn validate(&self, _series: &str) -> Result<(), ReadError> {
        Err(ReadError::UnsupportedSource("RTE".to_string()))
    }

    fn adapt(&self, _path: &Path, _req: &AdaptRequest<'_>) -> Result<CanonicalFrame, ReadError> {
        Err(ReadError::UnsupportedSource("RTE".to_string()))
    }
}
