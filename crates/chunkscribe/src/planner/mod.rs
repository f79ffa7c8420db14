//! Chunk planning: probe the source duration and cut it into fixed slices.

pub mod probe;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PlanningError;
use crate::model::Chunk;

pub use probe::{parse_sexagesimal, FfprobeProbe, MediaProbe};

// Float noise below this is not worth a chunk of its own.
const MIN_TAIL_SECS: f64 = 1e-6;

/// Splits `total` seconds into consecutive slices of `slice` seconds.
///
/// Produces `ceil(total / slice)` chunks with dense indices from 0; the last
/// one is shorter when `total` is not a multiple of `slice`.
pub fn split_into_chunks(total: f64, slice: f64) -> Result<Vec<Chunk>, PlanningError> {
    if !total.is_finite() || total <= 0.0 {
        return Err(PlanningError::InvalidDuration(total.to_string()));
    }
    if !slice.is_finite() || slice <= 0.0 {
        return Err(PlanningError::InvalidDuration(format!(
            "slice length {}",
            slice
        )));
    }

    let mut chunks = Vec::new();
    let mut index: u32 = 0;
    loop {
        let start = f64::from(index) * slice;
        let remaining = total - start;
        if remaining <= MIN_TAIL_SECS && index > 0 {
            break;
        }
        chunks.push(Chunk::new(index, start, remaining.min(slice)));
        index += 1;
    }

    Ok(chunks)
}

/// Pure function of (file, slice length): probes the file and splits it.
#[derive(Clone)]
pub struct ChunkPlanner {
    probe: Arc<dyn MediaProbe>,
    slice_secs: f64,
}

impl ChunkPlanner {
    pub fn new(probe: Arc<dyn MediaProbe>, slice_secs: f64) -> Self {
        Self { probe, slice_secs }
    }

    pub fn slice_secs(&self) -> f64 {
        self.slice_secs
    }

    pub fn plan(&self, source: &Path) -> Result<Vec<Chunk>, PlanningError> {
        let total = self.probe.duration(source)?;
        debug!("Probed {}: {:.3}s", source.display(), total);

        let chunks = split_into_chunks(total, self.slice_secs).map_err(|e| {
            PlanningError::PlanningFailed {
                path: source.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        info!(
            "Planned {} chunks of {}s for {}",
            chunks.len(),
            self.slice_secs,
            source.display()
        );
        Ok(chunks)
    }
}
