use serde::{Deserialize, Serialize};

/// One time-bounded slice of the source file. Offsets are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub index: u32,
    pub start_offset: f64,
    pub duration: f64,
}

impl Chunk {
    pub fn new(index: u32, start_offset: f64, duration: f64) -> Self {
        Self {
            index,
            start_offset,
            duration,
        }
    }

    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }
}
