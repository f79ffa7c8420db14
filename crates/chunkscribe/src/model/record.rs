use serde::{Deserialize, Serialize};

use super::job::JobId;

/// Result document written by the transcription engine for one job.
///
/// Wire shape: `{"jobName": ..., "results": {"transcripts": [{"transcript": ...}]}}`.
/// Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    pub job_name: String,
    pub results: TranscriptResults,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptResults {
    #[serde(default)]
    pub transcripts: Vec<TranscriptAlternative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptAlternative {
    pub transcript: String,
}

impl TranscriptRecord {
    pub fn new(job_id: &JobId, transcript: &str) -> Self {
        Self {
            job_name: job_id.as_str().to_string(),
            results: TranscriptResults {
                transcripts: vec![TranscriptAlternative {
                    transcript: transcript.to_string(),
                }],
            },
        }
    }

    pub fn job_id(&self) -> JobId {
        JobId::from_raw(&self.job_name)
    }

    pub fn chunk_index(&self) -> Option<u32> {
        self.job_id().chunk_index()
    }

    /// Transcript text of the record; multiple alternatives are joined by a space.
    pub fn text(&self) -> String {
        self.results
            .transcripts
            .iter()
            .map(|t| t.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
