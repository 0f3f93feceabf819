use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Canceling,
    Skipped,
    Manual,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Status glyph; `allow_failure` downgrades a failure to a warning mark.
    pub fn symbol(&self, allow_failure: bool) -> &'static str {
        match self {
            Self::Success => "✔",
            Self::Failed if allow_failure => "!",
            Self::Failed => "✘",
            Self::Running => "●",
            Self::Pending | Self::WaitingForResource | Self::Preparing => "●",
            Self::Manual => "■",
            Self::Canceled | Self::Canceling => "Ø",
            Self::Skipped => "»",
            Self::Created | Self::Scheduled => "○",
            Self::Unknown => "?",
        }
    }

    /// Only pending and running jobs can be canceled from the viewer.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Canceled | Self::Skipped | Self::Manual
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::WaitingForResource => "waiting",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Canceling => "canceling",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub iid: Option<u64>,
    pub project_id: Option<u64>,
    pub status: JobStatus,
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub web_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Pipeline summary embedded in job payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct JobPipeline {
    pub id: u64,
    pub project_id: Option<u64>,
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub status: JobStatus,
    pub stage: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub allow_failure: bool,
    pub pipeline: Option<JobPipeline>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamPipeline {
    pub id: u64,
    pub project_id: Option<u64>,
    pub sha: Option<String>,
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub status: Option<JobStatus>,
}

/// A trigger job. Its `downstream_pipeline` is `None` until GitLab has
/// created the child pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Bridge {
    pub id: u64,
    pub name: String,
    pub status: JobStatus,
    pub stage: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allow_failure: bool,
    pub pipeline: Option<JobPipeline>,
    pub downstream_pipeline: Option<DownstreamPipeline>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_payload_parses_with_pipeline_and_timestamps() {
        let json = r#"{
            "id": 7,
            "name": "rspec",
            "status": "running",
            "stage": "test",
            "web_url": "https://gitlab.example.com/g/p/-/jobs/7",
            "started_at": "2024-05-01T10:00:00.000Z",
            "finished_at": null,
            "duration": 12.5,
            "allow_failure": false,
            "pipeline": {"id": 3, "project_id": 11, "sha": "abc123", "ref": "main", "status": "running"}
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_none());
        assert_eq!(job.pipeline.unwrap().sha, "abc123");
    }

    #[test]
    fn bridge_without_downstream_pipeline_parses() {
        let json = r#"{
            "id": 9,
            "name": "trigger",
            "status": "created",
            "stage": "deploy",
            "downstream_pipeline": null
        }"#;
        let bridge: Bridge = serde_json::from_str(json).unwrap();
        assert!(bridge.downstream_pipeline.is_none());
        assert!(!bridge.allow_failure);
    }

    #[test]
    fn unknown_status_does_not_fail_parsing() {
        let status: JobStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
    }

    #[test]
    fn allowed_failure_uses_warning_symbol() {
        assert_eq!(JobStatus::Failed.symbol(false), "✘");
        assert_eq!(JobStatus::Failed.symbol(true), "!");
        assert_eq!(JobStatus::Canceled.symbol(false), "Ø");
    }
}
