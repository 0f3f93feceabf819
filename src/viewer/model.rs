use crate::gitlab::models::{Bridge, DownstreamPipeline, Job, JobStatus};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::HashMap;

/// Original API payload behind a [`ViewJob`].
#[derive(Debug, Clone)]
pub enum JobKind {
    Job(Job),
    Bridge(Bridge),
}

/// Jobs and bridges flattened into one shape for layout and navigation.
#[derive(Debug, Clone)]
pub struct ViewJob {
    pub id: u64,
    pub name: String,
    pub stage: String,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub allow_failure: bool,
    pub kind: JobKind,
}

impl From<Job> for ViewJob {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            stage: job.stage.clone(),
            status: job.status,
            started_at: job.started_at,
            finished_at: job.finished_at,
            allow_failure: job.allow_failure,
            kind: JobKind::Job(job),
        }
    }
}

impl From<Bridge> for ViewJob {
    fn from(bridge: Bridge) -> Self {
        Self {
            id: bridge.id,
            name: bridge.name.clone(),
            stage: bridge.stage.clone(),
            status: bridge.status,
            started_at: bridge.started_at,
            finished_at: bridge.finished_at,
            allow_failure: bridge.allow_failure,
            kind: JobKind::Bridge(bridge),
        }
    }
}

impl ViewJob {
    pub fn is_bridge(&self) -> bool {
        matches!(self.kind, JobKind::Bridge(_))
    }

    pub fn downstream(&self) -> Option<&DownstreamPipeline> {
        match &self.kind {
            JobKind::Bridge(bridge) => bridge.downstream_pipeline.as_ref(),
            JobKind::Job(_) => None,
        }
    }

    pub fn commit_sha(&self) -> Option<&str> {
        let pipeline = match &self.kind {
            JobKind::Job(job) => job.pipeline.as_ref(),
            JobKind::Bridge(bridge) => bridge.pipeline.as_ref(),
        };
        pipeline.map(|p| p.sha.as_str())
    }

    /// Run time so far: `finished - started`, or `now - started` while running.
    pub fn duration(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or(now);
        Some(end - started).filter(|d| *d >= chrono::Duration::zero())
    }

    pub fn symbol(&self) -> &'static str {
        self.status.symbol(self.allow_failure)
    }
}

/// Jobs first, then bridges, each in API order.
pub fn normalize(jobs: Vec<Job>, bridges: Vec<Bridge>) -> Vec<ViewJob> {
    jobs.into_iter()
        .map(ViewJob::from)
        .chain(bridges.into_iter().map(ViewJob::from))
        .collect()
}

/// Keeps one entry per (stage, name), replacing each with its latest retry.
///
/// Retries are assumed to be appended after the originals: everything from
/// the first repeated key onwards only contributes replacements.
pub fn deduplicate(jobs: Vec<ViewJob>) -> Vec<ViewJob> {
    let mut latest: HashMap<(&str, &str), usize> = HashMap::new();
    let mut boundary = None;
    for (idx, job) in jobs.iter().enumerate() {
        let key = (job.stage.as_str(), job.name.as_str());
        if boundary.is_none() && latest.contains_key(&key) {
            boundary = Some(idx);
        }
        latest.insert(key, idx);
    }

    let Some(boundary) = boundary else {
        return jobs;
    };

    let picks: Vec<usize> = jobs[..boundary]
        .iter()
        .map(|job| latest[&(job.stage.as_str(), job.name.as_str())])
        .collect();
    picks.into_iter().map(|idx| jobs[idx].clone()).collect()
}

/// Stable regrouping so every stage forms one contiguous run, stages in
/// order of first appearance.
pub fn group_by_stage(jobs: Vec<ViewJob>) -> Vec<ViewJob> {
    let order: HashMap<String, usize> = jobs
        .iter()
        .map(|j| j.stage.clone())
        .unique()
        .enumerate()
        .map(|(idx, stage)| (stage, idx))
        .collect();
    let mut jobs = jobs;
    jobs.sort_by_key(|j| order.get(&j.stage).copied().unwrap_or(usize::MAX));
    jobs
}

/// Aggregate status of the jobs of one stage.
pub fn stage_status<'a>(jobs: impl IntoIterator<Item = &'a ViewJob>) -> JobStatus {
    let mut has_running = false;
    let mut has_pending = false;
    let mut has_failed = false;
    let mut all_success = true;
    let mut all_skipped = true;
    let mut any = false;

    for job in jobs {
        any = true;
        match job.status {
            JobStatus::Failed if !job.allow_failure => has_failed = true,
            JobStatus::Running => has_running = true,
            JobStatus::Pending | JobStatus::WaitingForResource | JobStatus::Preparing => {
                has_pending = true
            }
            _ => {}
        }
        all_success &= job.status == JobStatus::Success
            || (job.status == JobStatus::Failed && job.allow_failure);
        all_skipped &= job.status == JobStatus::Skipped;
    }

    if !any {
        JobStatus::Created
    } else if has_failed {
        JobStatus::Failed
    } else if has_running {
        JobStatus::Running
    } else if has_pending {
        JobStatus::Pending
    } else if all_success {
        JobStatus::Success
    } else if all_skipped {
        JobStatus::Skipped
    } else {
        JobStatus::Created
    }
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
