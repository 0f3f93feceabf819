//! In-memory `PipelineApi` used by the viewer tests.

use super::models::{Bridge, DownstreamPipeline, Job, JobPipeline, JobStatus, Pipeline};
use super::PipelineApi;
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const SHA: &str = "abc123";

pub fn job(id: u64, name: &str, stage: &str, status: JobStatus) -> Job {
    Job {
        id,
        name: name.to_string(),
        status,
        stage: stage.to_string(),
        started_at: None,
        finished_at: None,
        duration: None,
        allow_failure: false,
        pipeline: Some(JobPipeline {
            id: 1,
            project_id: Some(1),
            sha: SHA.to_string(),
            ref_name: Some("main".to_string()),
            status: None,
        }),
    }
}

pub fn bridge(id: u64, name: &str, stage: &str, downstream: Option<u64>) -> Bridge {
    Bridge {
        id,
        name: name.to_string(),
        status: JobStatus::Success,
        stage: stage.to_string(),
        started_at: None,
        finished_at: None,
        allow_failure: false,
        pipeline: None,
        downstream_pipeline: downstream.map(|id| DownstreamPipeline {
            id,
            project_id: Some(2),
            sha: Some(SHA.to_string()),
            ref_name: Some("main".to_string()),
            status: Some(JobStatus::Running),
        }),
    }
}

pub fn pipeline(id: u64) -> Pipeline {
    Pipeline {
        id,
        iid: None,
        project_id: Some(1),
        status: JobStatus::Running,
        sha: SHA.to_string(),
        ref_name: Some("main".to_string()),
        web_url: None,
        created_at: None,
        updated_at: None,
    }
}

fn failure(what: &str) -> Error {
    Error::Api {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        url: what.to_string(),
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub pipelines: Mutex<HashMap<u64, (Vec<Job>, Vec<Bridge>)>>,
    pub sha_pipelines: Vec<Pipeline>,
    pub fail_fetch: bool,
    pub fail_actions: bool,
    /// Successive trace snapshots; the last one repeats.
    pub traces: Mutex<VecDeque<String>>,
    /// Successive statuses reported by `job`; the last one repeats.
    pub statuses: Mutex<VecDeque<JobStatus>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_pipeline(id: u64, jobs: Vec<Job>, bridges: Vec<Bridge>) -> Self {
        let api = Self::default();
        api.set_pipeline(id, jobs, bridges);
        api
    }

    pub fn set_pipeline(&self, id: u64, jobs: Vec<Job>, bridges: Vec<Bridge>) {
        if let Ok(mut pipelines) = self.pipelines.lock() {
            pipelines.insert(id, (jobs, bridges));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn find_job(&self, job_id: u64, status: JobStatus) -> Job {
        let found = self.pipelines.lock().ok().and_then(|pipelines| {
            pipelines
                .values()
                .flat_map(|(jobs, _)| jobs.iter())
                .find(|j| j.id == job_id)
                .cloned()
        });
        let mut found = found.unwrap_or_else(|| job(job_id, "job", "stage", status));
        found.status = status;
        found
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().ok()?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl PipelineApi for FakeApi {
    fn pipeline_jobs(&self, project: &str, pipeline_id: u64) -> Result<(Vec<Job>, Vec<Bridge>)> {
        self.record(format!("jobs {} {}", project, pipeline_id));
        if self.fail_fetch {
            return Err(failure("jobs"));
        }
        let pipelines = self.pipelines.lock().map_err(|_| failure("lock"))?;
        Ok(pipelines.get(&pipeline_id).cloned().unwrap_or_default())
    }

    fn pipelines_for_sha(&self, project: &str, sha: &str) -> Result<Vec<Pipeline>> {
        self.record(format!("pipelines {} {}", project, sha));
        Ok(self.sha_pipelines.clone())
    }

    fn job(&self, project: &str, job_id: u64) -> Result<Job> {
        self.record(format!("job {} {}", project, job_id));
        let status = Self::next(&self.statuses).unwrap_or(JobStatus::Success);
        Ok(self.find_job(job_id, status))
    }

    fn job_trace(&self, project: &str, job_id: u64) -> Result<String> {
        self.record(format!("trace {} {}", project, job_id));
        Ok(Self::next(&self.traces).unwrap_or_default())
    }

    fn cancel_job(&self, project: &str, job_id: u64) -> Result<Job> {
        self.record(format!("cancel {} {}", project, job_id));
        if self.fail_actions {
            return Err(failure("cancel"));
        }
        Ok(self.find_job(job_id, JobStatus::Canceled))
    }

    fn play_or_retry_job(&self, project: &str, job_id: u64, status: JobStatus) -> Result<Job> {
        self.record(format!("play_or_retry {} {} {}", project, job_id, status));
        if self.fail_actions {
            return Err(failure("retry"));
        }
        let mut retried = self.find_job(job_id, JobStatus::Pending);
        retried.id += 1000;
        Ok(retried)
    }
}
