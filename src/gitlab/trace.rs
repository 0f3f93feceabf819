use super::models::Job;
use super::PipelineApi;
use crate::error::{Error, Result};
use crate::util::cancel::CancelToken;
use std::io::Write;
use std::time::Duration;

pub const TRACE_POLL_INTERVAL: Duration = Duration::from_secs(1);

fn newest_named(jobs: Vec<Job>, job_name: &str) -> Option<Job> {
    jobs.into_iter()
        .filter(|j| j.name == job_name)
        .max_by_key(|j| j.id)
}

/// Newest job named `job_name`, looked up in `pipeline_id` first and then
/// among the other pipelines of commit `sha`. Parent and child pipelines
/// share a commit, so the same name can exist in several of them.
pub fn find_job_for_sha(
    api: &dyn PipelineApi,
    project: &str,
    sha: &str,
    pipeline_id: Option<u64>,
    job_name: &str,
) -> Result<Job> {
    if let Some(id) = pipeline_id {
        let (jobs, _) = api.pipeline_jobs(project, id)?;
        if let Some(job) = newest_named(jobs, job_name) {
            return Ok(job);
        }
    }
    for pipeline in api.pipelines_for_sha(project, sha)? {
        if Some(pipeline.id) == pipeline_id {
            continue;
        }
        let (jobs, _) = api.pipeline_jobs(project, pipeline.id)?;
        if let Some(job) = newest_named(jobs, job_name) {
            return Ok(job);
        }
    }
    Err(Error::JobNotFound {
        name: job_name.to_string(),
        sha: sha.to_string(),
    })
}

/// Writes the trace of `job_name` to `writer` as it grows.
///
/// Returns once the job has finished and its final trace is written, or as
/// soon as `cancel` fires.
pub fn stream_job_trace(
    api: &dyn PipelineApi,
    cancel: &CancelToken,
    writer: &mut dyn Write,
    project: &str,
    sha: &str,
    pipeline_id: Option<u64>,
    job_name: &str,
) -> Result<()> {
    let job = find_job_for_sha(api, project, sha, pipeline_id, job_name)?;
    log::debug!("streaming trace of job #{} ({})", job.id, job_name);

    let mut written = 0;
    let mut last_pass = false;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let trace = api.job_trace(project, job.id)?;
        let bytes = trace.as_bytes();
        if bytes.len() > written {
            writer.write_all(&bytes[written..])?;
            writer.flush()?;
            written = bytes.len();
        }

        if last_pass {
            return Ok(());
        }

        if api.job(project, job.id)?.status.is_finished() {
            last_pass = true;
            continue;
        }

        if cancel.wait(TRACE_POLL_INTERVAL) {
            return Ok(());
        }
    }
}
