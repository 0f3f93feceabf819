#[cfg(test)]
pub mod fake;
pub mod models;
pub mod trace;

use crate::error::{Error, Result};
use models::{Bridge, Job, JobStatus, Pipeline};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use url::Url;

const PER_PAGE: usize = 100;

/// The slice of the GitLab API the pipeline viewer depends on.
pub trait PipelineApi: Send + Sync {
    /// Jobs and bridges of one pipeline, each list sorted by ascending ID.
    fn pipeline_jobs(&self, project: &str, pipeline_id: u64) -> Result<(Vec<Job>, Vec<Bridge>)>;

    fn pipelines_for_sha(&self, project: &str, sha: &str) -> Result<Vec<Pipeline>>;

    fn job(&self, project: &str, job_id: u64) -> Result<Job>;

    fn job_trace(&self, project: &str, job_id: u64) -> Result<String>;

    fn cancel_job(&self, project: &str, job_id: u64) -> Result<Job>;

    /// Plays a manual job, retries anything else.
    fn play_or_retry_job(&self, project: &str, job_id: u64, status: JobStatus) -> Result<Job>;
}

pub struct GitLabClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "PRIVATE-TOKEN",
            HeaderValue::from_str(&self.token).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/api/v4/projects/{}/{}",
            self.base_url,
            urlencoded(project),
            path
        )
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<String> {
        let response = request.headers(self.headers()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status,
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &'static str) -> Result<T> {
        log::debug!("GET {}", url);
        let body = self.send(self.client.get(url), url)?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { what, source })
    }

    fn post_json<T: DeserializeOwned>(&self, url: &str, what: &'static str) -> Result<T> {
        log::debug!("POST {}", url);
        let body = self.send(self.client.post(url), url)?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { what, source })
    }

    fn get_paged<T: DeserializeOwned>(&self, url: &str, what: &'static str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let paged = format!("{}?per_page={}&page={}", url, PER_PAGE, page);
            let batch: Vec<T> = self.get_json(&paged, what)?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    fn get_pipelines(&self, project: &str, param: (&str, &str)) -> Result<Vec<Pipeline>> {
        let base = self.project_url(project, "pipelines");
        let url = Url::parse_with_params(&base, [param, ("order_by", "id"), ("sort", "desc")])
            .map_err(|e| Error::Config(format!("Invalid GitLab URL {}: {}", base, e)))?;
        self.get_json(url.as_str(), "pipelines")
    }

    /// Latest pipeline for a branch or tag.
    pub fn latest_pipeline(&self, project: &str, ref_name: &str) -> Result<Pipeline> {
        self.get_pipelines(project, ("ref", ref_name))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoPipeline(format!("{} in {}", ref_name, project)))
    }
}

impl PipelineApi for GitLabClient {
    fn pipeline_jobs(&self, project: &str, pipeline_id: u64) -> Result<(Vec<Job>, Vec<Bridge>)> {
        let base = self.project_url(project, &format!("pipelines/{}", pipeline_id));
        let mut jobs: Vec<Job> = self.get_paged(&format!("{}/jobs", base), "jobs")?;
        let mut bridges: Vec<Bridge> = self.get_paged(&format!("{}/bridges", base), "bridges")?;
        jobs.sort_by_key(|j| j.id);
        bridges.sort_by_key(|b| b.id);
        Ok((jobs, bridges))
    }

    fn pipelines_for_sha(&self, project: &str, sha: &str) -> Result<Vec<Pipeline>> {
        self.get_pipelines(project, ("sha", sha))
    }

    fn job(&self, project: &str, job_id: u64) -> Result<Job> {
        let url = self.project_url(project, &format!("jobs/{}", job_id));
        self.get_json(&url, "job")
    }

    fn job_trace(&self, project: &str, job_id: u64) -> Result<String> {
        let url = self.project_url(project, &format!("jobs/{}/trace", job_id));
        log::debug!("GET {}", url);
        self.send(self.client.get(&url), &url)
    }

    fn cancel_job(&self, project: &str, job_id: u64) -> Result<Job> {
        let url = self.project_url(project, &format!("jobs/{}/cancel", job_id));
        self.post_json(&url, "job")
    }

    fn play_or_retry_job(&self, project: &str, job_id: u64, status: JobStatus) -> Result<Job> {
        let action = if status == JobStatus::Manual {
            "play"
        } else {
            "retry"
        };
        let url = self.project_url(project, &format!("jobs/{}/{}", job_id, action));
        self.post_json(&url, "job")
    }
}

fn urlencoded(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
