//! Jenkins REST API client
//!
//! Only what is needed to find and abort superseded builds of the same
//! pull request: running builds across all executors, build parameters,
//! and the stop endpoint. Jenkins may require a CSRF crumb on POST.

use crate::error::{RemoteError, Result, check_status};
use serde::Deserialize;

/// Jenkins client with basic auth
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    token: String,
}

/// A build currently occupying an executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningBuild {
    /// Full job name, folders joined with `/`
    pub name: String,
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ComputerSet {
    #[serde(default)]
    computer: Vec<Computer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Computer {
    #[serde(default)]
    executors: Vec<Executor>,
    #[serde(default)]
    one_off_executors: Vec<Executor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Executor {
    current_executable: Option<Executable>,
}

#[derive(Debug, Deserialize)]
struct Executable {
    number: Option<u64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Crumb {
    crumb_request_field: String,
    crumb: String,
}

/// Build details (only the parameters are used)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Action {
    #[serde(rename = "_class")]
    pub class: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Parameter {
    /// String form of the value (numbers are rendered without quotes)
    pub fn value_str(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl BuildInfo {
    /// First parameter of each ParametersAction
    pub fn first_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.actions
            .iter()
            .filter(|action| {
                action
                    .class
                    .as_deref()
                    .is_some_and(|c| c.ends_with("ParametersAction"))
            })
            .filter_map(|action| action.parameters.first())
    }

    /// Whether the build was started for the given parameter value
    pub fn has_first_parameter(&self, name: &str, value: &str) -> bool {
        self.first_parameters()
            .any(|p| p.name == name && p.value_str().as_deref() == Some(value))
    }
}

impl JenkinsClient {
    pub fn new(base_url: impl Into<String>, user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
            token: token.into(),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.user, Some(&self.token))
    }

    /// Builds running on any executor of any node
    pub async fn running_builds(&self) -> Result<Vec<RunningBuild>> {
        let url = format!(
            "{}/computer/api/json?depth=2&tree=computer[executors[currentExecutable[number,url]],oneOffExecutors[currentExecutable[number,url]]]",
            self.base_url
        );
        let response = self.get(&url).send().await?;
        let computers: ComputerSet = check_status(response)?.json().await?;

        let builds = computers
            .computer
            .into_iter()
            .flat_map(|c| c.executors.into_iter().chain(c.one_off_executors))
            .filter_map(|executor| executor.current_executable)
            .filter_map(|executable| {
                let number = executable.number?;
                let url = executable.url?;
                let name = job_name_from_url(&url)?;
                Some(RunningBuild { name, number, url })
            })
            .collect::<Vec<_>>();

        tracing::debug!("Running builds: {:?}", builds);
        Ok(builds)
    }

    pub async fn build_info(&self, name: &str, number: u64) -> Result<BuildInfo> {
        let url = format!("{}{}/{}/api/json", self.base_url, job_path(name), number);
        let response = self.get(&url).send().await?;
        Ok(check_status(response)?.json().await?)
    }

    /// Abort a running build
    pub async fn stop_build(&self, name: &str, number: u64) -> Result<()> {
        let url = format!("{}{}/{}/stop", self.base_url, job_path(name), number);

        let mut request = self
            .client
            .post(&url)
            .basic_auth(&self.user, Some(&self.token));
        if let Some(crumb) = self.crumb().await {
            request = request.header(crumb.crumb_request_field, crumb.crumb);
        }

        let response = request.send().await?;
        // stop は結果ページへリダイレクトするので 3xx も成功扱い
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            tracing::info!("Stopped {} #{}", name, number);
            Ok(())
        } else {
            Err(RemoteError::Status {
                url,
                status: status.as_u16(),
            })
        }
    }

    /// CSRF crumb, if the server issues one
    async fn crumb(&self) -> Option<Crumb> {
        let url = format!("{}/crumbIssuer/api/json", self.base_url);
        let result = async {
            let response = self.get(&url).send().await?;
            let crumb: Crumb = check_status(response)?.json().await?;
            Ok::<_, RemoteError>(crumb)
        }
        .await;

        match result {
            Ok(crumb) => Some(crumb),
            Err(e) => {
                tracing::debug!("No crumb issued: {}", e);
                None
            }
        }
    }

    /// Stop every running build, other than `job_name` #`build_number`,
    /// whose first parameter `param_name` equals `param_value`.
    /// Returns the stopped builds.
    pub async fn stop_previous_builds(
        &self,
        job_name: &str,
        build_number: u64,
        param_name: &str,
        param_value: &str,
    ) -> Result<Vec<RunningBuild>> {
        let mut stopped = Vec::new();

        for build in self.running_builds().await? {
            if build.name == job_name && build.number == build_number {
                continue;
            }

            let info = self.build_info(&build.name, build.number).await?;
            if !info.has_first_parameter(param_name, param_value) {
                continue;
            }

            tracing::info!(
                "Stopping {} #{} ({}={})",
                build.name,
                build.number,
                param_name,
                param_value
            );
            self.stop_build(&build.name, build.number).await?;
            stopped.push(build);
        }

        Ok(stopped)
    }
}

/// `/job/a/job/b` for job `a/b`
fn job_path(name: &str) -> String {
    name.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| format!("/job/{}", segment))
        .collect()
}

/// Job name from a build URL such as `http://host/jenkins/job/a/job/b/17/`
fn job_name_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.split('/').collect();
    let names: Vec<&str> = segments
        .windows(2)
        .filter(|pair| pair[0] == "job")
        .map(|pair| pair[1])
        .collect();

    if names.is_empty() {
        None
    } else {
        Some(names.join("/"))
    }
}
