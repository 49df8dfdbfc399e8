use crate::config::RtmConfig;
use crate::error::{LensError, Result};
use crate::integrations::response::Response;
use crate::models::{List, Priority, Task};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::CACHE_CONTROL;
use std::collections::BTreeMap;
use std::time::Duration;

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

pub type Params = BTreeMap<String, String>;

/// `md5(secret + k1v1 + k2v2 ...)` with keys in ascending order.
pub fn sign(shared_secret: &str, params: &Params) -> String {
    let mut request_string = String::from(shared_secret);
    for (key, value) in params {
        request_string.push_str(key);
        request_string.push_str(value);
    }
    format!("{:x}", md5::compute(request_string.as_bytes()))
}

/// Blocking client for the Remember The Milk REST API.
pub struct RtmClient {
    api_key: String,
    shared_secret: String,
    perms: String,
    token: Option<String>,
    rest_url: String,
    auth_url: String,
    http: Client,
}

impl RtmClient {
    pub fn new(config: &RtmConfig, token: Option<String>) -> Result<Self> {
        if config.api_key.trim().is_empty() || config.shared_secret.trim().is_empty() {
            return Err(LensError::Config(
                "rtm.api_key and rtm.shared_secret are required in config.toml".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            shared_secret: config.shared_secret.trim().to_string(),
            perms: config.perms.clone(),
            token,
            rest_url: config.rest_url.clone(),
            auth_url: config.auth_url.clone(),
            http,
        })
    }

    #[cfg(test)]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Builds `base?params&api_sig=...`, signing the unsigned parameters.
    pub fn signed_url(&self, base: &str, params: &Params) -> Result<String> {
        let api_sig = sign(&self.shared_secret, params);
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        pairs.push(("api_sig", api_sig.as_str()));
        let url = Url::parse_with_params(base, pairs)
            .map_err(|e| LensError::Config(format!("invalid service url {base:?}: {e}")))?;
        Ok(url.to_string())
    }

    /// Issues a signed GET for `method` and parses the reply.
    pub fn signed_request(&self, method: &str, mut params: Params) -> Result<Response> {
        params.insert("method".to_string(), method.to_string());
        let url = self.signed_url(&self.rest_url, &params)?;
        log::debug!("Calling {method}");

        let resp = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-cache, max-age=0")
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LensError::Transport(format!(
                "{method} failed with HTTP {status}"
            )));
        }
        let body = resp.text()?;
        Response::parse(method, &body)
    }

    /// Like `signed_request`, with the api key and auth token merged in.
    pub fn call(&self, method: &str, params: Params) -> Result<Response> {
        let mut all_params = self.base_params();
        if let Some(token) = &self.token {
            all_params.insert("auth_token".to_string(), token.clone());
        }
        all_params.extend(params);
        self.signed_request(method, all_params)
    }

    pub fn get_frob(&self) -> Result<String> {
        let rsp = self.signed_request("rtm.auth.getFrob", self.base_params())?;
        rsp.get("frob")?
            .value()
            .map(str::to_string)
            .ok_or_else(|| LensError::MalformedResponse("empty <frob>".to_string()))
    }

    /// Starts a desktop authentication; returns the consent url and the frob.
    pub fn authenticate_desktop(&self) -> Result<(String, String)> {
        let frob = self.get_frob()?;
        let mut params = self.base_params();
        params.insert("perms".to_string(), self.perms.clone());
        params.insert("frob".to_string(), frob.clone());
        let url = self.signed_url(&self.auth_url, &params)?;
        Ok((url, frob))
    }

    /// Exchanges a frob for a token. The token is kept on the client when present.
    pub fn get_token(&mut self, frob: &str) -> Result<Option<String>> {
        let mut params = self.base_params();
        params.insert("frob".to_string(), frob.to_string());
        let rsp = self.signed_request("rtm.auth.getToken", params)?;
        let token = rsp
            .rsp()
            .child("auth")
            .and_then(|auth| auth.child("token"))
            .and_then(|token| token.value())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        self.token = token.clone();
        Ok(token)
    }

    /// `false` when there is no token or the service rejects it.
    pub fn token_valid(&self) -> Result<bool> {
        let Some(token) = &self.token else {
            return Ok(false);
        };
        let mut params = self.base_params();
        params.insert("auth_token".to_string(), token.clone());
        match self.signed_request("rtm.auth.checkToken", params) {
            Ok(_) => Ok(true),
            Err(LensError::Api { code, message }) => {
                log::info!("Stored token rejected ({code}: {message})");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_lists(&self) -> Result<Vec<List>> {
        let rsp = self.call("rtm.lists.getList", Params::new())?;
        parse_lists(&rsp)
    }

    pub fn get_tasks(&self, filter: Option<&str>) -> Result<Vec<Task>> {
        let mut params = Params::new();
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            params.insert("filter".to_string(), filter.to_string());
        }
        let rsp = self.call("rtm.tasks.getList", params)?;
        parse_tasks(&rsp)
    }

    fn base_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("api_key".to_string(), self.api_key.clone());
        params
    }
}

pub fn parse_lists(rsp: &Response) -> Result<Vec<List>> {
    let lists: Vec<List> = rsp
        .get("lists")?
        .collection()?
        .iter()
        .map(|list| List {
            id: list.attr_or_empty("id"),
            name: list.attr_or_empty("name"),
        })
        .collect();
    log::debug!("{}: {} lists", rsp.method(), lists.len());
    Ok(lists)
}

/// Flattens `tasks/list/taskseries/task` into one `Task` per `<task>`.
pub fn parse_tasks(rsp: &Response) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    for list in rsp.get("tasks")?.collection()? {
        let list_id = list.attr_or_empty("id");
        for series in list.collection()? {
            let series_id = series.attr_or_empty("id");
            let name = series.attr_or_empty("name");
            for task in series.children_named("task") {
                tasks.push(Task {
                    list_id: list_id.clone(),
                    task_series_id: series_id.clone(),
                    task_id: task.attr_or_empty("id"),
                    name: name.clone(),
                    due: task.attr_or_empty("due"),
                    priority: Priority::from_code(task.attr("priority").unwrap_or("N")),
                    completed: task.attr_or_empty("completed"),
                });
            }
        }
    }
    log::debug!("{}: {} tasks", rsp.method(), tasks.len());
    Ok(tasks)
}
