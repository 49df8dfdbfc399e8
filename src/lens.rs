use crate::auth::AuthFlow;
use crate::config::Config;
use crate::credentials::TokenStore;
use crate::due_date::DueDateFormatter;
use crate::error::{LensError, Result};
use crate::integrations::rtm::RtmClient;
use crate::models::{ResultRow, ResultSink};
use crate::platform::{Browser, Clock};
use crate::presentation::{OrderKey, TaskDescriptor, build_preview_text, order_by};
use crate::storage::{CacheStore, TaskColumn};

pub const RESULT_CATEGORY: &str = "tasks";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayFields {
    pub category: bool,
    pub due: bool,
    pub priority: bool,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            category: true,
            due: true,
            priority: true,
        }
    }
}

impl DisplayFields {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let has = |field: &str| names.iter().any(|n| n.as_ref().trim() == field);
        Self {
            category: has("category"),
            due: has("due"),
            priority: has("priority"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    /// List name to narrow to; `None` or an unknown name means every list.
    pub category: Option<String>,
    pub order: String,
    pub include_completed: bool,
    pub fields: DisplayFields,
}

impl SearchRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            text: String::new(),
            category: None,
            order: config.search.order.clone(),
            include_completed: config.search.show_completed,
            fields: DisplayFields::from_names(&config.search.fields),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskIds {
    pub list_id: String,
    pub task_series_id: String,
    pub task_id: String,
}

/// `rtmLens://select/lid=..&tsid=..&tid=..`
pub fn task_uri(task: &TaskDescriptor) -> String {
    format!(
        "rtmLens://select/lid={}&tsid={}&tid={}",
        task.list_id, task.task_series_id, task.task_id
    )
}

pub fn parse_task_ids(uri: &str) -> Result<TaskIds> {
    let invalid = || LensError::InvalidUri(uri.to_string());
    let last = uri.rsplit('/').next().ok_or_else(invalid)?;

    let (mut list_id, mut task_series_id, mut task_id) = (None, None, None);
    for pair in last.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "lid" => list_id = Some(value.to_string()),
            "tsid" => task_series_id = Some(value.to_string()),
            "tid" => task_id = Some(value.to_string()),
            _ => {}
        }
    }

    match (list_id, task_series_id, task_id) {
        (Some(list_id), Some(task_series_id), Some(task_id)) => Ok(TaskIds {
            list_id,
            task_series_id,
            task_id,
        }),
        _ => Err(invalid()),
    }
}

/// Lets SQLite pre-sort; `order_by` still applies the full rules afterwards.
fn sql_order(key: &str) -> Option<TaskColumn> {
    match OrderKey::parse(key)? {
        OrderKey::Priority => Some(TaskColumn::Priority),
        OrderKey::Due => Some(TaskColumn::Due),
        OrderKey::Name => Some(TaskColumn::Name),
    }
}

fn uri_action(uri: &str) -> Option<&str> {
    let mut segments = uri.rsplit('/');
    segments.next()?;
    segments.next()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub title: String,
    pub subtitle: String,
    pub icon: String,
    pub description: String,
}

/// One search session: token, cache and auth state for a single user.
pub struct TaskLens<C: Clock, B: Browser> {
    api: RtmClient,
    auth: AuthFlow,
    store: CacheStore,
    tokens: TokenStore,
    formatter: DueDateFormatter,
    clock: C,
    browser: B,
    last_refresh: Option<i64>,
    staleness_seconds: i64,
    min_search_length: usize,
    icon_base: String,
    home_url: String,
}

impl<C: Clock, B: Browser> TaskLens<C, B> {
    pub fn new(
        config: &Config,
        tokens: TokenStore,
        formatter: DueDateFormatter,
        clock: C,
        browser: B,
    ) -> Result<Self> {
        let token = tokens.load()?;
        if token.is_none() {
            log::info!("No stored token at {:?}", tokens.path());
        }
        let api = RtmClient::new(&config.rtm, token)?;
        let store = if config.cache.path.as_os_str().is_empty() {
            CacheStore::open_in_memory()?
        } else {
            CacheStore::open(&config.cache.path)?
        };
        let icon_base = config.search.icon_base.clone();

        Ok(Self {
            api,
            auth: AuthFlow::new(format!("{icon_base}.png")),
            store,
            tokens,
            formatter,
            clock,
            browser,
            last_refresh: None,
            staleness_seconds: config.cache.staleness_seconds,
            min_search_length: config.search.min_search_length,
            icon_base,
            home_url: config.rtm.home_url.clone(),
        })
    }

    #[cfg(test)]
    pub fn browser(&self) -> &B {
        &self.browser
    }

    #[cfg(test)]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[cfg(test)]
    pub fn is_auth_pending(&self) -> bool {
        self.auth.is_pending()
    }

    /// Re-fetches lists and tasks when the snapshot is older than the
    /// staleness threshold. Returns whether a fetch happened.
    pub fn refresh(&mut self) -> Result<bool> {
        let now = self.clock.now();
        if let Some(last) = self.last_refresh
            && now - last <= self.staleness_seconds
        {
            return Ok(false);
        }

        let tasks = self.api.get_tasks(None)?;
        let lists = self.api.get_lists()?;
        self.store.replace_tasks(&tasks)?;
        self.store.replace_lists(&lists)?;
        self.last_refresh = Some(now);
        log::info!("Refreshed cache: {} lists, {} tasks", lists.len(), tasks.len());
        Ok(true)
    }

    pub fn search(&mut self, request: &SearchRequest, sink: &mut dyn ResultSink) -> Result<()> {
        if self
            .auth
            .check_and_require_authentication(&self.api, sink, &self.browser)?
        {
            return Ok(());
        }

        self.refresh()?;

        let category = match request.category.as_deref() {
            Some(name) => match self.store.list_id(name) {
                Ok(_) => Some(name),
                Err(LensError::UnknownList(_)) => {
                    log::warn!("Unknown category {name:?}, showing all categories");
                    None
                }
                Err(err) => return Err(err),
            },
            None => None,
        };

        let records = self
            .store
            .query(category, sql_order(&request.order), request.include_completed)?;
        let mut tasks: Vec<TaskDescriptor> = records
            .iter()
            .map(|record| TaskDescriptor::from_record(record, &self.formatter))
            .collect();
        order_by(&mut tasks, &request.order);

        let needle = request.text.trim().to_lowercase();
        let filter_by_text = needle.chars().count() >= self.min_search_length;
        for task in &tasks {
            if filter_by_text && !task.name.to_lowercase().contains(&needle) {
                continue;
            }
            sink.append(self.result_row(task, &request.fields));
        }
        Ok(())
    }

    /// Activates a result uri. `auth` finishes authorization and re-runs the
    /// search with empty text; `select` opens the service in the browser.
    pub fn handle_uri(
        &mut self,
        uri: &str,
        request: &SearchRequest,
        sink: &mut dyn ResultSink,
    ) -> Result<()> {
        match uri_action(uri) {
            Some("auth") => {
                self.auth.complete_authentication(&mut self.api, &self.tokens)?;
                sink.clear();
                let refreshed = SearchRequest {
                    text: String::new(),
                    ..request.clone()
                };
                self.search(&refreshed, sink)
            }
            Some("select") => self.browser.open(&self.home_url),
            _ => Err(LensError::InvalidUri(uri.to_string())),
        }
    }

    pub fn preview(&self, uri: &str) -> Result<Preview> {
        let ids = parse_task_ids(uri)?;
        let record = self
            .store
            .find_by_id(&ids.task_id, &ids.list_id, &ids.task_series_id)?;
        let task = TaskDescriptor::from_record(&record, &self.formatter);
        let row = self.result_row(&task, &DisplayFields::default());

        Ok(Preview {
            title: row.subtitle,
            subtitle: row.title,
            icon: row.icon,
            description: build_preview_text(&record, &self.formatter),
        })
    }

    /// List names for the category chooser; empty when the cache is cold.
    pub fn category_names(&self) -> Vec<String> {
        self.store.list_names().unwrap_or_else(|err| {
            log::warn!("Could not read categories: {err}");
            Vec::new()
        })
    }

    fn result_row(&self, task: &TaskDescriptor, fields: &DisplayFields) -> ResultRow {
        let mut subtitle = if fields.category {
            task.category.clone()
        } else {
            String::new()
        };
        if fields.due && !task.pretty_due.is_empty() {
            subtitle.push_str(&format!(" [{}]", task.pretty_due));
        }
        let priority = if fields.priority {
            task.priority.as_str()
        } else {
            ""
        };

        ResultRow {
            uri: task_uri(task),
            icon: format!("{}{}.png", self.icon_base, priority),
            category: RESULT_CATEGORY.to_string(),
            mime_type: "text/plain".to_string(),
            subtitle,
            title: task.name.clone(),
            comment: String::new(),
        }
    }
}
