use crate::credentials::TokenStore;
use crate::error::Result;
use crate::integrations::rtm::RtmClient;
use crate::models::{ResultRow, ResultSink};
use crate::platform::Browser;

pub const AUTH_WAIT_URI: &str = "rtmLens://auth/wait";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    NotPending,
    /// Waiting for the user to approve `frob` in the browser.
    Pending { frob: String },
}

pub struct AuthFlow {
    state: AuthState,
    icon: String,
}

impl AuthFlow {
    pub fn new(icon: impl Into<String>) -> Self {
        Self {
            state: AuthState::NotPending,
            icon: icon.into(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, AuthState::Pending { .. })
    }

    /// Returns `true` while the user still has to authorize; the caller should
    /// show nothing but the placeholder in that case.
    pub fn check_and_require_authentication(
        &mut self,
        api: &RtmClient,
        sink: &mut dyn ResultSink,
        browser: &dyn Browser,
    ) -> Result<bool> {
        if !self.is_pending() && api.token_valid()? {
            return Ok(false);
        }

        sink.append(self.placeholder());
        if self.is_pending() {
            return Ok(true);
        }

        let (url, frob) = api.authenticate_desktop()?;
        log::info!("Authorization required, opening browser");
        if let Err(err) = browser.open(&url) {
            log::warn!("Could not open browser ({err}); visit {url}");
        }
        self.state = AuthState::Pending { frob };
        Ok(true)
    }

    /// Trades the pending frob for a token and saves it. `None` when the service
    /// handed back no token or nothing was pending. The flow is back to
    /// `NotPending` afterwards even when the exchange fails, so the next check
    /// starts over with a fresh frob.
    pub fn complete_authentication(
        &mut self,
        api: &mut RtmClient,
        tokens: &TokenStore,
    ) -> Result<Option<String>> {
        let AuthState::Pending { frob } =
            std::mem::replace(&mut self.state, AuthState::NotPending)
        else {
            log::warn!("No authorization in progress");
            return Ok(None);
        };

        let token = api.get_token(&frob)?;

        match &token {
            Some(token) => {
                tokens.save(token)?;
                log::info!("Authorization complete");
            }
            None => log::warn!("Service returned no token"),
        }
        Ok(token)
    }

    fn placeholder(&self) -> ResultRow {
        ResultRow {
            uri: AUTH_WAIT_URI.to_string(),
            icon: self.icon.clone(),
            category: "tasks".to_string(),
            mime_type: "text/plain".to_string(),
            subtitle: "Authorization required".to_string(),
            title: "Check your web browser. Click this icon when finished.".to_string(),
            comment: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LensError;
    use crate::integrations::rtm::tests::test_config;
    use crate::platform::testing::RecordingBrowser;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    fn temp_token_store() -> TokenStore {
        let mut dir = std::env::temp_dir();
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        dir.push(format!("tasklens-auth-{}-{}", std::process::id(), stamp));
        TokenStore::new(dir.join("token"))
    }

    #[test]
    fn valid_token_needs_no_auth() {
        let server = MockServer::start();
        let check = server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.checkToken");
            then.status(200).body(r#"<rsp stat="ok"><auth><token>tok</token></auth></rsp>"#);
        });

        let api = RtmClient::new(&test_config(&server), Some("tok".to_string())).expect("client");
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        let browser = RecordingBrowser::default();

        let pending = flow
            .check_and_require_authentication(&api, &mut rows, &browser)
            .expect("check");

        assert!(!pending);
        assert!(rows.is_empty());
        assert!(browser.opened.borrow().is_empty());
        check.assert();
    }

    #[test]
    fn repeated_checks_allocate_one_frob() {
        let server = MockServer::start();
        let frob = server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getFrob");
            then.status(200).body(r#"<rsp stat="ok"><frob>f00d</frob></rsp>"#);
        });

        let api = RtmClient::new(&test_config(&server), None).expect("client");
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        let browser = RecordingBrowser::default();

        assert!(
            flow.check_and_require_authentication(&api, &mut rows, &browser)
                .expect("first")
        );
        assert!(
            flow.check_and_require_authentication(&api, &mut rows, &browser)
                .expect("second")
        );

        assert_eq!(frob.hits(), 1);
        assert_eq!(browser.opened.borrow().len(), 1);
        assert!(browser.opened.borrow()[0].contains("frob=f00d"));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.uri == AUTH_WAIT_URI));
        assert_eq!(
            flow.state(),
            &AuthState::Pending {
                frob: "f00d".to_string()
            }
        );
    }

    #[test]
    fn completion_saves_token_and_resets() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getFrob");
            then.status(200).body(r#"<rsp stat="ok"><frob>f00d</frob></rsp>"#);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getToken")
                .query_param("frob", "f00d");
            then.status(200)
                .body(r#"<rsp stat="ok"><auth><token>fresh</token><perms>write</perms></auth></rsp>"#);
        });

        let mut api = RtmClient::new(&test_config(&server), None).expect("client");
        let tokens = temp_token_store();
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        let browser = RecordingBrowser::default();
        flow.check_and_require_authentication(&api, &mut rows, &browser)
            .expect("check");

        let token = flow
            .complete_authentication(&mut api, &tokens)
            .expect("complete");

        assert_eq!(token.as_deref(), Some("fresh"));
        assert_eq!(flow.state(), &AuthState::NotPending);
        assert_eq!(tokens.load().expect("load").as_deref(), Some("fresh"));
        assert_eq!(api.token(), Some("fresh"));
    }

    #[test]
    fn missing_token_resets_without_saving() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getFrob");
            then.status(200).body(r#"<rsp stat="ok"><frob>f00d</frob></rsp>"#);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getToken");
            then.status(200).body(r#"<rsp stat="ok"><auth/></rsp>"#);
        });

        let mut api = RtmClient::new(&test_config(&server), None).expect("client");
        let tokens = temp_token_store();
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        flow.check_and_require_authentication(&api, &mut rows, &RecordingBrowser::default())
            .expect("check");

        let token = flow
            .complete_authentication(&mut api, &tokens)
            .expect("complete");

        assert_eq!(token, None);
        assert_eq!(flow.state(), &AuthState::NotPending);
        assert!(!tokens.path().exists());
    }

    #[test]
    fn exchange_errors_propagate_and_reset() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getFrob");
            then.status(200).body(r#"<rsp stat="ok"><frob>f00d</frob></rsp>"#);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getToken");
            then.status(200)
                .body(r#"<rsp stat="fail"><err code="101" msg="Invalid frob - did you authenticate?"/></rsp>"#);
        });

        let mut api = RtmClient::new(&test_config(&server), None).expect("client");
        let tokens = temp_token_store();
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        flow.check_and_require_authentication(&api, &mut rows, &RecordingBrowser::default())
            .expect("check");

        let result = flow.complete_authentication(&mut api, &tokens);

        assert!(matches!(result, Err(LensError::Api { ref code, .. }) if code == "101"));
        assert_eq!(flow.state(), &AuthState::NotPending);
        assert!(!tokens.path().exists());
    }

    #[test]
    fn check_after_failed_exchange_starts_over() {
        let server = MockServer::start();
        let frob = server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getFrob");
            then.status(200).body(r#"<rsp stat="ok"><frob>f00d</frob></rsp>"#);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/services/rest/")
                .query_param("method", "rtm.auth.getToken");
            then.status(200)
                .body(r#"<rsp stat="fail"><err code="101" msg="Invalid frob - did you authenticate?"/></rsp>"#);
        });

        let mut api = RtmClient::new(&test_config(&server), None).expect("client");
        let tokens = temp_token_store();
        let mut flow = AuthFlow::new("icon.png");
        let mut rows: Vec<ResultRow> = Vec::new();
        let browser = RecordingBrowser::default();
        flow.check_and_require_authentication(&api, &mut rows, &browser)
            .expect("check");
        assert!(flow.complete_authentication(&mut api, &tokens).is_err());

        assert!(
            flow.check_and_require_authentication(&api, &mut rows, &browser)
                .expect("second check")
        );
        assert_eq!(frob.hits(), 2);
        assert_eq!(browser.opened.borrow().len(), 2);
        assert!(flow.is_pending());
    }

    #[test]
    fn completing_without_pending_is_a_no_op() {
        let server = MockServer::start();
        let mut api = RtmClient::new(&test_config(&server), None).expect("client");
        let mut flow = AuthFlow::new("icon.png");
        let token = flow
            .complete_authentication(&mut api, &temp_token_store())
            .expect("complete");
        assert_eq!(token, None);
    }
}
