use reqwest::{header, Client, Response, Url};
use scraper::Html;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::config::{Credentials, PortalConfig};
use crate::discovery::selector;
use crate::error::{Error, Result};

const LOGIN_PATH: &str = "login";
const CSRF_FIELD: &str = "_csrf_token";
const USERNAME_FIELD: &str = "_username";
const PASSWORD_FIELD: &str = "_password";

/// URL namespace the portal serves pages under. Anonymous visitors see
/// `public`, logged-in teams see `team`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Public,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Scoreboard,
    Text(&'a str),
    Samples(&'a str),
}

impl Namespace {
    /// Path of `endpoint` relative to the portal base URL.
    pub fn path(&self, endpoint: Endpoint) -> String {
        match (self, endpoint) {
            (Namespace::Public, Endpoint::Scoreboard) => "public".to_string(),
            (Namespace::Team, Endpoint::Scoreboard) => "team/scoreboard".to_string(),
            (ns, Endpoint::Text(id)) => format!("{}/problems/{}/text", ns, id),
            (ns, Endpoint::Samples(id)) => format!("{}/{}/samples.zip", ns, id),
        }
    }
}

/// HTTP session against one portal. The namespace is fixed once `connect`
/// returns; every request derives its path from it.
#[derive(Debug)]
pub struct Session {
    client: Client,
    base_url: Url,
    namespace: Namespace,
}

impl Session {
    pub async fn connect(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        let mut session = Self {
            client,
            base_url: config.base_url().clone(),
            namespace: Namespace::Public,
        };

        if let Some(credentials) = config.credentials() {
            session.login(credentials).await?;
        }

        Ok(session)
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn is_authenticated(&self) -> bool {
        self.namespace == Namespace::Team
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        self.join(&self.namespace.path(endpoint))
    }

    pub async fn fetch_scoreboard(&self) -> Result<Response> {
        self.get(Endpoint::Scoreboard).await
    }

    pub async fn fetch_problem_text(&self, problem_id: &str) -> Result<Response> {
        self.get(Endpoint::Text(problem_id)).await
    }

    pub async fn fetch_sample_archive(&self, problem_id: &str) -> Result<Response> {
        self.get(Endpoint::Samples(problem_id)).await
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let login_url = self.join(LOGIN_PATH)?;

        let page = self.client.get(login_url.clone()).send().await?;
        if !page.status().is_success() {
            return Err(Error::Auth(format!(
                "login page returned status {}",
                page.status()
            )));
        }
        let token = parse_csrf_token(&page.text().await?)?;

        let res = self
            .client
            .post(login_url.clone())
            .header(header::REFERER, login_url.as_str())
            .form(&[
                (USERNAME_FIELD, credentials.username.as_str()),
                (PASSWORD_FIELD, credentials.password.as_str()),
                (CSRF_FIELD, token.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("login returned status {}", status)));
        }
        // a rejected login lands on the login form again
        if has_login_form(&res.text().await?) {
            return Err(Error::Auth(format!(
                "credentials for {} were rejected",
                credentials.username
            )));
        }

        self.namespace = Namespace::Team;
        info!(username = %credentials.username, "logged in");
        Ok(())
    }

    async fn get(&self, endpoint: Endpoint<'_>) -> Result<Response> {
        let url = self.endpoint_url(endpoint)?;
        debug!(%url, "GET");

        let res = self.client.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                status,
            });
        }
        Ok(res)
    }

    fn join(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, path)).map_err(|e| Error::Config(e.to_string()))
    }
}

fn parse_csrf_token(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let input = selector(&format!("input[name=\"{}\"]", CSRF_FIELD)).map_err(Error::Auth)?;

    document
        .select(&input)
        .next()
        .and_then(|node| node.value().attr("value"))
        .map(|value| value.to_string())
        .ok_or_else(|| Error::Auth("login form has no anti-forgery token".to_string()))
}

fn has_login_form(html: &str) -> bool {
    let document = Html::parse_document(html);
    match selector(&format!("input[name=\"{}\"]", PASSWORD_FIELD)) {
        Ok(input) => document.select(&input).next().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(base: &str, namespace: Namespace) -> Session {
        Session {
            client: Client::new(),
            base_url: Url::parse(base).unwrap(),
            namespace,
        }
    }

    #[test]
    fn namespace_should_select_paths() {
        assert_eq!(Namespace::Public.path(Endpoint::Scoreboard), "public");
        assert_eq!(Namespace::Team.path(Endpoint::Scoreboard), "team/scoreboard");
        assert_eq!(
            Namespace::Public.path(Endpoint::Text("101")),
            "public/problems/101/text"
        );
        assert_eq!(
            Namespace::Team.path(Endpoint::Text("101")),
            "team/problems/101/text"
        );
        assert_eq!(
            Namespace::Public.path(Endpoint::Samples("101")),
            "public/101/samples.zip"
        );
        assert_eq!(
            Namespace::Team.path(Endpoint::Samples("101")),
            "team/101/samples.zip"
        );
    }

    #[test]
    fn namespace_should_round_trip_through_strum() {
        assert_eq!(Namespace::Team.to_string(), "team");
        assert_eq!("public".parse::<Namespace>().unwrap(), Namespace::Public);
    }

    #[test]
    fn endpoint_url_should_keep_base_prefix() {
        let s = session("https://judge.example.com/domjudge/", Namespace::Team);
        assert_eq!(
            s.endpoint_url(Endpoint::Text("7")).unwrap().as_str(),
            "https://judge.example.com/domjudge/team/problems/7/text"
        );

        let s = session("https://judge.example.com", Namespace::Public);
        assert_eq!(
            s.endpoint_url(Endpoint::Scoreboard).unwrap().as_str(),
            "https://judge.example.com/public"
        );
        assert!(!s.is_authenticated());
    }

    #[test]
    fn csrf_token_should_be_extracted() {
        let html = r#"<form method="post">
            <input type="text" name="_username">
            <input type="hidden" name="_csrf_token" value="abc123">
        </form>"#;
        assert_eq!(parse_csrf_token(html).unwrap(), "abc123");
    }

    #[test]
    fn missing_csrf_token_should_be_auth_error() {
        let err = parse_csrf_token("<form></form>").unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn login_form_should_be_detected() {
        assert!(has_login_form(r#"<input type="password" name="_password">"#));
        assert!(!has_login_form("<h1>Scoreboard</h1>"));
    }
}
