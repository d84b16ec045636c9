use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::Session;

const PROBLEM_MARKER: &str = "problem";

/// One scoreboard column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub id: String,
    pub name: String,
}

impl Problem {
    /// Name usable as a single path component.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect()
    }
}

pub async fn discover(session: &Session) -> Result<Vec<Problem>> {
    let html = session.fetch_scoreboard().await?.text().await?;
    let problems = parse_scoreboard(&html)?;
    info!(count = problems.len(), "discovered problems");
    Ok(problems)
}

pub fn parse_scoreboard(html: &str) -> Result<Vec<Problem>> {
    let document = Html::parse_document(html);
    let header = document
        .select(&selector(".scoreheader").map_err(Error::Discovery)?)
        .next()
        .ok_or_else(|| Error::Discovery("scoreboard header row not found".to_string()))?;

    let cell = selector("th").map_err(Error::Discovery)?;
    let link = selector("a[href]").map_err(Error::Discovery)?;

    let mut problems = vec![];
    for th in header.select(&cell) {
        let is_problem = th
            .value()
            .attr("title")
            .map(|title| title.starts_with(PROBLEM_MARKER))
            .unwrap_or(false);
        if !is_problem {
            continue;
        }

        let Some(a) = th.select(&link).next() else {
            warn!("problem column without a link, skipping");
            continue;
        };
        let href = a.value().attr("href").unwrap_or_default();
        let id = problem_id(href)?;
        let name = a.text().collect::<String>().trim().to_string();

        debug!(%id, %name, "found problem column");
        problems.push(Problem { id, name });
    }

    Ok(problems)
}

/// Pulls the numeric id out of a problem link such as `/public/problems/12/text`.
fn problem_id(href: &str) -> Result<String> {
    static ID_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_PATTERN.get_or_init(|| Regex::new(r"/([0-9]+)/").expect("valid regex"));

    pattern
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::Discovery(format!("no problem id in link {:?}", href)))
}

pub(crate) fn selector(css: &str) -> std::result::Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector {:?}: {}", css, e))
}
