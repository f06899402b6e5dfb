//! Line matchers deciding which rendered lines look like catalogue entries.
//!
//! Each matcher only finds candidates and splits them into a title part and a
//! page part. Validation (empty segments, numeric page, offset) is shared and
//! lives in [`crate::pdf::entries`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// "two dots followed by a digit": the end of a dotted leader before a page number
static LEADER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.][.]\d").unwrap());
static DOT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").unwrap());
static LEADER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?\S)[ \t]{2,}(\d+)\s*$").unwrap());

/// A line that looked like an entry, split but not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub raw_page: String,
}

impl Candidate {
    fn new(title: &str, raw_page: &str) -> Self {
        Candidate {
            title: title.trim_end().to_string(),
            raw_page: raw_page.trim().to_string(),
        }
    }
}

pub trait CatalogueMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when the line is not an entry candidate at all.
    fn candidate(&self, line: &str) -> Option<Candidate>;
}

/// Where a dotted-leader line is split into title and page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderSplit {
    /// Split at the last run of two or more dots, so section numbers such as
    /// `4.2` stay part of the title.
    LastRun,
    /// Every run of dots is a separator; title is the first segment and the
    /// page the second. `4.2 Scope....7` therefore yields title `4` and page
    /// `2 Scope`, which is then rejected as non-numeric.
    FirstRun,
}

/// Matches `Section Title ........ 12`.
///
/// A line is a candidate when it contains two dots directly followed by a
/// digit anywhere. This is permissive: prose containing `..5` is a candidate
/// too. It is also strict about the gap: a leader separated from its page
/// number by blanks (`Overview ....  12`) is not a candidate.
#[derive(Debug, Clone, Copy)]
pub struct DottedLeader {
    split: LeaderSplit,
}

impl DottedLeader {
    pub fn last_run() -> Self {
        DottedLeader {
            split: LeaderSplit::LastRun,
        }
    }

    pub fn first_run() -> Self {
        DottedLeader {
            split: LeaderSplit::FirstRun,
        }
    }
}

impl Default for DottedLeader {
    fn default() -> Self {
        Self::last_run()
    }
}

impl CatalogueMatcher for DottedLeader {
    fn name(&self) -> &'static str {
        match self.split {
            LeaderSplit::LastRun => "dotted",
            LeaderSplit::FirstRun => "dotted-first",
        }
    }

    fn candidate(&self, line: &str) -> Option<Candidate> {
        if !LEADER_MARKER.is_match(line) {
            return None;
        }

        match self.split {
            LeaderSplit::LastRun => {
                let leader = LEADER_RUN.find_iter(line).last()?;
                Some(Candidate::new(
                    &line[..leader.start()],
                    &line[leader.end()..],
                ))
            }
            LeaderSplit::FirstRun => {
                let collapsed = DOT_RUN.replace_all(line, "@");
                let mut segments = collapsed.split('@');
                let title = segments.next().unwrap_or_default();
                let page = segments.next().unwrap_or_default();
                Some(Candidate::new(title, page))
            }
        }
    }
}

/// Matches `title<sep>page`; every line is a candidate.
///
/// Only the text between the first and second separator is the page, so
/// anything after a second separator is ignored.
#[derive(Debug, Clone, Copy)]
pub struct Separator(pub char);

impl CatalogueMatcher for Separator {
    fn name(&self) -> &'static str {
        "separator"
    }

    fn candidate(&self, line: &str) -> Option<Candidate> {
        let mut segments = line.split(self.0);
        let title = segments.next().unwrap_or_default();
        let page = segments.next().unwrap_or_default();
        Some(Candidate::new(title, page))
    }
}

/// Matches `Title    12`: at least two blanks between title and a trailing number.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingNumber;

impl CatalogueMatcher for TrailingNumber {
    fn name(&self) -> &'static str {
        "spaced"
    }

    fn candidate(&self, line: &str) -> Option<Candidate> {
        let caps = TRAILING_NUMBER.captures(line)?;
        Some(Candidate::new(&caps[1], &caps[2]))
    }
}

/// Matcher selection as exposed on the command line and over MCP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    #[default]
    Dotted,
    DottedFirst,
    Spaced,
}

impl MatcherKind {
    pub fn build(self) -> Box<dyn CatalogueMatcher> {
        match self {
            MatcherKind::Dotted => Box::new(DottedLeader::last_run()),
            MatcherKind::DottedFirst => Box::new(DottedLeader::first_run()),
            MatcherKind::Spaced => Box::new(TrailingNumber),
        }
    }
}
