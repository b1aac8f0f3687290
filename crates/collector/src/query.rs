use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Substitution point for the quoted, comma-joined node ids.
pub const NODE_IDS_PLACEHOLDER: &str = "__NODE_IDS__";

const ACTOR: &str = "createdAt actor {login}";
const COMMENT: &str = "createdAt updatedAt author {login} editor {login}";
const COMMIT: &str = "commit {pushedDate author {user {login}}}";
const COMMIT_THREAD: &str = "comments(last: 1) {nodes {createdAt updatedAt editor {login}}}";
const REVIEW_THREAD: &str =
    "comments(last: 1) {nodes {createdAt updatedAt author {login} editor {login}}}";
const REVISION_MARKER: &str = "lastSeenCommit {pushedDate author {user {login}}}";

/// A gateable selection: the unit name doubles as its capability name.
#[derive(Debug, Clone, Copy)]
struct Unit {
    name: &'static str,
    selection: &'static str,
}

const fn unit(name: &'static str, selection: &'static str) -> Unit {
    Unit { name, selection }
}

// https://docs.github.com/en/graphql/reference/unions#issuetimelineitems
const ISSUE_TIMELINE: &[Unit] = &[
    unit("AddedToProjectEvent", ACTOR),
    unit("AssignedEvent", ACTOR),
    unit("ClosedEvent", ACTOR),
    unit("CommentDeletedEvent", ACTOR),
    unit("ConnectedEvent", ACTOR),
    unit("ConvertedNoteToIssueEvent", ACTOR),
    unit("CrossReferencedEvent", ACTOR),
    unit("DemilestonedEvent", ACTOR),
    unit("DisconnectedEvent", ACTOR),
    unit("IssueComment", COMMENT),
    unit("LabeledEvent", ACTOR),
    unit("LockedEvent", ACTOR),
    unit("MarkedAsDuplicateEvent", ACTOR),
    unit("MentionedEvent", ACTOR),
    unit("MilestonedEvent", ACTOR),
    unit("MovedColumnsInProjectEvent", ACTOR),
    unit("PinnedEvent", ACTOR),
    unit("ReferencedEvent", ACTOR),
    unit("RemovedFromProjectEvent", ACTOR),
    unit("RenamedTitleEvent", ACTOR),
    unit("ReopenedEvent", ACTOR),
    unit("SubscribedEvent", ACTOR),
    unit("TransferredEvent", ACTOR),
    unit("UnassignedEvent", ACTOR),
    unit("UnlabeledEvent", ACTOR),
    unit("UnlockedEvent", ACTOR),
    unit("UnmarkedAsDuplicateEvent", ACTOR),
    unit("UnpinnedEvent", ACTOR),
    unit("UnsubscribedEvent", ACTOR),
    unit("UserBlockedEvent", ACTOR),
];

// https://docs.github.com/en/graphql/reference/unions#pullrequesttimelineitems
const PULL_REQUEST_TIMELINE: &[Unit] = &[
    unit("AddedToProjectEvent", ACTOR),
    unit("AssignedEvent", ACTOR),
    unit("AutomaticBaseChangeFailedEvent", ACTOR),
    unit("AutomaticBaseChangeSucceededEvent", ACTOR),
    unit("BaseRefChangedEvent", ACTOR),
    unit("BaseRefForcePushedEvent", ACTOR),
    unit("ClosedEvent", ACTOR),
    unit("CommentDeletedEvent", ACTOR),
    unit("ConnectedEvent", ACTOR),
    unit("ConvertToDraftEvent", ACTOR),
    unit("ConvertedNoteToIssueEvent", ACTOR),
    unit("CrossReferencedEvent", ACTOR),
    unit("DemilestonedEvent", ACTOR),
    unit("DeployedEvent", ACTOR),
    unit("DeploymentEnvironmentChangedEvent", ACTOR),
    unit("DisconnectedEvent", ACTOR),
    unit("HeadRefDeletedEvent", ACTOR),
    unit("HeadRefForcePushedEvent", ACTOR),
    unit("HeadRefRestoredEvent", ACTOR),
    unit("IssueComment", COMMENT),
    unit("LabeledEvent", ACTOR),
    unit("LockedEvent", ACTOR),
    unit("MarkedAsDuplicateEvent", ACTOR),
    unit("MentionedEvent", ACTOR),
    unit("MergedEvent", ACTOR),
    unit("MilestonedEvent", ACTOR),
    unit("MovedColumnsInProjectEvent", ACTOR),
    unit("PinnedEvent", ACTOR),
    unit("PullRequestCommit", COMMIT),
    unit("PullRequestCommitCommentThread", COMMIT_THREAD),
    unit("PullRequestReview", COMMENT),
    unit("PullRequestReviewThread", REVIEW_THREAD),
    unit("PullRequestRevisionMarker", REVISION_MARKER),
    unit("ReadyForReviewEvent", ACTOR),
    unit("ReferencedEvent", ACTOR),
    unit("RemovedFromProjectEvent", ACTOR),
    unit("RenamedTitleEvent", ACTOR),
    unit("ReopenedEvent", ACTOR),
    unit("ReviewDismissedEvent", ACTOR),
    unit("ReviewRequestRemovedEvent", ACTOR),
    unit("ReviewRequestedEvent", ACTOR),
    unit("SubscribedEvent", ACTOR),
    unit("TransferredEvent", ACTOR),
    unit("UnassignedEvent", ACTOR),
    unit("UnlabeledEvent", ACTOR),
    unit("UnlockedEvent", ACTOR),
    unit("UnmarkedAsDuplicateEvent", ACTOR),
    unit("UnpinnedEvent", ACTOR),
    unit("UnsubscribedEvent", ACTOR),
    unit("UserBlockedEvent", ACTOR),
];

const PULL_REQUEST_FIELDS: &[Unit] = &[unit("isDraft", "isDraft"), unit("mergedAt", "mergedAt")];

const COMMON_FIELDS: &str = "\
      updatedAt
      author {login}
      number
      repository {nameWithOwner isPrivate}
      participants(first: 100) {nodes {login avatarUrl name}}
      projectCards(first: 100) {nodes {project {url name} column {name}}}";

const REVIEW_FIELDS: &str = "\
      reviewRequests(first: 100) {
        nodes {
          requestedReviewer {
            ... on User {login avatarUrl name}
            ... on Team {teamLogin: combinedSlug teamName: name teamAvatarUrl: avatarUrl}
          }
        }
      }
      reviews(first: 100) {nodes {author {login avatarUrl} state updatedAt}}";

/// Units missing from self-hosted servers at or below each version.
/// Append-only: add a row when the server grows a new feature.
/// Gates compare `(major, minor)`, so every 1.x release gets all of them.
const VERSION_GATES: &[((u32, u32), &[&str])] = &[
    (
        (2, 20),
        &[
            "ConnectedEvent",
            "DisconnectedEvent",
            "UnmarkedAsDuplicateEvent",
            "ConvertToDraftEvent",
            "isDraft",
        ],
    ),
    (
        (2, 21),
        &[
            "AutomaticBaseChangeFailedEvent",
            "AutomaticBaseChangeSucceededEvent",
        ],
    ),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid server version {0:?}: expected major.minor[.patch]")]
pub struct VersionParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FromStr for ServerVersion {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(input.to_string());
        let parts = input
            .trim()
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: 0,
            }),
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: *patch,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl ServerVersion {
    /// Names of the units this server cannot resolve.
    pub fn unsupported_units(&self) -> BTreeSet<&'static str> {
        if self.major >= 3 {
            return BTreeSet::new();
        }
        VERSION_GATES
            .iter()
            .filter(|(gate, _)| (self.major, self.minor) <= *gate)
            .flat_map(|(_, names)| names.iter().copied())
            .collect()
    }
}

/// The `nodes(ids: ...)` query document for one target server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
    excluded: BTreeSet<&'static str>,
}

impl QueryTemplate {
    /// Every unit selected; what the hosted service and 3.x servers accept.
    pub fn full() -> Self {
        Self::compose(BTreeSet::new())
    }

    pub fn build(is_primary_host: bool, server_version: &str) -> Self {
        if is_primary_host {
            return Self::full();
        }

        let version = match server_version.parse::<ServerVersion>() {
            Ok(version) => version,
            Err(err) => {
                warn!(error = %err, "unrecognized server version; using the full query template");
                return Self::full();
            }
        };

        let excluded = version.unsupported_units();
        debug!(
            version = %version,
            excluded = excluded.len(),
            "composed query template for self-hosted server"
        );
        Self::compose(excluded)
    }

    fn compose(excluded: BTreeSet<&'static str>) -> Self {
        let issue_timeline = timeline_selection(ISSUE_TIMELINE, &excluded);
        let pull_request_timeline = timeline_selection(PULL_REQUEST_TIMELINE, &excluded);
        let pull_request_fields: String = PULL_REQUEST_FIELDS
            .iter()
            .filter(|field| !excluded.contains(field.name))
            .map(|field| format!("\n      {}", field.selection))
            .collect();

        let text = format!(
            "query {{
  nodes(ids: [{NODE_IDS_PLACEHOLDER}]) {{
    node_id: id
    ... on Issue {{
      __typename
{COMMON_FIELDS}
      timelineItems(last: 100) {{
        nodes {{
          __typename
{issue_timeline}
        }}
      }}
    }}
    ... on PullRequest {{
      __typename
{COMMON_FIELDS}{pull_request_fields}
{REVIEW_FIELDS}
      timelineItems(last: 100) {{
        nodes {{
          __typename
{pull_request_timeline}
        }}
      }}
    }}
  }}
}}
"
        );

        Self { text, excluded }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the named unit was left out for this server.
    pub fn excludes(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.excluded.iter().copied()
    }

    pub fn render<S: AsRef<str>>(&self, node_ids: &[S]) -> String {
        let joined = node_ids
            .iter()
            .map(|id| Value::String(id.as_ref().to_string()).to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.text.replace(NODE_IDS_PLACEHOLDER, &joined)
    }
}

fn timeline_selection(units: &[Unit], excluded: &BTreeSet<&'static str>) -> String {
    units
        .iter()
        .filter(|fragment| !excluded.contains(fragment.name))
        .map(|fragment| {
            format!(
                "          ... on {} {{__typename {}}}",
                fragment.name, fragment.selection
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
