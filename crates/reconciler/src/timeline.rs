use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::payloads::{RemoteItem, TimelineEvent};

/// Who last touched an item, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastActivity {
    pub actor_login: Option<String>,
    pub activity_at: DateTime<Utc>,
}

type LoginSource = fn(&TimelineEvent) -> Option<&str>;
type TimestampSource = fn(&TimelineEvent) -> Option<DateTime<Utc>>;

/// Actor login sources, first non-empty wins.
const ACTOR_SOURCES: [(&str, LoginSource); 7] = [
    ("actor", |event| event.fields()?.actor_login()),
    ("editor", |event| event.fields()?.editor_login()),
    ("author", |event| event.fields()?.author_login()),
    ("commit.author.user", |event| event.fields()?.commit_author_login()),
    ("lastComment.editor", |event| event.fields()?.last_comment_editor_login()),
    ("lastComment.author", |event| event.fields()?.last_comment_author_login()),
    ("lastSeenCommit.author.user", |event| {
        event.fields()?.last_seen_commit_author_login()
    }),
];

/// Timestamp sources, first present wins.
const TIMESTAMP_SOURCES: [(&str, TimestampSource); 6] = [
    ("updatedAt", |event| event.fields()?.updated_at()),
    ("createdAt", |event| event.fields()?.created_at()),
    ("commit.pushedDate", |event| event.fields()?.commit_pushed_at()),
    ("lastComment.updatedAt", |event| event.fields()?.last_comment_updated_at()),
    ("lastComment.createdAt", |event| event.fields()?.last_comment_created_at()),
    ("lastSeenCommit.pushedDate", |event| {
        event.fields()?.last_seen_commit_pushed_at()
    }),
];

pub fn extract_actor(event: &TimelineEvent) -> Option<&str> {
    actor_with_source(event).map(|(_, login)| login)
}

pub fn extract_timestamp(event: &TimelineEvent) -> Option<DateTime<Utc>> {
    timestamp_with_source(event).map(|(_, at)| at)
}

fn actor_with_source(event: &TimelineEvent) -> Option<(&'static str, &str)> {
    ACTOR_SOURCES.iter().find_map(|(label, source)| {
        source(event)
            .filter(|login| !login.is_empty())
            .map(|login| (*label, login))
    })
}

fn timestamp_with_source(event: &TimelineEvent) -> Option<(&'static str, DateTime<Utc>)> {
    TIMESTAMP_SOURCES
        .iter()
        .find_map(|(label, source)| source(event).map(|at| (*label, at)))
}

/// Derives the last actor and activity time of an item from its timeline.
///
/// Items without a usable timeline fall back to the item's own author and
/// `updatedAt`. The same fallback applies when the latest entry is a pushed
/// commit older than the item's `updatedAt`: right after a pull request is
/// opened its commits carry push dates that predate the item itself.
pub fn resolve_last_activity(item: &RemoteItem) -> LastActivity {
    let core = item.core();
    let fallback = || LastActivity {
        actor_login: core.author_login().map(str::to_string),
        activity_at: core.updated_at,
    };

    let Some((event, activity_at)) = latest_event(core.timeline()) else {
        return fallback();
    };

    if event.is_commit_push() && activity_at < core.updated_at {
        return fallback();
    }

    let actor = actor_with_source(event);
    debug!(
        node_id = %core.node_id,
        event = event.type_name(),
        actor_source = actor.map_or("none", |(label, _)| label),
        "resolved last activity from timeline"
    );
    LastActivity {
        actor_login: actor.map(|(_, login)| login.to_string()),
        activity_at,
    }
}

/// Latest timestamped event; ties go to the earliest entry in source order.
fn latest_event(events: &[TimelineEvent]) -> Option<(&TimelineEvent, DateTime<Utc>)> {
    let mut latest: Option<(&TimelineEvent, DateTime<Utc>)> = None;
    for event in events {
        let Some((source, at)) = timestamp_with_source(event) else {
            trace!(event = event.type_name(), "timeline event without timestamp");
            continue;
        };
        match latest {
            Some((_, current)) if current >= at => {}
            _ => {
                trace!(event = event.type_name(), timestamp_source = source, %at, "new latest event");
                latest = Some((event, at));
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn item(typename: &str, timeline: Vec<Value>) -> RemoteItem {
        serde_json::from_value(json!({
            "node_id": "N1",
            "__typename": typename,
            "updatedAt": "2024-05-01T12:00:00Z",
            "author": {"login": "author"},
            "timelineItems": {"nodes": timeline},
        }))
        .expect("item")
    }

    fn ts(value: &str) -> DateTime<Utc> {
        value.parse().expect("timestamp")
    }

    #[test]
    fn empty_timeline_uses_item_author() {
        let activity = resolve_last_activity(&item("Issue", vec![]));
        assert_eq!(activity.actor_login.as_deref(), Some("author"));
        assert_eq!(activity.activity_at, ts("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn latest_timestamp_wins_regardless_of_type() {
        let activity = resolve_last_activity(&item(
            "Issue",
            vec![
                json!({"__typename": "IssueComment", "createdAt": "2024-05-02T00:00:00Z",
                       "updatedAt": "2024-05-03T00:00:00Z", "author": {"login": "carol"}}),
                json!({"__typename": "LabeledEvent", "createdAt": "2024-05-04T00:00:00Z",
                       "actor": {"login": "bob"}}),
                json!({"__typename": "ClosedEvent", "createdAt": "2024-05-01T00:00:00Z",
                       "actor": {"login": "dave"}}),
            ],
        ));
        assert_eq!(activity.actor_login.as_deref(), Some("bob"));
        assert_eq!(activity.activity_at, ts("2024-05-04T00:00:00Z"));
    }

    #[test]
    fn ties_keep_first_event() {
        let activity = resolve_last_activity(&item(
            "Issue",
            vec![
                json!({"__typename": "AssignedEvent", "createdAt": "2024-05-04T00:00:00Z",
                       "actor": {"login": "first"}}),
                json!({"__typename": "LabeledEvent", "createdAt": "2024-05-04T00:00:00Z",
                       "actor": {"login": "second"}}),
            ],
        ));
        assert_eq!(activity.actor_login.as_deref(), Some("first"));
    }

    #[test]
    fn stale_commit_push_falls_back_to_item() {
        let activity = resolve_last_activity(&item(
            "PullRequest",
            vec![
                json!({"__typename": "LabeledEvent", "createdAt": "2024-04-01T00:00:00Z",
                       "actor": {"login": "bob"}}),
                json!({"__typename": "PullRequestCommit", "commit": {
                    "pushedDate": "2024-04-30T00:00:00Z",
                    "author": {"user": {"login": "pusher"}}
                }}),
            ],
        ));
        assert_eq!(activity.actor_login.as_deref(), Some("author"));
        assert_eq!(activity.activity_at, ts("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn fresh_commit_push_is_selected() {
        let activity = resolve_last_activity(&item(
            "PullRequest",
            vec![json!({"__typename": "PullRequestCommit", "commit": {
                "pushedDate": "2024-05-02T00:00:00Z",
                "author": {"user": {"login": "pusher"}}
            }})],
        ));
        assert_eq!(activity.actor_login.as_deref(), Some("pusher"));
        assert_eq!(activity.activity_at, ts("2024-05-02T00:00:00Z"));
    }

    #[test]
    fn equal_timestamp_commit_push_is_selected() {
        let activity = resolve_last_activity(&item(
            "PullRequest",
            vec![json!({"__typename": "PullRequestCommit", "commit": {
                "pushedDate": "2024-05-01T12:00:00Z",
                "author": {"user": {"login": "pusher"}}
            }})],
        ));
        assert_eq!(
            activity,
            LastActivity {
                actor_login: Some("pusher".to_string()),
                activity_at: ts("2024-05-01T12:00:00Z"),
            }
        );
    }

    #[test]
    fn editor_outranks_author() {
        let event: TimelineEvent = serde_json::from_value(json!({
            "__typename": "PullRequestReview",
            "createdAt": "2024-05-02T00:00:00Z",
            "updatedAt": null,
            "author": {"login": "reviewer"},
            "editor": {"login": "editor"}
        }))
        .expect("event");
        assert_eq!(extract_actor(&event), Some("editor"));
        assert_eq!(extract_timestamp(&event), Some(ts("2024-05-02T00:00:00Z")));
    }

    #[test]
    fn empty_login_is_skipped() {
        let event: TimelineEvent = serde_json::from_value(json!({
            "__typename": "IssueComment",
            "createdAt": "2024-05-02T00:00:00Z",
            "author": {"login": "writer"},
            "editor": {"login": ""}
        }))
        .expect("event");
        assert_eq!(extract_actor(&event), Some("writer"));
    }

    #[test]
    fn untimestamped_events_are_ignored() {
        let activity = resolve_last_activity(&item(
            "Issue",
            vec![json!({"__typename": "SomeFutureEvent"})],
        ));
        assert_eq!(activity.actor_login.as_deref(), Some("author"));
    }
}
