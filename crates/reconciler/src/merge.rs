use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{CanonicalIssue, ProjectAssociation, ReviewVerdict};
use crate::participants::User;
use crate::payloads::RemoteItem;
use crate::reviews::resolve_verdicts;
use crate::timeline::resolve_last_activity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub merged: usize,
    pub missing: usize,
}

/// Writes fetched fields onto the matching canonical issues in place.
///
/// Issues without a remote counterpart are logged and left as they were, so
/// merging a partial result set never discards earlier state.
pub fn merge_remote_items(
    remote_items: &[RemoteItem],
    issues: &mut [CanonicalIssue],
) -> MergeSummary {
    let mut by_node_id: HashMap<&str, &RemoteItem> = HashMap::with_capacity(remote_items.len());
    for item in remote_items {
        by_node_id.entry(item.node_id()).or_insert(item);
    }

    let mut summary = MergeSummary::default();
    for issue in issues.iter_mut() {
        match by_node_id.get(issue.node_id.as_str()) {
            Some(item) => {
                debug!(node_id = %issue.node_id, kind = item.kind().as_str(), "merging remote item");
                apply_remote_item(item, issue);
                summary.merged += 1;
            }
            None => {
                warn!(node_id = %issue.node_id, "remote item not found; issue left unchanged");
                summary.missing += 1;
            }
        }
    }
    summary
}

pub fn apply_remote_item(item: &RemoteItem, issue: &mut CanonicalIssue) {
    let core = item.core();

    issue.is_private = core.repository.as_ref().map(|repo| repo.is_private);
    issue.involved_users = core.participants().iter().map(User::from).collect();

    let activity = item
        .last_activity()
        .cloned()
        .unwrap_or_else(|| resolve_last_activity(item));
    issue.last_actor_login = activity.actor_login;
    issue.last_activity_at = Some(activity.activity_at);

    issue.project_associations = core
        .project_cards()
        .iter()
        .map(ProjectAssociation::from)
        .collect();

    if let Some(pull) = item.as_pull_request() {
        issue.merged_at = pull.merged_at;
        issue.is_draft = pull.is_draft;
        issue.requested_reviewers = pull
            .review_requests()
            .iter()
            .filter_map(|request| request.requested_reviewer.as_ref())
            .filter_map(User::from_reviewer)
            .collect();
        issue.review_verdicts = resolve_verdicts(pull.reviews())
            .into_iter()
            .filter_map(ReviewVerdict::from_review)
            .collect();
    }

    include_requested_reviewers(issue);
}

/// The server's participant list omits users who were only asked to review.
// TODO: users who are only mentioned are missing as well; the timeline
// query would need MentionedEvent subjects to recover them.
fn include_requested_reviewers(issue: &mut CanonicalIssue) {
    for reviewer in &issue.requested_reviewers {
        issue.involved_users.insert(reviewer.clone());
    }
}
