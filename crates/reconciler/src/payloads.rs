use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::timeline::LastActivity;

/// GraphQL connection wrapper. `nodes` tolerates both a null list and null
/// entries inside it; both are dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default = "Vec::new", deserialize_with = "skip_null_nodes")]
    pub nodes: Vec<T>,
}

fn skip_null_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let nodes: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(nodes.unwrap_or_default().into_iter().flatten().collect())
}

fn nodes_of<T>(connection: &Option<Connection<T>>) -> &[T] {
    connection
        .as_ref()
        .map(|conn| conn.nodes.as_slice())
        .unwrap_or(&[])
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub login: String,
}

fn login_of(actor: &Option<Actor>) -> Option<&str> {
    non_empty(actor.as_ref().map(|a| a.login.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    PullRequest,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Issue => "Issue",
            ItemKind::PullRequest => "PullRequest",
        }
    }
}

/// One element of the `nodes(ids: [...])` response root.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum RemoteItem {
    Issue(IssueNode),
    PullRequest(PullRequestNode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueNode {
    #[serde(flatten)]
    pub core: ItemCore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    #[serde(flatten)]
    pub core: ItemCore,
    /// Absent when the server predates draft pull requests.
    pub is_draft: Option<bool>,
    pub merged_at: Option<DateTime<Utc>>,
    pub review_requests: Option<Connection<ReviewRequest>>,
    pub reviews: Option<Connection<Review>>,
}

impl PullRequestNode {
    pub fn reviews(&self) -> &[Review] {
        nodes_of(&self.reviews)
    }

    pub fn review_requests(&self) -> &[ReviewRequest] {
        nodes_of(&self.review_requests)
    }
}

/// Fields shared by issues and pull requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCore {
    #[serde(rename = "node_id")]
    pub node_id: String,
    pub updated_at: DateTime<Utc>,
    pub author: Option<Actor>,
    pub number: Option<i64>,
    pub repository: Option<RepositoryRef>,
    pub participants: Option<Connection<Participant>>,
    pub project_cards: Option<Connection<ProjectCard>>,
    pub timeline_items: Option<Connection<TimelineEvent>>,
    /// Filled in after the fetch; never part of the wire payload.
    #[serde(skip)]
    pub last_activity: Option<LastActivity>,
}

impl ItemCore {
    pub fn author_login(&self) -> Option<&str> {
        login_of(&self.author)
    }

    pub fn participants(&self) -> &[Participant] {
        nodes_of(&self.participants)
    }

    pub fn project_cards(&self) -> &[ProjectCard] {
        nodes_of(&self.project_cards)
    }

    pub fn timeline(&self) -> &[TimelineEvent] {
        nodes_of(&self.timeline_items)
    }
}

impl RemoteItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            RemoteItem::Issue(_) => ItemKind::Issue,
            RemoteItem::PullRequest(_) => ItemKind::PullRequest,
        }
    }

    pub fn core(&self) -> &ItemCore {
        match self {
            RemoteItem::Issue(issue) => &issue.core,
            RemoteItem::PullRequest(pull) => &pull.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut ItemCore {
        match self {
            RemoteItem::Issue(issue) => &mut issue.core,
            RemoteItem::PullRequest(pull) => &mut pull.core,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.core().node_id
    }

    pub fn as_pull_request(&self) -> Option<&PullRequestNode> {
        match self {
            RemoteItem::PullRequest(pull) => Some(pull),
            RemoteItem::Issue(_) => None,
        }
    }

    pub fn last_activity(&self) -> Option<&LastActivity> {
        self.core().last_activity.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    pub name_with_owner: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCard {
    pub project: ProjectRef,
    pub column: Option<ColumnRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub requested_reviewer: Option<RequestedReviewer>,
}

/// A requested reviewer is either a user or a team; team fields arrive
/// under the `team*` aliases selected by the query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedReviewer {
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub team_login: Option<String>,
    pub team_name: Option<String>,
    pub team_avatar_url: Option<String>,
}

impl RequestedReviewer {
    pub fn login(&self) -> Option<&str> {
        non_empty(self.login.as_deref()).or_else(|| non_empty(self.team_login.as_deref()))
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.team_name.as_deref()))
    }

    pub fn avatar_url(&self) -> Option<&str> {
        non_empty(self.avatar_url.as_deref())
            .or_else(|| non_empty(self.team_avatar_url.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

impl ReviewState {
    /// Approvals and change requests outrank plain comments.
    pub fn is_decisive(&self) -> bool {
        matches!(self, ReviewState::Approved | ReviewState::ChangesRequested)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    #[serde(default)]
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: Option<ReviewAuthor>,
    pub state: ReviewState,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn author_login(&self) -> Option<&str> {
        non_empty(self.author.as_ref().map(|a| a.login.as_str()))
    }

    pub fn author_avatar_url(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.avatar_url.as_deref())
    }
}

/// Read access to the optional sources a timeline event may carry. Every
/// accessor defaults to `None`; each payload shape overrides only what it
/// actually selects.
pub trait EventFields {
    fn actor_login(&self) -> Option<&str> {
        None
    }
    fn editor_login(&self) -> Option<&str> {
        None
    }
    fn author_login(&self) -> Option<&str> {
        None
    }
    fn commit_author_login(&self) -> Option<&str> {
        None
    }
    fn last_comment_editor_login(&self) -> Option<&str> {
        None
    }
    fn last_comment_author_login(&self) -> Option<&str> {
        None
    }
    fn last_seen_commit_author_login(&self) -> Option<&str> {
        None
    }
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn commit_pushed_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn last_comment_updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn last_comment_created_at(&self) -> Option<DateTime<Utc>> {
        None
    }
    fn last_seen_commit_pushed_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// `createdAt actor {login}`: the shape of most state-change events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorEvent {
    pub created_at: Option<DateTime<Utc>>,
    pub actor: Option<Actor>,
}

impl EventFields for ActorEvent {
    fn actor_login(&self) -> Option<&str> {
        login_of(&self.actor)
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Issue comments and pull request reviews: authored and editable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<Actor>,
    pub editor: Option<Actor>,
}

impl EventFields for CommentEvent {
    fn editor_login(&self) -> Option<&str> {
        login_of(&self.editor)
    }
    fn author_login(&self) -> Option<&str> {
        login_of(&self.author)
    }
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    pub user: Option<Actor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub pushed_date: Option<DateTime<Utc>>,
    pub author: Option<GitActor>,
}

impl CommitRef {
    fn user_login(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| login_of(&a.user))
    }
}

/// A commit pushed to a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEvent {
    pub commit: Option<CommitRef>,
}

impl EventFields for CommitEvent {
    fn commit_author_login(&self) -> Option<&str> {
        self.commit.as_ref().and_then(CommitRef::user_login)
    }
    fn commit_pushed_at(&self) -> Option<DateTime<Utc>> {
        self.commit.as_ref().and_then(|c| c.pushed_date)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadComment {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<Actor>,
    pub editor: Option<Actor>,
}

/// Review and commit comment threads; the query selects only the last
/// comment of each thread.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentThreadEvent {
    pub comments: Option<Connection<ThreadComment>>,
}

impl CommentThreadEvent {
    fn last_comment(&self) -> Option<&ThreadComment> {
        nodes_of(&self.comments).first()
    }
}

impl EventFields for CommentThreadEvent {
    fn last_comment_editor_login(&self) -> Option<&str> {
        self.last_comment().and_then(|c| login_of(&c.editor))
    }
    fn last_comment_author_login(&self) -> Option<&str> {
        self.last_comment().and_then(|c| login_of(&c.author))
    }
    fn last_comment_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_comment().and_then(|c| c.updated_at)
    }
    fn last_comment_created_at(&self) -> Option<DateTime<Utc>> {
        self.last_comment().and_then(|c| c.created_at)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMarkerEvent {
    pub last_seen_commit: Option<CommitRef>,
}

impl EventFields for RevisionMarkerEvent {
    fn last_seen_commit_author_login(&self) -> Option<&str> {
        self.last_seen_commit.as_ref().and_then(CommitRef::user_login)
    }
    fn last_seen_commit_pushed_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_commit.as_ref().and_then(|c| c.pushed_date)
    }
}

macro_rules! timeline_events {
    ($($tag:ident($payload:ty)),+ $(,)?) => {
        /// One timeline entry, discriminated by `__typename`.
        #[derive(Debug, Clone, Deserialize)]
        #[serde(tag = "__typename")]
        pub enum TimelineEvent {
            $($tag($payload),)+
            /// A type the query selected no fields for.
            #[serde(other)]
            Unknown,
        }

        impl TimelineEvent {
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(TimelineEvent::$tag(_) => stringify!($tag),)+
                    TimelineEvent::Unknown => "Unknown",
                }
            }

            pub fn fields(&self) -> Option<&dyn EventFields> {
                match self {
                    $(TimelineEvent::$tag(payload) => Some(payload as &dyn EventFields),)+
                    TimelineEvent::Unknown => None,
                }
            }
        }
    };
}

timeline_events! {
    AddedToProjectEvent(ActorEvent),
    AssignedEvent(ActorEvent),
    AutomaticBaseChangeFailedEvent(ActorEvent),
    AutomaticBaseChangeSucceededEvent(ActorEvent),
    BaseRefChangedEvent(ActorEvent),
    BaseRefForcePushedEvent(ActorEvent),
    ClosedEvent(ActorEvent),
    CommentDeletedEvent(ActorEvent),
    ConnectedEvent(ActorEvent),
    ConvertToDraftEvent(ActorEvent),
    ConvertedNoteToIssueEvent(ActorEvent),
    CrossReferencedEvent(ActorEvent),
    DemilestonedEvent(ActorEvent),
    DeployedEvent(ActorEvent),
    DeploymentEnvironmentChangedEvent(ActorEvent),
    DisconnectedEvent(ActorEvent),
    HeadRefDeletedEvent(ActorEvent),
    HeadRefForcePushedEvent(ActorEvent),
    HeadRefRestoredEvent(ActorEvent),
    IssueComment(CommentEvent),
    LabeledEvent(ActorEvent),
    LockedEvent(ActorEvent),
    MarkedAsDuplicateEvent(ActorEvent),
    MentionedEvent(ActorEvent),
    MergedEvent(ActorEvent),
    MilestonedEvent(ActorEvent),
    MovedColumnsInProjectEvent(ActorEvent),
    PinnedEvent(ActorEvent),
    PullRequestCommit(CommitEvent),
    PullRequestCommitCommentThread(CommentThreadEvent),
    PullRequestReview(CommentEvent),
    PullRequestReviewThread(CommentThreadEvent),
    PullRequestRevisionMarker(RevisionMarkerEvent),
    ReadyForReviewEvent(ActorEvent),
    ReferencedEvent(ActorEvent),
    RemovedFromProjectEvent(ActorEvent),
    RenamedTitleEvent(ActorEvent),
    ReopenedEvent(ActorEvent),
    ReviewDismissedEvent(ActorEvent),
    ReviewRequestRemovedEvent(ActorEvent),
    ReviewRequestedEvent(ActorEvent),
    SubscribedEvent(ActorEvent),
    TransferredEvent(ActorEvent),
    UnassignedEvent(ActorEvent),
    UnlabeledEvent(ActorEvent),
    UnlockedEvent(ActorEvent),
    UnmarkedAsDuplicateEvent(ActorEvent),
    UnpinnedEvent(ActorEvent),
    UnsubscribedEvent(ActorEvent),
    UserBlockedEvent(ActorEvent),
}

impl TimelineEvent {
    /// A commit pushed to a pull request branch.
    pub fn is_commit_push(&self) -> bool {
        matches!(self, TimelineEvent::PullRequestCommit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pull_request_node_decodes_with_team_reviewer() {
        let value = json!({
            "node_id": "PR_1",
            "__typename": "PullRequest",
            "updatedAt": "2024-03-01T10:00:00Z",
            "author": {"login": "alice"},
            "number": 7,
            "repository": {"nameWithOwner": "acme/widgets", "isPrivate": true},
            "participants": {"nodes": [{"login": "alice", "avatarUrl": "a.png", "name": null}]},
            "projectCards": {"nodes": []},
            "isDraft": false,
            "mergedAt": null,
            "reviewRequests": {"nodes": [
                {"requestedReviewer": {"teamLogin": "acme/core", "teamName": "Core", "teamAvatarUrl": "t.png"}}
            ]},
            "reviews": {"nodes": []},
            "timelineItems": {"nodes": [
                {"__typename": "LabeledEvent", "createdAt": "2024-03-01T09:00:00Z", "actor": {"login": "bob"}},
                {"__typename": "SomeFutureEvent"},
                null
            ]}
        });

        let item: RemoteItem = serde_json::from_value(value).expect("decode");
        assert_eq!(item.kind(), ItemKind::PullRequest);
        assert_eq!(item.node_id(), "PR_1");
        assert_eq!(item.core().timeline().len(), 2);
        assert!(matches!(item.core().timeline()[1], TimelineEvent::Unknown));
        assert!(item.core().repository.as_ref().unwrap().is_private);

        let pull = item.as_pull_request().expect("pull request");
        let reviewer = pull.review_requests()[0]
            .requested_reviewer
            .as_ref()
            .expect("reviewer");
        assert_eq!(reviewer.login(), Some("acme/core"));
        assert_eq!(reviewer.name(), Some("Core"));
        assert_eq!(reviewer.avatar_url(), Some("t.png"));
    }

    #[test]
    fn thread_event_reads_last_comment() {
        let event: TimelineEvent = serde_json::from_value(json!({
            "__typename": "PullRequestReviewThread",
            "comments": {"nodes": [{
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-02T00:00:00Z",
                "author": {"login": "carol"},
                "editor": null
            }]}
        }))
        .expect("decode");

        let fields = event.fields().expect("fields");
        assert_eq!(fields.last_comment_author_login(), Some("carol"));
        assert_eq!(fields.last_comment_editor_login(), None);
        assert_eq!(event.type_name(), "PullRequestReviewThread");
    }

    #[test]
    fn unknown_review_state_does_not_fail() {
        let review: Review = serde_json::from_value(json!({
            "author": {"login": "dave"},
            "state": "SOMETHING_NEW",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .expect("decode");
        assert_eq!(review.state, ReviewState::Unknown);
        assert!(!review.state.is_decisive());
    }
}
