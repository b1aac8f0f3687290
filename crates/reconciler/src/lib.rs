pub mod merge;
pub mod models;
pub mod participants;
pub mod payloads;
pub mod reviews;
pub mod timeline;

pub use merge::{merge_remote_items, MergeSummary};
pub use models::{CanonicalIssue, ProjectAssociation, ReviewVerdict};
pub use participants::{Participants, User};
pub use payloads::{ItemKind, RemoteItem, Review, ReviewState, TimelineEvent};
pub use reviews::resolve_verdicts;
pub use timeline::{resolve_last_activity, LastActivity};
