use serde::{Deserialize, Serialize};

pub const CONTENT_KIND_THREAD: &str = "thread";
pub const CONTENT_KIND_COMMENT: &str = "comment";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Votes {
    #[serde(default)]
    pub up: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteCounts {
    pub up: u64,
    pub down: u64,
}

impl Votes {
    /// Vote totals with any vote cast by `user_id` left out. Works on the
    /// snapshot only; the stored item keeps its voters.
    pub fn counts_excluding(&self, user_id: &str) -> VoteCounts {
        let tally = |voters: &[String]| voters.iter().filter(|voter| *voter != user_id).count();
        VoteCounts {
            up: tally(&self.up) as u64,
            down: tally(&self.down) as u64,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    Thread {
        title: String,
        commentable_id: String,
        #[serde(default)]
        group_id: Option<i64>,
        #[serde(default)]
        comment_count: u64,
    },
    Comment {
        thread_id: String,
        /// Ancestor comment ids, root first. Empty for a direct comment on
        /// the thread.
        #[serde(default)]
        parent_ids: Vec<String>,
    },
}

/// How a piece of content counts towards a user's participation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentRole {
    Thread,
    Comment,
    Reply,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    pub content_id: String,
    pub author_id: String,
    pub course_id: String,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub anonymous_to_peers: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub votes: Votes,
    #[serde(default)]
    pub abuse_flaggers: Vec<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    #[serde(flatten)]
    pub kind: ContentKind,
}

impl ContentItem {
    pub fn is_thread(&self) -> bool {
        matches!(self.kind, ContentKind::Thread { .. })
    }

    /// The thread this item belongs to: its own id for a thread, the owning
    /// thread for a comment.
    pub fn owning_thread_id(&self) -> &str {
        match &self.kind {
            ContentKind::Thread { .. } => &self.content_id,
            ContentKind::Comment { thread_id, .. } => thread_id,
        }
    }

    pub fn role(&self) -> ContentRole {
        match &self.kind {
            ContentKind::Thread { .. } => ContentRole::Thread,
            ContentKind::Comment { parent_ids, .. } if parent_ids.is_empty() => {
                ContentRole::Comment
            }
            ContentKind::Comment { .. } => ContentRole::Reply,
        }
    }

    pub fn comment_count(&self) -> u64 {
        match &self.kind {
            ContentKind::Thread { comment_count, .. } => *comment_count,
            ContentKind::Comment { .. } => 0,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ContentKind::Thread { .. } => CONTENT_KIND_THREAD,
            ContentKind::Comment { .. } => CONTENT_KIND_COMMENT,
        }
    }

    pub fn is_public(&self) -> bool {
        !self.anonymous && !self.anonymous_to_peers
    }
}
