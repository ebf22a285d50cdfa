use std::sync::Arc;

use crate::DomainResult;
use crate::content::{ContentItem, ContentKind, Votes};
use crate::error::DomainError;
use crate::ports::content::ContentRepository;
use crate::util::{now_ms, require_non_empty, uuid_v7_without_dashes};

#[derive(Clone, Debug)]
pub struct CommentCreate {
    pub thread_id: String,
    /// Comment being replied to; `None` comments on the thread directly.
    pub parent_id: Option<String>,
    pub author_id: String,
    pub body: String,
    pub anonymous: bool,
    pub anonymous_to_peers: bool,
}

#[derive(Clone)]
pub struct CommentService {
    content_repo: Arc<dyn ContentRepository>,
}

impl CommentService {
    pub fn new(content_repo: Arc<dyn ContentRepository>) -> Self {
        Self { content_repo }
    }

    pub async fn create(&self, input: CommentCreate) -> DomainResult<ContentItem> {
        require_non_empty("thread_id", &input.thread_id)?;
        require_non_empty("user_id", &input.author_id)?;
        require_non_empty("body", &input.body)?;

        let thread = self
            .content_repo
            .get(&input.thread_id)
            .await?
            .filter(ContentItem::is_thread)
            .ok_or(DomainError::NotFound)?;

        let parent_ids = match input.parent_id.as_deref() {
            Some(parent_id) => {
                let parent = self
                    .content_repo
                    .get(parent_id)
                    .await?
                    .ok_or(DomainError::NotFound)?;
                match parent.kind {
                    ContentKind::Comment {
                        thread_id,
                        mut parent_ids,
                    } if thread_id == thread.content_id => {
                        parent_ids.push(parent.content_id);
                        parent_ids
                    }
                    _ => {
                        return Err(DomainError::Validation(
                            "parent_id must be a comment on the same thread".into(),
                        ));
                    }
                }
            }
            None => Vec::new(),
        };

        let now = now_ms();
        let comment = ContentItem {
            content_id: uuid_v7_without_dashes(),
            author_id: input.author_id,
            course_id: thread.course_id.clone(),
            anonymous: input.anonymous,
            anonymous_to_peers: input.anonymous_to_peers,
            body: Some(input.body),
            votes: Votes::default(),
            abuse_flaggers: Vec::new(),
            created_at_ms: now,
            updated_at_ms: now,
            kind: ContentKind::Comment {
                thread_id: thread.content_id.clone(),
                parent_ids,
            },
        };

        let comment = self.content_repo.create(&comment).await?;
        if let Err(err) = self
            .content_repo
            .record_comment(&thread.content_id, now)
            .await
        {
            tracing::warn!(
                comment_id = %comment.content_id,
                thread_id = %thread.content_id,
                error = %err,
                "comment stored but thread comment_count not bumped"
            );
            return Err(err);
        }
        Ok(comment)
    }
}
