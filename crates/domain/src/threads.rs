use std::sync::Arc;

use crate::DomainResult;
use crate::content::{ContentItem, ContentKind, Votes};
use crate::error::DomainError;
use crate::ports::content::{CommentableThreadQuery, ContentRepository};
use crate::subscriptions::SubscriptionService;
use crate::util::{now_ms, require_non_empty, uuid_v7_without_dashes};

const MAX_TITLE_LENGTH: usize = 1024;

#[derive(Clone, Debug)]
pub struct ThreadCreate {
    pub commentable_id: String,
    pub author_id: String,
    pub course_id: String,
    pub title: String,
    pub body: String,
    pub anonymous: bool,
    pub anonymous_to_peers: bool,
    pub group_id: Option<i64>,
    pub auto_subscribe: bool,
}

#[derive(Clone)]
pub struct ThreadService {
    content_repo: Arc<dyn ContentRepository>,
    subscriptions: SubscriptionService,
}

impl ThreadService {
    pub fn new(content_repo: Arc<dyn ContentRepository>, subscriptions: SubscriptionService) -> Self {
        Self {
            content_repo,
            subscriptions,
        }
    }

    pub async fn create(&self, input: ThreadCreate) -> DomainResult<ContentItem> {
        validate_thread_create(&input)?;
        let now = now_ms();
        let thread = ContentItem {
            content_id: uuid_v7_without_dashes(),
            author_id: input.author_id,
            course_id: input.course_id,
            anonymous: input.anonymous,
            anonymous_to_peers: input.anonymous_to_peers,
            body: Some(input.body),
            votes: Votes::default(),
            abuse_flaggers: Vec::new(),
            created_at_ms: now,
            updated_at_ms: now,
            kind: ContentKind::Thread {
                title: input.title,
                commentable_id: input.commentable_id,
                group_id: input.group_id,
                comment_count: 0,
            },
        };

        let thread = self.content_repo.create(&thread).await?;
        if input.auto_subscribe {
            self.subscriptions
                .follow_thread(&thread.author_id, &thread.content_id)
                .await?;
        }
        Ok(thread)
    }

    pub async fn list_by_commentable(
        &self,
        commentable_id: &str,
        group_ids: Vec<i64>,
    ) -> DomainResult<Vec<ContentItem>> {
        require_non_empty("commentable_id", commentable_id)?;
        self.content_repo
            .list_threads_by_commentable(&CommentableThreadQuery {
                commentable_id: commentable_id.to_string(),
                group_ids,
            })
            .await
    }

    pub async fn delete_by_commentable(&self, commentable_id: &str) -> DomainResult<usize> {
        require_non_empty("commentable_id", commentable_id)?;
        let deleted = self
            .content_repo
            .delete_threads_by_commentable(commentable_id)
            .await?;
        tracing::info!(commentable_id, deleted, "deleted commentable threads");
        Ok(deleted)
    }
}

fn validate_thread_create(input: &ThreadCreate) -> DomainResult<()> {
    require_non_empty("commentable_id", &input.commentable_id)?;
    require_non_empty("user_id", &input.author_id)?;
    require_non_empty("course_id", &input.course_id)?;
    require_non_empty("title", &input.title)?;
    require_non_empty("body", &input.body)?;
    if input.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(DomainError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}
