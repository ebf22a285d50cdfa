use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::content::ContentItem;
use crate::pagination::{DEFAULT_PER_PAGE, PageWindow, dedupe_preserving_order, reorder_by_ids};
use crate::ports::content::{AuthorContentQuery, ContentRepository};
use crate::util::{normalize_scope, require_non_empty};

#[derive(Clone, Debug)]
pub struct ActiveThreadsQuery {
    pub user_id: String,
    pub course_id: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityPage {
    pub threads: Vec<ContentItem>,
    pub page: usize,
    pub num_pages: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct ActivityConfig {
    pub default_per_page: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Clone)]
pub struct ActivityService {
    content_repo: Arc<dyn ContentRepository>,
    config: ActivityConfig,
}

impl ActivityService {
    pub fn new(content_repo: Arc<dyn ContentRepository>, config: ActivityConfig) -> Self {
        Self {
            content_repo,
            config,
        }
    }

    /// Threads the user has touched most recently, one page at a time.
    ///
    /// Returns `Ok(None)` without querying the store when no course is given.
    pub async fn active_threads(
        &self,
        query: ActiveThreadsQuery,
    ) -> DomainResult<Option<ActivityPage>> {
        require_non_empty("user_id", &query.user_id)?;
        let Some(course_id) = normalize_scope(query.course_id.as_deref()) else {
            return Ok(None);
        };

        let contents = self
            .content_repo
            .list_by_author(&AuthorContentQuery {
                author_id: query.user_id.clone(),
                course_id: course_id.to_string(),
                public_only: true,
                include_body: false,
            })
            .await?;

        let thread_ids = active_thread_ids(&contents);
        let window = PageWindow::resolve(
            thread_ids.len(),
            query.page,
            query.per_page,
            self.config.default_per_page,
        );
        let paged_ids = window.slice(&thread_ids);

        let threads = if paged_ids.is_empty() {
            Vec::new()
        } else {
            let fetched = self.content_repo.find_threads_by_ids(paged_ids).await?;
            reorder_by_ids(paged_ids, fetched, |thread| thread.content_id.as_str())
        };

        tracing::debug!(
            user_id = %query.user_id,
            course_id,
            active_threads = thread_ids.len(),
            page = window.page,
            num_pages = window.num_pages,
            returned = threads.len(),
            "built active threads page"
        );

        Ok(Some(ActivityPage {
            threads,
            page: window.page,
            num_pages: window.num_pages,
        }))
    }
}

/// Distinct thread ids in the order they first appear in `contents`. Relies
/// on `contents` already being sorted by recency.
pub fn active_thread_ids(contents: &[ContentItem]) -> Vec<String> {
    dedupe_preserving_order(
        contents
            .iter()
            .map(|content| content.owning_thread_id().to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentKind, Votes};

    fn item(content_id: &str, kind: ContentKind, updated_at_ms: i64) -> ContentItem {
        ContentItem {
            content_id: content_id.into(),
            author_id: "u".into(),
            course_id: "course".into(),
            anonymous: false,
            anonymous_to_peers: false,
            body: None,
            votes: Votes::default(),
            abuse_flaggers: vec![],
            created_at_ms: updated_at_ms,
            updated_at_ms,
            kind,
        }
    }

    fn thread(content_id: &str, updated_at_ms: i64) -> ContentItem {
        item(
            content_id,
            ContentKind::Thread {
                title: content_id.into(),
                commentable_id: "cmt".into(),
                group_id: None,
                comment_count: 0,
            },
            updated_at_ms,
        )
    }

    fn comment(content_id: &str, thread_id: &str, updated_at_ms: i64) -> ContentItem {
        item(
            content_id,
            ContentKind::Comment {
                thread_id: thread_id.into(),
                parent_ids: vec![],
            },
            updated_at_ms,
        )
    }

    #[test]
    fn comments_collapse_onto_their_thread() {
        let contents = vec![
            comment("c1", "t1", 5),
            comment("c2", "t2", 4),
            thread("t1", 3),
            thread("t2", 1),
        ];
        assert_eq!(active_thread_ids(&contents), vec!["t1", "t2"]);
    }

    #[test]
    fn later_touches_do_not_move_a_thread_back() {
        let contents = vec![
            comment("c3", "t9", 10),
            thread("t4", 8),
            comment("c4", "t4", 7),
            thread("t9", 2),
        ];
        assert_eq!(active_thread_ids(&contents), vec!["t9", "t4"]);
    }
}
