use crate::DomainResult;
use crate::content::ContentItem;
use crate::ports::BoxFuture;

/// Filter for the content a single author wrote inside one course.
#[derive(Clone, Debug)]
pub struct AuthorContentQuery {
    pub author_id: String,
    pub course_id: String,
    /// Skip anything posted anonymously or anonymously-to-peers.
    pub public_only: bool,
    /// When false the body field is left out of the projection.
    pub include_body: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CommentableThreadQuery {
    pub commentable_id: String,
    /// Threads in any of these groups, plus threads without a group.
    /// Empty means no group filter.
    pub group_ids: Vec<i64>,
}

#[allow(clippy::needless_pass_by_value)]
pub trait ContentRepository: Send + Sync {
    fn create(&self, item: &ContentItem) -> BoxFuture<'_, DomainResult<ContentItem>>;

    fn get(&self, content_id: &str) -> BoxFuture<'_, DomainResult<Option<ContentItem>>>;

    /// Ordered by `updated_at_ms` descending, ties broken by id descending.
    fn list_by_author(
        &self,
        query: &AuthorContentQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>>;

    /// Batch lookup of threads. The result order is unspecified and ids with
    /// no matching thread are skipped.
    fn find_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>>;

    fn list_threads_by_commentable(
        &self,
        query: &CommentableThreadQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>>;

    /// Removes every thread of the commentable along with their comments and
    /// returns the number of threads removed.
    fn delete_threads_by_commentable(
        &self,
        commentable_id: &str,
    ) -> BoxFuture<'_, DomainResult<usize>>;

    /// Bumps the thread's comment count and last-update time.
    fn record_comment(
        &self,
        thread_id: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContentItem>>;
}
