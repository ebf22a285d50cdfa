#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use forum_domain::DomainResult;
use forum_domain::content::{ContentItem, ContentKind, Votes};
use forum_domain::error::DomainError;
use forum_domain::ports::BoxFuture;
use forum_domain::ports::content::{AuthorContentQuery, CommentableThreadQuery, ContentRepository};
use forum_domain::ports::subscriptions::SubscriptionRepository;
use forum_domain::subscriptions::{SOURCE_TYPE_THREAD, Subscription};

pub const COURSE: &str = "course-101";

/// Content store double that hands back batch lookups in reverse storage
/// order and can be switched into a failing state.
#[derive(Default)]
pub struct ScriptedContentStore {
    items: Mutex<Vec<ContentItem>>,
    pub list_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub unavailable: bool,
    /// Ids that disappear between the listing and the batch lookup.
    pub vanished: Vec<String>,
    pub body_listings: AtomicUsize,
    pub comment_bump_fails: bool,
}

impl ScriptedContentStore {
    pub fn with_items(items: Vec<ContentItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst) + self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<ContentItem> {
        self.items.lock().expect("items lock").clone()
    }
}

fn unsupported<T: Send + 'static>() -> BoxFuture<'static, DomainResult<T>> {
    Box::pin(async { Err(DomainError::Validation("unsupported by test store".into())) })
}

impl ContentRepository for ScriptedContentStore {
    fn create(&self, item: &ContentItem) -> BoxFuture<'_, DomainResult<ContentItem>> {
        let item = item.clone();
        self.items.lock().expect("items lock").push(item.clone());
        Box::pin(async move { Ok(item) })
    }

    fn get(&self, content_id: &str) -> BoxFuture<'_, DomainResult<Option<ContentItem>>> {
        let found = self
            .snapshot()
            .into_iter()
            .find(|item| item.content_id == content_id);
        Box::pin(async move { Ok(found) })
    }

    fn list_by_author(
        &self,
        query: &AuthorContentQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if query.include_body {
            self.body_listings.fetch_add(1, Ordering::SeqCst);
        }
        let query = query.clone();
        let unavailable = self.unavailable;
        let items = self.snapshot();
        Box::pin(async move {
            if unavailable {
                return Err(DomainError::Unavailable("connection refused".into()));
            }
            let mut items: Vec<ContentItem> = items
                .into_iter()
                .filter(|item| item.author_id == query.author_id)
                .filter(|item| item.course_id == query.course_id)
                .filter(|item| !query.public_only || item.is_public())
                .map(|mut item| {
                    if !query.include_body {
                        item.body = None;
                    }
                    item
                })
                .collect();
            items.sort_by(|left, right| {
                right
                    .updated_at_ms
                    .cmp(&left.updated_at_ms)
                    .then_with(|| right.content_id.cmp(&left.content_id))
            });
            Ok(items)
        })
    }

    fn find_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let thread_ids = thread_ids.to_vec();
        let vanished = self.vanished.clone();
        let items = self.snapshot();
        Box::pin(async move {
            let mut found: Vec<ContentItem> = items
                .into_iter()
                .filter(|item| item.is_thread())
                .filter(|item| thread_ids.contains(&item.content_id))
                .filter(|item| !vanished.contains(&item.content_id))
                .collect();
            found.reverse();
            Ok(found)
        })
    }

    fn list_threads_by_commentable(
        &self,
        _query: &CommentableThreadQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        unsupported()
    }

    fn delete_threads_by_commentable(
        &self,
        _commentable_id: &str,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        unsupported()
    }

    fn record_comment(
        &self,
        thread_id: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContentItem>> {
        if self.comment_bump_fails {
            return Box::pin(async { Err(DomainError::Unavailable("write timed out".into())) });
        }
        let mut items = self.items.lock().expect("items lock");
        let updated = items
            .iter_mut()
            .find(|item| item.content_id == thread_id)
            .map(|item| {
                if let ContentKind::Thread { comment_count, .. } = &mut item.kind {
                    *comment_count += 1;
                }
                item.updated_at_ms = updated_at_ms;
                item.clone()
            });
        Box::pin(async move { updated.ok_or(DomainError::NotFound) })
    }
}

#[derive(Default)]
pub struct ScriptedSubscriptions {
    pub subscriptions: Mutex<Vec<Subscription>>,
    pub count_calls: AtomicUsize,
    pub unavailable: bool,
}

impl ScriptedSubscriptions {
    pub fn following(pairs: &[(&str, &str)]) -> Self {
        let subscriptions = pairs
            .iter()
            .map(|(subscriber_id, source_id)| Subscription {
                subscriber_id: subscriber_id.to_string(),
                source_id: source_id.to_string(),
                source_type: SOURCE_TYPE_THREAD.to_string(),
                created_at_ms: 0,
            })
            .collect();
        Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        }
    }

    pub fn unavailable(pairs: &[(&str, &str)]) -> Self {
        Self {
            unavailable: true,
            ..Self::following(pairs)
        }
    }
}

impl SubscriptionRepository for ScriptedSubscriptions {
    fn subscribe(&self, subscription: &Subscription) -> BoxFuture<'_, DomainResult<Subscription>> {
        let subscription = subscription.clone();
        self.subscriptions
            .lock()
            .expect("subscriptions lock")
            .push(subscription.clone());
        Box::pin(async move { Ok(subscription) })
    }

    fn count_followers(
        &self,
        source_ids: &[String],
        exclude_subscriber_id: &str,
    ) -> BoxFuture<'_, DomainResult<u64>> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Box::pin(async {
                Err(DomainError::Unavailable("subscription index down".into()))
            });
        }
        let mut follows: Vec<(String, String)> = self
            .subscriptions
            .lock()
            .expect("subscriptions lock")
            .iter()
            .filter(|subscription| source_ids.contains(&subscription.source_id))
            .filter(|subscription| subscription.subscriber_id != exclude_subscriber_id)
            .map(|subscription| {
                (
                    subscription.subscriber_id.clone(),
                    subscription.source_id.clone(),
                )
            })
            .collect();
        follows.sort();
        follows.dedup();
        Box::pin(async move { Ok(follows.len() as u64) })
    }
}

fn base(content_id: &str, author_id: &str, updated_at_ms: i64, kind: ContentKind) -> ContentItem {
    ContentItem {
        content_id: content_id.to_string(),
        author_id: author_id.to_string(),
        course_id: COURSE.to_string(),
        anonymous: false,
        anonymous_to_peers: false,
        body: Some(format!("body of {content_id}")),
        votes: Votes::default(),
        abuse_flaggers: Vec::new(),
        created_at_ms: updated_at_ms,
        updated_at_ms,
        kind,
    }
}

pub fn thread(content_id: &str, author_id: &str, updated_at_ms: i64) -> ContentItem {
    base(
        content_id,
        author_id,
        updated_at_ms,
        ContentKind::Thread {
            title: format!("title of {content_id}"),
            commentable_id: "commentable-1".to_string(),
            group_id: None,
            comment_count: 0,
        },
    )
}

pub fn comment(
    content_id: &str,
    author_id: &str,
    thread_id: &str,
    parent_ids: &[&str],
    updated_at_ms: i64,
) -> ContentItem {
    base(
        content_id,
        author_id,
        updated_at_ms,
        ContentKind::Comment {
            thread_id: thread_id.to_string(),
            parent_ids: parent_ids.iter().map(|id| id.to_string()).collect(),
        },
    )
}

pub fn ids(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|item| item.content_id.as_str()).collect()
}
