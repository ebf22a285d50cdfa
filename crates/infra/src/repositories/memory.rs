use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use forum_domain::DomainResult;
use forum_domain::content::{ContentItem, ContentKind};
use forum_domain::error::DomainError;
use forum_domain::ports::BoxFuture;
use forum_domain::ports::content::{AuthorContentQuery, CommentableThreadQuery, ContentRepository};
use forum_domain::ports::subscriptions::SubscriptionRepository;
use forum_domain::ports::users::UserRepository;
use forum_domain::subscriptions::Subscription;
use forum_domain::users::User;
use tokio::sync::RwLock;

fn sort_by_recency_desc(items: &mut [ContentItem]) {
    items.sort_by(|left, right| {
        right
            .updated_at_ms
            .cmp(&left.updated_at_ms)
            .then_with(|| right.content_id.cmp(&left.content_id))
    });
}

fn thread_group_matches(item: &ContentItem, group_ids: &[i64]) -> bool {
    if group_ids.is_empty() {
        return true;
    }
    match &item.kind {
        ContentKind::Thread { group_id, .. } => {
            group_id.is_none_or(|group_id| group_ids.contains(&group_id))
        }
        ContentKind::Comment { .. } => false,
    }
}

#[derive(Default)]
pub struct InMemoryContentRepository {
    by_id: Arc<RwLock<HashMap<String, ContentItem>>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentRepository for InMemoryContentRepository {
    fn create(&self, item: &ContentItem) -> BoxFuture<'_, DomainResult<ContentItem>> {
        let item = item.clone();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            let mut by_id = by_id.write().await;
            if by_id.contains_key(&item.content_id) {
                return Err(DomainError::Conflict);
            }
            by_id.insert(item.content_id.clone(), item.clone());
            Ok(item)
        })
    }

    fn get(&self, content_id: &str) -> BoxFuture<'_, DomainResult<Option<ContentItem>>> {
        let content_id = content_id.to_string();
        let by_id = self.by_id.clone();
        Box::pin(async move { Ok(by_id.read().await.get(&content_id).cloned()) })
    }

    fn list_by_author(
        &self,
        query: &AuthorContentQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let query = query.clone();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            let mut items: Vec<ContentItem> = by_id
                .read()
                .await
                .values()
                .filter(|item| {
                    item.author_id == query.author_id
                        && item.course_id == query.course_id
                        && (!query.public_only || item.is_public())
                })
                .cloned()
                .map(|mut item| {
                    if !query.include_body {
                        item.body = None;
                    }
                    item
                })
                .collect();
            sort_by_recency_desc(&mut items);
            Ok(items)
        })
    }

    fn find_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let wanted: HashSet<String> = thread_ids.iter().cloned().collect();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            Ok(by_id
                .read()
                .await
                .values()
                .filter(|item| item.is_thread() && wanted.contains(&item.content_id))
                .cloned()
                .collect())
        })
    }

    fn list_threads_by_commentable(
        &self,
        query: &CommentableThreadQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let query = query.clone();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            let mut items: Vec<ContentItem> = by_id
                .read()
                .await
                .values()
                .filter(|item| match &item.kind {
                    ContentKind::Thread { commentable_id, .. } => {
                        *commentable_id == query.commentable_id
                            && thread_group_matches(item, &query.group_ids)
                    }
                    ContentKind::Comment { .. } => false,
                })
                .cloned()
                .collect();
            sort_by_recency_desc(&mut items);
            Ok(items)
        })
    }

    fn delete_threads_by_commentable(
        &self,
        commentable_id: &str,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let commentable_id = commentable_id.to_string();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            let mut by_id = by_id.write().await;
            let thread_ids: HashSet<String> = by_id
                .values()
                .filter(|item| {
                    matches!(
                        &item.kind,
                        ContentKind::Thread { commentable_id: owner, .. } if *owner == commentable_id
                    )
                })
                .map(|item| item.content_id.clone())
                .collect();
            by_id.retain(|_, item| !thread_ids.contains(item.owning_thread_id()));
            Ok(thread_ids.len())
        })
    }

    fn record_comment(
        &self,
        thread_id: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContentItem>> {
        let thread_id = thread_id.to_string();
        let by_id = self.by_id.clone();
        Box::pin(async move {
            let mut by_id = by_id.write().await;
            let thread = by_id.get_mut(&thread_id).ok_or(DomainError::NotFound)?;
            match &mut thread.kind {
                ContentKind::Thread { comment_count, .. } => *comment_count += 1,
                ContentKind::Comment { .. } => return Err(DomainError::NotFound),
            }
            thread.updated_at_ms = thread.updated_at_ms.max(updated_at_ms);
            Ok(thread.clone())
        })
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionRepository for InMemorySubscriptionRepository {
    fn subscribe(&self, subscription: &Subscription) -> BoxFuture<'_, DomainResult<Subscription>> {
        let subscription = subscription.clone();
        let subscriptions = self.subscriptions.clone();
        Box::pin(async move {
            let mut subscriptions = subscriptions.write().await;
            let existing = subscriptions.iter().find(|existing| {
                existing.subscriber_id == subscription.subscriber_id
                    && existing.source_id == subscription.source_id
            });
            if let Some(existing) = existing {
                return Ok(existing.clone());
            }
            subscriptions.push(subscription.clone());
            Ok(subscription)
        })
    }

    fn count_followers(
        &self,
        source_ids: &[String],
        exclude_subscriber_id: &str,
    ) -> BoxFuture<'_, DomainResult<u64>> {
        let source_ids: HashSet<String> = source_ids.iter().cloned().collect();
        let exclude_subscriber_id = exclude_subscriber_id.to_string();
        let subscriptions = self.subscriptions.clone();
        Box::pin(async move {
            let followers: HashSet<(String, String)> = subscriptions
                .read()
                .await
                .iter()
                .filter(|subscription| {
                    source_ids.contains(&subscription.source_id)
                        && subscription.subscriber_id != exclude_subscriber_id
                })
                .map(|subscription| {
                    (
                        subscription.subscriber_id.clone(),
                        subscription.source_id.clone(),
                    )
                })
                .collect();
            Ok(followers.len() as u64)
        })
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&user.external_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(user.external_id.clone(), user.clone());
            Ok(user)
        })
    }

    fn get(&self, external_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let external_id = external_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&external_id).cloned()) })
    }

    fn upsert(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let store = self.store.clone();
        Box::pin(async move {
            store
                .write()
                .await
                .insert(user.external_id.clone(), user.clone());
            Ok(user)
        })
    }
}
