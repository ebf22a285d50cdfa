use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::content::{ContentItem, ContentRole};
use crate::ports::content::{AuthorContentQuery, ContentRepository};
use crate::ports::subscriptions::SubscriptionRepository;
use crate::util::{normalize_scope, require_non_empty};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialStats {
    pub num_threads: u64,
    pub num_comments: u64,
    pub num_replies: u64,
    pub num_upvotes: u64,
    pub num_downvotes: u64,
    pub num_flagged: u64,
    pub num_thread_followers: u64,
    pub num_comments_generated: u64,
}

/// Running totals for one pass over a user's content.
#[derive(Debug, Default)]
pub struct StatsTally {
    stats: SocialStats,
    thread_ids: Vec<String>,
}

impl StatsTally {
    pub fn record(&mut self, item: &ContentItem, user_id: &str) {
        match item.role() {
            ContentRole::Thread => {
                self.stats.num_threads += 1;
                self.stats.num_comments_generated += item.comment_count();
                self.thread_ids.push(item.content_id.clone());
            }
            ContentRole::Comment => self.stats.num_comments += 1,
            ContentRole::Reply => self.stats.num_replies += 1,
        }

        let votes = item.votes.counts_excluding(user_id);
        self.stats.num_upvotes += votes.up;
        self.stats.num_downvotes += votes.down;
        self.stats.num_flagged += item.abuse_flaggers.len() as u64;
    }

    pub fn thread_ids(&self) -> &[String] {
        &self.thread_ids
    }

    pub fn finish(self, num_thread_followers: u64) -> SocialStats {
        SocialStats {
            num_thread_followers,
            ..self.stats
        }
    }
}

#[derive(Clone)]
pub struct SocialStatsService {
    content_repo: Arc<dyn ContentRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
}

impl SocialStatsService {
    pub fn new(
        content_repo: Arc<dyn ContentRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            content_repo,
            subscription_repo,
        }
    }

    /// Returns `Ok(None)` without querying the store when no course is given.
    pub async fn social_stats(
        &self,
        user_id: &str,
        course_id: Option<&str>,
    ) -> DomainResult<Option<SocialStats>> {
        require_non_empty("user_id", user_id)?;
        let Some(course_id) = normalize_scope(course_id) else {
            return Ok(None);
        };

        let contents = self
            .content_repo
            .list_by_author(&AuthorContentQuery {
                author_id: user_id.to_string(),
                course_id: course_id.to_string(),
                public_only: false,
                include_body: false,
            })
            .await?;

        let mut tally = StatsTally::default();
        for item in &contents {
            tally.record(item, user_id);
        }

        let num_thread_followers = if tally.thread_ids().is_empty() {
            0
        } else {
            self.subscription_repo
                .count_followers(tally.thread_ids(), user_id)
                .await?
        };

        let stats = tally.finish(num_thread_followers);
        tracing::debug!(
            user_id,
            course_id,
            contents = contents.len(),
            num_threads = stats.num_threads,
            num_thread_followers = stats.num_thread_followers,
            "computed social stats"
        );
        Ok(Some(stats))
    }
}
