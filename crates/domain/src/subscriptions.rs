use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::ports::subscriptions::SubscriptionRepository;
use crate::util::{now_ms, require_non_empty};

pub const SOURCE_TYPE_THREAD: &str = "thread";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber_id: String,
    pub source_id: String,
    pub source_type: String,
    pub created_at_ms: i64,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repository: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionService {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    pub async fn follow_thread(
        &self,
        subscriber_id: &str,
        thread_id: &str,
    ) -> DomainResult<Subscription> {
        require_non_empty("subscriber_id", subscriber_id)?;
        require_non_empty("source_id", thread_id)?;
        let subscription = Subscription {
            subscriber_id: subscriber_id.to_string(),
            source_id: thread_id.to_string(),
            source_type: SOURCE_TYPE_THREAD.to_string(),
            created_at_ms: now_ms(),
        };
        self.repository.subscribe(&subscription).await
    }
}
