use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::subscriptions::Subscription;

pub trait SubscriptionRepository: Send + Sync {
    fn subscribe(&self, subscription: &Subscription) -> BoxFuture<'_, DomainResult<Subscription>>;

    /// Distinct (subscriber, source) follows of any of `source_ids`, not
    /// counting `exclude_subscriber_id`. A subscriber following two of the
    /// sources counts twice.
    fn count_followers(
        &self,
        source_ids: &[String],
        exclude_subscriber_id: &str,
    ) -> BoxFuture<'_, DomainResult<u64>>;
}
