use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::users::User;

pub trait UserRepository: Send + Sync {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>>;

    fn get(&self, external_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>>;

    fn upsert(&self, user: &User) -> BoxFuture<'_, DomainResult<User>>;
}
