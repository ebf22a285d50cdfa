pub mod activity;
pub mod comments;
pub mod content;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod stats;
pub mod subscriptions;
pub mod threads;
pub mod users;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
