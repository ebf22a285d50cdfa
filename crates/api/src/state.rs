use std::sync::Arc;

use forum_domain::activity::{ActivityConfig, ActivityService};
use forum_domain::comments::CommentService;
use forum_domain::ports::content::ContentRepository;
use forum_domain::ports::db::DocumentStoreProbe;
use forum_domain::ports::subscriptions::SubscriptionRepository;
use forum_domain::ports::users::UserRepository;
use forum_domain::stats::SocialStatsService;
use forum_domain::subscriptions::SubscriptionService;
use forum_domain::threads::ThreadService;
use forum_domain::users::UserService;
use forum_infra::config::AppConfig;
use forum_infra::db::{DbConfig, MemoryProbe, SurrealProbe, connect};
use forum_infra::repositories::{
    InMemoryContentRepository, InMemorySubscriptionRepository, InMemoryUserRepository,
    SurrealContentRepository, SurrealSubscriptionRepository, SurrealUserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub users: UserService,
    pub subscriptions: SubscriptionService,
    pub threads: ThreadService,
    pub comments: CommentService,
    pub activity: ActivityService,
    pub social_stats: SocialStatsService,
    pub store_probe: Arc<dyn DocumentStoreProbe>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        if !config.uses_surreal() {
            tracing::info!(backend = %config.data_backend, "using in-memory repositories");
            return Ok(Self::in_memory(config));
        }

        let db_config = DbConfig::from_app_config(&config);
        let client = connect(&db_config).await?;
        Ok(Self::with_repositories(
            config,
            Arc::new(SurrealContentRepository::with_client(client.clone())),
            Arc::new(SurrealSubscriptionRepository::with_client(client.clone())),
            Arc::new(SurrealUserRepository::with_client(client)),
            Arc::new(SurrealProbe::new(db_config)),
        ))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_repositories(
            config,
            Arc::new(InMemoryContentRepository::new()),
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(MemoryProbe),
        )
    }

    pub fn with_repositories(
        config: AppConfig,
        content_repo: Arc<dyn ContentRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
        store_probe: Arc<dyn DocumentStoreProbe>,
    ) -> Self {
        let subscriptions = SubscriptionService::new(subscription_repo.clone());
        let activity = ActivityService::new(
            content_repo.clone(),
            ActivityConfig {
                default_per_page: config.default_per_page,
            },
        );
        Self {
            users: UserService::new(user_repo),
            threads: ThreadService::new(content_repo.clone(), subscriptions.clone()),
            subscriptions,
            comments: CommentService::new(content_repo.clone()),
            activity,
            social_stats: SocialStatsService::new(content_repo, subscription_repo),
            store_probe,
            config,
        }
    }
}
