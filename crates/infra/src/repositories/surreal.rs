use std::sync::Arc;

use forum_domain::DomainResult;
use forum_domain::content::{
    CONTENT_KIND_COMMENT, CONTENT_KIND_THREAD, ContentItem, ContentKind, Votes,
};
use forum_domain::error::DomainError;
use forum_domain::ports::BoxFuture;
use forum_domain::ports::content::{AuthorContentQuery, CommentableThreadQuery, ContentRepository};
use forum_domain::ports::subscriptions::SubscriptionRepository;
use forum_domain::ports::users::UserRepository;
use forum_domain::subscriptions::Subscription;
use forum_domain::users::User;
use serde::{Deserialize, Serialize};
use serde_json::{Value, to_value};
use surrealdb::{Surreal, engine::remote::ws::Client};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

fn map_surreal_error(err: surrealdb::Error) -> DomainError {
    let error_message = err.to_string().to_lowercase();
    if error_message.contains("already exists")
        || error_message.contains("duplicate")
        || error_message.contains("unique")
    {
        return DomainError::Conflict;
    }
    DomainError::Unavailable(format!("surreal query failed: {error_message}"))
}

fn take_rows(response: &mut surrealdb::Response, index: usize) -> DomainResult<Vec<Value>> {
    response
        .take(index)
        .map_err(|err| DomainError::Unavailable(format!("invalid query result: {err}")))
}

fn parse_datetime_ms(value: &Value) -> DomainResult<i64> {
    let raw = value
        .as_str()
        .or_else(|| value.as_object().and_then(|obj| obj.values().find_map(Value::as_str)))
        .ok_or_else(|| DomainError::Validation(format!("invalid datetime payload: {value}")))?;
    let datetime = OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| DomainError::Validation(format!("invalid datetime: {err}")))?;
    Ok((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn to_rfc3339(timestamp_ms: i64) -> DomainResult<String> {
    let datetime = OffsetDateTime::from_unix_timestamp_nanos((timestamp_ms as i128) * 1_000_000)
        .map_err(|err| DomainError::Validation(format!("invalid timestamp: {err}")))?;
    Ok(datetime
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string()))
}

fn count_from_rows(rows: &[Value]) -> u64 {
    rows.first()
        .and_then(|row| row.get("total").or_else(|| row.get("count")))
        .and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_i64().and_then(|number| u64::try_from(number).ok()))
        })
        .unwrap_or(0)
}

#[derive(Clone)]
pub struct SurrealContentRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealContentRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    fn content_projection(include_body: bool) -> String {
        let mut projection = String::from(
            "content_id, author_id, course_id, anonymous, anonymous_to_peers, votes, \
             abuse_flaggers, kind, title, commentable_id, group_id, comment_count, thread_id, \
             parent_ids, updated_at_ms, <string>created_at AS created_at, \
             <string>updated_at AS updated_at",
        );
        if include_body {
            projection.push_str(", body");
        }
        projection
    }

    fn map_rows(rows: Vec<Value>) -> DomainResult<Vec<ContentItem>> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<SurrealContentRow>(row)
                    .map_err(|err| DomainError::Validation(format!("invalid content row: {err}")))
                    .and_then(SurrealContentRow::into_item)
            })
            .collect()
    }

    fn to_create_payload(item: &ContentItem) -> DomainResult<SurrealContentCreateRow> {
        let (title, commentable_id, group_id, comment_count, thread_id, parent_ids) =
            match &item.kind {
                ContentKind::Thread {
                    title,
                    commentable_id,
                    group_id,
                    comment_count,
                } => (
                    Some(title.clone()),
                    Some(commentable_id.clone()),
                    *group_id,
                    Some(*comment_count),
                    None,
                    None,
                ),
                ContentKind::Comment {
                    thread_id,
                    parent_ids,
                } => (
                    None,
                    None,
                    None,
                    None,
                    Some(thread_id.clone()),
                    Some(parent_ids.clone()),
                ),
            };
        Ok(SurrealContentCreateRow {
            content_id: item.content_id.clone(),
            author_id: item.author_id.clone(),
            course_id: item.course_id.clone(),
            anonymous: item.anonymous,
            anonymous_to_peers: item.anonymous_to_peers,
            body: item.body.clone(),
            votes: item.votes.clone(),
            abuse_flaggers: item.abuse_flaggers.clone(),
            kind: item.kind_name().to_string(),
            title,
            commentable_id,
            group_id,
            comment_count,
            thread_id,
            parent_ids,
            created_at: to_rfc3339(item.created_at_ms)?,
            updated_at: to_rfc3339(item.updated_at_ms)?,
            updated_at_ms: item.updated_at_ms,
        })
    }

    /// Orders on the numeric `updated_at_ms`; the projected `updated_at` is a
    /// string and would not sort chronologically.
    fn author_listing_statement(query: &AuthorContentQuery) -> String {
        let mut clauses = vec!["author_id = $author_id", "course_id = $course_id"];
        if query.public_only {
            clauses.push("anonymous = false");
            clauses.push("anonymous_to_peers = false");
        }
        format!(
            "SELECT {} FROM forum_content WHERE {} \
             ORDER BY updated_at_ms DESC, content_id DESC",
            Self::content_projection(query.include_body),
            clauses.join(" AND ")
        )
    }

    async fn select_by_content_id(&self, content_id: String) -> DomainResult<Option<ContentItem>> {
        let projection = Self::content_projection(true);
        let mut response = self
            .client
            .query(format!(
                "SELECT {projection} FROM forum_content WHERE content_id = $content_id LIMIT 1"
            ))
            .bind(("content_id", content_id))
            .await
            .map_err(map_surreal_error)?;
        let rows = take_rows(&mut response, 0)?;
        Ok(Self::map_rows(rows)?.into_iter().next())
    }
}

impl ContentRepository for SurrealContentRepository {
    fn create(&self, item: &ContentItem) -> BoxFuture<'_, DomainResult<ContentItem>> {
        let item = item.clone();
        let payload = match Self::to_create_payload(&item) {
            Ok(payload) => payload,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let client = self.client.clone();
        Box::pin(async move {
            let payload = to_value(payload)
                .map_err(|err| DomainError::Validation(format!("invalid payload: {err}")))?;
            client
                .query(
                    "CREATE type::thing('forum_content', $payload.content_id) CONTENT $payload; \
                     UPDATE type::thing('forum_content', $payload.content_id) SET \
                     created_at = <datetime>$payload.created_at, \
                     updated_at = <datetime>$payload.updated_at",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?
                .check()
                .map_err(map_surreal_error)?;
            Ok(item)
        })
    }

    fn get(&self, content_id: &str) -> BoxFuture<'_, DomainResult<Option<ContentItem>>> {
        let content_id = content_id.to_string();
        Box::pin(async move { self.select_by_content_id(content_id).await })
    }

    fn list_by_author(
        &self,
        query: &AuthorContentQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let query = query.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(Self::author_listing_statement(&query))
                .bind(("author_id", query.author_id.clone()))
                .bind(("course_id", query.course_id.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response, 0)?;
            Self::map_rows(rows)
        })
    }

    fn find_threads_by_ids(
        &self,
        thread_ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let thread_ids = thread_ids.to_vec();
        let client = self.client.clone();
        Box::pin(async move {
            if thread_ids.is_empty() {
                return Ok(Vec::new());
            }
            let projection = Self::content_projection(true);
            let mut response = client
                .query(format!(
                    "SELECT {projection} FROM forum_content \
                     WHERE kind = $kind AND content_id IN $thread_ids"
                ))
                .bind(("kind", CONTENT_KIND_THREAD))
                .bind(("thread_ids", thread_ids))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response, 0)?;
            Self::map_rows(rows)
        })
    }

    fn list_threads_by_commentable(
        &self,
        query: &CommentableThreadQuery,
    ) -> BoxFuture<'_, DomainResult<Vec<ContentItem>>> {
        let query = query.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut clauses = vec!["kind = $kind", "commentable_id = $commentable_id"];
            if !query.group_ids.is_empty() {
                clauses.push("(group_id IN $group_ids OR group_id = NONE)");
            }
            let projection = Self::content_projection(true);
            let statement = format!(
                "SELECT {projection} FROM forum_content WHERE {} \
                 ORDER BY updated_at_ms DESC, content_id DESC",
                clauses.join(" AND ")
            );
            let mut response = client
                .query(statement)
                .bind(("kind", CONTENT_KIND_THREAD))
                .bind(("commentable_id", query.commentable_id.clone()))
                .bind(("group_ids", query.group_ids.clone()))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response, 0)?;
            Self::map_rows(rows)
        })
    }

    fn delete_threads_by_commentable(
        &self,
        commentable_id: &str,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let commentable_id = commentable_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "LET $doomed = (SELECT VALUE content_id FROM forum_content \
                     WHERE kind = $thread_kind AND commentable_id = $commentable_id); \
                     DELETE forum_content WHERE kind = $comment_kind AND thread_id IN $doomed; \
                     DELETE forum_content WHERE kind = $thread_kind AND content_id IN $doomed \
                     RETURN BEFORE;",
                )
                .bind(("thread_kind", CONTENT_KIND_THREAD))
                .bind(("comment_kind", CONTENT_KIND_COMMENT))
                .bind(("commentable_id", commentable_id))
                .await
                .map_err(map_surreal_error)?;
            let deleted = take_rows(&mut response, 2)?;
            Ok(deleted.len())
        })
    }

    fn record_comment(
        &self,
        thread_id: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContentItem>> {
        let thread_id = thread_id.to_string();
        Box::pin(async move {
            let updated_at = to_rfc3339(updated_at_ms)?;
            let mut response = self
                .client
                .query(
                    "UPDATE forum_content SET \
                     comment_count += 1, \
                     updated_at = <datetime>$updated_at, \
                     updated_at_ms = $updated_at_ms \
                     WHERE kind = $kind AND content_id = $thread_id",
                )
                .bind(("kind", CONTENT_KIND_THREAD))
                .bind(("thread_id", thread_id.clone()))
                .bind(("updated_at", updated_at))
                .bind(("updated_at_ms", updated_at_ms))
                .await
                .map_err(map_surreal_error)?;
            let updated = take_rows(&mut response, 0)?;
            if updated.is_empty() {
                return Err(DomainError::NotFound);
            }
            self.select_by_content_id(thread_id)
                .await?
                .ok_or(DomainError::NotFound)
        })
    }
}

#[derive(Clone)]
pub struct SurrealSubscriptionRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealSubscriptionRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }
}

impl SubscriptionRepository for SurrealSubscriptionRepository {
    fn subscribe(&self, subscription: &Subscription) -> BoxFuture<'_, DomainResult<Subscription>> {
        let subscription = subscription.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let payload = to_value(SurrealSubscriptionRow::from(&subscription)).map_err(|err| {
                DomainError::Validation(format!("invalid subscription payload: {err}"))
            })?;
            client
                .query(
                    "IF (SELECT VALUE subscriber_id FROM subscription \
                     WHERE subscriber_id = $payload.subscriber_id \
                     AND source_id = $payload.source_id LIMIT 1) = [] \
                     { CREATE subscription CONTENT $payload };",
                )
                .bind(("payload", payload))
                .await
                .map_err(map_surreal_error)?
                .check()
                .map_err(map_surreal_error)?;
            Ok(subscription)
        })
    }

    fn count_followers(
        &self,
        source_ids: &[String],
        exclude_subscriber_id: &str,
    ) -> BoxFuture<'_, DomainResult<u64>> {
        let source_ids = source_ids.to_vec();
        let exclude_subscriber_id = exclude_subscriber_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            if source_ids.is_empty() {
                return Ok(0);
            }
            let mut response = client
                .query(
                    "SELECT count() AS total FROM ( \
                     SELECT subscriber_id, source_id FROM subscription \
                     WHERE source_id IN $source_ids AND subscriber_id != $exclude \
                     GROUP BY subscriber_id, source_id) GROUP ALL",
                )
                .bind(("source_ids", source_ids))
                .bind(("exclude", exclude_subscriber_id))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response, 0)?;
            Ok(count_from_rows(&rows))
        })
    }
}

#[derive(Clone)]
pub struct SurrealUserRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealUserRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    fn map_user_row(row: Value) -> DomainResult<User> {
        serde_json::from_value::<SurrealUserRow>(row)
            .map_err(|err| DomainError::Validation(format!("invalid user row: {err}")))
            .and_then(|row| {
                Ok(User {
                    external_id: row.external_id,
                    username: row.username,
                    default_sort_key: row.default_sort_key,
                    created_at_ms: parse_datetime_ms(&row.created_at)?,
                    updated_at_ms: parse_datetime_ms(&row.updated_at)?,
                })
            })
    }

    fn user_payload(user: &User) -> DomainResult<Value> {
        to_value(SurrealUserWriteRow {
            external_id: user.external_id.clone(),
            username: user.username.clone(),
            default_sort_key: user.default_sort_key.clone(),
            created_at: to_rfc3339(user.created_at_ms)?,
            updated_at: to_rfc3339(user.updated_at_ms)?,
        })
        .map_err(|err| DomainError::Validation(format!("invalid user payload: {err}")))
    }

    async fn write_user(&self, statement: &'static str, user: &User) -> DomainResult<User> {
        let payload = Self::user_payload(user)?;
        self.client
            .query(statement)
            .bind(("payload", payload))
            .await
            .map_err(map_surreal_error)?
            .check()
            .map_err(map_surreal_error)?;
        Ok(user.clone())
    }
}

impl UserRepository for SurrealUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        Box::pin(async move {
            self.write_user(
                "CREATE type::thing('forum_user', $payload.external_id) SET \
                 external_id = $payload.external_id, \
                 username = $payload.username, \
                 default_sort_key = $payload.default_sort_key, \
                 created_at = <datetime>$payload.created_at, \
                 updated_at = <datetime>$payload.updated_at",
                &user,
            )
            .await
        })
    }

    fn get(&self, external_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let external_id = external_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query(
                    "SELECT external_id, username, default_sort_key, \
                     <string>created_at AS created_at, <string>updated_at AS updated_at \
                     FROM forum_user WHERE external_id = $external_id LIMIT 1",
                )
                .bind(("external_id", external_id))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response, 0)?;
            rows.into_iter().next().map(Self::map_user_row).transpose()
        })
    }

    fn upsert(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        Box::pin(async move {
            self.write_user(
                "UPSERT type::thing('forum_user', $payload.external_id) SET \
                 external_id = $payload.external_id, \
                 username = $payload.username, \
                 default_sort_key = $payload.default_sort_key, \
                 created_at = <datetime>$payload.created_at, \
                 updated_at = <datetime>$payload.updated_at",
                &user,
            )
            .await
        })
    }
}

#[derive(Debug, Serialize)]
struct SurrealContentCreateRow {
    content_id: String,
    author_id: String,
    course_id: String,
    anonymous: bool,
    anonymous_to_peers: bool,
    body: Option<String>,
    votes: Votes,
    abuse_flaggers: Vec<String>,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commentable_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_ids: Option<Vec<String>>,
    created_at: String,
    updated_at: String,
    updated_at_ms: i64,
}

#[derive(Debug, Deserialize)]
struct SurrealContentRow {
    content_id: String,
    author_id: String,
    course_id: String,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    anonymous_to_peers: bool,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    votes: Votes,
    #[serde(default)]
    abuse_flaggers: Vec<String>,
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    commentable_id: Option<String>,
    #[serde(default)]
    group_id: Option<i64>,
    #[serde(default)]
    comment_count: Option<u64>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    parent_ids: Option<Vec<String>>,
    created_at: Value,
    updated_at: Value,
    #[serde(default)]
    updated_at_ms: Option<i64>,
}

impl SurrealContentRow {
    fn into_item(self) -> DomainResult<ContentItem> {
        let kind = match self.kind.as_str() {
            CONTENT_KIND_THREAD => ContentKind::Thread {
                title: self.title.unwrap_or_default(),
                commentable_id: self.commentable_id.unwrap_or_default(),
                group_id: self.group_id,
                comment_count: self.comment_count.unwrap_or(0),
            },
            CONTENT_KIND_COMMENT => ContentKind::Comment {
                thread_id: self.thread_id.ok_or_else(|| {
                    DomainError::Validation(format!(
                        "comment {} has no thread_id",
                        self.content_id
                    ))
                })?,
                parent_ids: self.parent_ids.unwrap_or_default(),
            },
            other => {
                return Err(DomainError::Validation(format!(
                    "unknown content kind '{other}'"
                )));
            }
        };
        Ok(ContentItem {
            created_at_ms: parse_datetime_ms(&self.created_at)?,
            updated_at_ms: match self.updated_at_ms {
                Some(updated_at_ms) => updated_at_ms,
                None => parse_datetime_ms(&self.updated_at)?,
            },
            content_id: self.content_id,
            author_id: self.author_id,
            course_id: self.course_id,
            anonymous: self.anonymous,
            anonymous_to_peers: self.anonymous_to_peers,
            body: self.body,
            votes: self.votes,
            abuse_flaggers: self.abuse_flaggers,
            kind,
        })
    }
}

#[derive(Debug, Serialize)]
struct SurrealSubscriptionRow {
    subscriber_id: String,
    source_id: String,
    source_type: String,
    created_at_ms: i64,
}

impl From<&Subscription> for SurrealSubscriptionRow {
    fn from(subscription: &Subscription) -> Self {
        Self {
            subscriber_id: subscription.subscriber_id.clone(),
            source_id: subscription.source_id.clone(),
            source_type: subscription.source_type.clone(),
            created_at_ms: subscription.created_at_ms,
        }
    }
}

#[derive(Debug, Serialize)]
struct SurrealUserWriteRow {
    external_id: String,
    username: Option<String>,
    default_sort_key: String,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct SurrealUserRow {
    external_id: String,
    #[serde(default)]
    username: Option<String>,
    default_sort_key: String,
    created_at: Value,
    updated_at: Value,
}
