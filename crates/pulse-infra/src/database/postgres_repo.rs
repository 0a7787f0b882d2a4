//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SelectTwo, Set, Statement,
};
use uuid::Uuid;

use pulse_core::domain::{
    AuthorPosts, AuthoredComment, AuthoredPost, Comment, FeedItem, Page, Post, PostUpdate, User,
    UserSummary,
};
use pulse_core::error::RepoError;
use pulse_core::ports::{
    CommentRepository, FeedRepository, FollowRepository, LikeRepository, PostRepository,
    UserRepository,
};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::like::{self, Entity as LikeEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, contains_pattern, query_error, write_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository. Also serves the feed read model.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL follow graph repository.
pub type PostgresFollowRepository = PostgresBaseRepository<FollowEntity>;

/// PostgreSQL like repository.
pub type PostgresLikeRepository = PostgresBaseRepository<LikeEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

fn timestamp(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.into()
}

/// Visibility predicate for posts evaluated against `as_of`.
fn visible_at(as_of: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(post::Column::IsDeleted.eq(false))
        .add(post::Column::IsPublished.eq(true))
        .add(
            Condition::any()
                .add(post::Column::ScheduledAt.is_null())
                .add(post::Column::ScheduledAt.lte(timestamp(as_of))),
        )
}

/// Pair joined rows into read models. Rows whose author is gone drop out.
fn authored_posts(rows: Vec<(post::Model, Option<user::Model>)>) -> Vec<AuthoredPost> {
    rows.into_iter().filter_map(authored_post).collect()
}

fn authored_post((post, author): (post::Model, Option<user::Model>)) -> Option<AuthoredPost> {
    Some(AuthoredPost {
        post: post.into(),
        author: author?.into(),
    })
}

/// Visible posts containing `query` with their authors, newest first.
pub(super) fn search_select(
    query: &str,
    as_of: DateTime<Utc>,
) -> SelectTwo<PostEntity, UserEntity> {
    PostEntity::find()
        .filter(visible_at(as_of))
        .filter(
            Expr::expr(Func::lower(Expr::col((post::Entity, post::Column::Content))))
                .like(contains_pattern(query).as_str()),
        )
        .find_also_related(UserEntity)
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
}

/// Comments on a post with their authors, oldest first.
pub(super) fn comments_select(post_id: Uuid) -> SelectTwo<CommentEntity, UserEntity> {
    CommentEntity::find()
        .filter(comment::Column::PostId.eq(post_id))
        .find_also_related(UserEntity)
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, new_user: User) -> Result<User, RepoError> {
        let model = user::ActiveModel::from(new_user)
            .insert(self.conn())
            .await
            .map_err(write_error)?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.find_model(id).await?.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    async fn search(&self, query: &str, limit: u64) -> Result<Vec<UserSummary>, RepoError> {
        let pattern = contains_pattern(query);
        let users = UserEntity::find()
            .filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                            .like(pattern.as_str()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::FullName)))
                            .like(pattern.as_str()),
                    ),
            )
            .order_by_asc(user::Column::Username)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(users.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, new_post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel::from(new_post)
            .insert(self.conn())
            .await
            .map_err(write_error)?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.find_model(id).await?.map(Into::into))
    }

    async fn find_authored(&self, id: Uuid) -> Result<Option<AuthoredPost>, RepoError> {
        let row = PostEntity::find_by_id(id)
            .find_also_related(UserEntity)
            .one(self.conn())
            .await
            .map_err(query_error)?;

        Ok(row.and_then(authored_post))
    }

    async fn find_by_author(
        &self,
        author_id: Uuid,
        scope: AuthorPosts,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError> {
        let mut select = PostEntity::find()
            .filter(post::Column::UserId.eq(author_id))
            .filter(post::Column::IsDeleted.eq(false));
        if scope == AuthorPosts::Visible {
            select = select.filter(visible_at(as_of));
        }

        let rows = select
            .find_also_related(UserEntity)
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(authored_posts(rows))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        changes: &PostUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, RepoError> {
        let mut update = PostEntity::update_many()
            .col_expr(post::Column::UpdatedAt, Expr::value(timestamp(now)))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::UserId.eq(author_id))
            .filter(post::Column::IsDeleted.eq(false));

        if let Some(content) = &changes.content {
            update = update.col_expr(post::Column::Content, Expr::value(content.clone()));
        }
        if let Some(media_url) = &changes.media_url {
            // `None` clears the column.
            update = update.col_expr(post::Column::MediaUrl, Expr::value(media_url.clone()));
        }
        if let Some(enabled) = changes.comments_enabled {
            update = update.col_expr(post::Column::CommentsEnabled, Expr::value(enabled));
        }

        let updated = update
            .exec_with_returning(self.conn())
            .await
            .map_err(query_error)?;

        Ok(updated.into_iter().next().map(Into::into))
    }

    async fn soft_delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result = PostEntity::update_many()
            .col_expr(post::Column::IsDeleted, Expr::value(true))
            .filter(post::Column::Id.eq(id))
            .filter(post::Column::UserId.eq(author_id))
            .filter(post::Column::IsDeleted.eq(false))
            .exec(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn search(
        &self,
        query: &str,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<AuthoredPost>, RepoError> {
        let rows = search_select(query, as_of)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(authored_posts(rows))
    }

    async fn publish_due(&self, as_of: DateTime<Utc>) -> Result<Vec<Uuid>, RepoError> {
        let published = PostEntity::update_many()
            .col_expr(post::Column::IsPublished, Expr::value(true))
            .filter(post::Column::IsPublished.eq(false))
            .filter(post::Column::IsDeleted.eq(false))
            .filter(post::Column::ScheduledAt.lte(timestamp(as_of)))
            .exec_with_returning(self.conn())
            .await
            .map_err(query_error)?;

        Ok(published.into_iter().map(|model| model.id).collect())
    }
}

const FEED_SQL: &str = r#"
SELECT p.id, p.user_id, p.content, p.media_url, p.comments_enabled, p.scheduled_at,
       p.is_published, p.is_deleted, p.created_at, p.updated_at,
       u.username, u.full_name,
       (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
FROM posts p
JOIN users u ON u.id = p.user_id
WHERE (p.user_id = $1
       OR p.user_id IN (SELECT f.followee_id FROM follows f WHERE f.follower_id = $1))
  AND p.is_deleted = FALSE
  AND p.is_published = TRUE
  AND (p.scheduled_at IS NULL OR p.scheduled_at <= $2)
ORDER BY p.created_at DESC, p.id DESC
LIMIT $3 OFFSET $4
"#;

#[derive(Debug, FromQueryResult)]
struct FeedRow {
    id: Uuid,
    user_id: Uuid,
    content: String,
    media_url: Option<String>,
    comments_enabled: bool,
    scheduled_at: Option<DateTimeWithTimeZone>,
    is_published: bool,
    is_deleted: bool,
    created_at: DateTimeWithTimeZone,
    updated_at: Option<DateTimeWithTimeZone>,
    username: String,
    full_name: String,
    like_count: i64,
    comment_count: i64,
}

impl From<FeedRow> for FeedItem {
    fn from(row: FeedRow) -> Self {
        Self {
            post: Post {
                id: row.id,
                user_id: row.user_id,
                content: row.content,
                media_url: row.media_url,
                comments_enabled: row.comments_enabled,
                scheduled_at: row.scheduled_at.map(Into::into),
                is_published: row.is_published,
                is_deleted: row.is_deleted,
                created_at: row.created_at.into(),
                updated_at: row.updated_at.map(Into::into),
            },
            username: row.username,
            full_name: row.full_name,
            like_count: row.like_count,
            comment_count: row.comment_count,
        }
    }
}

#[async_trait]
impl FeedRepository for PostgresPostRepository {
    async fn feed(
        &self,
        viewer: Uuid,
        page: Page,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<FeedItem>, RepoError> {
        let statement = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            FEED_SQL,
            [
                viewer.into(),
                timestamp(as_of).into(),
                (page.limit as i64).into(),
                (page.offset as i64).into(),
            ],
        );

        let rows = FeedRow::find_by_statement(statement)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        tracing::debug!(viewer = %viewer, items = rows.len(), "Feed composed");
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let edge = follow::ActiveModel {
            follower_id: Set(follower_id),
            followee_id: Set(followee_id),
            created_at: Set(timestamp(Utc::now())),
        };

        let inserted = FollowEntity::insert(edge)
            .on_conflict(
                OnConflict::columns([follow::Column::FollowerId, follow::Column::FolloweeId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await
            .map_err(write_error)?;

        Ok(inserted > 0)
    }

    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        let result = FollowEntity::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .exec(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
        Ok(self.find_model((follower_id, followee_id)).await?.is_some())
    }

    async fn following(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError> {
        let followees = Query::select()
            .column(follow::Column::FolloweeId)
            .from(FollowEntity)
            .and_where(follow::Column::FollowerId.eq(user_id))
            .to_owned();

        let users = UserEntity::find()
            .filter(user::Column::Id.in_subquery(followees))
            .order_by_asc(user::Column::Username)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    async fn followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>, RepoError> {
        let followers = Query::select()
            .column(follow::Column::FollowerId)
            .from(FollowEntity)
            .and_where(follow::Column::FolloweeId.eq(user_id))
            .to_owned();

        let users = UserEntity::find()
            .filter(user::Column::Id.in_subquery(followers))
            .order_by_asc(user::Column::Username)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(self.conn())
            .await
            .map_err(query_error)
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .count(self.conn())
            .await
            .map_err(query_error)
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn insert(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let like = like::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(timestamp(Utc::now())),
        };

        let inserted = LikeEntity::insert(like)
            .on_conflict(
                OnConflict::columns([like::Column::UserId, like::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await
            .map_err(write_error)?;

        Ok(inserted > 0)
    }

    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let result = LikeEntity::delete_many()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.eq(post_id))
            .exec(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        Ok(self.find_model((user_id, post_id)).await?.is_some())
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        LikeEntity::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(self.conn())
            .await
            .map_err(query_error)
    }

    async fn posts_liked_by(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let likes = LikeEntity::find()
            .filter(like::Column::UserId.eq(user_id))
            .order_by_desc(like::Column::CreatedAt)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(likes.into_iter().map(|like| like.post_id).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, new_comment: Comment) -> Result<Comment, RepoError> {
        let model = comment::ActiveModel::from(new_comment)
            .insert(self.conn())
            .await
            .map_err(write_error)?;
        Ok(model.into())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        author_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Comment>, RepoError> {
        let updated = CommentEntity::update_many()
            .col_expr(comment::Column::Content, Expr::value(content))
            .col_expr(comment::Column::UpdatedAt, Expr::value(timestamp(now)))
            .filter(comment::Column::Id.eq(id))
            .filter(comment::Column::UserId.eq(author_id))
            .exec_with_returning(self.conn())
            .await
            .map_err(query_error)?;

        Ok(updated.into_iter().next().map(Into::into))
    }

    async fn delete_owned(&self, id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let result = CommentEntity::delete_many()
            .filter(comment::Column::Id.eq(id))
            .filter(comment::Column::UserId.eq(author_id))
            .exec(self.conn())
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Page,
    ) -> Result<Vec<AuthoredComment>, RepoError> {
        let rows = comments_select(post_id)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.conn())
            .await
            .map_err(query_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(comment, author)| {
                Some(AuthoredComment {
                    comment: comment.into(),
                    author: author?.into(),
                })
            })
            .collect())
    }
}
