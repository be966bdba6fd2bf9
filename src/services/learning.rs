//! Learning articles and the completion reward.

use std::collections::HashMap;

use diesel_async::AsyncConnection;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    Ledger,
    miles::{Entry, post_entry},
    non_blank,
    non_negative,
    optional_text,
    referenced,
    required,
    users_by_id,
};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::{ArticleCategory, RelatedKind, TransactionKind},
    models::{ArticleChanges, LearningArticle, LearningCompletion, NewLearningArticle},
    views::ArticleView,
};

/// Rating recorded when a completion omits one.
pub const DEFAULT_RATING: i32 = 5;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: Option<String>,
    pub content_url: Option<String>,
    pub miles_reward: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInput {
    pub comprehension_rating: Option<i32>,
}

/// Result of completing an article.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub miles_earned: i32,
    pub balance: i32,
}

/// Category filter from a query string; `all` or nothing means unfiltered.
///
/// # Errors
/// Returns `Validation` for unknown categories.
pub fn category_filter(raw: Option<&str>) -> ServiceResult<Option<ArticleCategory>> {
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(name) => Ok(Some(name.parse()?)),
    }
}

async fn project(
    conn: &mut DbConnection,
    who: &Principal,
    articles: Vec<LearningArticle>,
) -> ServiceResult<Vec<ArticleView>> {
    let ids: Vec<i32> = articles.iter().map(|a| a.id).collect();
    let creators = users_by_id(conn, articles.iter().map(|a| a.created_by)).await?;
    let counts: HashMap<i32, i64> = db::learning::completion_counts(conn, &ids)
        .await?
        .into_iter()
        .collect();
    let ratings: HashMap<i32, i32> = db::learning::completions_by_user(conn, who.user_id, &ids)
        .await?
        .into_iter()
        .map(|c| (c.article_id, c.rating))
        .collect();
    articles
        .iter()
        .map(|article| -> ServiceResult<ArticleView> {
            let creator = referenced(&creators, article.created_by)?;
            let count = counts.get(&article.id).copied().unwrap_or_default();
            Ok(ArticleView::build(article, creator, count)?
                .for_viewer(ratings.get(&article.id).copied()))
        })
        .collect()
}

async fn find_article(conn: &mut DbConnection, article_id: i32) -> ServiceResult<LearningArticle> {
    db::learning::find_article(conn, article_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("article"))
}

async fn article_view(
    conn: &mut DbConnection,
    who: &Principal,
    article: LearningArticle,
) -> ServiceResult<ArticleView> {
    project(conn, who, vec![article])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found("article"))
}

/// Articles newest first, optionally restricted to one category.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn list_articles(
    conn: &mut DbConnection,
    who: &Principal,
    category: Option<ArticleCategory>,
) -> ServiceResult<Vec<ArticleView>> {
    let articles =
        db::learning::list_articles(conn, category.map(ArticleCategory::as_str)).await?;
    project(conn, who, articles).await
}

/// One article with the caller's completion state.
///
/// # Errors
/// Returns `NotFound` for unknown ids.
pub async fn get_article(
    conn: &mut DbConnection,
    who: &Principal,
    article_id: i32,
) -> ServiceResult<ArticleView> {
    let article = find_article(conn, article_id).await?;
    article_view(conn, who, article).await
}

/// Publish an article.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `Validation` for missing
/// fields, unknown categories or a negative reward.
pub async fn create_article(
    conn: &mut DbConnection,
    who: &Principal,
    input: ArticleInput,
) -> ServiceResult<ArticleView> {
    require_admin(who)?;
    let title = required("title", input.title)?;
    let category: ArticleCategory = required("category", input.category)?.parse()?;
    let content_url = required("contentUrl", input.content_url)?;
    let subtitle = optional_text(input.subtitle);
    let cover = optional_text(input.cover_image_url);
    let article = db::learning::create_article(
        conn,
        &NewLearningArticle {
            title: &title,
            subtitle: subtitle.as_deref(),
            cover_image_url: cover.as_deref(),
            category: category.as_str(),
            content_url: &content_url,
            miles_reward: non_negative("milesReward", input.miles_reward.unwrap_or_default())?,
            created_by: who.user_id,
            created_at: db::now(),
        },
    )
    .await?;
    info!(article_id = article.id, "learning article created");
    article_view(conn, who, article).await
}

/// Apply a partial update.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `NotFound` for unknown ids and
/// `Validation` for unknown categories or a negative reward.
pub async fn update_article(
    conn: &mut DbConnection,
    who: &Principal,
    article_id: i32,
    input: ArticleInput,
) -> ServiceResult<ArticleView> {
    require_admin(who)?;
    let category = input
        .category
        .as_deref()
        .map(str::parse::<ArticleCategory>)
        .transpose()?;
    let changes = ArticleChanges {
        title: non_blank("title", input.title)?,
        subtitle: input.subtitle,
        cover_image_url: input.cover_image_url,
        category: category.map(|c| c.as_str().to_owned()),
        content_url: non_blank("contentUrl", input.content_url)?,
        miles_reward: input
            .miles_reward
            .map(|m| non_negative("milesReward", m))
            .transpose()?,
    };
    let article = db::learning::update_article(conn, article_id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("article"))?;
    article_view(conn, who, article).await
}

/// Delete an article and its completions.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_article(
    conn: &mut DbConnection,
    who: &Principal,
    article_id: i32,
) -> ServiceResult<()> {
    require_admin(who)?;
    super::found(
        db::learning::delete_article(conn, article_id).await?,
        "article",
    )?;
    info!(article_id, "learning article deleted");
    Ok(())
}

fn rating(raw: Option<i32>) -> ServiceResult<i32> {
    let rating = raw.unwrap_or(DEFAULT_RATING);
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(ServiceError::Validation(
            "comprehensionRating must be between 1 and 5".to_owned(),
        ))
    }
}

/// Mark an article as completed and award its Miles.
///
/// The completion row, the balance change and the ledger entry commit
/// together.
///
/// # Errors
/// Returns `NotFound` for unknown ids, `Validation` for a rating outside
/// 1..=5 and `Conflict` when the caller already completed the article.
pub async fn complete(
    conn: &mut DbConnection,
    ledger: &Ledger,
    who: &Principal,
    article_id: i32,
    input: CompletionInput,
) -> ServiceResult<CompletionOutcome> {
    let rating = rating(input.comprehension_rating)?;
    let user_id = who.user_id;
    let _gate = ledger.lock().await;
    let outcome = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                let article = find_article(conn, article_id).await?;
                if !db::learning::completions_by_user(conn, user_id, &[article_id])
                    .await?
                    .is_empty()
                {
                    return Err(ServiceError::Conflict(
                        "this article has already been completed".to_owned(),
                    ));
                }
                db::learning::create_completion(
                    conn,
                    &LearningCompletion {
                        article_id,
                        user_id,
                        rating,
                        completed_at: db::now(),
                    },
                )
                .await?;
                if article.miles_reward == 0 {
                    let balance = db::ledger::balance(conn, user_id)
                        .await?
                        .ok_or_else(|| ServiceError::not_found("user"))?;
                    return Ok(CompletionOutcome {
                        miles_earned: 0,
                        balance,
                    });
                }
                let description = format!("Completed learning article \"{}\"", article.title);
                let balance = post_entry(
                    conn,
                    &Entry {
                        user_id,
                        kind: TransactionKind::Earn,
                        amount: article.miles_reward,
                        description: &description,
                        related_id: Some(article_id),
                        related_type: Some(RelatedKind::Learning),
                    },
                )
                .await?;
                Ok(CompletionOutcome {
                    miles_earned: article.miles_reward,
                    balance,
                })
            })
        })
        .await?;
    info!(
        article_id,
        user_id,
        miles = outcome.miles_earned,
        "learning article completed"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, Ok(5))]
    #[case(Some(1), Ok(1))]
    #[case(Some(5), Ok(5))]
    #[case(Some(0), Err(()))]
    #[case(Some(6), Err(()))]
    fn ratings_default_and_stay_in_range(#[case] raw: Option<i32>, #[case] expected: Result<i32, ()>) {
        assert_eq!(rating(raw).map_err(|_| ()), expected);
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("all"), None)]
    #[case(Some("english"), Some(ArticleCategory::English))]
    fn category_filter_treats_all_as_none(
        #[case] raw: Option<&str>,
        #[case] expected: Option<ArticleCategory>,
    ) {
        assert_eq!(category_filter(raw).expect("filter"), expected);
    }

    #[rstest]
    fn unknown_category_is_rejected() {
        assert!(matches!(
            category_filter(Some("cooking")),
            Err(ServiceError::Validation(_))
        ));
    }
}
