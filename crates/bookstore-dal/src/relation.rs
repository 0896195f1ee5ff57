use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Pool, Row as _};
use tracing::debug;

use crate::{ChosenRow, Error, error::Result};

/// User rating of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
#[repr(u8)]
pub enum Rate {
    Ok = 1,
    Fine = 2,
    Good = 3,
    Amazing = 4,
    Incredible = 5,
}

impl Rate {
    pub fn label(&self) -> &'static str {
        match self {
            Rate::Ok => "OK",
            Rate::Fine => "Fine",
            Rate::Good => "Good",
            Rate::Amazing => "Amazing",
            Rate::Incredible => "Incredible",
        }
    }

    pub fn value(self) -> i64 {
        self as u8 as i64
    }
}

impl TryFrom<i64> for Rate {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rate::Ok),
            2 => Ok(Rate::Fine),
            3 => Ok(Rate::Good),
            4 => Ok(Rate::Amazing),
            5 => Ok(Rate::Incredible),
            other => Err(Error::InvalidRate(other)),
        }
    }
}

impl From<Rate> for i64 {
    fn from(value: Rate) -> Self {
        value.value()
    }
}

/// Relation of current user to a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserBookRelation {
    pub book: i64,
    pub like: bool,
    pub in_bookmarks: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>, minimum = 1, maximum = 5))]
    pub rate: Option<Rate>,
}

impl UserBookRelation {
    fn unrated(book: i64) -> Self {
        Self {
            book,
            like: false,
            in_bookmarks: false,
            rate: None,
        }
    }
}

fn decode_rate(row: &ChosenRow, column: &str) -> Result<Option<Rate>, sqlx::Error> {
    row.try_get::<Option<i64>, _>(column)?
        .map(Rate::try_from)
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
}

impl sqlx::FromRow<'_, ChosenRow> for UserBookRelation {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(UserBookRelation {
            book: row.try_get("book_id")?,
            like: row.try_get("liked")?,
            in_bookmarks: row.try_get("in_bookmarks")?,
            rate: decode_rate(row, "rate")?,
        })
    }
}

/// Minimal relation data needed for book statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationFacts {
    pub book_id: i64,
    pub liked: bool,
    pub rate: Option<Rate>,
}

impl sqlx::FromRow<'_, ChosenRow> for RelationFacts {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(RelationFacts {
            book_id: row.try_get("book_id")?,
            liked: row.try_get("liked")?,
            rate: decode_rate(row, "rate")?,
        })
    }
}

// Distinguishes missing field (None) from explicit null (Some(None))
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn valid_rate(value: &Option<Option<i64>>, _ctx: &()) -> garde::Result {
    match value {
        Some(Some(rate)) => Rate::try_from(*rate)
            .map(|_| ())
            .map_err(|_| garde::Error::new(format!("{rate} is not a valid choice, use 1 to 5"))),
        _ => Ok(()),
    }
}

/// Partial update of relation, only present fields are applied.
/// `rate: null` clears the rating, missing `rate` keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PatchRelation {
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<bool>,
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_bookmarks: Option<bool>,
    #[garde(custom(valid_rate))]
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>, minimum = 1, maximum = 5))]
    pub rate: Option<Option<i64>>,
}

/// Full replacement of relation, missing fields are reset to defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateRelation {
    #[garde(skip)]
    #[serde(default)]
    pub like: bool,
    #[garde(skip)]
    #[serde(default)]
    pub in_bookmarks: bool,
    #[garde(range(min = 1, max = 5))]
    #[serde(default)]
    pub rate: Option<i64>,
}

impl From<UpdateRelation> for PatchRelation {
    fn from(value: UpdateRelation) -> Self {
        PatchRelation {
            like: Some(value.like),
            in_bookmarks: Some(value.in_bookmarks),
            rate: Some(value.rate),
        }
    }
}

pub type RelationRepository = RelationRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct RelationRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> RelationRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn ensure_book(&self, book_id: i64) -> Result<()> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book WHERE id = ?)")
            .bind(book_id)
            .fetch_one(&self.executor)
            .await?;
        if exists == 1 {
            Ok(())
        } else {
            Err(Error::RecordNotFound("Book".to_string()))
        }
    }

    /// Relation of user to book, defaults if user did not interact with the book yet
    pub async fn get(&self, user_id: i64, book_id: i64) -> Result<UserBookRelation> {
        self.ensure_book(book_id).await?;
        let record = sqlx::query_as::<_, UserBookRelation>(
            "SELECT book_id, liked, in_bookmarks, rate FROM user_book_relation WHERE user_id = ? AND book_id = ?",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.executor)
        .await?;
        Ok(record.unwrap_or_else(|| UserBookRelation::unrated(book_id)))
    }

    /// Creates relation on first use or applies patch to existing one.
    /// Relies on unique (user_id, book_id) constraint, so concurrent first
    /// interactions cannot create duplicate rows.
    pub async fn upsert(
        &self,
        user_id: i64,
        book_id: i64,
        patch: PatchRelation,
    ) -> Result<UserBookRelation> {
        let (set_rate, rate) = match patch.rate {
            Some(rate) => (true, rate.map(Rate::try_from).transpose()?.map(i64::from)),
            None => (false, None),
        };
        self.ensure_book(book_id).await?;
        debug!("Upserting relation user={user_id} book={book_id}: {patch:?}");

        const SQL: &str = r#"
        INSERT INTO user_book_relation (user_id, book_id, liked, in_bookmarks, rate)
        VALUES (?1, ?2, COALESCE(?3, 0), COALESCE(?4, 0), ?5)
        ON CONFLICT (user_id, book_id) DO UPDATE SET
            liked = COALESCE(?3, liked),
            in_bookmarks = COALESCE(?4, in_bookmarks),
            rate = CASE WHEN ?6 THEN ?5 ELSE rate END
        RETURNING book_id, liked, in_bookmarks, rate
        "#;
        let record = sqlx::query_as::<_, UserBookRelation>(SQL)
            .bind(user_id)
            .bind(book_id)
            .bind(patch.like)
            .bind(patch.in_bookmarks)
            .bind(rate)
            .bind(set_rate)
            .fetch_one(&self.executor)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    Error::RecordNotFound("Book or user".to_string())
                }
                e => Error::from(e),
            })?;
        Ok(record)
    }

    pub async fn count_for_book(&self, book_id: i64) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM user_book_relation WHERE book_id = ?")
                .bind(book_id)
                .fetch_one(&self.executor)
                .await?;
        Ok(count as u64)
    }
}
