use std::str::FromStr as _;

use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _};
use tracing::{debug, warn};

use crate::{
    ChosenRow, Error, MAX_LIMIT,
    catalog::{self, AnnotatedBook, CatalogQuery, two_places},
    error::Result,
    relation::RelationFacts,
};

const MAX_PRICE_DIGITS: u32 = 7;

fn valid_price(value: &Decimal, _ctx: &()) -> garde::Result {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(garde::Error::new("price must not be negative"));
    }
    if value.normalize().scale() > catalog::DECIMAL_PLACES {
        return Err(garde::Error::new(format!(
            "ensure that there are no more than {} decimal places",
            catalog::DECIMAL_PLACES
        )));
    }
    let limit = Decimal::from(10_i64.pow(MAX_PRICE_DIGITS - catalog::DECIMAL_PLACES));
    if value.abs() >= limit {
        return Err(garde::Error::new(format!(
            "ensure that there are no more than {MAX_PRICE_DIGITS} digits in total"
        )));
    }
    Ok(())
}

/// Book as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub author_name: String,
    pub owner_id: Option<i64>,
}

impl sqlx::FromRow<'_, ChosenRow> for Book {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let price: String = row.try_get("price")?;
        let price = Decimal::from_str(&price).map_err(|e| sqlx::Error::ColumnDecode {
            index: "price".to_string(),
            source: Box::new(e),
        })?;
        Ok(Book {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price,
            author_name: row.try_get("author_name")?,
            owner_id: row.try_get("owner_id")?,
        })
    }
}

/// Book payload, owner is never taken from the client
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBook {
    #[garde(length(chars, min = 1, max = 255))]
    pub name: String,
    #[garde(custom(valid_price))]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "23.00"))]
    pub price: Decimal,
    #[garde(length(chars, min = 1, max = 255))]
    pub author_name: String,
}

pub type UpdateBook = CreateBook;

pub type BookRepository = BookRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct BookRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> BookRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateBook, owner_id: i64) -> Result<AnnotatedBook> {
        let result = sqlx::query(
            "INSERT INTO book (name, price, author_name, owner_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(two_places(payload.price).to_string())
        .bind(&payload.author_name)
        .bind(owner_id)
        .execute(&self.executor)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Error::RecordNotFound("Owner".to_string())
            }
            e => Error::from(e),
        })?;

        let id = result.last_insert_rowid();
        debug!("Created book {id} owned by {owner_id}");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateBook) -> Result<AnnotatedBook> {
        let result =
            sqlx::query("UPDATE book SET name = ?, price = ?, author_name = ? WHERE id = ?")
                .bind(&payload.name)
                .bind(two_places(payload.price).to_string())
                .bind(&payload.author_name)
                .bind(id)
                .execute(&self.executor)
                .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Book".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Book".to_string()))
        } else {
            Ok(())
        }
    }

    /// Stored book record, including owner
    pub async fn get_record(&self, id: i64) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, name, price, author_name, owner_id FROM book WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Book".to_string()))
    }

    pub async fn get(&self, id: i64) -> Result<AnnotatedBook> {
        let book = self.get_record(id).await?;
        let relations = sqlx::query_as::<_, RelationFacts>(
            "SELECT book_id, liked, rate FROM user_book_relation WHERE book_id = ?",
        )
        .bind(id)
        .fetch_all(&self.executor)
        .await?;
        let stats = catalog::aggregate(&relations);
        Ok(AnnotatedBook::new(book, stats.get(&id)))
    }

    pub async fn list(&self, query: CatalogQuery) -> Result<Vec<AnnotatedBook>> {
        // fail fast on bad ordering, before touching database
        catalog::parse_order(&query.order)?;
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, name, price, author_name, owner_id FROM book ORDER BY id",
        )
        .fetch(&self.executor)
        .take(MAX_LIMIT)
        .try_collect::<Vec<_>>()
        .await?;
        if books.len() >= MAX_LIMIT {
            warn!("Listing truncated to first {MAX_LIMIT} books");
        }
        let relations = sqlx::query_as::<_, RelationFacts>(
            "SELECT book_id, liked, rate FROM user_book_relation",
        )
        .fetch_all(&self.executor)
        .await?;
        catalog::select(books, &relations, &query)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM book")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }
}
