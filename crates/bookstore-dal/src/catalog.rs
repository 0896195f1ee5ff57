//! Book listing pipeline: relation statistics are aggregated per book in one
//! pass, then search and ordering are applied over the annotated sequence.

use std::{cmp::Ordering, collections::HashMap, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Order,
    book::Book,
    error::Result,
    relation::RelationFacts,
};

/// Number of decimal places for prices and ratings
pub const DECIMAL_PLACES: u32 = 2;

/// Rounds (half to even) and pads value to exactly two decimal places
pub fn two_places(value: Decimal) -> Decimal {
    let mut value = value.round_dp(DECIMAL_PLACES);
    value.rescale(DECIMAL_PLACES);
    value
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookStats {
    pub like_count: u64,
    pub rating: Option<Decimal>,
}

#[derive(Default)]
struct Accumulator {
    likes: u64,
    rate_sum: i64,
    rated: i64,
}

impl Accumulator {
    fn add(&mut self, relation: &RelationFacts) {
        if relation.liked {
            self.likes += 1;
        }
        if let Some(rate) = relation.rate {
            self.rate_sum += rate.value();
            self.rated += 1;
        }
    }

    fn finish(self) -> BookStats {
        let rating = (self.rated > 0)
            .then(|| two_places(Decimal::from(self.rate_sum) / Decimal::from(self.rated)));
        BookStats {
            like_count: self.likes,
            rating,
        }
    }
}

/// Groups relations by book and computes like count and mean rating.
/// Ratings count regardless of like flag, unrated relations are ignored for the mean.
pub fn aggregate<'a>(
    relations: impl IntoIterator<Item = &'a RelationFacts>,
) -> HashMap<i64, BookStats> {
    let mut acc: HashMap<i64, Accumulator> = HashMap::new();
    for relation in relations {
        acc.entry(relation.book_id).or_default().add(relation);
    }
    acc.into_iter().map(|(id, a)| (id, a.finish())).collect()
}

/// Book as presented in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnnotatedBook {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub author_name: String,
    pub likes_count: u64,
    pub annotated_likes: u64,
    pub rating: Option<Decimal>,
    #[serde(skip)]
    pub owner_id: Option<i64>,
}

impl AnnotatedBook {
    pub fn new(book: Book, stats: Option<&BookStats>) -> Self {
        let stats = stats.cloned().unwrap_or_default();
        AnnotatedBook {
            id: book.id,
            name: book.name,
            price: two_places(book.price),
            author_name: book.author_name,
            likes_count: stats.like_count,
            annotated_likes: stats.like_count,
            rating: stats.rating,
            owner_id: book.owner_id,
        }
    }
}

pub fn annotate(books: Vec<Book>, stats: &HashMap<i64, BookStats>) -> Vec<AnnotatedBook> {
    books
        .into_iter()
        .map(|book| {
            let book_stats = stats.get(&book.id);
            AnnotatedBook::new(book, book_stats)
        })
        .collect()
}

/// Splits search query into lowercase terms, separated by whitespace or commas
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Every term must be contained (case insensitive) in name or author name
pub fn matches_search(book: &Book, terms: &[String]) -> bool {
    let name = book.name.to_lowercase();
    let author = book.author_name.to_lowercase();
    terms
        .iter()
        .all(|term| name.contains(term.as_str()) || author.contains(term.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Id,
    Name,
    Price,
    AuthorName,
    Likes,
    Rating,
}

impl FromStr for BookField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(BookField::Id),
            "name" => Ok(BookField::Name),
            "price" => Ok(BookField::Price),
            "author_name" => Ok(BookField::AuthorName),
            "annotated_likes" | "likes_count" => Ok(BookField::Likes),
            "rating" => Ok(BookField::Rating),
            other => Err(Error::InvalidOrderByField(other.to_string())),
        }
    }
}

impl BookField {
    fn compare(self, a: &AnnotatedBook, b: &AnnotatedBook) -> Ordering {
        match self {
            BookField::Id => a.id.cmp(&b.id),
            BookField::Name => a.name.cmp(&b.name),
            BookField::Price => a.price.cmp(&b.price),
            BookField::AuthorName => a.author_name.cmp(&b.author_name),
            BookField::Likes => a.annotated_likes.cmp(&b.annotated_likes),
            BookField::Rating => a.rating.cmp(&b.rating),
        }
    }
}

pub fn parse_order(order: &[Order]) -> Result<Vec<(BookField, bool)>> {
    order
        .iter()
        .map(|o| Ok((o.as_ref().parse::<BookField>()?, o.is_descending())))
        .collect()
}

/// Stable sort by given keys, books equal on all keys keep id order
pub fn sort(books: &mut [AnnotatedBook], keys: &[(BookField, bool)]) {
    books.sort_by_key(|b| b.id);
    if keys.is_empty() {
        return;
    }
    books.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ord = field.compare(a, b);
                if *descending { ord.reverse() } else { ord }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub order: Vec<Order>,
}

/// Runs complete listing pipeline over loaded books and relations
pub fn select(
    books: Vec<Book>,
    relations: &[RelationFacts],
    query: &CatalogQuery,
) -> Result<Vec<AnnotatedBook>> {
    let keys = parse_order(&query.order)?;
    let terms = query.search.as_deref().map(search_terms).unwrap_or_default();
    let books: Vec<Book> = if terms.is_empty() {
        books
    } else {
        books
            .into_iter()
            .filter(|b| matches_search(b, &terms))
            .collect()
    };
    let stats = aggregate(relations);
    let mut annotated = annotate(books, &stats);
    sort(&mut annotated, &keys);
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Rate;

    fn book(id: i64, name: &str, price: i64, author: &str) -> Book {
        Book {
            id,
            name: name.to_string(),
            price: Decimal::from(price),
            author_name: author.to_string(),
            owner_id: None,
        }
    }

    fn rel(book_id: i64, liked: bool, rate: Option<i64>) -> RelationFacts {
        RelationFacts {
            book_id,
            liked,
            rate: rate.map(|r| Rate::try_from(r).unwrap()),
        }
    }

    fn sample_books() -> Vec<Book> {
        vec![
            book(1, "1 book", 23, "Vadym"),
            book(2, "book2", 53, "Denis"),
            book(3, "book3", 3, "Vadym"),
        ]
    }

    #[test]
    fn test_aggregate() {
        let relations = vec![
            rel(1, true, Some(5)),
            rel(1, true, Some(3)),
            rel(1, true, Some(5)),
            rel(2, true, Some(5)),
            rel(2, true, Some(5)),
            rel(2, false, None),
        ];
        let stats = aggregate(&relations);
        let first = &stats[&1];
        assert_eq!(first.like_count, 3);
        assert_eq!(first.rating.unwrap().to_string(), "4.33");
        let second = &stats[&2];
        assert_eq!(second.like_count, 2);
        assert_eq!(second.rating.unwrap().to_string(), "5.00");
    }

    #[test]
    fn test_rating_of_unliked_counts() {
        let relations = vec![rel(1, false, Some(2)), rel(1, true, None)];
        let stats = aggregate(&relations);
        assert_eq!(stats[&1].like_count, 1);
        assert_eq!(stats[&1].rating.unwrap().to_string(), "2.00");
    }

    #[test]
    fn test_no_ratings_is_null() {
        let relations = vec![rel(1, true, None)];
        let annotated = annotate(sample_books(), &aggregate(&relations));
        assert_eq!(annotated[0].rating, None);
        assert_eq!(annotated[0].likes_count, 1);
        assert_eq!(annotated[1].likes_count, 0);
        assert_eq!(annotated[1].rating, None);
        let json = serde_json::to_value(&annotated[0]).unwrap();
        assert_eq!(json["price"], "23.00");
        assert!(json["rating"].is_null());
        assert!(json.get("owner_id").is_none());
    }

    #[test]
    fn test_search() {
        let query = CatalogQuery {
            search: Some("vadym".into()),
            ..Default::default()
        };
        let found = select(sample_books(), &[], &query).unwrap();
        let ids: Vec<_> = found.iter().map(|b| b.id).collect();
        assert_eq!(ids, [1, 3]);

        let query = CatalogQuery {
            search: Some("book2".into()),
            ..Default::default()
        };
        let found = select(sample_books(), &[], &query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].author_name, "Denis");

        let query = CatalogQuery {
            search: Some("Vadym book3".into()),
            ..Default::default()
        };
        let found = select(sample_books(), &[], &query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
    }

    #[test]
    fn test_empty_search_keeps_all() {
        let query = CatalogQuery {
            search: Some(" , ".into()),
            ..Default::default()
        };
        assert_eq!(select(sample_books(), &[], &query).unwrap().len(), 3);
    }

    #[test]
    fn test_ordering() {
        let mut books = sample_books();
        books.reverse();
        let query = CatalogQuery {
            order: vec![Order::Asc("price".into())],
            ..Default::default()
        };
        let prices: Vec<_> = select(books.clone(), &[], &query)
            .unwrap()
            .iter()
            .map(|b| b.price.to_string())
            .collect();
        assert_eq!(prices, ["3.00", "23.00", "53.00"]);

        let query = CatalogQuery {
            order: vec![Order::Desc("price".into())],
            ..Default::default()
        };
        let ids: Vec<_> = select(books.clone(), &[], &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [2, 1, 3]);

        let ids: Vec<_> = select(books, &[], &CatalogQuery::default())
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn test_ordering_ties_keep_id_order() {
        let query = CatalogQuery {
            order: vec![Order::Asc("author_name".into())],
            ..Default::default()
        };
        let ids: Vec<_> = select(sample_books(), &[], &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [2, 1, 3]);

        let query = CatalogQuery {
            order: vec![Order::Desc("author_name".into()), Order::Desc("price".into())],
            ..Default::default()
        };
        let ids: Vec<_> = select(sample_books(), &[], &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [1, 3, 2]);
    }

    #[test]
    fn test_ordering_by_rating() {
        let relations = vec![rel(2, false, Some(4)), rel(3, false, Some(1))];
        let query = CatalogQuery {
            order: vec![Order::Desc("rating".into())],
            ..Default::default()
        };
        let ids: Vec<_> = select(sample_books(), &relations, &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn test_invalid_ordering() {
        let query = CatalogQuery {
            order: vec![Order::Asc("owner".into())],
            ..Default::default()
        };
        let res = select(sample_books(), &[], &query);
        assert!(matches!(res, Err(Error::InvalidOrderByField(f)) if f == "owner"));
    }

    #[test]
    fn test_two_places() {
        assert_eq!(two_places(Decimal::from(23)).to_string(), "23.00");
        assert_eq!(two_places(Decimal::new(4335, 3)).to_string(), "4.34");
        assert_eq!(two_places(Decimal::new(4325, 3)).to_string(), "4.32");
    }
}
