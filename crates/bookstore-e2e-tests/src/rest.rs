use anyhow::{Result, bail};
use bookstore_dal::{catalog::AnnotatedBook, relation::UserBookRelation};
use reqwest::Url;
use serde_json::{Value, json};
use tracing::info;

use crate::extend_url;

pub async fn create_book(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    price: Value,
    author_name: &str,
) -> Result<AnnotatedBook> {
    let payload = json!({"name": name, "price": price, "author_name": author_name});
    let api_url = base_url.join("books")?;

    let response = client.post(api_url).json(&payload).send().await?;
    info!("Create book response: {:#?}", response);
    if response.status().as_u16() != 201 {
        bail!("Book not created, status {}", response.status());
    }

    let book: AnnotatedBook = response.json().await?;
    Ok(book)
}

pub async fn list_books(
    client: &reqwest::Client,
    base_url: &Url,
    query: &str,
) -> Result<Vec<AnnotatedBook>> {
    let mut api_url = base_url.join("books")?;
    if !query.is_empty() {
        api_url.set_query(Some(query));
    }
    let response = client.get(api_url).send().await?;
    info!("List books response: {:#?}", response);
    if !response.status().is_success() {
        bail!("Listing failed with status {}", response.status());
    }
    Ok(response.json().await?)
}

pub async fn patch_relation(
    client: &reqwest::Client,
    base_url: &Url,
    book_id: i64,
    payload: Value,
) -> Result<UserBookRelation> {
    let url = extend_url(&base_url.join("relations")?, book_id);
    let response = client.patch(url).json(&payload).send().await?;
    info!("Patch relation response: {:#?}", response);
    if !response.status().is_success() {
        bail!("Relation update failed with status {}", response.status());
    }
    Ok(response.json().await?)
}
