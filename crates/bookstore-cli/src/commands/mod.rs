use bookstore_dal::user::UserRepository;

pub mod change_password;
pub mod create_user;
pub mod migrate;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

/// Opens database and brings schema up to date
pub(crate) async fn open_database(database_url: &str) -> anyhow::Result<bookstore_dal::Pool> {
    let pool = bookstore_dal::new_pool(database_url).await?;
    bookstore_dal::migrate(&pool).await?;
    Ok(pool)
}

pub(crate) async fn create_user_repository(database_url: &str) -> anyhow::Result<UserRepository> {
    let pool = open_database(database_url).await?;
    Ok(UserRepository::new(pool))
}
