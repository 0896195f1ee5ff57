use bookstore_e2e_tests::{TestUser, launch_env, prepare_env};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _config_guard) = prepare_env("test_health").await.unwrap();
    let (client, base_url) = launch_env(args, TestUser::Anonymous).await.unwrap();

    let response = client.get(base_url.join("health").unwrap()).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");

    let response = client
        .get(base_url.join("api-docs/openapi.json").unwrap())
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    let docs: serde_json::Value = response.json().await.unwrap();
    assert!(docs["paths"].get("/books").is_some());
}
