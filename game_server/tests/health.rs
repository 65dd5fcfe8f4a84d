mod support;

#[tokio::test]
async fn health_endpoint_answers_ok() {
    let addr = support::ensure_server();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.text().await.expect("body should be text"), "ok");
}
