use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

static BASE_URL: &str = "http://localhost:8061";

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub async fn new() -> Self {
        let client = ClientBuilder::new().build().unwrap();

        for _ in 0..10 {
            match client.get(BASE_URL).send().await {
                Ok(_) => break,
                Err(error) => {
                    if !error.is_connect() {
                        panic!("{error}");
                    }
                }
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        tokio::time::sleep(Duration::from_secs(1)).await;

        Self { client }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{BASE_URL}{path}"))
            .send()
            .await
            .unwrap()
    }

    pub async fn post<T: Serialize>(&self, path: &str, body: T) -> Response {
        self.client
            .post(format!("{BASE_URL}{path}"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put<T: Serialize>(&self, path: &str, body: T) -> Response {
        self.client
            .put(format!("{BASE_URL}{path}"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(format!("{BASE_URL}{path}"))
            .send()
            .await
            .unwrap()
    }
}

pub async fn assert_response_status(response: Response, status: StatusCode) {
    assert_eq!(
        response.status(),
        status,
        "unexpected response:\n{:?}\n",
        std::str::from_utf8(response.bytes().await.unwrap().as_ref()),
    );
}

/// Assert the status code and decode the body.
pub async fn assert_json_response<T: DeserializeOwned>(
    response: Response,
    status: StatusCode,
) -> T {
    let actual_status = response.status();
    let body = response.bytes().await.unwrap();
    assert_eq!(
        actual_status,
        status,
        "unexpected response:\n{:?}\n",
        std::str::from_utf8(body.as_ref()),
    );
    serde_json::from_slice(body.as_ref()).unwrap()
}
