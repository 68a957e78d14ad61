use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::types::{PredictionRequest, PredictionResponse};

/// Anything that turns a filled-in form into a price prediction.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResponse>;
}

pub struct PredictorClient {
    client: Client,
    url: String,
}

impl PredictorClient {
    /// `timeout` of `None` waits for the backend indefinitely.
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("homeval/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PredictionBackend for PredictorClient {
    async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResponse> {
        tracing::debug!(url = %self.url, ?req, "sending prediction request");

        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(req)
            .send()
            .await
            .context("Failed to reach prediction backend")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Prediction backend error {}: {}",
                status,
                snippet(&body)
            );
        }

        let text = resp.text().await.context("Failed to read response body")?;
        let parsed: PredictionResponse = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => {
                anyhow::bail!(
                    "Failed to parse prediction: {} | response: {}",
                    e,
                    snippet(&text)
                );
            }
        };
        tracing::debug!(?parsed, "parsed prediction response");
        Ok(parsed)
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(300).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn request() -> PredictionRequest {
        PredictionRequest {
            purpose: "buy".into(),
            sqft_living: "1500".into(),
            no_of_bedrooms: "3".into(),
            no_of_bathrooms: "2".into(),
            sqft_lot: "5000".into(),
            no_of_floors: "1".into(),
            house_age: "10".into(),
            zipcode: "98101".into(),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn posts_raw_strings_and_parses_reply() {
        let received = Arc::new(Mutex::new(Value::Null));
        let sink = received.clone();
        let app = Router::new().route(
            "/",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = body;
                    Json(json!({
                        "predicted_price": 450000.0,
                        "confidence_interval": [420000.0, 480000.0],
                        "realtor_url": "https://www.realtor.com/realestateandhomes-search/98101",
                        "recommendations": ["Consider a 4th bedroom"]
                    }))
                }
            }),
        );
        let url = serve(app).await;

        let client = PredictorClient::new(&url, None).unwrap();
        let resp = client.predict(&request()).await.unwrap();
        assert_eq!(resp.predicted_price, Some(450000.0));
        assert_eq!(resp.recommendations, Some(vec!["Consider a 4th bedroom".to_string()]));

        let body = received.lock().unwrap().clone();
        assert_eq!(body["purpose"], "buy");
        assert_eq!(body["sqft_living"], "1500");
        assert_eq!(body["zipcode"], "98101");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid zipcode"}))) }),
        );
        let url = serve(app).await;

        let client = PredictorClient::new(&url, Some(Duration::from_secs(5))).unwrap();
        let err = client.predict(&request()).await.unwrap_err();
        assert!(err.to_string().contains("400"), "{err}");
    }

    #[tokio::test]
    async fn unparseable_body_is_an_error() {
        let app = Router::new().route("/", post(|| async { "<html>oops</html>" }));
        let url = serve(app).await;

        let client = PredictorClient::new(&url, None).unwrap();
        assert!(client.predict(&request()).await.is_err());
    }
}
