use std::time::Duration;

use async_trait::async_trait;
use offerwise_core::config::ClassifierConfig;
use offerwise_core::resolution::{ClassifierClient, ClassifierError, FeatureVector};
use reqwest::Client;
use serde_json::Value;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-over-HTTP transport to the offer classifier.
pub struct HttpClassifierClient {
    client: Client,
    endpoint_url: String,
    health_url: String,
    timeout_ms: u64,
}

impl HttpClassifierClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_millis(config.timeout_ms)).build()?;
        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            health_url: health_url(&config.endpoint_url),
            timeout_ms: config.timeout_ms,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ClassifierError {
        if error.is_timeout() {
            ClassifierError::Timeout(self.timeout_ms)
        } else {
            ClassifierError::Transport(error.to_string())
        }
    }
}

/// The classifier serves its root next to the `/recommend` route.
fn health_url(endpoint_url: &str) -> String {
    let trimmed = endpoint_url.trim_end_matches('/');
    match trimmed.strip_suffix("/recommend") {
        Some(root) if !root.is_empty() => root.to_string(),
        _ => trimmed.to_string(),
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn fetch(&self, features: &FeatureVector) -> Result<Value, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .header("Accept", "application/json")
            .json(features)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Status(response.status().as_u16()));
        }

        response.json::<Value>().await.map_err(|error| ClassifierError::Decode(error.to_string()))
    }

    async fn probe(&self) -> Result<(), ClassifierError> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClassifierError::Status(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{routing::get, routing::post, Json, Router};
    use offerwise_core::config::ClassifierConfig;
    use offerwise_core::domain::profile::{UsageType, UserProfile};
    use offerwise_core::domain::catalog::OfferLabel;
    use offerwise_core::resolution::{
        ClassifierClient, ClassifierError, FeatureVector, ResolutionPolicy, ResponseNormalizer,
    };
    use serde_json::{json, Value};

    use super::{health_url, HttpClassifierClient};

    async fn spawn_classifier(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}/recommend")
    }

    fn config(endpoint_url: String) -> ClassifierConfig {
        ClassifierConfig { endpoint_url, timeout_ms: 2_000, enabled: true }
    }

    #[test]
    fn health_url_strips_recommend_route() {
        assert_eq!(health_url("http://ml:8000/recommend"), "http://ml:8000");
        assert_eq!(health_url("http://ml:8000/recommend/"), "http://ml:8000");
        assert_eq!(health_url("http://ml:8000/predict"), "http://ml:8000/predict");
    }

    #[tokio::test]
    async fn fetch_posts_features_and_returns_raw_reply() {
        let router = Router::new().route(
            "/recommend",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "primary_offer": "Data Booster",
                    "top_offers": ["Data Booster", "Voice Bundle"],
                    "confidence_score": 0.9,
                    "echo_plan": body["plan_type"],
                }))
            }),
        );
        let client = HttpClassifierClient::new(&config(spawn_classifier(router).await))
            .expect("client");

        let features = FeatureVector::from_profile(&UserProfile::new(UsageType::Data));
        let reply = client.fetch(&features).await.expect("reply");

        assert_eq!(reply["primary_offer"], "Data Booster");
        assert_eq!(reply["echo_plan"], "Prepaid");

        let offers = ResponseNormalizer::new(ResolutionPolicy::default()).normalize(&reply);
        assert_eq!(offers[0].label, OfferLabel::DataBooster);
        assert!((offers[0].score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let router = Router::new().route(
            "/recommend",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let client = HttpClassifierClient::new(&config(spawn_classifier(router).await))
            .expect("client");

        let features = FeatureVector::from_profile(&UserProfile::default());
        assert_eq!(client.fetch(&features).await, Err(ClassifierError::Status(502)));
    }

    #[tokio::test]
    async fn probe_hits_classifier_root() {
        let router = Router::new().route("/", get(|| async { "ok" }));
        let client = HttpClassifierClient::new(&config(spawn_classifier(router).await))
            .expect("client");

        assert_eq!(client.probe().await, Ok(()));
    }
}
