use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{ingest::ingest_document, liveness::live, query::query_document, readiness::ready};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/query", post(query_document))
        .route(
            "/ingest",
            post(ingest_document).layer(DefaultBodyLimit::max(
                app_state.config.ingest_max_body_bytes,
            )),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use common::{
        error::AppError,
        storage::paths::StoragePaths,
        utils::{config::AppConfig, embedding::EmbeddingProvider},
    };
    use ingestion_pipeline::{ChunkingConfig, PdfEngineBuilder};
    use retrieval_pipeline::{QueryServices, RetrievedChunk};
    use serde_json::Value;
    use session::Session;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "pdfchatboundary";

    struct EchoServices {
        provider: Arc<EmbeddingProvider>,
    }

    #[async_trait]
    impl QueryServices for EchoServices {
        async fn embed_query(&self, question: &str) -> Result<Vec<f32>, AppError> {
            Ok(self.provider.embed(question).await?)
        }

        async fn generate_answer(
            &self,
            _question: &str,
            context: &[RetrievedChunk],
        ) -> Result<String, AppError> {
            Ok(format!("found {} passages", context.len()))
        }
    }

    async fn app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path().join("in"), dir.path().join("out"));
        paths.ensure_exists().await.expect("folders");

        let provider = Arc::new(EmbeddingProvider::new_hashed(64));
        let builder = Arc::new(PdfEngineBuilder::new(
            Arc::clone(&provider),
            ChunkingConfig {
                min_chars: 20,
                max_chars: 60,
                overlap_chars: 0,
            },
            2,
        ));
        let services = Arc::new(EchoServices { provider });
        let session = Arc::new(Session::new(paths, builder, services));

        let state = ApiState::new(session, &AppConfig::default());
        let router = api_routes_v1::<ApiState>(&state).with_state(state);
        (dir, router)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn query_request(question: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "question": question }).to_string(),
            ))
            .expect("request")
    }

    fn upload_request(file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{contents}\r\n--{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/ingest")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn test_live_and_ready_without_engine() {
        let (_dir, router) = app().await;

        let live = router
            .clone()
            .oneshot(Request::get("/live").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(live.status(), StatusCode::OK);

        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(ready.status(), StatusCode::OK);
        let body = json_body(ready).await;
        assert_eq!(body["checks"]["engine"], "empty");
        assert_eq!(body["session"]["status"], "None");
    }

    #[tokio::test]
    async fn test_query_before_ingest_is_a_conflict() {
        let (_dir, router) = app().await;

        let response = router
            .oneshot(query_request("what is this about?"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["status"], "error");
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (_dir, router) = app().await;
        let response = router.oneshot(query_request("   ")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let (dir, router) = app().await;
        let text = "Quarterly revenue grew in every region. Costs stayed flat overall.";

        let first = router
            .clone()
            .oneshot(upload_request("notes.txt", text))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        let body = json_body(first).await;
        assert_eq!(body["outcome"], "built");
        assert_eq!(body["cache_key"], "notes.cache");
        assert_eq!(body["status"], "Vector store updated. notes.cache");
        assert!(dir.path().join("in").join("notes.txt").is_file());
        assert!(dir.path().join("out").join("notes.cache").is_file());

        let second = router
            .clone()
            .oneshot(upload_request("notes.txt", text))
            .await
            .expect("response");
        assert_eq!(json_body(second).await["outcome"], "cache_hit");

        let answer = router
            .oneshot(query_request("How did revenue develop?"))
            .await
            .expect("response");
        assert_eq!(answer.status(), StatusCode::OK);
        let body = json_body(answer).await;
        assert!(body["answer"]
            .as_str()
            .is_some_and(|a| a.starts_with("found")));
        assert!(body["sources"].as_array().is_some_and(|s| !s.is_empty()));
    }
}
