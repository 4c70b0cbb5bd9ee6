//! Routes: `GET /`, `POST /predict`, `GET /health`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use maud::Markup;
use tracing::{info, warn};
use wasteclass_core::{ErrorKind, GENERIC_ERROR_MESSAGE, InferenceError, PredictionLabel};

use crate::page;
use crate::provider::ModelProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<ModelProvider>,
}

impl AppState {
    pub fn new(provider: ModelProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Markup {
    page::render(state.provider.schema(), None, &HashMap::new())
}

async fn predict(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Markup {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!(
                kind = %ErrorKind::InvalidInput,
                error = %rejection,
                "rejected predict body"
            );
            return page::render(
                state.provider.schema(),
                Some(GENERIC_ERROR_MESSAGE),
                &HashMap::new(),
            );
        }
    };

    let text = match run_prediction(&state.provider, &form).await {
        Ok(label) => {
            info!(label = %label, "prediction served");
            label.display_text()
        }
        Err(e) => {
            warn!(kind = %e.kind(), error = %e, "prediction failed");
            e.user_message().to_string()
        }
    };
    page::render(state.provider.schema(), Some(&text), &form)
}

async fn run_prediction(
    provider: &ModelProvider,
    form: &HashMap<String, String>,
) -> Result<PredictionLabel, InferenceError> {
    let pipeline = provider.pipeline().await?;
    Ok(pipeline.predict(form)?.label)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let provider = &state.provider;
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": provider.is_loaded(),
        "source": provider.source_name(),
        "fetch_state": provider.fetch_state().map(|s| s.as_str()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ArtifactSource;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wasteclass_ai::ArtifactPaths;
    use wasteclass_core::food_waste;

    struct Fixture {
        state: AppState,
        _files: (NamedTempFile, NamedTempFile),
    }

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// Identity scaler and a linear model that votes High for positive sums.
    fn fixture() -> Fixture {
        let model = write(
            &serde_json::json!({
                "kind": "linear",
                "weights": vec![1.0; 7],
                "intercept": 0.0
            })
            .to_string(),
        );
        let scaler = write(
            &serde_json::json!({
                "schema_version": 1,
                "feature_names": food_waste::FIELDS_V1,
                "mean": vec![0.0; 7],
                "scale": vec![1.0; 7]
            })
            .to_string(),
        );
        let provider = ModelProvider::new(
            ArtifactSource::Local(ArtifactPaths::new(model.path(), scaler.path())),
            food_waste::schema_v1(),
        );
        Fixture {
            state: AppState::new(provider),
            _files: (model, scaler),
        }
    }

    fn form_with(value: &str) -> HashMap<String, String> {
        food_waste::FIELDS_V1
            .iter()
            .map(|f| (f.to_string(), value.to_string()))
            .collect()
    }

    async fn submit(state: &AppState, form: HashMap<String, String>) -> String {
        predict(State(state.clone()), Ok(Form(form)))
            .await
            .into_string()
    }

    #[tokio::test]
    async fn index_renders_form_without_prediction() {
        let fx = fixture();
        let html = index(State(fx.state.clone())).await.into_string();
        assert!(html.contains("name=\"combined_figures\""));
        assert!(!html.contains("Predicted Food Waste Category"));
        // Rendering the form does not load the model.
        assert!(!fx.state.provider.is_loaded());
    }

    #[tokio::test]
    async fn positive_inputs_predict_high() {
        let fx = fixture();
        let html = submit(&fx.state, form_with("2.5")).await;
        assert!(html.contains("Predicted Food Waste Category: High"), "{html}");
    }

    #[tokio::test]
    async fn negative_inputs_predict_low() {
        let fx = fixture();
        let html = submit(&fx.state, form_with("-1")).await;
        assert!(html.contains("Predicted Food Waste Category: Low"), "{html}");
    }

    #[tokio::test]
    async fn missing_field_renders_generic_error() {
        let fx = fixture();
        let mut form = form_with("1");
        form.remove("food_service_estimate_kg");
        let html = submit(&fx.state, form).await;
        assert!(html.contains(GENERIC_ERROR_MESSAGE));
        assert!(!html.contains("Predicted Food Waste Category"));
    }

    #[tokio::test]
    async fn non_numeric_field_renders_generic_error() {
        let fx = fixture();
        let mut form = form_with("1");
        form.insert("household_estimate_tonnes".into(), "abc".into());
        let html = submit(&fx.state, form).await;
        assert!(html.contains(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn missing_artifacts_render_generic_error() {
        let provider = ModelProvider::new(
            ArtifactSource::Local(ArtifactPaths::new("/nonexistent/m.json", "/nonexistent/s.json")),
            food_waste::schema_v1(),
        );
        let state = AppState::new(provider);
        let html = submit(&state, form_with("1")).await;
        assert!(html.contains(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn health_reports_load_state() {
        let fx = fixture();
        let Json(before) = health(State(fx.state.clone())).await;
        assert_eq!(before["status"], "ok");
        assert_eq!(before["model_loaded"], false);
        assert_eq!(before["source"], "local");
        assert!(before["fetch_state"].is_null());

        submit(&fx.state, form_with("1")).await;
        let Json(after) = health(State(fx.state.clone())).await;
        assert_eq!(after["model_loaded"], true);
    }

    #[tokio::test]
    async fn serves_over_http() {
        let fx = fixture();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(fx.state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let base = format!("http://{addr}");

        let resp = client.get(&base).send().await.unwrap();
        assert!(resp.status().is_success());
        assert!(resp.text().await.unwrap().contains("<form"));

        let resp = client
            .post(format!("{base}/predict"))
            .form(&form_with("3"))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert!(
            resp.text()
                .await
                .unwrap()
                .contains("Predicted Food Waste Category: High")
        );

        // A body that is not form-encoded still gets the page back.
        let resp = client
            .post(format!("{base}/predict"))
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert!(resp.text().await.unwrap().contains(GENERIC_ERROR_MESSAGE));
    }
}
