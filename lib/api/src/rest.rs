use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use bizrec_core::{Error, FilterQuery, Preferences, StatusCode};
use bizrec_service::{EventQueue, PipelineStats, PipelineStatus, RecommendationService, Recommendations};
use serde::Serialize;
use std::sync::Arc;

/// Everything the HTTP handlers need.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<RecommendationService>,
    pub business_events: Arc<EventQueue>,
    pub preference_events: Arc<EventQueue>,
    pub ingestion_status: Arc<PipelineStatus>,
    pub preference_status: Arc<PipelineStatus>,
}

#[derive(Serialize)]
struct HealthResponse {
    index_loaded: bool,
    index_version: Option<u64>,
    records: usize,
    engine_invocations: u64,
    ingestion: PipelineStats,
    preferences: PipelineStats,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: ApiState, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .configure(routes)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Route table, shared by the server and tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/recommendations", web::post().to(recommend))
        .route("/recommendations/preferences", web::post().to(recommend_for_preferences))
        .route("/events/businesses", web::post().to(publish_business_event))
        .route("/events/preferences", web::post().to(publish_preference_event))
        .route("/health", web::get().to(health));
}

async fn recommend(
    state: web::Data<ApiState>,
    req: web::Json<FilterQuery>,
) -> ActixResult<HttpResponse> {
    let service = state.service.clone();
    let query = req.into_inner();
    let result = web::block(move || service.recommend(&query)).await?;
    Ok(respond(result))
}

async fn recommend_for_preferences(
    state: web::Data<ApiState>,
    req: web::Json<Preferences>,
) -> ActixResult<HttpResponse> {
    let service = state.service.clone();
    let preferences = req.into_inner();
    let result = web::block(move || service.recommend_for_preferences(&preferences)).await?;
    Ok(respond(result))
}

async fn publish_business_event(
    state: web::Data<ApiState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    Ok(enqueue(&state.business_events, body))
}

async fn publish_preference_event(
    state: web::Data<ApiState>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    Ok(enqueue(&state.preference_events, body))
}

async fn health(state: web::Data<ApiState>) -> ActixResult<HttpResponse> {
    let index = state.service.index().load().ok();
    Ok(HttpResponse::Ok().json(HealthResponse {
        index_loaded: index.is_some(),
        index_version: index.as_ref().map(|i| i.version()),
        records: index.as_ref().map_or(0, |i| i.len()),
        engine_invocations: state.service.engine_invocations(),
        ingestion: state.ingestion_status.snapshot(),
        preferences: state.preference_status.snapshot(),
    }))
}

fn enqueue(queue: &EventQueue, body: web::Bytes) -> HttpResponse {
    if queue.publish(body.to_vec()) {
        HttpResponse::Accepted().json(serde_json::json!({ "status": "queued" }))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "Event queue is closed"
        }))
    }
}

fn respond(result: Result<Recommendations, Error>) -> HttpResponse {
    match result {
        Ok(recommendations) => HttpResponse::Ok().json(recommendations),
        Err(e) => {
            let body = serde_json::json!({
                "error": e.to_string(),
                "code": e.status().to_string(),
            });
            match e.status() {
                StatusCode::InvalidArgument => HttpResponse::BadRequest().json(body),
                StatusCode::NotFound => HttpResponse::NotFound().json(body),
                StatusCode::Internal => {
                    tracing::error!("Recommendation request failed: {}", e);
                    HttpResponse::InternalServerError().json(body)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http, test};
    use bizrec_core::{
        BusinessFeatureRecord, BusinessFields, FeatureCatalog, FeatureIndexBuilder, IndexHandle,
    };
    use bizrec_service::{EventSource, ServiceConfig};
    use bizrec_storage::{MemoryCacheStore, MemoryStore};

    fn state(loaded: bool) -> ApiState {
        let index = Arc::new(IndexHandle::new());
        if loaded {
            let catalog = FeatureCatalog::from_records(
                ["a", "b"]
                    .iter()
                    .map(|id| {
                        BusinessFeatureRecord::new(BusinessFields {
                            business_id: id.to_string(),
                            name: id.to_string(),
                            category: "Cafe".to_string(),
                            city: "Boston".to_string(),
                            price: "$".to_string(),
                            rating: 4.0,
                            review_count: 10,
                            address: String::new(),
                            phone: String::new(),
                            image_url: String::new(),
                            url: String::new(),
                        })
                    })
                    .collect(),
            );
            index.publish(FeatureIndexBuilder::default().build(&catalog.snapshot()));
        }
        ApiState {
            service: Arc::new(RecommendationService::new(
                index,
                Arc::new(MemoryCacheStore::new()),
                Arc::new(MemoryStore::new()),
                ServiceConfig::default(),
            )),
            business_events: Arc::new(EventQueue::new()),
            preference_events: Arc::new(EventQueue::new()),
            ingestion_status: Arc::new(PipelineStatus::default()),
            preference_status: Arc::new(PipelineStatus::default()),
        }
    }

    fn query(min_rating: f64, city: &str) -> serde_json::Value {
        serde_json::json!({
            "category": "cafe",
            "city": city,
            "price": "$",
            "min_rating": min_rating,
            "min_review_count": 0
        })
    }

    #[actix_web::test]
    async fn test_status_mapping() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(state(true))).configure(routes),
        )
        .await;

        let cases = [
            (query(4.0, "Boston"), http::StatusCode::OK),
            (query(9.0, "Boston"), http::StatusCode::BAD_REQUEST),
            (query(4.0, "Denver"), http::StatusCode::NOT_FOUND),
        ];
        for (body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/recommendations")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
        }
    }

    #[actix_web::test]
    async fn test_unloaded_index_is_500() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(state(false))).configure(routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/recommendations/preferences")
            .set_json(serde_json::json!({"category": ["Cafe"], "city": "Boston"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_events_are_queued() {
        let state = state(true);
        let queue = state.preference_events.clone();
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/events/preferences")
            .set_payload("{\"user_id\": 1}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::ACCEPTED);
        assert_eq!(queue.pending(), 1);

        queue.close();
        let req = test::TestRequest::post()
            .uri("/events/preferences")
            .set_payload("{}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
