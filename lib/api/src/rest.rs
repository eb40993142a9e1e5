use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use simrec_core::{Error, ItemId, Recommendation, RecommendationService};
use tracing::{debug, error};

const DEFAULT_LIMIT: usize = 10;

#[derive(Deserialize)]
struct RecommendRequest {
    title: Option<String>,
    id: Option<ItemId>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct SearchRequest {
    text: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ItemInfo {
    id: ItemId,
    title: String,
}

#[derive(Serialize)]
struct Stats {
    generation: u64,
    items: usize,
    dimension: usize,
    index_kind: String,
    built_at: String,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(service: RecommendationService, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(service.clone()))
                .configure(Self::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Route table. The caller provides `web::Data<RecommendationService>`.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/recommend", web::post().to(recommend))
            .route("/search", web::post().to(search))
            .route("/items/{id}", web::get().to(get_item))
            .route("/items/{id}/recommendations", web::get().to(item_recommendations))
            .route("/stats", web::get().to(stats))
            .route("/healthz", web::get().to(healthz));
    }
}

fn error_response(e: Error) -> HttpResponse {
    if e.is_not_found() {
        debug!("Not found: {}", e);
        HttpResponse::NotFound().json(serde_json::json!({
            "error": "Item not found"
        }))
    } else {
        error!("Request failed: {}", e);
        HttpResponse::InternalServerError().json(serde_json::json!({
            "error": e.to_string()
        }))
    }
}

async fn recommend(
    service: web::Data<RecommendationService>,
    req: web::Json<RecommendRequest>,
) -> ActixResult<HttpResponse> {
    let req = req.into_inner();
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT);

    let result = match (req.title, req.id) {
        (Some(title), _) => service.recommend_by_title(&title, limit),
        (None, Some(id)) => service.recommend_scored(&id, limit),
        (None, None) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Either 'title' or 'id' must be provided"
            })));
        }
    };

    match result {
        Ok(recs) => {
            let titles: Vec<String> = recs.into_iter().map(|r| r.title).collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "recommendations": titles
            })))
        }
        Err(e) => Ok(error_response(e)),
    }
}

async fn item_recommendations(
    service: web::Data<RecommendationService>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> ActixResult<HttpResponse> {
    let id = ItemId::parse(&path.into_inner());
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    match service.recommend_scored(&id, limit) {
        Ok(recs) => Ok(result_response(recs)),
        Err(e) => Ok(error_response(e)),
    }
}

async fn get_item(
    service: web::Data<RecommendationService>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = ItemId::parse(&path.into_inner());
    let generation = service.engine().current();

    match generation.title(&id) {
        Some(title) => {
            let info = ItemInfo {
                title: title.to_string(),
                id,
            };
            Ok(HttpResponse::Ok().json(serde_json::json!({ "result": info })))
        }
        None => Ok(error_response(Error::ItemNotFound(id.to_string()))),
    }
}

async fn search(
    service: web::Data<RecommendationService>,
    req: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT);
    match service.search_text(&req.text, limit) {
        Ok(hits) => Ok(result_response(hits)),
        Err(e) => Ok(error_response(e)),
    }
}

async fn stats(service: web::Data<RecommendationService>) -> ActixResult<HttpResponse> {
    let generation = service.engine().current();
    let stats = Stats {
        generation: generation.number(),
        items: generation.len(),
        dimension: generation.dim(),
        index_kind: generation.index().kind().to_string(),
        built_at: generation.built_at().to_rfc3339(),
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "result": stats })))
}

async fn healthz() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

fn result_response(recs: Vec<Recommendation>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "result": recs }))
}
