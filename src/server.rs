use std::io::Write;

use actix_multipart::{Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{Either, HttpResponse, HttpServer, ResponseError, get, post, web};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::error::{PredictError, ValidationError};
use crate::orchestrator::{PredictionRequest, Predictor};
use crate::protocol::{
    ErrorResponse, HealthResponse, PredictResponse, PropertiesForm, RootResponse,
};

/// Text form fields are short numbers; anything longer is a malformed request.
const MAX_TEXT_FIELD_BYTES: usize = 1024;

#[derive(Debug)]
pub struct AppState {
    pub predictor: Predictor,
    pub max_image_bytes: usize,
}

impl AppState {
    pub fn new(predictor: Predictor, max_image_bytes: usize) -> Self {
        Self {
            predictor,
            max_image_bytes,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("malformed multipart payload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("malformed form payload: {0}")]
    Form(String),

    #[error("form field '{0}' is too long")]
    FieldTooLong(String),

    #[error("prediction task failed: {0}")]
    Blocking(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Predict(PredictError::Validation(e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(RootResponse {
        message: "Mineral prediction API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[get("/health")]
pub async fn health(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_status: app_state.predictor.model_status().to_string(),
    })
}

/// Multipart form: optional `image` file part plus `hardness` and `density`.
#[post("/predict")]
pub async fn predict(
    payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (image, form) = read_multipart(payload, app_state.max_image_bytes).await?;
    let properties = form.into_properties()?;
    run_prediction(app_state, PredictionRequest::new(image, properties)).await
}

/// `hardness` and `density` as an urlencoded or multipart form, answered from
/// the rule table. Image parts of a multipart body are ignored.
#[post("/predict_simple")]
pub async fn predict_simple(
    payload: Either<web::Form<Vec<(String, String)>>, Multipart>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let form = match payload {
        Either::Left(form) => PropertiesForm::from_pairs(form.into_inner()),
        Either::Right(multipart) => {
            let (_image, form) = read_multipart(multipart, app_state.max_image_bytes).await?;
            form
        }
    };
    let properties = form.into_properties()?;
    run_prediction(app_state, PredictionRequest::without_image(properties)).await
}

async fn run_prediction(
    app_state: web::Data<AppState>,
    request: PredictionRequest,
) -> Result<HttpResponse, ApiError> {
    // Decoding and inference are CPU bound; keep them off the event loop.
    let outcome = web::block(move || app_state.predictor.predict(&request))
        .await
        .map_err(|e| ApiError::Blocking(e.to_string()))??;
    match &outcome.fallback {
        Some(reason) => log::debug!(
            "Prediction {} (fallback: {})",
            outcome.result.to_string(),
            reason
        ),
        None => log::debug!("Prediction {}", outcome.result.to_string()),
    }
    Ok(HttpResponse::Ok().json(PredictResponse::from(outcome.result)))
}

async fn read_multipart(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<(Option<Bytes>, PropertiesForm), ApiError> {
    let mut image = None;
    let mut form = PropertiesForm::default();

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();
        let is_image = matches!(name.as_str(), "image" | "file");
        let limit = if is_image {
            max_image_bytes
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if buf.len() + chunk.len() > limit {
                return Err(if is_image {
                    ValidationError::ImageTooLarge { limit }.into()
                } else {
                    ApiError::FieldTooLong(name)
                });
            }
            buf.extend_from_slice(&chunk);
        }

        if is_image {
            // Browsers send an empty part when no file was chosen.
            if !buf.is_empty() {
                image = Some(buf.freeze());
            }
        } else if !form.set_field(&name, String::from_utf8_lossy(&buf).into_owned()) {
            log::debug!("Ignoring unknown form field '{}'", name);
        }
    }
    Ok((image, form))
}

/// Register the API routes and their extractor configuration.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| ApiError::Form(err.to_string()).into()),
    )
    .service(root)
    .service(health)
    .service(predict)
    .service(predict_simple);
}

pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();
}

pub async fn startup(config: ServerConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    log::info!(
        "Starting server at {}:{} (model: {})",
        config.host,
        config.port,
        app_state.predictor.model_status()
    );

    let mut server = HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }
    server.bind((config.host, config.port))?.run().await
}
