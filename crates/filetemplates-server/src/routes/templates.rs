//! Template listing and file creation routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use filetemplates::TemplateGroupListing;
use tracing::{debug, info};

use crate::{
    AppState,
    error::{ApiError, Result},
    identity::CurrentUser,
    models::{ApiResponse, CreateFromTemplateRequest},
};

/// Create template routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates))
        .route("/create", post(create_from_template))
}

/// List every registered file type with the user's templates for it
async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<Vec<TemplateGroupListing>>>> {
    debug!("Listing templates for {:?}", user);

    let groups = state.template_service(user).list_mimetypes().await?;

    Ok(Json(ApiResponse::new(groups)))
}

/// Create a new file, empty or copied from a template
async fn create_from_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateFromTemplateRequest>,
) -> Result<impl IntoResponse> {
    if request.file_path.trim().is_empty() {
        return Err(ApiError::bad_request("filePath must not be empty"));
    }
    info!("Creating {} from template {:?}", request.file_path, request.template_path);

    let file = state
        .template_service(user)
        .create_from_template(&request.file_path, request.template_path.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(file, "File created".to_string())),
    ))
}
