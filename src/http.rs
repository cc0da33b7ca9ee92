use crate::{
    admin::{AdminDraft, AdminError, NewSlot},
    backend::StorageBackend,
    booking,
    configuration::Configuration,
    greeting::{Greeter, GreetingError, TextGenerator},
    storage::Storage,
    types::{BookingDetails, CompanyInfo, TimeSlot},
};
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use validator::Validate;

const SLOT_TAKEN: &str = "This time slot has already been booked. Please choose another one.";
const SAVE_FAILED: &str = "Saving failed. Please try again.";

#[derive(Clone)]
pub struct AppState<B, C, G> {
    pub storage: Storage<B>,
    pub configuration: C,
    pub greeter: Greeter<G>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingQuery {
    pub candidate_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub greeting: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub supported: bool,
    pub selected: bool,
    pub configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectKeyRequest {
    pub key: String,
}

pub fn create_app<B, C, G>(storage: Storage<B>, configuration: C, greeter: Greeter<G>) -> Router
where
    B: StorageBackend,
    C: Configuration,
    G: TextGenerator,
{
    let state = AppState {
        storage,
        configuration,
        greeter,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/slots", get(get_slots::<B, C, G>))
        .route("/config", get(get_config::<B, C, G>))
        .route("/greeting", get(get_greeting::<B, C, G>))
        .route("/book", post(book_slot::<B, C, G>));

    let admin = Router::new()
        .route("/admin", put(save_draft::<B, C, G>))
        .route(
            "/admin/slots",
            get(get_all_slots::<B, C, G>).post(add_slot::<B, C, G>),
        )
        .route("/admin/slots/:id", delete(remove_slot::<B, C, G>))
        .route("/admin/bookings", get(get_bookings::<B, C, G>))
        .route("/admin/greeting", post(preview_greeting::<B, C, G>))
        .route(
            "/admin/api_key",
            get(get_api_key_status::<B, C, G>).post(select_api_key::<B, C, G>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<B, C, G>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors)
}

async fn admin_auth<B, C, G>(
    State(state): State<AppState<B, C, G>>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)>
where
    B: StorageBackend,
    C: Configuration,
    G: TextGenerator,
{
    let Some(auth_header) = request.headers().get("x-admin-password") else {
        return Err((StatusCode::UNAUTHORIZED, "Missing credentials".to_string()));
    };
    let password = auth_header.to_str().unwrap_or("");
    if password.is_empty() || password != state.configuration.admin_password() {
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }
    Ok(next.run(request).await)
}

/// Runs blocking storage work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, (StatusCode, String)>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|err| {
        error!(?err, "Storage task failed");
        (StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED.to_string())
    })
}

fn admin_error(err: AdminError) -> (StatusCode, String) {
    match err {
        AdminError::InvalidSlot(_) | AdminError::InconsistentSlot(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        AdminError::Storage(err) => {
            error!(?err, "Failed to save admin changes");
            (StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED.to_string())
        }
    }
}

async fn get_slots<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Json<Vec<TimeSlot>> {
    let slots = state
        .storage
        .load_slots()
        .into_iter()
        .filter(|slot| slot.is_active)
        .map(TimeSlot::without_booker)
        .collect();
    Json(slots)
}

async fn get_config<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Json<CompanyInfo> {
    Json(state.storage.load_config())
}

async fn get_greeting<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Query(query): Query<GreetingQuery>,
) -> Json<GreetingResponse> {
    let company = state.storage.load_config();
    let greeting = state
        .greeter
        .greeting(&company, query.candidate_name.as_deref())
        .await;
    Json(GreetingResponse { greeting })
}

async fn book_slot<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Json(details): Json<BookingDetails>,
) -> Result<Json<BookingResponse>, (StatusCode, String)> {
    if let Err(err) = details.validate() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, err.to_string()));
    }
    let storage = state.storage.clone();
    let slot_id = details.slot_id.clone();
    match blocking(move || booking::book_active(&storage, &details)).await? {
        Ok(true) => Ok(Json(BookingResponse { booked: true })),
        Ok(false) => Err((StatusCode::CONFLICT, SLOT_TAKEN.to_string())),
        Err(err) => {
            error!(?err, %slot_id, "Failed to persist booking");
            Err((StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED.to_string()))
        }
    }
}

async fn get_all_slots<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Json<Vec<TimeSlot>> {
    Json(state.storage.load_slots())
}

async fn get_bookings<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Json<Vec<TimeSlot>> {
    let draft = AdminDraft::load(&state.storage);
    Json(draft.booked_slots().into_iter().cloned().collect())
}

async fn save_draft<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Json(draft): Json<AdminDraft>,
) -> Result<StatusCode, (StatusCode, String)> {
    let storage = state.storage.clone();
    blocking(move || draft.save(&storage)).await?.map_err(admin_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_slot<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Json(new_slot): Json<NewSlot>,
) -> Result<(StatusCode, Json<TimeSlot>), (StatusCode, String)> {
    let storage = state.storage.clone();
    let slot = blocking(move || -> Result<TimeSlot, AdminError> {
        let locked = storage.lock();
        let mut draft = AdminDraft::load_locked(&locked);
        let slot = draft.add_slot(new_slot)?.clone();
        draft.save_locked(&locked)?;
        Ok(slot)
    })
    .await?
    .map_err(admin_error)?;
    info!(slot_id = %slot.id, "Timeslot added");
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn remove_slot<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let storage = state.storage.clone();
    let slot_id = id.clone();
    let removed = blocking(move || -> Result<bool, AdminError> {
        let locked = storage.lock();
        let mut draft = AdminDraft::load_locked(&locked);
        if !draft.remove_slot(&slot_id) {
            return Ok(false);
        }
        draft.save_locked(&locked).map(|()| true)
    })
    .await?
    .map_err(admin_error)?;
    if !removed {
        return Err((
            StatusCode::NOT_FOUND,
            "Timeslot does not exist and can't be removed".to_string(),
        ));
    }
    info!(slot_id = %id, "Timeslot removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_greeting<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Result<Json<GreetingResponse>, (StatusCode, String)> {
    let company = state.storage.load_config();
    match state.greeter.generate(&company).await {
        Ok(greeting) => Ok(Json(GreetingResponse { greeting })),
        Err(err @ (GreetingError::MissingApiKey | GreetingError::KeySelectionRequired)) => {
            Err((StatusCode::PRECONDITION_FAILED, err.to_string()))
        }
        Err(err) => {
            error!(?err, "Failed to generate greeting preview");
            Err((StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}

async fn get_api_key_status<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
) -> Json<ApiKeyStatus> {
    let key_selection = state.greeter.key_selection();
    Json(ApiKeyStatus {
        supported: key_selection.is_some(),
        selected: key_selection.is_some_and(|selection| selection.has_selected_key()),
        configured: state.configuration.api_key().is_some(),
    })
}

async fn select_api_key<B: StorageBackend, C: Configuration, G: TextGenerator>(
    State(state): State<AppState<B, C, G>>,
    Json(request): Json<SelectKeyRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(key_selection) = state.greeter.key_selection() else {
        return Err((
            StatusCode::NOT_IMPLEMENTED,
            "Key selection is not supported by this host".to_string(),
        ));
    };
    key_selection
        .select_key(request.key)
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err))?;
    Ok(StatusCode::NO_CONTENT)
}
