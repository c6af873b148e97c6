use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use models::person::validate_input;
use models::Person;

use crate::{errors::JsonApiError, state::AppState};

/// Client payload for create and update. The id never comes from the body;
/// missing fields bind as empty and are then rejected by validation.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct PersonInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub work: String,
    #[serde(default)]
    pub age: i32,
}

impl PersonInput {
    fn validated(self) -> Result<Person, JsonApiError> {
        validate_input(&self.name, &self.address, &self.work, self.age)?;
        Ok(Person::new(self.name, self.address, self.work, self.age))
    }
}

#[utoipa::path(
    get, path = "/api/v1/persons", tag = "persons",
    responses(
        (status = 200, description = "All readable persons", body = [crate::openapi::PersonDoc])
    )
)]
pub async fn list_persons(State(state): State<AppState>) -> Json<Vec<Person>> {
    let scan = state.persons.get_all().await;
    if let Some(e) = &scan.error {
        warn!(err = %e, returned = scan.persons.len(), "person scan incomplete, returning partial list");
    }
    Json(scan.persons)
}

#[utoipa::path(
    get, path = "/api/v1/persons/{id}", tag = "persons",
    params(("id" = i64, Path, description = "Person id")),
    responses(
        (status = 200, description = "Found", body = crate::openapi::PersonDoc),
        (status = 400, description = "Invalid Id", body = crate::openapi::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn get_person(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>, JsonApiError> {
    let Path(id) = id?;
    let person = state.persons.get(id).await?;
    Ok(Json(person))
}

#[utoipa::path(
    post, path = "/api/v1/persons", tag = "persons",
    request_body = crate::openapi::PersonInputDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::PersonDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn create_person(
    State(state): State<AppState>,
    input: Result<Json<PersonInput>, JsonRejection>,
) -> Result<impl IntoResponse, JsonApiError> {
    let Json(input) = input?;
    let mut person = input.validated()?;
    let id = state.persons.insert(&mut person).await?;
    info!(id, name = %person.name, "created person");
    let location = format!("/api/v1/persons/{id}");
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(person)))
}

#[utoipa::path(
    patch, path = "/api/v1/persons/{id}", tag = "persons",
    params(("id" = i64, Path, description = "Person id")),
    request_body = crate::openapi::PersonInputDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::PersonDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn update_person(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<PersonInput>, JsonRejection>,
) -> Result<Json<Person>, JsonApiError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let person = input.validated()?.with_id(id);
    state.persons.update(&person).await?;
    info!(id, "updated person");
    Ok(Json(person))
}

#[utoipa::path(
    delete, path = "/api/v1/persons/{id}", tag = "persons",
    params(("id" = i64, Path, description = "Person id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Invalid Id", body = crate::openapi::ErrorResponse),
        (status = 404, description = "Not Found", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn delete_person(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, JsonApiError> {
    let Path(id) = id?;
    state.persons.delete(id).await?;
    info!(id, "deleted person");
    Ok(StatusCode::NO_CONTENT)
}
