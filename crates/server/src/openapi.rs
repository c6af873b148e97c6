use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct ErrorResponse { pub error: String, pub message: Option<String> }

#[derive(ToSchema)]
pub struct PersonDoc {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub work: String,
    pub age: i32,
}

/// Create/update payload; any `id` in the body is ignored.
#[derive(ToSchema)]
pub struct PersonInputDoc {
    pub name: String,
    pub address: String,
    pub work: String,
    pub age: i32,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::persons::list_persons,
        crate::routes::persons::get_person,
        crate::routes::persons::create_person,
        crate::routes::persons::update_person,
        crate::routes::persons::delete_person,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            PersonDoc,
            PersonInputDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "persons")
    )
)]
pub struct ApiDoc;
