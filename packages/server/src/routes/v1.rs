use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{users, works};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/works", works_routes(config))
        .nest("/users", user_routes())
}

fn works_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    // Upload and list share "/", so they register together; the body limit
    // only matters for the POST.
    let collection = OpenApiRouter::new()
        .routes(routes!(works::upload_work, works::list_works))
        .layer(works::upload_body_limit(config));

    let item = OpenApiRouter::new()
        .routes(routes!(works::get_work))
        .routes(routes!(works::preview_work))
        .routes(routes!(works::download_work));

    collection.merge(item)
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(users::create_user))
        .routes(routes!(users::get_user))
}
