use utoipa::OpenApi;

use crate::routes::{codesage, health};

#[derive(OpenApi)]
#[openapi(info(
    title = "codesage-server",
    description = "CodeSage debugging assistant API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(codesage::CodeSageApi::openapi());
    root
}
