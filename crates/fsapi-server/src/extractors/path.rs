//! Virtual path extractor

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::PathRejection, FromRequestParts, Path},
    http::request::Parts,
};
use fsapi_core::VirtualPath;
use std::collections::HashMap;

const PATH_PARAM: &str = "path";

/// Percent-decoded remainder of the request path after `/api/files`.
///
/// Routes without a wildcard (the root) yield `/`.
#[derive(Debug, Clone)]
pub struct FilePath(pub VirtualPath);

#[async_trait]
impl<S> FromRequestParts<S> for FilePath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // The root routes carry no captures at all
        let captures = Path::<HashMap<String, String>>::from_request_parts(parts, state).await;
        let mut params = match captures {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(e) => return Err(ApiError::BadRequest(e.body_text())),
        };
        let raw = params.remove(PATH_PARAM).unwrap_or_default();

        VirtualPath::parse(&raw)
            .map(FilePath)
            .map_err(ApiError::from)
    }
}
