use axum::{
    extract::Request,
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};

/// Drop a single trailing `/` from the path so `/api/v1/ping/` routes like `/api/v1/ping`.
///
/// Must wrap the router as a whole; route-level middleware runs after matching.
pub async fn strip_trailing_slash(mut request: Request, next: Next) -> Response {
    if let Some(uri) = stripped_uri(request.uri()) {
        *request.uri_mut() = uri;
    }
    next.run(request).await
}

fn stripped_uri(uri: &Uri) -> Option<Uri> {
    let path = uri.path();
    if path.len() <= 1 || !path.ends_with('/') {
        return None;
    }

    let trimmed = &path[..path.len() - 1];
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", trimmed, query),
        None => trimmed.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}
