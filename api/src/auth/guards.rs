use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::policy;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract and validate the user from request extensions and
/// insert it back into the request for downstream handlers.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Faculty-only guard for read-only report routes.
///
/// This is the LOOSE check: any faculty member passes, regardless of which
/// club they coordinate. Mutating routes must additionally resolve the
/// event's club and consult `policy::can_mutate_attendance` per request.
pub async fn allow_faculty(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !policy::can_view_reports(&user.caller()) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Faculty access required")),
        ));
    }

    Ok(next.run(req).await)
}
