use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::policy::CallerIdentity;

/// Decodes the bearer token and attaches a [`CallerIdentity`] to the request
/// before any handler runs. Missing or invalid credentials never reach a
/// handler.
pub async fn auth_middleware(
    mut req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .jwt_secret
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => {
                let resp = HttpResponse::Unauthorized()
                    .json(json!({"success": false, "message": "Invalid Authorization header encoding"}));
                return Ok(req.into_response(resp.map_into_boxed_body()));
            }
        },
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"success": false, "message": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"success": false, "message": "Authorization header must start with Bearer"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let claims = match verify_token(token, &secret) {
        Ok(c) => c,
        Err(e @ (ApiError::TokenExpired | ApiError::TokenInvalid)) => {
            let resp = actix_web::ResponseError::error_response(&e);
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
        Err(e) => return Err(e.into()),
    };

    let caller = CallerIdentity {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
        employee_id: claims.employee_id,
    };

    req.extensions_mut().insert(caller);

    next.call(req).await
}
