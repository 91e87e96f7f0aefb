//! Tenant scope and actor extraction from request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use procforge_core::types::TenantScope;

use crate::error::AppError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const APP_HEADER: &str = "x-app-id";
pub const CONTEXT_HEADER: &str = "x-context-id";
pub const USER_HEADER: &str = "x-user-id";

/// Actor recorded when the caller does not identify itself.
pub const DEFAULT_ACTOR: &str = "system";

/// Scope and actor of the current request.
///
/// `x-tenant-id` is required; `x-app-id` and `x-context-id` narrow the
/// scope when present. The actor comes from `x-user-id`.
///
/// ```ignore
/// async fn my_handler(ctx: RequestContext) -> AppResult<Json<()>> {
///     tracing::info!(scope = %ctx.scope, actor = %ctx.actor, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub scope: TenantScope,
    pub actor: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header(&parts.headers, TENANT_HEADER).ok_or_else(|| {
            AppError::BadRequest(format!("Missing {TENANT_HEADER} header"))
        })?;

        Ok(RequestContext {
            scope: TenantScope::new(
                tenant_id,
                header(&parts.headers, APP_HEADER),
                header(&parts.headers, CONTEXT_HEADER),
            ),
            actor: header(&parts.headers, USER_HEADER)
                .unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
        })
    }
}

/// Trimmed, non-empty header value.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<RequestContext, AppError> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn full_scope_and_actor() {
        let ctx = extract(&[
            (TENANT_HEADER, "acme"),
            (APP_HEADER, "hr"),
            (CONTEXT_HEADER, "eu"),
            (USER_HEADER, "alice"),
        ])
        .await
        .unwrap();
        assert_eq!(
            ctx.scope,
            TenantScope::new("acme", Some("hr".to_string()), Some("eu".to_string()))
        );
        assert_eq!(ctx.actor, "alice");
    }

    #[tokio::test]
    async fn optional_parts_default() {
        let ctx = extract(&[(TENANT_HEADER, "acme"), (APP_HEADER, " ")]).await.unwrap();
        assert_eq!(ctx.scope, TenantScope::tenant("acme"));
        assert_eq!(ctx.actor, DEFAULT_ACTOR);
    }

    #[tokio::test]
    async fn missing_tenant_is_rejected() {
        assert_matches!(
            extract(&[(USER_HEADER, "alice")]).await,
            Err(AppError::BadRequest(msg)) if msg.contains(TENANT_HEADER)
        );
    }
}
