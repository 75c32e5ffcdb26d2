// src/web/handlers/extractors.rs

//! Caller identity. Authentication itself happens upstream; the gateway in
//! front of this service forwards the user id and role as headers.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::order_queries::Viewer;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Customer,
  Admin,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: Role,
}

impl AuthenticatedUser {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn viewer(&self) -> Viewer {
    Viewer {
      user_id: self.user_id,
      is_admin: self.is_admin(),
    }
  }

  fn from_headers(req: &HttpRequest) -> Result<Self, AppError> {
    let user_id = req
      .headers()
      .get(USER_ID_HEADER)
      .and_then(|h| h.to_str().ok())
      .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
      .ok_or_else(|| {
        warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
        AppError::Auth("User authentication required.".to_string())
      })?;
    let role = match req.headers().get(USER_ROLE_HEADER).and_then(|h| h.to_str().ok()) {
      Some(raw) if raw.trim().eq_ignore_ascii_case("admin") => Role::Admin,
      _ => Role::Customer,
    };
    Ok(Self { user_id, role })
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Self::from_headers(req))
  }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(AuthenticatedUser::from_headers(req).and_then(|user| {
      if user.is_admin() {
        Ok(AdminUser(user))
      } else {
        warn!(user_id = %user.user_id, "Admin route called by a non-admin.");
        Err(AppError::Forbidden("Admin access required.".to_string()))
      }
    }))
  }
}
