use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload. The user id is the only identity claim; `iat`/`exp` bound its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}
