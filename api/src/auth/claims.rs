use db::models::user::Role;
use db::policy::Caller;
use serde::{Deserialize, Serialize};

/// Claims asserted by the external identity gate. The core never issues
/// these outside of tests; it only verifies and consumes them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// The caller identity consulted by the authorization policy.
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.0.sub,
            role: self.0.role,
        }
    }
}
