//! Token values, secrets, and the uniform endpoint response shape.

pub mod record;
pub mod response;
pub mod secret;
