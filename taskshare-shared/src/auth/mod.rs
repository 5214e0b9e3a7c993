/// Authentication and authorization
///
/// - [`password`]: Argon2id hashing and the registration password policy
/// - [`jwt`]: HS256 access tokens carrying the user ID as subject
/// - [`middleware`]: bearer-token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: task and group role resolution and permission checks

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
