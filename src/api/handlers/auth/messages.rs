//! User-facing authentication and validation messages.
//!
//! Kept in one table; the existence-revealing texts ("does not exist",
//! "already exists") match the public API contract, and a hardened variant
//! only has to edit this module.

pub(crate) const MISSING_PAYLOAD: &str = "Missing payload";
pub(crate) const INVALID_MULTIPART: &str = "Invalid multipart payload";
pub(crate) const NO_UPDATES_PROVIDED: &str = "At least one field is required";
pub(crate) const ALL_FIELDS_REQUIRED: &str = "All fields are required";
pub(crate) const IDENTITY_REQUIRED: &str = "Username or email is required";
pub(crate) const INVALID_EMAIL: &str = "Invalid email address";
pub(crate) const USER_EXISTS: &str = "User with this email or username already exists";
pub(crate) const USER_DOES_NOT_EXIST: &str = "User does not exist";
pub(crate) const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub(crate) const INVALID_OLD_PASSWORD: &str = "Invalid old password";
pub(crate) const UNAUTHORIZED_REQUEST: &str = "Unauthorized request";
pub(crate) const INVALID_ACCESS_TOKEN: &str = "Invalid access token";
pub(crate) const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
pub(crate) const REFRESH_TOKEN_REUSED: &str = "Refresh token is expired or used";
pub(crate) const AVATAR_REQUIRED: &str = "Avatar is required";
pub(crate) const AVATAR_UPLOAD_FAILED: &str = "Avatar upload failed";
pub(crate) const COVER_REQUIRED: &str = "Cover image is required";
pub(crate) const COVER_UPLOAD_FAILED: &str = "Cover image upload failed";
pub(crate) const LOGIN_OK: &str = "User has successfully logged in";
pub(crate) const LOGOUT_OK: &str = "User has successfully logged out";
pub(crate) const REGISTER_OK: &str = "Successfully registered the user";
pub(crate) const REFRESH_OK: &str = "Session tokens rotated successfully";
