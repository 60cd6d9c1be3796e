//! # Clipstream (User Management & Sessions API)
//!
//! `clipstream` is the user-management backend of the clipstream video
//! platform: registration with media-backed avatars, credential login,
//! token-based session continuation, profile mutation, and channel
//! subscriptions.
//!
//! ## Sessions
//!
//! Authentication is a signed-token pair: a short-lived access token
//! presented on every request (cookie or bearer) and a long-lived refresh
//! token persisted as the account's single current value. Issuing a new
//! refresh token overwrites the previous one, so each account has at most
//! one active session. Rotation exchanges a valid refresh token for a new
//! pair and invalidates the presented token.
//!
//! Access tokens are stateless: logout clears the stored refresh token and
//! the transport cookies, but an already-issued access token keeps
//! authenticating until it expires. Short access TTLs bound that window.

pub mod api;
pub mod cli;
pub mod media;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
