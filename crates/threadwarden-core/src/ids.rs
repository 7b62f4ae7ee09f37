//! Identifiers used by the platform.
//!
//! The platform hands out opaque numeric-looking strings for both threads and
//! users. They are compared byte for byte and never normalized.

/// Identifier of a chat thread (group).
pub type ThreadId = String;

/// Identifier of a platform user.
pub type UserId = String;
