//! Role policy engine for a content management console.
//!
//! Translates wire role documents into a normalized rule model and back,
//! prunes rules that reference deleted content types or locales, and answers
//! edit-time access questions for the current user's membership.

pub mod errors;
pub mod policy;
pub mod settings;
