//! Slash-command gateway for chat-driven issue tracking.
//!
//! Invocation text is split into a command path and key/value parameters
//! ([`slash`]), routed to a registered handler ([`dispatch`]), and answered
//! either inline or through the platform's callback URL ([`callback`]).
//! The [`server`] module is the HTTP front door; [`commands`] holds the
//! built-in command set.

pub mod callback;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod help;
pub mod request;
pub mod response;
pub mod server;
pub mod slash;
pub mod tracker;
