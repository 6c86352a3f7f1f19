//! OAuth support for the Claude Code authenticated variant

pub mod token_manager;

pub use token_manager::{
    parse_expires_at, RefreshCallback, RefreshedTokens, TokenManager, TokenManagerBuilder,
    TokenState,
};
