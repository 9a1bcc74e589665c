// secure_chat/chat_server/src/config.rs

use std::fmt;
use std::net::SocketAddr;

use chat_crypto::{MessageAuthPipeline, UntaggedPolicy};
use clap::Parser;

use crate::error::ApiResult;

/// Secure chat server
///
/// Stores messages as toy-RSA ciphertext tagged with HMAC-SHA-256 and
/// re-verifies every message on read.
#[derive(Parser, Clone)]
#[command(name = "chat_server")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listen address for the HTTP API
    #[arg(short, long, env = "CHAT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Shared HMAC secret (must not be empty)
    #[arg(long, env = "CHAT_HMAC_SECRET", hide_env_values = true)]
    pub hmac_secret: String,

    /// Report messages without a tag as unverified
    #[arg(long, env = "CHAT_REQUIRE_TAGS", default_value = "false")]
    pub require_tags: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CHAT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "CHAT_LOG_FORMAT", default_value = "plain")]
    pub log_format: String,
}

impl Args {
    pub fn untagged_policy(&self) -> UntaggedPolicy {
        if self.require_tags {
            UntaggedPolicy::Reject
        } else {
            UntaggedPolicy::Trust
        }
    }

    /// Builds the process-wide pipeline. Fails on an empty secret.
    pub fn build_pipeline(&self) -> ApiResult<MessageAuthPipeline> {
        let pipeline = MessageAuthPipeline::with_secret(&self.hmac_secret)?
            .with_untagged_policy(self.untagged_policy());
        Ok(pipeline)
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("bind", &self.bind)
            .field("hmac_secret", &"<redacted>")
            .field("require_tags", &self.require_tags)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}
