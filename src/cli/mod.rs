use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP API to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8080")]
    pub server_addr: String,

    /// Maximum accepted requests per second across all clients. 0 disables the limiter.
    #[arg(long, env = "RATE_LIMIT_PER_SEC", default_value = "0")]
    pub rate_limit_per_sec: u32,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- Message Store Args ---
    /// Message store type (memory, redis)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// Redis endpoint used when STORE_TYPE=redis (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub store_redis_url: String,

    /// Prefix for Redis conversation keys.
    #[arg(long, env = "STORE_REDIS_PREFIX", default_value = "chat:")]
    pub store_redis_prefix: String,

    /// Maximum number of conversations held by the memory store. 0 means unbounded.
    #[arg(long, env = "MAX_CONVERSATIONS", default_value = "0")]
    pub max_conversations: usize,

    /// Maximum number of messages per conversation. 0 means unbounded.
    #[arg(long, env = "MAX_MESSAGES_PER_CONVERSATION", default_value = "0")]
    pub max_messages_per_conversation: usize,

    // --- Request Limits ---
    /// Maximum message text length in bytes.
    #[arg(long, env = "MAX_TEXT_BYTES", default_value = "4096")]
    pub max_text_bytes: usize,

    /// Number of messages returned by a pull without an explicit limit.
    #[arg(long, env = "DEFAULT_PULL_LIMIT", default_value = "10")]
    pub default_pull_limit: usize,

    /// Largest limit a pull may ask for.
    #[arg(long, env = "MAX_PULL_LIMIT", default_value = "100")]
    pub max_pull_limit: usize,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
