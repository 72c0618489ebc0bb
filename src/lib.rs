pub mod cli;
pub mod error;
pub mod history;
pub mod key;
pub mod models;
pub mod server;
pub mod service;

use cli::Args;
use log::info;
use server::Server;
use service::{ ChatService, RequestLimits };
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Store Type: {}", args.store_type);
    if args.store_type.eq_ignore_ascii_case("redis") {
        info!("Store Redis URL: {}", args.store_redis_url);
        info!("Store Redis Prefix: {}", args.store_redis_prefix);
    }
    info!("Max Conversations: {}", args.max_conversations);
    info!("Max Messages Per Conversation: {}", args.max_messages_per_conversation);
    info!("Max Text Bytes: {}", args.max_text_bytes);
    info!("Pull Limit: default {}, max {}", args.default_pull_limit, args.max_pull_limit);
    info!("Rate Limit Per Second: {}", args.rate_limit_per_sec);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let store = history::initialize_message_store(&args)?;
    let service = ChatService::new(store, RequestLimits::from(&args));
    let server = Server::new(args.server_addr.clone(), service, args);
    server.run().await?;

    Ok(())
}
