use std::sync::Arc;

use anyhow::Context;

use numerologist::bot::Router;
use numerologist::channels::TelegramChannel;
use numerologist::config::AppConfig;
use numerologist::llm::create_provider;
use numerologist::logging;
use numerologist::store::{LibSqlProfileStore, ProfileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=... OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    // Keeps the file writer flushing until shutdown.
    let _log_guard = logging::init(config.log_file.as_deref())?;

    eprintln!("🔢 Numerologist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!(
        "   Quota: {}",
        if config.bot.quota.enforced {
            format!("enforced, {} per new user", config.bot.quota.starting_quota)
        } else {
            "not enforced".to_string()
        }
    );
    if let Some(proxy) = &config.llm.proxy_url {
        eprintln!("   Proxy: {proxy}");
    }

    let llm = create_provider(&config.llm)?;

    let store: Arc<dyn ProfileStore> = Arc::new(
        LibSqlProfileStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );

    let telegram = TelegramChannel::new(config.telegram.clone());
    telegram
        .health_check()
        .await
        .context("Telegram health check failed")?;

    let router = Router::new(config.bot.clone(), store, llm, Arc::new(telegram));
    router.run().await?;

    Ok(())
}
