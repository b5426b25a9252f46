use std::sync::Arc;

use anyhow::Context;
use maylove::api::{AppState, build_app};
use maylove::backend::{MemoryBackend, SupabaseBackend};
use maylove::config::AppConfig;
use maylove::onboarding::{OnboardingSessions, spawn_prune_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("💛 Maylove v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);

    // ── Backend ─────────────────────────────────────────────────────────
    let sessions =
        OnboardingSessions::with_limits(config.max_sessions, config.session_idle_timeout);
    let state = match config.supabase {
        Some(supabase) => {
            eprintln!("   Backend: Supabase ({})", supabase.url);
            AppState::with_backend(Arc::new(SupabaseBackend::new(supabase)), sessions.clone())
        }
        None => {
            tracing::warn!(
                "SUPABASE_URL / SUPABASE_ANON_KEY not set; using in-memory backend, data is lost on restart"
            );
            eprintln!("   Backend: in-memory (local mode)");
            AppState::with_backend(Arc::new(MemoryBackend::new()), sessions.clone())
        }
    };

    // Sweep abandoned onboarding sessions
    let _prune_handle = spawn_prune_task(sessions);

    let app = build_app(state, config.cors_origin.as_deref())?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Maylove API server started");
    axum::serve(listener, app).await?;

    Ok(())
}
