use anyhow::Context;
use homegrown::api::{self, app_state::AppState};
use homegrown::config::loader::ConfigLoader;
use homegrown::observability::{ObservabilityState, create_observability_router, init_tracing};
use homegrown::services::{
    PersonaRegistry, create_chat_service, create_enrollment_service, create_llm_gateway,
    create_upload_service,
};
use homegrown::storage::StorageFactory;
use homegrown::storage::seed::seed_demo_data;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    info!("Starting {} ({})...", config.app_name, config.environment);
    ConfigLoader::validate(&config).context("invalid configuration")?;
    info!("Configuration loaded successfully");

    let repositories = StorageFactory::create(&config.database)
        .await
        .context("failed to initialize storage")?;
    info!("Repositories initialized: {:?}", repositories);

    if config.seed_demo_data {
        seed_demo_data(&repositories).await?;
    }

    let personas = Arc::new(PersonaRegistry::load(config.llm.persona_file.as_deref())?);
    info!("Persona registry initialized with {} personas", personas.len());

    let gateway = Arc::from(create_llm_gateway(&config.llm)?);
    if config.llm.offline_fallback {
        info!("LLM gateway running in offline mode");
    } else if config.llm.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; chat requests will fail until it is configured");
    } else {
        info!("LLM gateway initialized with model {}", config.llm.model);
    }

    let chat_service = create_chat_service(
        repositories.catalog.clone(),
        repositories.enrollments.clone(),
        repositories.chat_logs.clone(),
        repositories.turns.clone(),
        personas,
        gateway,
    );
    let enrollment_service = create_enrollment_service(
        repositories.enrollments.clone(),
        repositories.catalog.clone(),
    );
    let upload_service = create_upload_service(
        config.uploads.clone(),
        repositories.enrollments.clone(),
        repositories.chat_logs.clone(),
    );
    info!("Services initialized");

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION"),
        repositories.instance.clone(),
    ));
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let app_state = AppState::new(
        repositories,
        chat_service,
        enrollment_service,
        upload_service,
        config,
    );
    let router = create_observability_router(observability_state).merge(api::create_router(app_state));
    info!("API router created with observability endpoints");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
