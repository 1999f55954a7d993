//! Call assistant server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tokio_util::sync::CancellationToken;

use call_assistant_agent::{AgentError, Session};
use call_assistant_audio::{
    HttpSynthesizer, PhraseConfig, SynthesizerConfig, SystemAudioTranscriber, TranscriberConfig,
};
use call_assistant_automation::{
    CookieStore, DisabledMailer, Mailer, ShiftWorkflow, SmtpMailer, WebDriverConnector,
};
use call_assistant_config::{load_settings, Settings};
use call_assistant_llm::{DateReasoner, OllamaChat};
use call_assistant_server::{create_router, AppState, SessionFactory, SessionRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(std::env::var("CALL_ASSISTANT_ENV").ok().as_deref())?;
    init_tracing(&settings);

    tracing::info!("starting call assistant server v{}", env!("CARGO_PKG_VERSION"));

    let factory = build_session_factory(&settings)?;
    let registry = SessionRegistry::new(factory);
    let state = AppState::new(settings.clone(), registry.clone());

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop any calls still live before the process exits.
    registry.drain().await;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wire the per-session object graph out of the process-wide settings.
///
/// The browser connector, cookie store and mailer are shared; chats,
/// the date reasoner, the workflow and the audio adapters are built
/// fresh per call so no state crosses sessions.
fn build_session_factory(settings: &Settings) -> Result<SessionFactory, Box<dyn std::error::Error>> {
    let connector = Arc::new(WebDriverConnector::new(
        &settings.site.webdriver_url,
        Duration::from_secs(settings.site.navigation_timeout_secs),
    )?);
    let cookies = CookieStore::new(&settings.site.session_dir)?;

    let mailer: Arc<dyn Mailer> = if settings.mail.sender.is_empty() {
        tracing::warn!("mail transport not configured; cancellation submissions will fail");
        Arc::new(DisabledMailer)
    } else {
        Arc::new(SmtpMailer::new(&settings.mail)?)
    };

    let settings = settings.clone();
    let factory: SessionFactory = Arc::new(move |call_id: &str,
                                                caller_phone: &str,
                                                stop: CancellationToken|
          -> Result<Session, AgentError> {
        let model_timeout = Duration::from_secs(settings.llm.request_timeout_secs);

        let conversation_chat = Arc::new(OllamaChat::new(
            &settings.llm.endpoint,
            &settings.llm.conversation_model,
            model_timeout,
        )?);
        let reasoner_chat = Arc::new(OllamaChat::new(
            &settings.llm.endpoint,
            &settings.llm.reasoner_model,
            model_timeout,
        )?);
        let reasoner = DateReasoner::new(reasoner_chat, settings.today_override);

        let workflow = Arc::new(ShiftWorkflow::new(
            connector.clone(),
            cookies.clone(),
            settings.site.clone(),
            mailer.clone(),
            settings.mail.subject.clone(),
            reasoner,
        ));

        let transcriber = Arc::new(SystemAudioTranscriber::new(TranscriberConfig {
            input_device: settings.audio.input_device.clone(),
            transcription_url: settings.audio.transcription_url.clone(),
            sample_rate: settings.audio.sample_rate,
            phrase: PhraseConfig {
                silence_timeout: Duration::from_secs(settings.audio.silence_timeout_secs),
                max_phrase: Duration::from_secs(settings.audio.max_phrase_secs),
            },
            speech_threshold: 0.01,
        })?);
        let synthesizer = Arc::new(HttpSynthesizer::new(SynthesizerConfig {
            synthesis_url: settings.audio.synthesis_url.clone(),
            output_device: settings.audio.output_device.clone(),
        })?);

        Ok(Session::new(
            call_id,
            caller_phone,
            transcriber,
            synthesizer,
            conversation_chat,
            workflow,
            stop,
        ))
    });
    Ok(factory)
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", settings.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
