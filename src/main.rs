//! # Interview Coach Backend - Main Application Entry Point
//!
//! This is the main entry point for the interview-coach-backend web server.
//! It sets up an Actix-web HTTP server that runs a voice-driven mock
//! interview: the browser records an answer, the server transcribes it,
//! scores its vocal tone, asks a generative model for feedback, and speaks
//! the feedback back.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: The entire application is asynchronous for better performance
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc & RwLock**: Thread-safe shared state management
//! - **static**: Global variables that live for the entire program duration
//!
//! ## Application Architecture:
//! - **config**: Handles application configuration (TOML files + environment variables)
//! - **state**: Manages shared application state and metrics
//! - **interview**: Fixed question list and per-session cursors
//! - **audio**: Transcoding and tone analysis of uploaded answers
//! - **services**: Speech-to-text, feedback generation, and text-to-speech clients
//! - **pipeline**: The answer-processing flow that ties the above together
//! - **health**: Provides system health monitoring endpoints
//! - **middleware**: Custom request processing logic (logging, metrics)
//! - **handlers**: HTTP request handlers for API endpoints
//! - **error**: Custom error types and HTTP error responses

// Module declarations - These tell Rust about our other source files
mod audio;      // Transcoding and tone analysis (audio/ directory)
mod config;     // Configuration management (config.rs)
mod error;      // Error handling types (error.rs)
mod handlers;   // HTTP request handlers (handlers/ directory)
mod health;     // Health check endpoints (health.rs)
mod interview;  // Question list and session cursors (interview.rs)
mod middleware; // Custom middleware (middleware/ directory)
mod pipeline;   // The answer-processing pipeline (pipeline.rs)
mod services;   // External service clients (services/ directory)
mod state;      // Application state management (state.rs)

// External crate imports - These are dependencies from Cargo.toml
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal that can be accessed from anywhere in the program.
/// AtomicBool is thread-safe, meaning multiple threads can safely read/write to it.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Creates the working directory** for intermediate audio files
/// 4. **Creates shared application state** that all requests can access
/// 5. **Configures the HTTP server** with middleware and routes
/// 6. **Handles graceful shutdown** when receiving system signals
///
/// ## Error Handling:
/// If any step fails (config loading, missing GOOGLE_API_KEY, server binding,
/// etc.), the function returns an error and the program exits with a message.
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Set up structured logging (tracing) for debugging and monitoring
    init_tracing()?;

    // Load application configuration from config.toml and environment variables
    let config = AppConfig::load()?;
    // Validate that the configuration makes sense; this is where a missing
    // GOOGLE_API_KEY aborts startup rather than failing mid-request.
    config.validate()?;

    info!("Starting interview-coach-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!(
        "Interview questions: {}, model: {}",
        config.interview.questions.len(),
        config.services.gemini_model
    );

    // Intermediate audio files (uploads, transcodes, synthesized feedback)
    // land here; the answer pipeline assumes the directory exists.
    std::fs::create_dir_all(&config.audio.work_dir).with_context(|| {
        format!("Failed to create working directory {:?}", config.audio.work_dir)
    })?;
    info!("Working directory: {:?}", config.audio.work_dir);

    // Create the shared application state that all HTTP requests can access
    let app_state = AppState::new(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    // Set up signal handlers for graceful shutdown (Ctrl+C, SIGTERM, etc.)
    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        // Allow the recorded-answer upload to come from any origin; the
        // browser frontend may be served separately during development.
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/", web::get().to(handlers::index))
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/api")
                    .route("/answer", web::post().to(handlers::answer))
                    .route("/audio/{filename}", web::get().to(handlers::fetch_audio))
                    .route("/metrics", web::get().to(health::detailed_metrics)),
            )
    })
    .bind(&bind_addr)?
    .run();

    // Get a handle to control the server and spawn it in a separate task
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Wait for either the server to finish OR a shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info")
/// - If not set, defaults to "interview_coach_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_coach_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown.
///
/// Listens for SIGTERM and SIGINT; when either arrives, sets the global
/// shutdown flag so the main task can stop the server after in-flight
/// requests finish. An answer upload mid-pipeline gets to complete.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set.
///
/// Polls the atomic flag every 100ms; async sleep keeps the runtime free
/// for request handling in the meantime.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
