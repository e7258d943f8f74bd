//! # livetrans
//!
//! Streaming translation relay binary: loads settings, wires the translator
//! and debounce engine into the `WebSocket` server, and runs until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use livetrans_core::Translator;
use livetrans_engine::DebounceConfig;
use livetrans_server::{RelayServer, ServerConfig};
use livetrans_settings::{RelaySettings, TranslatorKind};
use livetrans_telemetry::{init_telemetry, parse_level, TelemetryConfig};
use livetrans_translate::{
    EchoTranslator, MyMemoryConfig, MyMemoryTranslator, ReliableConfig, ReliableTranslator,
};

/// Streaming translation relay.
#[derive(Parser, Debug)]
#[command(name = "livetrans", about = "Streaming translation relay over WebSocket")]
struct Cli {
    /// Settings file (default `~/.livetrans/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Translation engine: `mymemory` or `echo`.
    #[arg(long)]
    translator: Option<TranslatorKind>,

    /// Source language code.
    #[arg(long)]
    source_lang: Option<String>,

    /// Target language code.
    #[arg(long)]
    target_lang: Option<String>,

    /// Default log level (`trace`..`error`).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(kind) = self.translator {
            settings.translator.kind = kind;
        }
        if let Some(lang) = &self.source_lang {
            settings.translator.source_lang = lang.clone();
        }
        if let Some(lang) = &self.target_lang {
            settings.translator.target_lang = lang.clone();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn load(cli: &Cli) -> Result<RelaySettings> {
    let mut settings = match &cli.config {
        Some(path) => livetrans_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => livetrans_settings::load_settings().context("Failed to load settings")?,
    };
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn telemetry_config(settings: &RelaySettings) -> TelemetryConfig {
    let log_level = parse_level(&settings.logging.level).unwrap_or(Level::INFO);
    let module_levels = settings
        .logging
        .module_levels
        .iter()
        .filter_map(|(module, level)| parse_level(level).map(|l| (module.clone(), l)))
        .collect();
    TelemetryConfig {
        log_level,
        module_levels,
        json: settings.logging.json,
    }
}

fn server_config(settings: &RelaySettings) -> ServerConfig {
    let s = &settings.server;
    ServerConfig {
        host: s.host.clone(),
        port: s.port,
        ws_path: s.ws_path.clone(),
        max_message_size: s.max_message_size,
        ping_interval_secs: s.ping_interval_secs,
        ping_timeout_secs: s.ping_timeout_secs,
        max_sessions: s.max_sessions,
        send_queue: s.send_queue,
        shutdown_timeout_secs: s.shutdown_timeout_secs,
    }
}

fn debounce_config(settings: &RelaySettings) -> DebounceConfig {
    let d = &settings.debounce;
    DebounceConfig {
        min_interval: Duration::from_millis(d.min_interval_ms),
        min_words: d.min_words,
        terminal_marks: d.terminal_marks.iter().filter_map(|m| m.chars().next()).collect(),
        empty_is_terminal: d.empty_is_terminal,
    }
}

fn build_translator(settings: &RelaySettings) -> Arc<dyn Translator> {
    let t = &settings.translator;
    let reliable = ReliableConfig {
        timeout: Duration::from_millis(t.timeout_ms),
        max_retries: t.max_retries,
        circuit_breaker_threshold: t.circuit_breaker_threshold.max(1),
        circuit_breaker_cooldown: Duration::from_secs(t.circuit_breaker_cooldown_secs),
        ..ReliableConfig::default()
    };

    match t.kind {
        TranslatorKind::MyMemory => {
            if t.contact_email.is_none() {
                warn!("no contact email configured; MyMemory applies the anonymous daily quota");
            }
            let engine = MyMemoryTranslator::new(MyMemoryConfig {
                base_url: t.base_url.clone(),
                source_lang: t.source_lang.clone(),
                target_lang: t.target_lang.clone(),
                contact_email: t.contact_email.clone(),
                max_query_bytes: t.max_query_bytes,
            });
            Arc::new(ReliableTranslator::new(engine, reliable))
        }
        TranslatorKind::Echo => Arc::new(ReliableTranslator::new(EchoTranslator::new(), reliable)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    let telemetry = init_telemetry(&telemetry_config(&settings));
    info!(
        translator = ?settings.translator.kind,
        langpair = %format!("{}|{}", settings.translator.source_lang, settings.translator.target_lang),
        "starting livetrans"
    );

    let server = RelayServer::new(
        server_config(&settings),
        debounce_config(&settings),
        build_translator(&settings),
        telemetry.metrics(),
    );

    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    info!(%addr, "livetrans ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    server.shutdown(handle).await;
    Ok(())
}
