use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use appserver::{config, config::ServerConfig, constants};
use appserver::engine::{self, Engine, HandlerOutcome};
use appserver::route::{RouteOptions, RouteRegistry};
use appserver::server;
use appserver::worker::WorkerPools;

const MODULE_NAME_WIDTH: usize = 40;

struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(
            now.as_secs() as i64,
            now.subsec_nanos(),
        )
        .unwrap_or_default();

        let target = metadata.target();
        let cleaned_target = target.strip_prefix("appserver::").unwrap_or(target);
        let padded_target = format!("{:<width$}", cleaned_target, width = MODULE_NAME_WIDTH);

        write!(
            writer,
            "{} {:>5} {}: ",
            datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            metadata.level(),
            padded_target
        )?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[derive(Parser, Debug)]
#[command(name = "appserver")]
#[command(about = "HTTP/1.1 + WebSocket application server with decorator-style routing")]
pub struct Args {
    /// Address to bind the HTTP/WebSocket listener to
    #[arg(long, default_value_t = constants::DEFAULT_HOST.to_string())]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = constants::DEFAULT_PORT)]
    pub port: u16,

    /// TCP accept backlog
    #[arg(long, default_value_t = constants::DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Host allowed to connect; repeatable. Defaults to loopback only.
    #[arg(long = "allowed-host")]
    pub allowed_hosts: Vec<IpAddr>,

    /// Redis URL for the result cache's Redis backend, if enabled
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Port for the documented gRPC service stub (unset disables it)
    #[arg(long)]
    pub grpc_port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "{}={},appserver={}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            log_level,
            log_level
        ))
        .event_format(CustomFormatter)
        .init();

    info!("starting appserver");
    info!("binding to: {}:{}", args.host, args.port);

    let port = ServerConfig::validate_port(args.port as i64)?;

    let allowed_hosts = if args.allowed_hosts.is_empty() {
        vec!["127.0.0.1".parse().expect("valid loopback literal")]
    } else {
        args.allowed_hosts
    };

    let config = ServerConfig {
        host: args.host,
        port,
        backlog: args.backlog,
        allowed_hosts: allowed_hosts.clone(),
        redis: args.redis_url.map(|url| config::RedisConfig { url }),
        grpc_port: args.grpc_port,
    };

    let mut routes = RouteRegistry::new();
    register_routes(&mut routes)?;

    let workers = WorkerPools::with_defaults(64);
    let engine = Engine::new(routes, workers, allowed_hosts);

    let server = server::Server::new(config, engine);
    server.run().await
}

/// Placeholder route table: the decorator-style registration surface a
/// real application would populate (spec §3, §4.2). A bare server binary
/// with no application routes registered would accept connections and
/// answer every request with 404, which is valid but uninteresting, so a
/// health check is wired up by default.
fn register_routes(routes: &mut RouteRegistry) -> Result<()> {
    let health: engine::Handler = std::sync::Arc::new(|_params: HashMap<String, String>| {
        Box::pin(async { HandlerOutcome::json(serde_json::json!({"status": "ok"})) })
    });
    routes.register_http(
        "/health",
        health,
        vec!["GET".to_string()],
        false,
        RouteOptions::default(),
    )?;
    Ok(())
}
