//! # Runlet CLI Entry Point
//!
//! Main binary for the Runlet dynamic code hosting runtime.
//!
//! ## Usage
//!
//! ```bash
//! # Start a server
//! runlet serve -b 0.0.0.0:8080 -m ./modules
//!
//! # Make a raw engine call (outputs raw JSON)
//! runlet call http://127.0.0.1:8080 _status
//! runlet call http://127.0.0.1:8080 session.start -a '{"ttl_secs": 60}'
//!
//! # Upload a script file and call a function on it
//! runlet run-script http://127.0.0.1:8080 ./sum.js main -a '{"a":2,"b":3}'
//! ```
//!
//! ## URL Format
//!
//! Server URLs must include the `http://` or `https://` prefix.

use std::net::SocketAddr;

use anyhow::Result;
use argh::FromArgs;

/// Validates that a URL string starts with http:// or https://.
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

#[derive(FromArgs)]
/// Runlet - dynamic code hosting runtime
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
    RunScript(RunScriptArgs),
}

/// Arguments for starting a Runlet server.
///
/// The server hosts uploaded JavaScript bundles and exposes the JSON-RPC
/// engine surface on the bind address. Uploaded session files are persisted
/// under the modules directory, one subdirectory per session.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start a Runlet server
struct ServeArgs {
    /// address to bind the HTTP server to
    ///
    /// Defaults to "0.0.0.0:8080".
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,

    /// directory for persisted session module files
    ///
    /// Priority: this flag, then the RUNLET_MODULES_DIR env var, then
    /// "./modules". Created if absent.
    #[argh(option, short = 'm')]
    modules_dir: Option<String>,
}

/// Arguments for making a raw engine call.
///
/// Sends one JSON-RPC request and prints the raw JSON result to stdout,
/// suitable for piping into `jq` and friends. Errors go to stderr with a
/// non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call an engine method on a server
struct CallArgs {
    /// address of the server to call
    ///
    /// Must include the http:// or https:// prefix.
    #[argh(positional)]
    server_address: String,

    /// name of the engine method (e.g. session.start, script.list, _status)
    #[argh(positional)]
    method: String,

    /// JSON string containing the method parameters
    ///
    /// Must be valid JSON. Defaults to `{}`.
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,
}

/// Arguments for uploading a script file and calling a function on it.
///
/// Reads the file, uploads it to the stateless script surface (idempotent:
/// identical content keeps its id), then invokes the named function and
/// prints the raw JSON result.
#[derive(FromArgs)]
#[argh(subcommand, name = "run-script")]
/// upload a script file and call a function on it
struct RunScriptArgs {
    /// address of the server to call
    ///
    /// Must include the http:// or https:// prefix.
    #[argh(positional)]
    server_address: String,

    /// path to the JavaScript file to upload
    #[argh(positional)]
    script: String,

    /// name of the function to invoke on the uploaded script
    #[argh(positional)]
    function: String,

    /// JSON string containing the function parameters
    ///
    /// Must be valid JSON. Defaults to `{}`.
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Initialize tracing only for serve; call-style commands keep stdout
    // clean for unix tool usage (piping to jq, etc.)
    if matches!(cli.command, Commands::Serve(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
        Commands::RunScript(args) => run_script(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let modules_dir = args
        .modules_dir
        .or_else(|| std::env::var("RUNLET_MODULES_DIR").ok())
        .unwrap_or_else(|| "./modules".into());

    tracing::info!("Starting Runlet server");
    tracing::info!("Binding to: {}", args.bind);
    tracing::info!("Modules directory: {}", modules_dir);

    let host = runlet_server::Host::new(modules_dir)?;
    let server = runlet_server::HttpServer::new(std::sync::Arc::new(host));

    let addr: SocketAddr = args
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", args.bind, e))?;
    server.run(addr).await?;

    Ok(())
}

async fn run_call(args: CallArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let params: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;

    let client = runlet_client::RunletClient::new(&args.server_address);
    let result = client.call(&args.method, params).await?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn run_script(args: RunScriptArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let params: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;
    let source = std::fs::read_to_string(&args.script)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.script, e))?;

    let client = runlet_client::RunletClient::new(&args.server_address);
    let id = client.upload_script(&source).await?;
    let result = client.call_script(&id, &args.function, params).await?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
