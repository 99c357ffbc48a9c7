use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Management CLI for the route-dispatch server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show engine status and active configuration fingerprint
    Status,
    /// Show resolution and cache counters
    Stats,
    /// Drop every cached resolution
    ClearCache,
    /// Dispatch a pattern the way a client would
    Resolve {
        /// Route pattern, e.g. `admin.users@index`
        pattern: String,

        #[arg(long, default_value = "GET")]
        verb: String,

        #[arg(long, default_value = "/_dispatch")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Stats => {
            client
                .get(format!("{}/admin/stats", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::ClearCache => {
            client
                .post(format!("{}/admin/cache/clear", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Resolve {
            pattern,
            verb,
            prefix,
        } => {
            let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())?;
            let res = client
                .request(method, format!("{}{}/{}", cli.url, prefix.trim_end_matches('/'), pattern))
                .send()
                .await?;
            if let Some(cache) = res.headers().get("x-dispatch-cache") {
                eprintln!("cache: {}", cache.to_str().unwrap_or("?"));
            }
            res
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
