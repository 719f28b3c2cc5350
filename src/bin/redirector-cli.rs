use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "redirector-cli")]
#[command(about = "Management CLI for the redirector admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "REDIRECTOR_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check redirector status
    Status,
    /// List registered redirects
    List,
    /// Register one redirect at runtime
    Register {
        /// Path pattern, e.g. /old/{id}
        #[arg(long)]
        from: String,
        /// Destination, e.g. /new/{id}
        #[arg(long)]
        to: String,
        /// Status code or name (permanent, temporary)
        #[arg(long)]
        status: Option<String>,
        /// Restrict the redirect to one host
        #[arg(long)]
        host: Option<String>,
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
        Commands::List => {
            client
                .get(format!("{}/admin/redirects", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Register {
            from,
            to,
            status,
            host,
        } => {
            client
                .post(format!("{}/admin/redirects", cli.url))
                .headers(headers)
                .json(&register_body(from, to, status, host))
                .send()
                .await?
        }
    };
    print_response(res).await
}

fn register_body(from: String, to: String, status: Option<String>, host: Option<String>) -> Value {
    let spec = match status {
        Some(status) => {
            let status = status.parse::<u16>().map(Value::from).unwrap_or(Value::from(status));
            json!({ "destination": to, "status_code": status })
        }
        None => Value::from(to),
    };
    let routes = BTreeMap::from([(from, spec)]);
    match host {
        Some(host) => json!({ "vhosts": BTreeMap::from([(host, routes)]) }),
        None => json!({ "redirects": routes }),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
