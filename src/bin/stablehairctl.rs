use clap::{Parser, Subcommand};
use stablehair_api_proxy::api::relay::is_json;
use stablehair_api_proxy::stablehair::HealthStatus;
use stablehair_api_proxy::upload::{FormField, REFERENCE_IMAGE, REQUIRED_UPLOADS, TARGET_IMAGE};
use stablehair_api_proxy::{Config, ImageNormalizer, StableHairClient, UploadForm};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "stablehairctl", about = "CLI for the StableHair API Proxy", version)]
struct Cli {
    /// Override STABLEHAIR_API_URL
    #[arg(global = true, long)]
    api_url: Option<String>,

    /// Override STABLEHAIR_API_KEY
    #[arg(global = true, long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether the StableHair API is reachable
    Health,
    /// Submit a target and reference image for processing
    Process {
        /// Photo to restyle
        #[arg(long, value_name = "PATH")]
        target: PathBuf,
        /// Photo with the desired hairstyle
        #[arg(long, value_name = "PATH")]
        reference: PathBuf,
        /// Extra form fields as key=value (repeatable)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        /// Where to write an image response
        #[arg(long, value_name = "PATH", default_value = "result.png")]
        out: PathBuf,
        /// Send the files as-is instead of re-encoding them
        #[arg(long)]
        no_normalize: bool,
    },
    /// Show the status of a submitted job
    Status {
        id: String,
    },
    /// Download the result image of a finished job
    Result {
        id: String,
        /// Output path (defaults to ./<id>.png)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Config::dotenv_load();
    let cli = Cli::parse();

    // The key is the only required setting; allow it on the command line.
    let api_key = cli.api_key.clone();
    let mut conf = Config::from_lookup(|key| match key {
        "STABLEHAIR_API_KEY" => api_key.clone().or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?;
    if let Some(url) = cli.api_url {
        conf.api_url = url;
    }
    let client = StableHairClient::from_config(&conf)?;

    match cli.command {
        Commands::Health => match client.check_health().await {
            HealthStatus::Online => {
                println!("online");
                Ok(())
            }
            HealthStatus::Offline(error) => {
                eprintln!("offline: {}", error);
                std::process::exit(1);
            }
        },
        Commands::Process { target, reference, fields, out, no_normalize } => {
            let mut form = UploadForm::new();
            form.push(read_upload(TARGET_IMAGE, &target).await?);
            form.push(read_upload(REFERENCE_IMAGE, &reference).await?);
            for item in &fields {
                let Some((key, value)) = item.split_once('=') else {
                    eprintln!("Invalid --field '{}', expected KEY=VALUE", item);
                    std::process::exit(2);
                };
                form.push(FormField::text(key, value));
            }

            if !no_normalize {
                form = form
                    .normalize(ImageNormalizer::new(conf.normalize_quality), &REQUIRED_UPLOADS)
                    .await?;
            }

            let payload = client.submit_job(form.into_multipart()?).await?;
            if payload.content_type.as_deref().map(is_json).unwrap_or(false) {
                let v: serde_json::Value = serde_json::from_slice(&payload.body)?;
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                tokio::fs::write(&out, &payload.body).await?;
                println!("Saved {} ({} bytes)", out.display(), payload.body.len());
            }
            Ok(())
        }
        Commands::Status { id } => {
            let v = client.get_status(&id).await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
            Ok(())
        }
        Commands::Result { id, out } => {
            let bytes = client.get_result(&id).await?;
            let path = out.unwrap_or_else(|| PathBuf::from(format!("{}.png", id)));
            tokio::fs::write(&path, &bytes).await?;
            println!("Saved {} ({} bytes)", path.display(), bytes.len());
            Ok(())
        }
    }
}

async fn read_upload(field: &str, path: &Path) -> Result<FormField, Box<dyn std::error::Error>> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(field)
        .to_string();
    let content_type = match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(FormField::file(field, &file_name, content_type, data))
}
