use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use profile_metrics::cli::Args;
use profile_metrics::{pipeline, AppConfig, GitHubClient, Settings};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_metrics=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    match generate(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn generate(args: &Args) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let mut settings = Settings::resolve(config)?;
    if let Some(output) = &args.output {
        settings.output_dir = output.clone();
    }
    tracing::info!(
        account = %settings.account,
        output = %settings.output_dir.display(),
        "Resolved configuration"
    );

    let client = GitHubClient::new(&settings).context("failed to build GitHub client")?;
    let reports = pipeline::run(&client, &settings, &args.selected(), Utc::now()).await?;

    let mut total = 0;
    for report in &reports {
        total += report.charts.len();
        println!(
            "✅ {} metrics generated in {} ({} charts, {} placeholders)",
            report.category.spec().name,
            report.output_dir.display(),
            report.charts.len(),
            report.placeholders
        );
    }
    println!("✅ {} charts written for {}", total, settings.account);
    Ok(())
}
