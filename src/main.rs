use anyhow::bail;
use clap::Parser;

mod catalog;
mod cli;
mod config;
mod corpus;
mod embedding;
mod engine;
mod feedback;
mod patterns;
mod resolver;
#[cfg(test)]
mod tests;

use config::Config;
use engine::Engine;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let base_path = config::resolve_base_path();
    let config = Config::load_with(&base_path);
    let engine = Engine::new(config)?;

    match args.command {
        cli::Command::Resolve { reference } => {
            let matches = engine.find_series(&reference)?;
            if matches.is_empty() {
                log::info!("no series matches above threshold");
            }
            println!("{}", serde_json::to_string_pretty(&matches)?);
            Ok(())
        }

        cli::Command::Feedback {
            video_id,
            up,
            down,
            title,
            seed,
        } => {
            if up == down {
                bail!("pass exactly one of --up or --down");
            }

            let outcome = engine.submit_feedback(&video_id, up, &title, seed.as_deref());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }

        cli::Command::Status { video_id } => {
            let status = engine.feedback_status(&video_id);
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }

        cli::Command::Stats {} => {
            let stats = engine.feedback_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            log::info!("{} negative examples in corpus store", engine.corpus_size());
            Ok(())
        }

        cli::Command::Add { reference } => {
            engine.store_video(&reference)?;
            log::info!("{} corpus records total", engine.corpus_size());
            Ok(())
        }

        cli::Command::Repair { limit } => {
            let repaired = engine.repair_embeddings(limit)?;
            println!("{repaired} embeddings repaired");
            Ok(())
        }
    }
}
