//! Subcommand entry points.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use tracing::info;
use yansi::Paint;

use crate::cli::SearchArgs;
use crate::config::Config;
use crate::matching::SearchOutcome;
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::create_router;

/// Main application struct: configuration plus the loaded ranking engine.
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Load taxonomy and catalogue and build the ranking engine.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let start = Instant::now();
        let state = AppState::from_config(&config)?;
        info!(
            programs = state.recommender.catalogue().len(),
            fields = state.recommender.taxonomy().fields.len(),
            embeddings = state.recommender.embedder().is_enabled(),
            duration = fmt_duration(start.elapsed()),
            "Ranking engine ready"
        );
        Ok(Self { config, state })
    }

    /// Serve the JSON API until Ctrl-C.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(%addr, "Web server listening");

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Web server failed")?;
        info!("Web server stopped");
        Ok(())
    }

    /// Rank programs for a command-line profile and print them.
    pub async fn search(self, args: &SearchArgs) -> anyhow::Result<()> {
        let profile = args
            .to_profile_input()
            .validate()
            .context("Invalid profile")?;
        let outcome = self.state.recommender.search(&profile, args.top_k).await;

        if args.json {
            let json = serde_json::to_string_pretty(&outcome).context("Failed to encode ranking")?;
            println!("{json}");
        } else {
            print_table(&outcome);
        }
        Ok(())
    }

    /// Report what was loaded; success means the configuration is usable.
    pub fn check(self) -> anyhow::Result<()> {
        let recommender = &self.state.recommender;
        let catalogue = recommender.catalogue();
        let embedded = catalogue
            .programs()
            .iter()
            .filter(|p| p.embedding.is_some())
            .count();

        println!("{}", "Configuration OK".green().bold());
        println!("  catalogue:   {}", self.config.catalogue_path.display());
        println!("  programs:    {}", catalogue.len());
        println!(
            "  embeddings:  {embedded} (dimension {})",
            catalogue
                .embedding_dim()
                .map_or_else(|| "n/a".to_string(), |d| d.to_string())
        );
        println!("  fields:      {}", recommender.taxonomy().fields.len());
        println!("  courses:     {}", recommender.taxonomy().courses.len());
        println!(
            "  upstream:    {}",
            if recommender.embedder().is_enabled() {
                "enabled"
            } else {
                "disabled (no API key)"
            }
        );
        Ok(())
    }
}

fn print_table(outcome: &SearchOutcome) {
    if !outcome.detected_fields.is_empty() {
        println!(
            "{} {}",
            "Detected fields:".bold(),
            outcome.detected_fields.join(", ")
        );
    }
    if let Some(note) = &outcome.note {
        println!("{}", note.yellow());
    }
    if outcome.results.is_empty() {
        println!("No programs found.");
        return;
    }

    println!(
        "{}",
        format!(
            "{:>3}  {:>5}  {:<40}  {:<30}  {:<9}  {}",
            "#", "match", "program", "university", "fit", "missing"
        )
        .bold()
    );
    for (rank, entry) in outcome.results.iter().enumerate() {
        let pct = format!("{:>4}%", entry.breakdown.match_percent);
        let pct = match entry.breakdown.match_percent {
            70.. => pct.green(),
            40..=69 => pct.yellow(),
            _ => pct.red(),
        };
        println!(
            "{:>3}  {}  {:<40.40}  {:<30.30}  {:<9}  {}",
            rank + 1,
            pct,
            entry.program.name,
            entry.program.university,
            entry.breakdown.grade_assessment.to_string(),
            entry.breakdown.missing_prereqs.join(", ")
        );
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
