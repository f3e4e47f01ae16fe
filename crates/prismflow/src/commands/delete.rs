use crate::utils;
use colored::Colorize;
use prismflow_api::AppLifecycle;
use prismflow_config::Settings;
use prismflow_converge::CancellationToken;

pub async fn handle(
    settings: &Settings,
    cancel: CancellationToken,
    app: &str,
    soft: bool,
) -> anyhow::Result<()> {
    let mode = if soft { " (soft)" } else { "" };
    println!("{}", format!("Deleting {}{}...", app, mode).yellow());

    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?)
        .with_profile(settings.poll_profile()?)
        .with_cancellation(cancel);
    let app = &lifecycle.resolve_app(app).await?;

    lifecycle.delete(app, soft).await?;

    println!();
    println!("{}", format!("✓ {} deleted", app).green().bold());
    Ok(())
}
