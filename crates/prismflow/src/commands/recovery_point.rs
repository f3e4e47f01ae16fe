use crate::utils;
use colored::Colorize;
use prismflow_api::AppLifecycle;
use prismflow_config::Settings;
use prismflow_converge::CancellationToken;

pub async fn list(settings: &Settings, cancel: CancellationToken, app: &str) -> anyhow::Result<()> {
    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?).with_cancellation(cancel);
    let app = lifecycle.resolve_app(app).await?;

    let groups = lifecycle.recovery_points(&app).await?.groups();
    if groups.is_empty() {
        println!("{}", format!("ℹ {} has no recovery points", app).dimmed());
        return Ok(());
    }

    for (name, uuid) in groups {
        println!("  {:<24} {}", name.cyan(), uuid.dimmed());
    }
    Ok(())
}

pub async fn delete(
    settings: &Settings,
    cancel: CancellationToken,
    app: &str,
    name: &str,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Deleting recovery point '{}' of {}...", name, app).yellow()
    );

    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?)
        .with_profile(settings.poll_profile()?)
        .with_cancellation(cancel);
    let app = lifecycle.resolve_app(app).await?;

    let run = lifecycle.delete_recovery_point(&app, name).await?;

    println!();
    println!(
        "{}",
        format!("✓ Recovery point '{}' deleted", name).green().bold()
    );
    println!("  runlog: {}", run.runlog_uuid.cyan());
    Ok(())
}
