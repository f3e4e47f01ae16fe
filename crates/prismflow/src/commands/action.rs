use crate::utils;
use colored::Colorize;
use prismflow_api::{AppLifecycle, SystemAction};
use prismflow_config::Settings;
use prismflow_converge::CancellationToken;

pub async fn handle(
    settings: &Settings,
    cancel: CancellationToken,
    app: &str,
    action: &str,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Running '{}' on {}...", action, app).yellow()
    );

    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?)
        .with_profile(settings.poll_profile()?)
        .with_cancellation(cancel);
    let app = &lifecycle.resolve_app(app).await?;

    // start/stop/restart have dedicated endpoints; anything else is a custom action
    let run = match action.parse::<SystemAction>() {
        Ok(system) => lifecycle.run_system_action(app, system).await?,
        Err(_) => lifecycle.run_custom_action(app, action, Vec::new()).await?,
    };

    println!();
    println!(
        "{}",
        format!("✓ '{}' finished", action).green().bold()
    );
    println!("  runlog: {}", run.runlog_uuid.cyan());
    if let Some(line) = run.runlog.last_output_line() {
        println!("  {}", line.dimmed());
    }

    Ok(())
}
