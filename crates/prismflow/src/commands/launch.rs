use crate::utils;
use colored::Colorize;
use prismflow_api::{AppLifecycle, LaunchRequest};
use prismflow_config::Settings;
use prismflow_converge::CancellationToken;

pub async fn handle(
    settings: &Settings,
    cancel: CancellationToken,
    request: LaunchRequest,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!(
            "Launching blueprint {} as '{}'...",
            request.blueprint, request.app_name
        )
        .yellow()
    );

    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?)
        .with_profile(settings.poll_profile()?)
        .with_cancellation(cancel);

    let app = lifecycle.provision(&request).await?;

    println!();
    println!(
        "{}",
        format!("✓ '{}' is {}", request.app_name, app.state().unwrap_or("running"))
            .green()
            .bold()
    );
    if let Some(uuid) = app.uuid() {
        println!("  uuid: {}", uuid.cyan());
    }

    Ok(())
}
