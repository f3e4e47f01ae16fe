use crate::utils;
use colored::Colorize;
use prismflow_api::AppLifecycle;
use prismflow_api::selfservice::types::RunbookArg;
use prismflow_config::Settings;
use prismflow_converge::CancellationToken;

pub async fn handle(
    settings: &Settings,
    cancel: CancellationToken,
    runbook: &str,
    vars: Vec<(String, String)>,
) -> anyhow::Result<()> {
    println!("{}", format!("Executing runbook {}...", runbook).yellow());

    let lifecycle = AppLifecycle::new(utils::selfservice(settings)?)
        .with_profile(settings.poll_profile()?)
        .with_cancellation(cancel);
    let runbook = &lifecycle.resolve_runbook(runbook).await?;

    let args = vars
        .into_iter()
        .map(|(name, value)| RunbookArg { name, value })
        .collect();
    let result = lifecycle.execute_runbook(runbook, args).await?;

    println!();
    println!(
        "{}",
        format!("✓ Runbook {} {}", runbook, result.state.to_lowercase())
            .green()
            .bold()
    );
    println!("  runlog: {}", result.runlog_uuid.cyan());

    if !result.outputs.is_empty() {
        println!("  outputs:");
        for output in &result.outputs {
            println!("    {} = {}", output.name.cyan(), output.value);
        }
    }

    Ok(())
}
