use crate::utils;
use colored::Colorize;
use prismflow_api::{
    AppRunlogQuery, AppStateQuery, LaunchQuery, NdbOperationQuery, PrismTaskQuery,
    RunbookRunlogQuery,
};
use prismflow_config::Settings;
use prismflow_converge::{
    CancellationToken, ConvergeError, NotFoundPolicy, OperationHandle, OperationKind, Poller,
};
use std::time::Duration;

pub struct WaitArgs {
    pub kind: String,
    pub handle: String,
    pub app: Option<String>,
    pub blueprint: Option<String>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

pub async fn handle(
    settings: &Settings,
    cancel: CancellationToken,
    args: WaitArgs,
) -> anyhow::Result<()> {
    let kind: OperationKind = args.kind.parse()?;

    let mut poll_settings = settings.poll_profile()?.settings(kind);
    if let Some(delay_ms) = args.delay_ms {
        poll_settings = poll_settings.with_delay(Duration::from_millis(delay_ms));
    }
    if let Some(timeout_secs) = args.timeout_secs {
        if timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        poll_settings = poll_settings.with_timeout(Duration::from_secs(timeout_secs));
    }

    println!(
        "{}",
        format!("Waiting for {} {}...", kind, args.handle).yellow()
    );

    let poller = Poller::new(kind.table(), poll_settings).with_cancellation(cancel);
    let handle = OperationHandle::new(args.handle.as_str());
    let what = format!("{} {}", kind, args.handle);

    match kind {
        OperationKind::BlueprintLaunch => {
            let blueprint = args
                .blueprint
                .ok_or_else(|| anyhow::anyhow!("blueprint-launch needs --blueprint"))?;
            let api = utils::selfservice(settings)?;
            let query = LaunchQuery {
                api: &api,
                blueprint,
            };
            let launch = utils::report_outcome(poller.run(&query, handle).await?, &what)?;
            if let Some(app) = launch.status.application_uuid {
                println!("  application: {}", app.cyan());
            }
        }
        OperationKind::AppProvisioning => {
            let api = utils::selfservice(settings)?;
            let app = utils::report_outcome(
                poller.run(&AppStateQuery { api: &api }, handle).await?,
                &what,
            )?;
            if let Some(name) = app.name() {
                println!("  application: {}", name.cyan());
            }
        }
        OperationKind::AppDeletion => {
            let api = utils::selfservice(settings)?;
            // Gone means deleted, so not-found always ends the poll
            let poller =
                poller.with_settings(poll_settings.with_not_found(NotFoundPolicy::Propagate));
            match poller.run(&AppStateQuery { api: &api }, handle).await {
                Ok(outcome) => {
                    utils::report_outcome(outcome, &what)?;
                }
                Err(ConvergeError::HandleNotFound { .. }) => {
                    println!("{}", format!("✓ {} succeeded (gone)", what).green().bold());
                }
                Err(e) => return Err(e.into()),
            }
        }
        OperationKind::AppRunlog => {
            let app = args
                .app
                .ok_or_else(|| anyhow::anyhow!("app-runlog needs --app"))?;
            let api = utils::selfservice(settings)?;
            let query = AppRunlogQuery { api: &api, app };
            let runlog = utils::report_outcome(poller.run(&query, handle).await?, &what)?;
            if let Some(line) = runlog.last_output_line() {
                println!("  {}", line.dimmed());
            }
        }
        OperationKind::RunbookRunlog => {
            let api = utils::selfservice(settings)?;
            let runlog = utils::report_outcome(
                poller.run(&RunbookRunlogQuery { api: &api }, handle).await?,
                &what,
            )?;
            for output in runlog.status.output_variable_list {
                println!("  {} = {}", output.name.cyan(), output.value);
            }
        }
        OperationKind::PrismTask => {
            let api = utils::prism(settings)?;
            let task = utils::report_outcome(
                poller.run(&PrismTaskQuery { api: &api }, handle).await?,
                &what,
            )?;
            for entity in task.entity_reference_list {
                println!("  entity: {}", entity.uuid.cyan());
            }
        }
        OperationKind::NdbOperation => {
            let api = utils::ndb(settings)?;
            let operation = utils::report_outcome(
                poller.run(&NdbOperationQuery { api: &api }, handle).await?,
                &what,
            )?;
            if let Some(entity) = operation.entity_id {
                println!("  entity: {}", entity.cyan());
            }
        }
    }

    Ok(())
}
