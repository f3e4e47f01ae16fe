use colored::Colorize;
use prismflow_converge::{OperationKind, StateClass};

pub fn handle(json: bool) -> anyhow::Result<()> {
    if json {
        let entries: Vec<_> = OperationKind::ALL
            .into_iter()
            .map(|kind| {
                let table = kind.table();
                let settings = kind.default_settings();
                serde_json::json!({
                    "kind": kind,
                    "pending": table.pending,
                    "success": table.success,
                    "failure": table.failure,
                    "delay_ms": settings.delay.as_millis() as u64,
                    "timeout_secs": settings.timeout.as_secs(),
                    "not_found": settings.not_found,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for kind in OperationKind::ALL {
        let table = kind.table();
        table.validate()?;
        let settings = kind.default_settings();

        println!(
            "{} {}",
            kind.as_str().cyan().bold(),
            format!(
                "(every {:?}, timeout {}s)",
                settings.delay,
                settings.timeout.as_secs()
            )
            .dimmed()
        );
        for (literal, class) in table.literals() {
            let class = match class {
                StateClass::Pending => "pending".yellow(),
                StateClass::Success => "success".green(),
                StateClass::Failure => "failure".red(),
            };
            println!("  {:<12} {}", literal, class);
        }
    }

    Ok(())
}
