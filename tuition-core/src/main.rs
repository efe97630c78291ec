use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tuition_tracker_core::backend::domain::{LoggingDispatcher, ReplanOutcome};
use tuition_tracker_core::backend::{initialize_backend, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Using data directory {:?}", config.data_directory);
    let backend = initialize_backend(&config, Arc::new(LoggingDispatcher)).await?;

    let today = backend.schedule_service.todays_classes().await;
    println!("Today's classes ({})", today.len());
    for class in &today {
        println!(
            "  {}  {:<24} {}",
            class.class.time,
            class.class.student.name,
            class.status.describe()
        );
    }

    println!();
    println!("Cycle progress");
    for student in backend.student_service.list_students().await {
        match backend.cycle_service.get_progress(&student.id).await {
            Ok(progress) => {
                let marker = if progress.is_complete { "  (complete)" } else { "" };
                println!(
                    "  {:<24} {}/{}{}",
                    student.name, progress.total_classes, progress.classes_per_cycle, marker
                );
            }
            Err(e) => warn!("Could not compute progress for {}: {}", student.name, e),
        }
    }

    match backend.notification_service.request_replan_all().await {
        ReplanOutcome::Completed(report) => {
            info!(
                "Planned {} reminders for {} students",
                report.reminders_scheduled, report.students_planned
            );
            for failure in &report.failures {
                warn!("Reminders failed for {}: {}", failure.student_name, failure.message);
            }
        }
        ReplanOutcome::Coalesced => info!("Reminder replan already running"),
    }

    Ok(())
}
