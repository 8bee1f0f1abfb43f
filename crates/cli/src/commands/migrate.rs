use crate::commands::{prepare, CommandResult, StepFailure};
use quotedesk_db::{connect, migrations};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let before = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let after = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<i64, StepFailure>(after - before)
    });

    match result {
        Ok(applied) => {
            CommandResult::success("migrate", format!("applied {applied} pending migration(s)"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
