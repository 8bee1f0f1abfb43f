use crate::commands::{prepare, CommandResult, StepFailure};
use quotedesk_db::{connect, migrations, ping};

/// Preflight for `quotedesk-server`: the same config, connection and
/// migration steps the server runs before it binds.
pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("start") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        ping(&pool).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), StepFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success(
            "start",
            format!(
                "preflight passed; server would listen on {} as desk admin `{}`",
                config.listen_address(),
                config.desk.admin_id
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}
