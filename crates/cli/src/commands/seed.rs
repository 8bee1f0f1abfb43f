use crate::commands::{prepare, CommandResult, StepFailure};
use quotedesk_db::{connect, migrations, DemoSeedDataset, QuotationDesk, SeedResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let desk = QuotationDesk::sql(pool.clone(), config.desk.admin_id.clone());
        let seeded: Result<SeedResult, StepFailure> = DemoSeedDataset::load(&desk)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));

        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo requests: {} created, {} already present; quotations created: {}",
        seeded.requests_created, seeded.requests_skipped, seeded.quotations_created
    )
}
