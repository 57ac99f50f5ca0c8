use conclave_db::migrations;

use crate::commands::{self, CommandError, CommandResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match commands::setup("migrate") {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), CommandError>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
