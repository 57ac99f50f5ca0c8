use conclave_db::{migrations, SeedDataset};

use crate::commands::{self, CommandError, CommandResult};

/// Seeding migrates first so the command works against a fresh file.
pub fn run() -> CommandResult {
    let (config, runtime) = match commands::setup("seed") {
        Ok(parts) => parts,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = commands::connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        SeedDataset::load(&pool).await.map_err(|error| ("seed_load", error.to_string(), 6u8))?;
        let verification =
            SeedDataset::verify(&pool).await.map_err(|error| ("seed_verify", error.to_string(), 6u8))?;
        pool.close().await;

        if verification.all_present {
            return Ok(verification.checks.len());
        }
        let failed: Vec<&str> = verification
            .checks
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        Err::<usize, CommandError>((
            "seed_contract",
            format!("failed checks: {}", failed.join(", ")),
            6u8,
        ))
    });

    match result {
        Ok(checks) => {
            CommandResult::success("seed", format!("seed dataset loaded; {checks} checks passed"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
