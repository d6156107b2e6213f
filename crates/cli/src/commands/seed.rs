use gendra_db::repositories::SqlClientConfigRepository;
use gendra_db::{ClientSeedInfo, DemoClientDataset};

use crate::commands::{load_config, migrated_pool, runtime, CommandResult, Failure};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;
        let repository = SqlClientConfigRepository::new(pool.clone());

        let seed_result = DemoClientDataset::load(&repository)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoClientDataset::verify(&repository)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<ClientSeedInfo>, Failure> = if verification.all_present {
            Ok(seed_result.clients_seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(clients) => {
            let lines: Vec<String> = clients
                .iter()
                .map(|client| {
                    format!("  - {}: {} ({})", client.client_id, client.service_type, client.description)
                })
                .collect();
            let message = format!(
                "demo client configurations loaded for {} clients:\n{}",
                clients.len(),
                lines.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let missing =
        checks.iter().filter_map(|(client, present)| (!present).then_some(*client)).collect::<Vec<_>>();
    if missing.is_empty() {
        "Some demo clients failed to load".to_string()
    } else {
        format!("Seed verification failed for clients: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::verification_message;

    #[test]
    fn verification_error_message_targets_missing_clients() {
        let checks = [("speccoat-demo", true), ("metalworks-demo", false), ("coatings-demo", false)];

        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for clients: metalworks-demo, coatings-demo"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("speccoat-demo", true)];

        assert_eq!(verification_message(&checks), "Some demo clients failed to load");
    }
}
