//! Profiles command - list built-in and user profiles.

use anyhow::Result;
use tracing::info;

use super::load_catalog;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the profiles command.
pub async fn run(cli: &Cli) -> Result<()> {
    info!("Listing profiles");

    let catalog = load_catalog(cli).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            println!("{}", formatter.format_profiles_header());
            println!("{}", "─".repeat(86));

            for profile in catalog.all() {
                println!(
                    "{}",
                    formatter.format_profile_line(profile, catalog.is_user_profile(&profile.id))
                );
            }

            let user = catalog
                .all()
                .iter()
                .filter(|p| catalog.is_user_profile(&p.id))
                .count();
            println!();
            println!("Total: {} profiles ({} user)", catalog.len(), user);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_profiles(&catalog)?);
        }
    }

    Ok(())
}
