//! # Remove Project (`projects remove`)
//!
//! File: cli/src/commands/projects/remove.rs
//! Author: Christi Mahu
//!
use super::RegistryArgs;
use crate::core::error::Result;
use crate::projects;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Name of the project to unregister.
    pub name: String,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

/// Unregistering an unknown name is not an error.
pub fn handle_remove(args: RemoveArgs) -> Result<()> {
    let (_, registry) = args.registry.open()?;
    if projects::remove_project(&registry, &args.name)? {
        println!("✅ Project '{}' removed.", args.name);
    } else {
        println!("Project '{}' was not registered.", args.name);
    }
    Ok(())
}
