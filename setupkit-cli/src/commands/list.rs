//! List command - show the product catalog.

use std::path::PathBuf;

use console::style;
use setupkit::catalog::{Catalog, Category, TaskDescriptor};

use super::common::{format_size, CategoryArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the list command.
pub struct ListArgs {
    pub catalog: Option<PathBuf>,
    pub category: Option<CategoryArg>,
}

/// Run the list command.
pub fn run(runner: &CliRunner, args: ListArgs) -> Result<(), CliError> {
    let catalog = runner.catalog(args.catalog.as_deref())?;
    let category = args.category.map(Category::from);

    let rows = rows(&catalog, category);
    if rows.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<28} {:<14} {:<18} {:>8} {:>10}",
            "NAME", "CATEGORY", "KIND", "PRIORITY", "SIZE"
        ))
        .bold()
    );
    for task in &rows {
        let size = task
            .expected_size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<14} {:<18} {:>8} {:>10}",
            task.name,
            task.category.as_str(),
            task.kind.as_str(),
            task.priority.to_string(),
            size
        );
    }
    println!();
    println!("{} products", rows.len());
    Ok(())
}

fn rows(catalog: &Catalog, category: Option<Category>) -> Vec<&TaskDescriptor> {
    match category {
        Some(category) => catalog.by_category(category).map(|t| t.as_ref()).collect(),
        None => catalog.entries().iter().map(|t| t.as_ref()).collect(),
    }
}
