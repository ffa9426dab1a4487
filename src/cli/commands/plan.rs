//! Dry-run command
//!
//! Shows the table each file would become without opening a database.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::error::CliError;
use crate::load::{LoadPlan, plan_directory};

/// Plan command arguments
#[derive(Debug, Clone)]
pub struct PlanArgs {
    /// Directory holding the `*.csv` sources
    pub source_dir: PathBuf,
    /// Print JSON instead of text
    pub json: bool,
}

#[derive(Serialize)]
struct PlanEntry<'a> {
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a LoadPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Print the inferred schema of every source
pub fn handle_plan(args: &PlanArgs) -> Result<(), CliError> {
    if !args.source_dir.is_dir() {
        return Err(CliError::DirectoryNotFound(args.source_dir.clone()));
    }

    let plans = plan_directory(&args.source_dir)?;

    if args.json {
        let entries: Vec<PlanEntry> = plans
            .iter()
            .map(|(source, plan)| PlanEntry {
                file: &source.name,
                plan: plan.as_ref().ok(),
                error: plan.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        let output = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::SerializationError(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    for (source, plan) in &plans {
        match plan {
            Ok(plan) => print!("{}", render_plan(plan)),
            Err(e) => println!("{} -> {}: {}", source.name, source.table_name, e),
        }
    }

    Ok(())
}

fn render_plan(plan: &LoadPlan) -> String {
    let mut output = format!(
        "{} -> {} ({} rows)\n",
        plan.source.name,
        plan.schema.table(),
        plan.row_count
    );
    for column in plan.schema.columns() {
        output.push_str(&format!("  {} {}\n", column.name, column.sql_type()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::SourceFile;

    #[test]
    fn test_render_plan() {
        let source = SourceFile::from_path("/in/csv1.csv");
        let plan = LoadPlan::build(&source, b"Height,Label\n1.5,a\n2,b\n").unwrap();

        assert_eq!(
            render_plan(&plan),
            "csv1.csv -> csv1 (2 rows)\n  height float\n  label varchar\n"
        );
    }

    #[test]
    fn test_missing_directory() {
        let args = PlanArgs {
            source_dir: PathBuf::from("/definitely/not/here"),
            json: false,
        };
        assert!(matches!(
            handle_plan(&args),
            Err(CliError::DirectoryNotFound(_))
        ));
    }
}
