use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::combine::{combine, CREDIT_DIR, DEBIT_DIR, OUTPUT_FILE};
use crate::error::Result;
use crate::settings::{load_settings, shellexpand_path};

pub fn run(dir: Option<String>, output: Option<String>) -> Result<()> {
    let settings = load_settings();
    let (root, default_output) = match dir {
        Some(d) => {
            let root = PathBuf::from(shellexpand_path(&d));
            let out = root.join(OUTPUT_FILE);
            (root, out)
        }
        None => {
            let out = settings.data_path();
            let root = out.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, out)
        }
    };
    let output = output
        .map(|o| PathBuf::from(shellexpand_path(&o)))
        .unwrap_or(default_output);

    let result = combine(&root, &output, &settings.ignores)?;
    if result.files == 0 {
        println!(
            "No CSV exports found in {} or {}.",
            root.join(DEBIT_DIR).display(),
            root.join(CREDIT_DIR).display()
        );
        return Ok(());
    }

    if let Some(archived) = &result.archived {
        println!("Previous file archived to {}", archived.display());
    }
    println!("{} row(s) read from {} file(s)", result.read, result.files);
    println!(
        "{} automatic payment(s) skipped, {} duplicate(s) removed, {} ignored",
        result.payments_skipped, result.duplicates, result.ignored
    );
    if result.ids_expanded + result.ids_replaced > 0 {
        println!("{} ID(s) expanded, {} ID(s) replaced", result.ids_expanded, result.ids_replaced);
    }
    println!(
        "{} written to {}",
        format!("{} transaction(s)", result.written).bold(),
        output.display()
    );
    Ok(())
}
