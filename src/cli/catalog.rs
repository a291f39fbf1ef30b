use std::path::Path;

use crate::store::seed;

use super::init_store;

pub fn run_catalog_import(data_dir: String, file: &Path) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let catalog = seed::load_catalog_file(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;
    let summary = seed::import_catalog(&store, &catalog)?;

    println!(
        "Imported {} courses and {} exercises from {}",
        summary.courses,
        summary.exercises,
        file.display()
    );

    Ok(())
}
