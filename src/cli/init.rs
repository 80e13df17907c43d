use std::path::{Path, PathBuf};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};

/// Initialize a database. With `--db` only that file is created; otherwise
/// the data directory is recorded in settings and the database goes there.
pub fn run(db_flag: Option<&Path>, data_dir: Option<String>, company: Option<String>) -> Result<()> {
    let db_path = match db_flag {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            path.to_path_buf()
        }
        None => {
            let mut settings = load_settings();
            if let Some(dir) = data_dir {
                settings.data_dir = shellexpand_path(&dir);
            }
            if let Some(name) = company {
                settings.company_name = name;
            }
            save_settings(&settings)?;

            let resolved = PathBuf::from(&settings.data_dir);
            std::fs::create_dir_all(&resolved)?;
            resolved.join(DB_FILE)
        }
    };

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    println!("Initialized database at {}", db_path.display());
    Ok(())
}
