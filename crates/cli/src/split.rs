//! `spreadmart split`: one file per branch.

use std::path::PathBuf;

use spreadmart_io::split::write_branches;
use spreadmart_io::{read_source, split_by_column};

use crate::CliError;

pub fn cmd_split(file: PathBuf, by: String, out_dir: PathBuf) -> Result<(), CliError> {
    let table = read_source(&file)?;
    let branches = split_by_column(&table, &by)?;
    let paths = write_branches(&branches, &out_dir)?;

    for (path, branch) in paths.iter().zip(&branches) {
        eprintln!("wrote {} ({} rows)", path.display(), branch.len());
    }
    eprintln!("split {} rows of {} into {} branch file(s) by '{}'", table.len(), table.id, branches.len(), by);
    Ok(())
}
