use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

pub const EVENTS_HEADER: &str = "type,transaction,borrower,books,date,amount,note";

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Writes an events CSV with the standard header followed by `rows`.
pub fn events_csv(rows: &[&str]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{EVENTS_HEADER}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(file)
}

/// A one-member library with a single copy of book 1 priced at 20.00.
pub fn small_library() -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[[membership_types]]
id = 1
name = "Standard"
max_books = 2
loan_period_days = 14
renewal_limit = 2

[[books]]
id = 1
title = "Dune"
price = "20.00"

[[borrowers]]
id = 1
name = "Ada"
membership_type = 1
"#
    )?;
    file.flush()?;
    Ok(file)
}
