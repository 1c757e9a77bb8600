// File I/O operations

pub mod csv;
pub mod xlsx;

use std::path::Path;

use previa_recon::model::Table;

/// Input formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Excel,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "" => Err(format!("{}: missing file extension", path.display())),
            other => Err(format!(
                "{}: unsupported format '.{}' (expected csv, tsv, xlsx, xls, ods)",
                path.display(),
                other
            )),
        }
    }
}

/// Read every table in a file: one per worksheet for Excel, one for CSV.
///
/// Sheets with no used cells are skipped, so the result may be empty.
pub fn read_tables(path: &Path) -> Result<Vec<xlsx::SheetTable>, String> {
    match InputFormat::from_path(path)? {
        InputFormat::Delimited => {
            let table = csv::import(path)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("csv")
                .to_string();
            Ok(vec![xlsx::SheetTable { name, table }])
        }
        InputFormat::Excel => xlsx::import(path),
    }
}

/// Read the first table of a file.
pub fn read_table(path: &Path) -> Result<Table, String> {
    read_tables(path)?
        .into_iter()
        .next()
        .map(|s| s.table)
        .ok_or_else(|| format!("{}: no sheet with data", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("previa.CSV")).unwrap(), InputFormat::Delimited);
        assert_eq!(InputFormat::from_path(Path::new("base.xlsx")).unwrap(), InputFormat::Excel);
        assert!(InputFormat::from_path(Path::new("base")).is_err());
        let err = InputFormat::from_path(Path::new("base.pdf")).unwrap_err();
        assert!(err.contains("unsupported format '.pdf'"));
    }

    #[test]
    fn test_read_tables_csv_named_by_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("base-sp.csv");
        fs::write(&path, "Circuito,Valor Contratado\nC1,1000\n").unwrap();

        let tables = read_tables(&path).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "base-sp");
        assert_eq!(read_table(&path).unwrap().len(), 1);
    }
}
