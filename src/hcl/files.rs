//! Purpose: Decide which files make up a module directory and how each one is read.
//! Exports: `SourceKind`, `source_kind`, `module_files`, `terraform_json`.
//! Role: File selection for multi-file conversion in the native host.
//! Invariants: Directory listings are non-recursive and sorted by path.
//! Invariants: Inside a directory only `*.tf` and `*.tf.json` are picked; other files are skipped.
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// HCL native syntax, converted by the `parse` operation.
    Hcl,
    /// Terraform JSON syntax, already in the output shape.
    TerraformJson,
}

/// Classify a path by its name; `None` means a module directory would skip it.
pub fn source_kind(path: &Path) -> Option<SourceKind> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(".tf.json") {
        Some(SourceKind::TerraformJson)
    } else if name.ends_with(".tf") {
        Some(SourceKind::Hcl)
    } else {
        None
    }
}

/// List the configuration files directly inside `dir`.
pub fn module_files(dir: &Path) -> Result<Vec<(PathBuf, SourceKind)>, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read directory {}", dir.display()))
            .with_source(err)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read entry in {}", dir.display()))
                .with_source(err)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = source_kind(&path) {
            files.push((path, kind));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Read a `.tf.json` document; it must hold a JSON object.
pub fn terraform_json(bytes: &[u8], label: &str) -> Result<Value, Error> {
    let value: Value = serde_json::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::Conversion)
            .with_message(format!("parse config: {label}"))
            .with_source(err)
    })?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::new(ErrorKind::Conversion)
            .with_message(format!("{label}: top-level value must be an object")))
    }
}

#[cfg(test)]
mod tests {
    use super::{SourceKind, module_files, source_kind, terraform_json};
    use crate::core::error::ErrorKind;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn names_pick_the_reader() {
        assert_eq!(source_kind(Path::new("main.tf")), Some(SourceKind::Hcl));
        assert_eq!(
            source_kind(Path::new("dir/override.tf.json")),
            Some(SourceKind::TerraformJson)
        );
        assert_eq!(source_kind(Path::new("package.json")), None);
        assert_eq!(source_kind(Path::new("notes.tfvars")), None);
    }

    #[test]
    fn listing_is_sorted_and_filtered() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["b.tf", "a.tf.json", "c.json", "README.md"] {
            std::fs::write(temp.path().join(name), "").expect("write");
        }
        std::fs::create_dir(temp.path().join("nested.tf")).expect("mkdir");

        let files = module_files(temp.path()).expect("list");
        let names: Vec<_> = files
            .iter()
            .map(|(path, kind)| {
                let name = path.file_name().and_then(|n| n.to_str()).expect("name");
                (name.to_string(), *kind)
            })
            .collect();
        assert_eq!(
            names,
            [
                ("a.tf.json".to_string(), SourceKind::TerraformJson),
                ("b.tf".to_string(), SourceKind::Hcl)
            ]
        );
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = module_files(&temp.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn terraform_json_must_be_an_object() {
        let value = terraform_json(br#"{"variable":{"x":{}}}"#, "a.tf.json").expect("json");
        assert_eq!(value, json!({"variable": {"x": {}}}));

        let err = terraform_json(b"[1]", "b.tf.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        let err = terraform_json(b"{", "c.tf.json").unwrap_err();
        assert!(err.callback_message().starts_with("parse config: c.tf.json"));
    }
}
