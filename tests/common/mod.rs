//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use noid_rs::config::Settings;
use noid_rs::minter::{CreateArgs, Minter, Term};
use noid_rs::store::Backend;

pub fn settings(dir: &Path, backend: Backend) -> Settings {
    Settings {
        data_dir: Some(dir.to_path_buf()),
        contact: Some("tester".to_string()),
        backend,
        ..Settings::default()
    }
}

pub fn create_minter(
    dir: &Path,
    backend: Backend,
    template: &str,
    term: Term,
    naan: &str,
) -> Arc<Minter> {
    let settings = settings(dir, backend);
    let args = CreateArgs {
        template: if template.is_empty() {
            None
        } else {
            Some(template.to_string())
        },
        term,
        naan: naan.to_string(),
        naa: if term == Term::Long {
            "example.org".to_string()
        } else {
            String::new()
        },
        subnaa: if term == Term::Long {
            "registry".to_string()
        } else {
            String::new()
        },
    };
    let (minter, _report) = Minter::create(&settings, &args).expect("create minter");
    minter
}
