use std::collections::{BTreeMap, HashSet};
use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use fst::MapBuilder;
use rkyv::{rancor::Error as RkyvError, to_bytes};
use serde::Deserialize;
use zstd::bulk::compress as zstd_compress;

#[path = "src/data.rs"]
mod data_model;
#[path = "src/fold.rs"]
mod fold;

use data_model::{CatalogStore, TermRecord};

const ARCHIVE_COMPRESSION_LEVEL: i32 = 4;

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    println!(
        "cargo:rerun-if-changed={}",
        manifest_dir.join("src/fold.rs").display()
    );

    let records = load_terms(&manifest_dir)?;
    build_fst(&records, &out_dir)?;
    build_catalog(records, &out_dir)?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct TermJson {
    #[serde(default)]
    id: String,
    #[serde(default)]
    primary_name: String,
    secondary_name: Option<String>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    short_definition: String,
    #[serde(default)]
    full_explanation: String,
    #[serde(default)]
    related_terms: Vec<String>,
}

fn load_terms(manifest_dir: &Path) -> Result<Vec<TermRecord>, Box<dyn Error>> {
    let terms_path = manifest_dir.join("data/glossary_terms.json");
    println!("cargo:rerun-if-changed={}", terms_path.display());
    if !terms_path.exists() {
        panic!("Missing {}.", terms_path.display());
    }

    let reader = BufReader::new(File::open(&terms_path)?);
    let rows: Vec<TermJson> = serde_json::from_reader(reader)
        .map_err(|err| format!("Failed to parse {}: {err}", terms_path.display()))?;

    let mut seen_ids = HashSet::new();
    let mut records = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        if row.id.trim().is_empty() || row.primary_name.trim().is_empty() {
            println!("cargo:warning=skipping glossary row {idx}: missing id or primary name");
            continue;
        }
        if !seen_ids.insert(row.id.clone()) {
            panic!("Duplicate glossary id {:?}", row.id);
        }
        let secondary_name = row
            .secondary_name
            .filter(|name| !name.trim().is_empty());
        records.push(TermRecord {
            id: row.id,
            primary_name: row.primary_name,
            secondary_name,
            category: row.category,
            short_definition: row.short_definition,
            full_explanation: row.full_explanation,
            related_terms: row.related_terms,
        });
    }
    Ok(records)
}

fn build_fst(records: &[TermRecord], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    // BTreeMap gives the sorted, de-duplicated key order fst requires; later rows
    // overwrite earlier ones on a shared surface form.
    let mut surfaces: BTreeMap<String, u64> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        surfaces.insert(fold::fold_case(&record.primary_name), idx as u64);
        if let Some(secondary) = &record.secondary_name {
            surfaces.insert(fold::fold_case(secondary), idx as u64);
        }
    }

    let fst_path = out_dir.join("glossary_terms.fst");
    let writer = BufWriter::new(File::create(&fst_path)?);
    let mut builder = MapBuilder::new(writer)?;
    for (surface, idx) in &surfaces {
        builder.insert(surface, *idx)?;
    }
    builder.finish()?;
    println!("cargo:rustc-env=GLOSSARY_FST={}", fst_path.display());
    Ok(())
}

fn build_catalog(records: Vec<TermRecord>, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let store = CatalogStore { terms: records };
    let bytes = to_bytes::<RkyvError>(&store)
        .map_err(|err| format!("Failed to serialize glossary catalog: {err}"))?
        .into_vec();
    let compressed = zstd_compress(&bytes, ARCHIVE_COMPRESSION_LEVEL)?;

    let data_path = out_dir.join("glossary_catalog.rkyv");
    fs::write(&data_path, compressed)?;
    println!("cargo:rustc-env=GLOSSARY_DATA={}", data_path.display());
    Ok(())
}
