//! Catalog inspection: `stores`, `partners`, `adapters`, `validate`, `init`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use conciliador_config::{Catalog, Partner};
use conciliador_recon::config::AmountCombine;
use conciliador_recon::AdapterSpec;

use crate::exit_codes::EXIT_CONFIG;
use crate::CliError;

fn out_err(e: io::Error) -> CliError {
    CliError::output(e.to_string())
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

pub fn cmd_stores(catalog_path: Option<&Path>) -> Result<(), CliError> {
    let catalog = Catalog::load(catalog_path).map_err(CliError::config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for store in &catalog.stores {
        writeln!(out, "{:>4}  {}", store.id, store.name).map_err(out_err)?;
        for partner in catalog.partners_for_store(store.id).map_err(CliError::config)? {
            writeln!(out, "      {:>5}  {}", partner.id, partner.name).map_err(out_err)?;
        }
    }
    Ok(())
}

pub fn cmd_partners(catalog_path: Option<&Path>, store: Option<u32>) -> Result<(), CliError> {
    let catalog = Catalog::load(catalog_path).map_err(CliError::config)?;
    let partners: Vec<&Partner> = match store {
        Some(id) => catalog.partners_for_store(id).map_err(CliError::config)?,
        None => catalog.partners.iter().collect(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for p in partners {
        writeln!(out, "{:>5}  {}", p.id, p.name).map_err(out_err)?;
        writeln!(out, "       adapter: {}", p.adapter).map_err(out_err)?;
        if let Some(system) = &p.system_adapter {
            writeln!(out, "       system export adapter: {system}").map_err(out_err)?;
        }
        writeln!(out, "       client ids: {}", join_ids(&p.client_ids)).map_err(out_err)?;
        writeln!(out, "       payment methods: {}", join_ids(&p.payment_methods)).map_err(out_err)?;
    }
    Ok(())
}

pub fn cmd_adapters(catalog_path: Option<&Path>) -> Result<(), CliError> {
    let catalog = Catalog::load(catalog_path).map_err(CliError::config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for a in &catalog.adapters {
        if a.description.is_empty() {
            writeln!(out, "{}", a.name).map_err(out_err)?;
        } else {
            writeln!(out, "{}  ({})", a.name, a.description).map_err(out_err)?;
        }
        writeln!(out, "    order id: {}", a.order_id_column).map_err(out_err)?;
        writeln!(out, "    date:     {}", a.date_column).map_err(out_err)?;
        writeln!(out, "    amount:   {}", describe_amount(a)).map_err(out_err)?;
        if !a.extra_columns.is_empty() {
            let extras: Vec<&str> = a.extra_columns.iter().map(|e| e.column.as_str()).collect();
            writeln!(out, "    extras:   {}", extras.join(", ")).map_err(out_err)?;
        }
    }
    Ok(())
}

fn describe_amount(adapter: &AdapterSpec) -> String {
    match adapter.amount.combine {
        AmountCombine::First => adapter.amount.columns.join(", "),
        AmountCombine::Sum => adapter.amount.columns.join(" + "),
    }
}

/// Validate the catalog and each adapter file; report every failure.
pub fn cmd_validate(catalog_path: Option<&Path>, adapter_files: &[PathBuf]) -> Result<(), CliError> {
    let mut failures = 0usize;

    match Catalog::load(catalog_path) {
        Ok(catalog) => eprintln!(
            "valid: catalog with {} store(s), {} partner(s), {} adapter(s)",
            catalog.stores.len(),
            catalog.partners.len(),
            catalog.adapters.len(),
        ),
        Err(e) => {
            eprintln!("invalid: {e}");
            failures += 1;
        }
    }

    for path in adapter_files {
        let checked = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| AdapterSpec::from_toml(&s).map_err(|e| e.to_string()));
        match checked {
            Ok(spec) => eprintln!("valid: {} (adapter '{}')", path.display(), spec.name),
            Err(e) => {
                eprintln!("invalid: {}: {e}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(CliError::new(EXIT_CONFIG, format!("{failures} invalid definition(s)")));
    }
    Ok(())
}

pub fn cmd_init(path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(Catalog::user_path);
    if path.exists() && !force {
        return Err(CliError::usage(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite it"));
    }
    Catalog::write_default(&path).map_err(CliError::config)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
