pub use proc_macro2;
pub use syn;
pub use toml;
pub use quote;

pub mod prelude {
    pub use proc_macro2;
    pub use syn;
    pub use toml;
    pub use quote;
}

use std::{
    env,
    fs,
    path::PathBuf,
    sync::OnceLock,
};
use syn::Path;
use toml::{
    Table, Value,
};

/// Name of the facade crate re-exporting every `kin-*` crate as `kin::*`.
const FACADE: &str = "kin";

static CALLER_MANIFEST: OnceLock<Table> = OnceLock::new();

/// Parses the `Cargo.toml` of the crate currently being compiled.
pub fn get_manifest() -> &'static Table {
    CALLER_MANIFEST.get_or_init(|| {
        env::var_os("CARGO_MANIFEST_DIR")
            .map(|path| {
                let mut file = PathBuf::from(&path);
                file.push("Cargo.toml");

                fs::read_to_string(&file)
                    .ok()
                    .and_then(|content| content.parse::<Table>().ok())
                    .unwrap_or_else(|| panic!("missing or invalid `Cargo.toml` in {}", path.to_string_lossy()))
            })
            .unwrap_or_else(|| panic!("`CARGO_MANIFEST_DIR` env var not set"))
    })
}

#[inline]
fn crate_path(name: &str) -> syn::Result<Path> {
    syn::parse_str(&name.replace('-', "_"))
}

#[inline]
fn facade_path(alias: &str, name: &str) -> syn::Result<Path> {
    let mut path = crate_path(alias)?;
    path.segments.push(syn::parse_str(&name.strip_prefix("kin-").unwrap_or(name).replace('-', "_"))?);
    Ok(path)
}

fn search(deps: &Table, name: &str) -> syn::Result<Option<Path>> {
    match deps.get(name) {
        // `kin-*` is imported directly, e.g. `kin-ecs = "<version>"` or `kin-ecs = { path = ".." }`
        // without a rename; returning `kin_ecs`.
        Some(Value::String(..)) => return crate_path(name).map(Some),
        Some(Value::Table(spec)) if !spec.contains_key("package") => return crate_path(name).map(Some),
        _ => {},
    }

    match deps.get(FACADE) {
        // `kin-*` is reachable through `kin = ..`; returning `kin::*`.
        Some(Value::String(..)) => return facade_path(FACADE, name).map(Some),
        Some(Value::Table(spec)) if !spec.contains_key("package") => return facade_path(FACADE, name).map(Some),
        _ => {},
    }

    for (alias, dep) in deps {
        let Value::Table(spec) = dep else { continue };
        match spec.get("package") {
            // `kin-*` is imported by `<x> = { package = "kin-*" }`; returning `<x>`.
            Some(Value::String(actual)) if actual == name => return crate_path(alias).map(Some),
            // `kin` is imported by `<x> = { package = "kin" }`; returning `<x>::*`.
            Some(Value::String(actual)) if actual == FACADE => return facade_path(alias, name).map(Some),
            _ => {},
        }
    }

    Ok(None)
}

/// Resolves the path under which the caller can reach the `kin-*` crate `name`, looking at its
/// own package name first, then at its `[dependencies]` and `[dev-dependencies]`.
pub fn module(name: &str) -> syn::Result<Option<Path>> {
    let manifest = get_manifest();

    // Expanding inside the crate itself; it exposes itself as `extern crate self as <name>`.
    let own_name = manifest
        .get("package")
        .and_then(|package| package.get("name"))
        .and_then(Value::as_str);
    if own_name == Some(name) {
        return crate_path(name).map(Some);
    }

    for table in ["dependencies", "dev-dependencies"] {
        if let Some(Value::Table(deps)) = manifest.get(table) {
            if let Some(path) = search(deps, name)? {
                return Ok(Some(path));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;

    fn resolve(manifest: &str, name: &str) -> Option<String> {
        let table = manifest.parse::<Table>().unwrap();
        let deps = table.get("dependencies").and_then(Value::as_table).unwrap();
        search(deps, name).unwrap().map(|path| path.to_token_stream().to_string().replace(' ', ""))
    }

    #[test]
    fn direct_dependency() {
        assert_eq!(resolve("[dependencies]\nkin-ecs = \"0.1\"", "kin-ecs").as_deref(), Some("kin_ecs"));
        assert_eq!(resolve("[dependencies]\nkin-ecs = { path = \"../kin-ecs\" }", "kin-ecs").as_deref(), Some("kin_ecs"));
    }

    #[test]
    fn facade_dependency() {
        assert_eq!(resolve("[dependencies]\nkin = \"0.1\"", "kin-ecs").as_deref(), Some("kin::ecs"));
        assert_eq!(resolve("[dependencies]\nengine = { package = \"kin\", version = \"0.1\" }", "kin-ecs").as_deref(), Some("engine::ecs"));
    }

    #[test]
    fn renamed_dependency() {
        assert_eq!(resolve("[dependencies]\necs = { package = \"kin-ecs\", path = \"..\" }", "kin-ecs").as_deref(), Some("ecs"));
        assert_eq!(resolve("[dependencies]\nserde = \"1.0\"", "kin-ecs"), None);
    }
}
