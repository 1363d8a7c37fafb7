//! Providers command: list what the dispatcher can route to.

use std::io::Write;

use anyhow::Result;
use serde_json::json;

use podmortem_runtime::ProviderRegistry;

pub fn run<W: Write>(writer: &mut W, registry: &ProviderRegistry) -> Result<()> {
    let providers: Vec<_> = registry
        .list()
        .iter()
        .map(|p| {
            json!({
                "providerId": p.provider_id(),
                "description": p.description(),
            })
        })
        .collect();

    serde_json::to_writer_pretty(&mut *writer, &providers)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_prints_empty_array() {
        let mut out = Vec::new();
        run(&mut out, &ProviderRegistry::empty()).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json, json!([]));
    }

    #[test]
    fn bundled_providers_are_listed() {
        let registry = ProviderRegistry::register(crate::commands::bundled_providers().unwrap());
        let mut out = Vec::new();
        run(&mut out, &registry).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["providerId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, registry.provider_ids());
    }
}
