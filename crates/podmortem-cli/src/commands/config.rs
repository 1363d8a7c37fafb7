//! Config command: print the effective dispatch configuration.

use std::io::Write;

use anyhow::{Context, Result};

use podmortem_runtime::DispatchConfig;

pub fn run<W: Write>(writer: &mut W, config: &DispatchConfig) -> Result<()> {
    let yaml = config.to_yaml().context("failed to render configuration")?;
    write!(writer, "{yaml}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_defaults_as_yaml() {
        let mut out = Vec::new();
        run(&mut out, &DispatchConfig::default()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("timeout: 30s"));
        assert!(text.contains("max_attempts: 3"));
        assert!(text.contains("confidence: 0.6"));
        assert_eq!(DispatchConfig::from_yaml(&text).unwrap(), DispatchConfig::default());
    }
}
