use anyhow::{Context, Result};

use crate::ScopeError;

use super::{open_server, report_leaks, ScopesArgs};

pub(crate) fn run_scopes(args: ScopesArgs) -> Result<()> {
    let (export, server) = open_server(&args.r#in, args.page_size, args.verbose)?;

    let mut found = 0;
    for scope in server.scopes() {
        let scope = scope.context("Failed to enumerate scopes")?;
        let info = scope
            .info()
            .with_context(|| format!("Failed to read scope {}", scope.address()))?;

        let range = match scope.ip_range() {
            Ok(range) => range.to_string(),
            Err(ScopeError::NotFound(_)) => "no range".to_string(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read range of {}", scope.address()))
            }
        };

        let network = scope
            .network()
            .map(|net| net.to_string())
            .unwrap_or_else(|_| format!("{} mask {}", info.address, info.mask));

        println!("{:<18} {:<24} {:<10} {}", network, info.name, info.state, range);
        found += 1;
    }

    println!("Scopes found: {}", found);
    report_leaks(&export);
    Ok(())
}
