use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::{ClientOptions, DhcpServer, ExportServer};

mod scopes;
mod show;

pub(crate) struct ScopesArgs {
    pub(crate) r#in: PathBuf,
    pub(crate) page_size: Option<u32>,
    pub(crate) verbose: bool,
}

pub(crate) struct ShowArgs {
    pub(crate) r#in: PathBuf,
    pub(crate) scope: Ipv4Addr,
    pub(crate) page_size: Option<u32>,
    pub(crate) no_clients: bool,
    pub(crate) verbose: bool,
}

#[derive(Parser)]
#[command(
    name = "dhcpscope",
    about = "Inspect DHCP server scopes, ranges, reservations and option values",
    long_about = "Reads a DHCP server configuration export and walks it page by page, the same way a live management session does.",
    after_help = "Examples:\n  dhcpscope scopes --in ./dhcp-export.xml\n  dhcpscope show --in ./dhcp-export.xml --scope 192.168.1.0\n  dhcpscope show --in ./dhcp-export.xml --scope 192.168.1.0 --page-size 10 --verbose"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every scope configured on the server
    Scopes {
        /// Server configuration export (XML)
        #[arg(short, long)]
        r#in: PathBuf,

        /// Maximum records to request per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Log every page fetch and buffer release
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show one scope's attributes, elements, clients and option values
    Show {
        /// Server configuration export (XML)
        #[arg(short, long)]
        r#in: PathBuf,

        /// Scope (subnet) address
        #[arg(short, long)]
        scope: Ipv4Addr,

        /// Maximum records to request per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Do not list leased clients
        #[arg(long)]
        no_clients: bool,

        /// Log every page fetch and buffer release
        #[arg(short, long)]
        verbose: bool,
    },
}

pub fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Scopes {
            r#in,
            page_size,
            verbose,
        } => scopes::run_scopes(ScopesArgs {
            r#in,
            page_size,
            verbose,
        }),
        Commands::Show {
            r#in,
            scope,
            page_size,
            no_clients,
            verbose,
        } => show::run_show(ShowArgs {
            r#in,
            scope,
            page_size,
            no_clients,
            verbose,
        }),
    }
}

/// Load an export and wrap it in a server handle. The export is returned as well so
/// the caller can check for leaked buffers afterwards.
pub(crate) fn open_server(
    path: &Path,
    page_size: Option<u32>,
    verbose: bool,
) -> Result<(Arc<ExportServer>, DhcpServer)> {
    // A second call in the same process finds the logger already installed.
    let _ = crate::logging::enable_logger(verbose);

    let export = Arc::new(ExportServer::from_path(path)?);
    let options = match page_size {
        Some(preferred_max) => ClientOptions { preferred_max },
        None => ClientOptions::default(),
    };
    let server = DhcpServer::with_options(export.server_name(), export.clone(), options);
    Ok((export, server))
}

pub(crate) fn report_leaks(export: &ExportServer) {
    let outstanding = export.outstanding_buffers();
    if outstanding > 0 {
        log::warn!("{} remote buffer(s) were never released", outstanding);
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "0s".to_string();
    }

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(86_400)), "1d");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
        assert_eq!(format_duration(Duration::from_secs(480)), "8m");
    }
}
