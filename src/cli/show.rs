use anyhow::{Context, Result};

use crate::export::unix_seconds;
use crate::{format_hardware_address, ScopeError};

use super::{format_duration, open_server, report_leaks, ShowArgs};

pub(crate) fn run_show(args: ShowArgs) -> Result<()> {
    let (export, server) = open_server(&args.r#in, args.page_size, args.verbose)?;

    let scope = server
        .scope(args.scope)
        .with_context(|| format!("Failed to open scope {}", args.scope))?;
    let info = scope.info()?;

    println!("Scope {}", scope);
    println!("  Address:      {}", info.address);
    println!("  Mask:         {}", info.mask);
    println!("  State:        {}", info.state);
    if let Some(comment) = &info.comment {
        println!("  Comment:      {}", comment);
    }
    if !info.primary_host.is_unspecified() {
        println!("  Primary host: {}", info.primary_host);
    }

    match scope.ip_range() {
        Ok(range) => println!("  Range:        {} ({} addresses)", range, range.len()),
        Err(ScopeError::NotFound(_)) => println!("  Range:        none"),
        Err(e) => return Err(e).context("Failed to read allocatable range"),
    }

    let excluded = scope
        .excluded_ip_ranges()
        .context("Failed to read excluded ranges")?;
    if excluded.is_empty() {
        println!("  Excluded:     none");
    } else {
        for range in excluded {
            println!("  Excluded:     {}", range);
        }
    }

    println!(
        "  Lease:        {}",
        format_duration(scope.lease_duration().context("Failed to read lease time")?)
    );
    println!(
        "  Offer delay:  {} ms",
        scope.time_delay_offer()?.as_millis()
    );
    println!("  Dynamic DNS:  {}", scope.dns_settings()?);

    println!();
    println!("Reservations:");
    let mut reservations = 0;
    for reservation in scope.reservations() {
        let reservation = reservation.context("Failed to enumerate reservations")?;
        println!(
            "  {:<16} {}  {}",
            reservation.address,
            format_hardware_address(&reservation.hardware_address),
            reservation.allowed
        );
        reservations += 1;
    }
    if reservations == 0 {
        println!("  none");
    }

    if !args.no_clients {
        println!();
        println!("Clients:");
        let mut clients = 0;
        for client in scope.clients() {
            let client = client.context("Failed to enumerate clients")?;
            let expires = client
                .lease_expires
                .map(|t| unix_seconds(t).to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<16} {}  {:<20} expires {}",
                client.address,
                format_hardware_address(&client.hardware_address),
                client.name.as_deref().unwrap_or("-"),
                expires
            );
            clients += 1;
        }
        if clients == 0 {
            println!("  none");
        }
    }

    println!();
    println!("Options:");
    let mut options = 0;
    for value in scope.all_option_values() {
        let value = value.context("Failed to enumerate option values")?;
        println!("  [{}] {}", value.class, value.value);
        options += 1;
    }
    if options == 0 {
        println!("  none");
    }

    report_leaks(&export);
    Ok(())
}
