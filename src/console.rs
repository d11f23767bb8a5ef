//! Startup banner and endpoint listing for the terminal.
//! Used by: main.

use colored::Colorize;

use crate::config::Config;

const ENDPOINTS: [(&str, &str); 8] = [
    ("/records", "Filtered, sorted page of device changes"),
    ("/records/export", "Same rows as CSV or XLSX"),
    ("/facets", "Distinct values for filter pickers"),
    ("/timeseries", "Chart points for one device and property"),
    ("/timeseries/export", "Chart points as XLSX"),
    ("/stats", "Recent counts and most frequent values"),
    ("/metrics", "Telemetry"),
    ("/health", "Health check"),
];

pub fn print_banner() {
    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║                                                           ║".cyan());
    println!("║     {}                                   ║", "Historian v0.1.0".bold().white());
    println!("║     {}                      ║", "Device change log browser".dimmed());
    println!("{}", "║                                                           ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════════╝".cyan());
    println!();
}

pub fn print_startup(config: &Config) {
    println!("{} {}", "✓".green().bold(), "Server ready".white().bold());
    println!("  {} {}", "→".dimmed(), format!("http://{}", config.bind_addr).cyan().underline());
    println!();
    println!("{}", "Data sources:".white().bold());
    println!("  {} {}", "primary  ".yellow(), config.primary_db.white());
    println!("  {} {}", "secondary".yellow(), config.secondary_db.white());
    println!();
    println!("{}", "Endpoints:".white().bold());
    let width = ENDPOINTS.iter().map(|(path, _)| path.len()).max().unwrap_or_default();
    for (path, about) in ENDPOINTS {
        println!("  {} {:<width$}  {}", "GET".green(), path.white(), about.dimmed());
    }
    println!();
}
