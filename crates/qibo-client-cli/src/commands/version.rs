//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - Qibo client for the QRC cluster",
        style("qibo-client").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("  Library:      qibo-client {}", qibo_client::VERSION);
    println!("  Qibo version: {}", qibo_client::QIBO_VERSION);
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/qiboteam/qibo-client-rs").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
