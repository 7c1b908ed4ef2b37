//! Terminal report formatting. Report lines go to stdout; problems go to
//! stderr next to the log output so piped reports stay clean.

use colored::{ColoredString, Colorize};

pub fn print_header(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "=".repeat(title.chars().count()).cyan());
}

pub fn print_success(message: &str) {
    println!("{}", status("✓".green().bold(), message.green()));
}

pub fn print_info(message: &str) {
    println!("{}", status("ℹ".blue().bold(), message.normal()));
}

pub fn print_warning(message: &str) {
    eprintln!("{}", status("⚠".yellow().bold(), message.yellow()));
}

pub fn print_error(message: &str) {
    eprintln!("{}", status("✗".red().bold(), message.red()));
}

fn status(marker: ColoredString, message: ColoredString) -> String {
    format!("{} {}", marker, message)
}
