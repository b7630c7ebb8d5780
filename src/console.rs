use std::fmt::Display;
use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::error::SmartError;

pub fn info(msg: impl Display) {
    println!("{msg}");
}

/// Dimmed hint line.
pub fn hint(msg: impl Display) {
    println!("{}", msg.to_string().dark_grey());
}

pub fn warn(msg: impl Display) {
    tracing::warn!("{msg}");
    eprintln!("{}", format!("warning: {msg}").yellow());
}

pub fn error(err: &SmartError) {
    tracing::debug!(?err, "turn failed");
    eprintln!("{}", format!("error: {err}").red());
}

/// Exit status line, green on success and red otherwise.
pub fn status(msg: impl Display, success: bool) {
    let msg = msg.to_string();
    if success {
        println!("{}", msg.green());
    } else {
        println!("{}", msg.red());
    }
}

/// Prints a streamed fragment without a newline.
pub fn fragment(text: &str) {
    print!("{text}");
    io::stdout().flush().ok();
}
