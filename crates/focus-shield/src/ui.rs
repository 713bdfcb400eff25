//! Terminal output helpers

// ANSI color codes
pub const RED: &str = "\x1b[0;31m";
pub const GREEN: &str = "\x1b[0;32m";
pub const YELLOW: &str = "\x1b[0;33m";
pub const CYAN: &str = "\x1b[0;36m";
pub const MAGENTA: &str = "\x1b[0;35m";
pub const BOLD: &str = "\x1b[1m";
pub const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
pub fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
pub fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

pub fn ok(message: &str) {
    println!("{} {}", color(GREEN, "[ok]"), message);
}

pub fn info(message: &str) {
    println!("{} {}", color(CYAN, "[info]"), message);
}

pub fn warning(message: &str) {
    println!("{} {}", color(YELLOW, "[warn]"), message);
}

/// Print an error with its context chain
pub fn error(err: &anyhow::Error) {
    println!("{} {:#}", color(RED, "[error]"), err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_keeps_text() {
        let result = color(RED, "test");
        assert!(result.contains("test"));
    }
}
