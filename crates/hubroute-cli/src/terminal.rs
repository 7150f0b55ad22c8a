//! Terminal styling helpers.
//!
//! ANSI escape codes, color detection and number formatting for text output.

/// ANSI escape codes used by the text renderer.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for place names.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for secondary details.
    pub const GRAY: &str = "\x1b[90m";
    /// Cyan for hubs.
    pub const CYAN: &str = "\x1b[36m";
    /// Green for low risk and good quality.
    pub const GREEN: &str = "\x1b[32m";
    /// Yellow for medium risk.
    pub const YELLOW: &str = "\x1b[33m";
    /// Red for high risk and broken limits.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, either ANSI sequences or empty strings.
#[derive(Debug, Clone, Copy)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub cyan: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub red: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            cyan: colors::CYAN,
            green: colors::GREEN,
            yellow: colors::YELLOW,
            red: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            white_bold: "",
            gray: "",
            cyan: "",
            green: "",
            yellow: "",
            red: "",
        }
    }

    /// `colored()` when the terminal supports ANSI colors, else `plain()`.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Check if the terminal supports ANSI color codes.
///
/// Respects `NO_COLOR` (https://no-color.org/) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

/// Format a whole number with thousand separators.
///
/// ```
/// # use hubroute_cli::terminal::format_with_separators;
/// assert_eq!(format_with_separators(999), "999");
/// assert_eq!(format_with_separators(6_826_824), "6,826,824");
/// ```
#[must_use]
pub fn format_with_separators(n: u64) -> String {
    if n < 1000 {
        return n.to_string();
    }
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a monetary amount rounded to the nearest whole unit.
#[must_use]
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() || amount <= 0.0 {
        return "0".to_string();
    }
    format_with_separators(amount.round() as u64)
}
