//! `banner_playground` - headless alert banner playground
//!
//! Renders a banner through the full engine (live preview plus off-screen
//! measurement), optionally applies an edit as a user would, and prints the
//! copy-ready markup.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin banner_playground -- --variant info --text "Deploy finished"
//! cargo run --bin banner_playground -- --edit "Read the <code class=\"code\">docs</code>"
//! RUST_LOG=alert_banner=debug cargo run --bin banner_playground
//! ```

use alert_banner::{Playground, PlaygroundOptions, Theme, Variant};
use std::ffi::OsString;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Parsing
// ============================================================================

const HELP_TEXT: &str = "banner_playground - render and measure an SVG alert banner

USAGE:
    banner_playground [OPTIONS]

OPTIONS:
    -h, --help              Print this help message and exit
    --text <HTML>           Initial banner text (default: sample copy)
    --variant <NAME>        info, warning or error (default: warning)
    --theme <NAME>          dark or light (default: light)

    --width <PX>            Live preview width (default: 600)
    --min-width <PX>        Canonical measuring width (default: 300)

    --edit <HTML>           Replace the live text after the first render
    --type <TEXT>           Type plain text at the end of the live text

    --height-only           Print only the measured height

ENVIRONMENT:
    RUST_LOG                Log filter, e.g. alert_banner=debug (logs go to stderr)

EXAMPLES:
    banner_playground --variant error --text \"Build failed\"
    banner_playground --edit \"Hello\" --height-only
";

/// Run configuration parsed from command-line arguments.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub options: PlaygroundOptions,
    pub edit: Option<String>,
    pub typed: Option<String>,
    pub height_only: bool,
}

/// Result of CLI parsing.
pub enum ParseResult {
    /// Successfully parsed configuration.
    Config(Config),
    /// User requested help.
    Help,
    /// Parse error with message.
    Error(String),
}

impl Config {
    /// Parse configuration from command-line arguments.
    pub fn from_args<I>(args: I) -> ParseResult
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        // Skip program name
        args.next();

        while let Some(arg) = args.next() {
            let arg_str = arg.to_string_lossy();
            let flag = arg_str.as_ref();

            if matches!(flag, "-h" | "--help") {
                return ParseResult::Help;
            }
            if flag == "--height-only" {
                config.height_only = true;
                continue;
            }

            let takes_value = matches!(
                flag,
                "--text" | "--variant" | "--theme" | "--width" | "--min-width" | "--edit" | "--type"
            );
            if !takes_value {
                return ParseResult::Error(format!("Unknown option: {flag}"));
            }
            let Some(value) = args.next().map(|v| v.to_string_lossy().to_string()) else {
                return ParseResult::Error(format!("{flag} requires a value"));
            };

            match flag {
                "--text" => config.options.initial_text = value,
                "--variant" => match value.parse::<Variant>() {
                    Ok(variant) => config.options.initial_variant = variant,
                    Err(err) => return ParseResult::Error(err.to_string()),
                },
                "--theme" => match value.parse::<Theme>() {
                    Ok(theme) => config.options.initial_theme = theme,
                    Err(err) => return ParseResult::Error(err.to_string()),
                },
                "--width" => match parse_px(&value) {
                    Some(px) => config.options.live_width = px,
                    None => return ParseResult::Error(format!("Invalid --width value: {value}")),
                },
                "--min-width" => match parse_px(&value) {
                    Some(px) => config.options.canonical_min_width = px,
                    None => {
                        return ParseResult::Error(format!("Invalid --min-width value: {value}"));
                    }
                },
                "--edit" => config.edit = Some(value),
                _ => config.typed = Some(value),
            }
        }

        ParseResult::Config(config)
    }
}

/// Parse a positive pixel width, with or without a `px` suffix.
fn parse_px(s: &str) -> Option<f64> {
    let n = s.trim().trim_end_matches("px").parse::<f64>().ok()?;
    (n.is_finite() && n > 0.0).then_some(n)
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> io::Result<()> {
    match Config::from_args(std::env::args_os()) {
        ParseResult::Config(config) => {
            init_tracing();
            run(&config)
        }
        ParseResult::Help => {
            print!("{HELP_TEXT}");
            Ok(())
        }
        ParseResult::Error(msg) => {
            eprintln!("Error: {msg}");
            eprintln!("Run with --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

fn run(config: &Config) -> io::Result<()> {
    let mut playground = Playground::new(config.options.clone());
    playground.run_until_idle();

    if let Some(html) = &config.edit {
        playground.edit_live_text(html).map_err(io::Error::other)?;
        playground.run_until_idle();
    }
    if let Some(text) = &config.typed {
        playground.type_live_text(text).map_err(io::Error::other)?;
        playground.run_until_idle();
    }

    let mut out = io::stdout().lock();
    if config.height_only {
        writeln!(out, "{}", playground.height())?;
        return Ok(());
    }

    if let Some(metrics) = playground.live_metrics() {
        eprintln!(
            "live preview: {}px x {}px, published height {}",
            metrics.width,
            metrics.content_height,
            playground.height()
        );
    }
    writeln!(out, "{}", playground.source())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<OsString> {
        strs.iter().map(|s| OsString::from(*s)).collect()
    }

    fn parsed(strs: &[&str]) -> Config {
        match Config::from_args(args(strs)) {
            ParseResult::Config(c) => c,
            _ => panic!("Expected Config"),
        }
    }

    #[test]
    fn test_default_config() {
        let config = parsed(&["banner_playground"]);
        assert_eq!(config.options.initial_variant, Variant::Warning);
        assert_eq!(config.options.live_width, 600.0);
        assert!(config.edit.is_none());
        assert!(!config.height_only);
    }

    #[test]
    fn test_help_flag() {
        let result = Config::from_args(args(&["banner_playground", "--help"]));
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn test_variant_and_theme() {
        let config = parsed(&["banner_playground", "--variant", "error", "--theme", "dark"]);
        assert_eq!(config.options.initial_variant, Variant::Error);
        assert_eq!(config.options.initial_theme, Theme::Dark);
    }

    #[test]
    fn test_widths() {
        let config = parsed(&["banner_playground", "--width", "720px", "--min-width", "320"]);
        assert_eq!(config.options.live_width, 720.0);
        assert_eq!(config.options.canonical_min_width, 320.0);
    }

    #[test]
    fn test_edit_and_type() {
        let config = parsed(&["banner_playground", "--edit", "Hi", "--type", "!", "--height-only"]);
        assert_eq!(config.edit.as_deref(), Some("Hi"));
        assert_eq!(config.typed.as_deref(), Some("!"));
        assert!(config.height_only);
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("300"), Some(300.0));
        assert_eq!(parse_px("300px"), Some(300.0));
        assert_eq!(parse_px("0"), None);
        assert_eq!(parse_px("wide"), None);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Config::from_args(args(&["banner_playground", "--unknown"])),
            ParseResult::Error(_)
        ));
        assert!(matches!(
            Config::from_args(args(&["banner_playground", "--variant", "fatal"])),
            ParseResult::Error(_)
        ));
        assert!(matches!(
            Config::from_args(args(&["banner_playground", "--text"])),
            ParseResult::Error(_)
        ));
    }
}
