//! deepmatch CLI — driving adapter for the deepmatch engine.
//!
//! Subcommands:
//! - `eval <got> <expected> [--lax] [--max-errors N] [--root NAME] [--config FILE]`
//!   — compare a document against an expectation
//! - `check <expected>` — validate an expectation loads without errors
//! - `info` — print registered rule names
//!
//! Documents are JSON (`.json`) or YAML (anything else). Expectations may
//! embed rule objects: `{"$op": "Gt", "args": [0]}`.
//!
//! Exit status: 0 on match, 1 on mismatch, 2 on usage or load errors.

use std::path::Path;
use std::process::ExitCode;

use deepmatch::json::from_json;
use deepmatch::{evaluate_detailed, Config, RuleRegistry, RuleRegistryBuilder, Session, Value};

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(2);
    }

    let result = match args[1].as_str() {
        "eval" => cmd_eval(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "info" => cmd_info(),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(true)
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deepmatch=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

/// `Ok(true)` on match, `Ok(false)` on mismatch.
fn cmd_eval(args: &[String]) -> Result<bool, String> {
    let options = parse_eval_args(args)?;

    let config = options.config()?;
    let registry = build_registry();
    let got = from_json(&load_document(&options.got)?);
    let expected = load_expectation(&registry, &options.expected)?;

    tracing::debug!(got = %options.got, expected = %options.expected, "evaluating");

    match evaluate_detailed(&config, &Session::new(), got, expected) {
        Ok(()) => {
            println!("match");
            Ok(true)
        }
        Err(err) => {
            println!("{err}");
            Ok(false)
        }
    }
}

fn cmd_check(args: &[String]) -> Result<bool, String> {
    let [path] = args else {
        return Err("check requires exactly one expectation file".into());
    };

    let registry = build_registry();
    let expected = load_expectation(&registry, path)?;

    println!("Expectation valid: {expected}");
    Ok(true)
}

#[allow(clippy::unnecessary_wraps)] // Uniform return type for all commands
fn cmd_info() -> Result<bool, String> {
    let registry = build_registry();

    println!("Registered rules ({}):", registry.len());
    for name in registry.names() {
        println!("  {name}");
    }

    Ok(true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

fn build_registry() -> RuleRegistry {
    deepmatch_test::register_test_rules(RuleRegistryBuilder::new()).build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Document loading
// ═══════════════════════════════════════════════════════════════════════════════

fn is_json(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))
}

fn load_document(path: &str) -> Result<serde_json::Value, String> {
    let content = read(path)?;
    if is_json(path) {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error in \"{path}\": {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error in \"{path}\": {e}"))
    }
}

fn load_expectation(registry: &RuleRegistry, path: &str) -> Result<Value, String> {
    let doc = load_document(path)?;
    registry
        .load(&doc)
        .map_err(|e| format!("expectation invalid: {e}"))
}

fn load_config(path: &str) -> Result<Config, String> {
    let content = read(path)?;
    if is_json(path) {
        serde_json::from_str(&content).map_err(|e| format!("config error in \"{path}\": {e}"))
    } else {
        serde_yaml::from_str(&content).map_err(|e| format!("config error in \"{path}\": {e}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct EvalOptions {
    got: String,
    expected: String,
    config_file: Option<String>,
    lax: bool,
    max_errors: Option<i64>,
    root: Option<String>,
}

impl EvalOptions {
    /// Config file first, then flags on top.
    fn config(&self) -> Result<Config, String> {
        let mut config = match &self.config_file {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        if self.lax {
            config = config.be_lax(true);
        }
        if let Some(max) = self.max_errors {
            config = config.max_errors(max);
        }
        if let Some(root) = &self.root {
            config = config.root_name(root.clone());
        }
        Ok(config)
    }
}

fn parse_eval_args(args: &[String]) -> Result<EvalOptions, String> {
    let mut options = EvalOptions::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--lax" => options.lax = true,
            "--max-errors" => {
                let raw = iter.next().ok_or("--max-errors requires a value")?;
                let max = raw
                    .parse()
                    .map_err(|_| format!("invalid --max-errors value \"{raw}\""))?;
                options.max_errors = Some(max);
            }
            "--root" => {
                options.root = Some(iter.next().ok_or("--root requires a value")?.clone());
            }
            "--config" => {
                options.config_file = Some(iter.next().ok_or("--config requires a value")?.clone());
            }
            flag if flag.starts_with("--") => return Err(format!("unexpected argument \"{flag}\"")),
            path => positional.push(path.to_owned()),
        }
    }

    match <[String; 2]>::try_from(positional) {
        Ok([got, expected]) => {
            options.got = got;
            options.expected = expected;
            Ok(options)
        }
        Err(_) => Err("eval requires a got file and an expected file".into()),
    }
}

fn print_usage() {
    eprintln!(
        "Usage: deepmatch <command> [options]

Commands:
  eval <got> <expected> [options]   Compare a document against an expectation
      --lax                         Convert between compatible types
      --max-errors <N>              Stop after N errors (-1: no limit)
      --root <NAME>                 Name of the root in error paths
      --config <FILE>               Load settings from a JSON/YAML file
  check <expected>                  Validate an expectation
  info                              Print registered rules
  help                              Show this help

Exit status: 0 match, 1 mismatch, 2 error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn temp_file(name: &str, content: &str) -> String {
        let dir = std::env::temp_dir().join(format!("deepmatch-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parse_eval_positional() {
        let options = parse_eval_args(&args(&["got.json", "want.yaml"])).unwrap();
        assert_eq!(options.got, "got.json");
        assert_eq!(options.expected, "want.yaml");
        assert!(!options.lax);
    }

    #[test]
    fn parse_eval_flags() {
        let options = parse_eval_args(&args(&[
            "--lax", "got.json", "--max-errors", "-1", "want.json", "--root", "resp",
        ]))
        .unwrap();
        assert!(options.lax);
        assert_eq!(options.max_errors, Some(-1));
        assert_eq!(options.root.as_deref(), Some("resp"));

        let config = options.config().unwrap();
        assert!(config.be_lax);
        assert_eq!(config.max_errors, -1);
        assert_eq!(config.root_name, "resp");
    }

    #[test]
    fn parse_eval_errors() {
        assert!(parse_eval_args(&args(&["only-one.json"])).is_err());
        assert!(parse_eval_args(&args(&["a", "b", "c"])).is_err());
        assert!(parse_eval_args(&args(&["a", "b", "--max-errors"])).is_err());
        assert!(parse_eval_args(&args(&["a", "b", "--max-errors", "ten"])).is_err());
        assert!(parse_eval_args(&args(&["a", "b", "--verbose"])).is_err());
    }

    #[test]
    fn build_registry_has_extension_rules() {
        let registry = build_registry();
        assert!(registry.contains("Between"));
        assert!(registry.contains("Sorted"));
    }

    #[test]
    fn load_yaml_expectation_with_rules() {
        let path = temp_file("want.yaml", "id: {$op: Gt, args: [0]}\nname: bob\n");
        let expected = load_expectation(&build_registry(), &path).unwrap();
        let got = from_json(&serde_json::json!({"id": 7, "name": "bob"}));
        assert!(deepmatch::eq_deeply(got, expected));
    }

    #[test]
    fn eval_reports_match_and_mismatch() {
        let got = temp_file("got.json", r#"{"ids": [3, 1, 2]}"#);
        let bag = temp_file("bag.json", r#"{"ids": {"$op": "Bag", "args": [1, 2, 3]}}"#);
        let list = temp_file("list.json", r#"{"ids": [1, 2, 3]}"#);

        assert_eq!(cmd_eval(&args(&[got.as_str(), bag.as_str()])), Ok(true));
        assert_eq!(cmd_eval(&args(&[got.as_str(), list.as_str()])), Ok(false));
    }

    #[test]
    fn check_rejects_unknown_rule() {
        let path = temp_file("bad.json", r#"{"$op": "Nope"}"#);
        let err = cmd_check(&args(&[path.as_str()])).unwrap_err();
        assert!(err.contains("unknown rule \"Nope\""), "{err}");
    }

    #[test]
    fn config_file_is_overridden_by_flags() {
        let path = temp_file("config.yaml", "root_name: doc\nmax_errors: 3\n");
        let options = parse_eval_args(&args(&["a", "b", "--config", path.as_str(), "--root", "resp"])).unwrap();
        let config = options.config().unwrap();
        assert_eq!(config.root_name, "resp");
        assert_eq!(config.max_errors, 3);
    }
}
