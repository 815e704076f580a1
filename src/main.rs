//! Purpose: `hcl2json` CLI entry point: convert documents, parse expressions, serve over stdio.
//! Role: Binary crate root; every command goes through the same registered operations a
//! JavaScript host would call.
//! Invariants: Results go to stdout; errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use hcl2json_bridge::config::{BridgeConfig, ConvertOptions};
use hcl2json_bridge::core::error::{Error, ErrorKind, to_exit_code};
use hcl2json_bridge::hcl::files::{SourceKind, module_files, source_kind, terraform_json};
use hcl2json_bridge::hcl::merge::merge_into;
use hcl2json_bridge::logging;
use hcl2json_bridge::native::{CallbackLog, NativeValue};
use hcl2json_bridge::ops::{PARSE, PARSE_EXPRESSION};
use hcl2json_bridge::registry::{Registry, register_operations};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

mod stdio_host;

#[derive(Parser)]
#[command(
    name = "hcl2json",
    version,
    about = "Convert HCL documents to JSON and inspect HCL expressions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert HCL files or module directories to a single merged JSON document.
    Convert {
        /// Input files or directories; `-` reads standard input.
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        files: Vec<PathBuf>,
        /// Allow an attribute to be set more than once; the last definition wins.
        #[arg(long)]
        no_key_validation: bool,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the syntax tree of an expression, read as the contents of a quoted string.
    Expr {
        text: String,
        #[arg(long)]
        pretty: bool,
    },
    /// Answer newline-delimited JSON requests on stdin until EOF or a termination signal.
    Serve {
        #[arg(long)]
        no_key_validation: bool,
    },
}

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                return Ok(0);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `hcl2json --help` for usage."));
            }
        },
    };

    let config = BridgeConfig::default();
    logging::init_tracing(&config.log_filter);

    match cli.command {
        Command::Convert {
            files,
            no_key_validation,
            pretty,
        } => {
            let config = config.with_convert_options(ConvertOptions { no_key_validation });
            let merged = convert_files(&config, &files)?;
            print_json(&merged, pretty)?;
        }
        Command::Expr { text, pretty } => {
            let registry = registry(&config)?;
            let tree = invoke(
                &registry,
                PARSE_EXPRESSION,
                &[String::new(), text],
                ErrorKind::ExpressionParse,
            )?;
            print_json(&parse_result(&tree)?, pretty)?;
        }
        Command::Serve { no_key_validation } => {
            let config = config.with_convert_options(ConvertOptions { no_key_validation });
            let reason = stdio_host::serve(config)?;
            info!(%reason, "stdio host finished");
        }
    }
    Ok(0)
}

fn registry(config: &BridgeConfig) -> Result<Registry<NativeValue>, Error> {
    let mut registry = Registry::new(config.namespace.clone());
    register_operations(&mut registry, config)?;
    Ok(registry)
}

/// Call a registered operation the way a host would and unpack its callback.
fn invoke(
    registry: &Registry<NativeValue>,
    operation: &str,
    params: &[String],
    failure: ErrorKind,
) -> Result<String, Error> {
    let log = CallbackLog::new();
    let mut args: Vec<NativeValue> = params.iter().map(NativeValue::string).collect();
    args.push(log.callback());
    registry.invoke(operation, args)?;
    match log.single() {
        Some((None, Some(result))) => Ok(result),
        Some((Some(message), _)) => Err(Error::new(failure).with_message(message)),
        _ => Err(Error::new(ErrorKind::Internal)
            .with_message(format!("`{operation}` did not call back exactly once"))),
    }
}

fn convert_files(config: &BridgeConfig, inputs: &[PathBuf]) -> Result<Value, Error> {
    let registry = registry(config)?;
    let mut merged = Value::Object(Map::new());
    for input in inputs {
        for (path, kind) in expand_input(input)? {
            let (label, document) = read_input(&path)?;
            let value = match kind {
                SourceKind::Hcl => {
                    let json =
                        invoke(&registry, PARSE, &[label, document], ErrorKind::Conversion)?;
                    parse_result(&json)?
                }
                SourceKind::TerraformJson => terraform_json(document.as_bytes(), &label)?,
            };
            merge_into(&mut merged, value);
        }
    }
    Ok(merged)
}

/// Directories expand to their module files; a named file is read by its extension, HCL otherwise.
fn expand_input(input: &Path) -> Result<Vec<(PathBuf, SourceKind)>, Error> {
    if input != Path::new("-") && input.is_dir() {
        let files = module_files(input)?;
        debug!(dir = %input.display(), count = files.len(), "expanded module directory");
        return Ok(files);
    }
    let kind = source_kind(input).unwrap_or(SourceKind::Hcl);
    Ok(vec![(input.to_path_buf(), kind)])
}

fn read_input(path: &Path) -> Result<(String, String), Error> {
    if path == Path::new("-") {
        let mut document = String::new();
        io::stdin().read_to_string(&mut document).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read standard input")
                .with_source(err)
        })?;
        return Ok(("<stdin>".to_string(), document));
    }
    let document = fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read {}", path.display()))
            .with_hint("Check that the path exists and holds UTF-8 text.")
            .with_source(err)
    })?;
    Ok((path.display().to_string(), document))
}

fn parse_result(json: &str) -> Result<Value, Error> {
    serde_json::from_str(json).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("operation returned invalid JSON")
            .with_source(err)
    })
}

fn print_json(value: &Value, pretty: bool) -> Result<(), Error> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(())
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().label()));
    inner.insert("message".to_string(), json!(err.callback_message()));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{error_json, expand_input, invoke, registry};
    use hcl2json_bridge::config::BridgeConfig;
    use hcl2json_bridge::core::error::{Error, ErrorKind};
    use hcl2json_bridge::hcl::files::SourceKind;
    use hcl2json_bridge::ops::PARSE;
    use std::path::Path;

    #[test]
    fn error_json_carries_kind_message_and_hint() {
        let err = Error::new(ErrorKind::Io)
            .with_message("failed to read a.tf")
            .with_hint("check the path");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Io");
        assert_eq!(value["error"]["message"], "failed to read a.tf");
        assert_eq!(value["error"]["hint"], "check the path");
    }

    #[test]
    fn failed_invocation_uses_requested_kind() {
        let registry = registry(&BridgeConfig::default()).expect("registry");
        let err = invoke(
            &registry,
            PARSE,
            &["a.tf".to_string(), "x = {".to_string()],
            ErrorKind::Conversion,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        assert!(err.callback_message().contains("a.tf"));
    }

    #[test]
    fn named_files_are_read_by_extension() {
        let expanded = expand_input(Path::new("vars.tf.json")).expect("expand");
        assert_eq!(expanded[0].1, SourceKind::TerraformJson);
        let expanded = expand_input(Path::new("module.hcl")).expect("expand");
        assert_eq!(expanded[0].1, SourceKind::Hcl);
        let expanded = expand_input(Path::new("-")).expect("expand");
        assert_eq!(expanded.len(), 1);
    }
}
