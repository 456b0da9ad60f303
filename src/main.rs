//! Counterfeit CLI
//!
//! Usage:
//!   counterfeit [options] <source-path> <interface-name> [-]
//!   counterfeit -p <source-dir> [options] [-]
//!   counterfeit schema | version | help

use counterfeit::generate::{contract, generate_from};
use counterfeit::model::dir_base_name;
use counterfeit::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // COUNTERFEIT_LOG=debug shows how contracts are located
    if let Ok(filter) = EnvFilter::try_from_env("COUNTERFEIT_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "schema" => cmd_schema(),
        "version" | "--version" | "-v" => {
            println!("counterfeit {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => parse_options(&args[1..]).and_then(|options| cmd_generate(&options)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
counterfeit - call-recording fakes for Go interfaces

USAGE:
    counterfeit [OPTIONS] <source-path> <interface-name> [-]
    counterfeit -p <source-dir> [OPTIONS] [-]
    counterfeit <COMMAND>

COMMANDS:
    schema                           Print the JSON schema of .counterfeit.yaml
    version                          Print the version
    help                             Print this help

OPTIONS:
    -p                               Derive an interface from the exported
                                     functions of <source-dir>
    -o, --output <path>              Output directory, or file when it ends in .go
                                     (default: <source dir>/<pkg>fakes)
    --fake-name <name>               Name of the fake (default: Fake<Interface>)
    --package <name>                 Package of the generated file
                                     (default: output directory name)
    --model                          Print the extracted contract as JSON
    -                                Print to stdout instead of writing a file

ENVIRONMENT:
    COUNTERFEIT_LOG                  Log filter, e.g. debug or counterfeit=trace

EXAMPLES:
    counterfeit internal/store Store
    counterfeit -o internal/store/mocks internal/store/store.go Store
    counterfeit --fake-name MemStore internal/store Store -
    counterfeit -p ./vendor/os
"#
    );
}

#[derive(Debug, Default)]
struct Options {
    derive: bool,
    output: Option<PathBuf>,
    fake_name: Option<String>,
    package: Option<String>,
    model: bool,
    stdout: bool,
    positional: Vec<String>,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-p" => options.derive = true,
            "-o" | "--output" => options.output = Some(PathBuf::from(value_of(arg, iter.next())?)),
            "--fake-name" => options.fake_name = Some(value_of(arg, iter.next())?),
            "--package" => options.package = Some(value_of(arg, iter.next())?),
            "--model" => options.model = true,
            "-" => options.stdout = true,
            flag if flag.starts_with('-') => {
                return Err(Error::InvalidRequest(format!("unknown option `{}`", flag)))
            }
            _ => options.positional.push(arg.clone()),
        }
    }

    let expected = if options.derive { 1 } else { 2 };
    if options.positional.len() != expected {
        let usage = if options.derive {
            "Usage: counterfeit -p <source-dir> [-o <output-dir>] [--package <name>] [-]"
        } else {
            "Usage: counterfeit [-o <output-path>] [--fake-name <name>] [--package <name>] <source-path> <interface-name> [-]"
        };
        return Err(usage.into());
    }
    Ok(options)
}

fn value_of(flag: &str, value: Option<&String>) -> Result<String> {
    value
        .cloned()
        .ok_or_else(|| Error::InvalidRequest(format!("`{}` needs a value", flag)))
}

fn cmd_generate(options: &Options) -> Result<()> {
    let source_path = PathBuf::from(&options.positional[0]);
    if !source_path.exists() {
        return Err(Error::InvalidRequest(format!(
            "{} does not exist",
            source_path.display()
        )));
    }
    let source_dir = absolute(&source_dir_of(&source_path));
    let config = Config::discover(&source_path)?;

    // The default output directory is always a sibling package
    let qualify = config.qualify_local_types
        && options
            .output
            .as_ref()
            .is_none_or(|output| absolute(&output_dir_of(output)) != source_dir);

    let mut request = if options.derive {
        Request::derive(&source_path, "main")
    } else {
        Request::locate(&options.positional[1], &source_path, "main")
    }
    .with_qualified_local_types(qualify);
    if let Some(name) = &options.fake_name {
        request = request.with_struct_name(name);
    }

    let contract = contract(&request, &config)?;
    if options.model {
        println!("{}", serde_json::to_string_pretty(&contract)?);
        return Ok(());
    }

    let output_dir = match &options.output {
        Some(output) => output_dir_of(output),
        None => source_dir.join(format!("{}{}", contract.package.name, config.package_suffix)),
    };
    request.package_name = match &options.package {
        Some(package) => package.clone(),
        None => dir_base_name(&absolute(&output_dir)),
    };

    let generated = generate_from(&contract, &request, &config)?;
    let source = if config.format {
        match format_go(&generated.source) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!(error = %e, "writing unformatted output");
                generated.source.clone()
            }
        }
    } else {
        generated.source.clone()
    };

    if options.stdout {
        print!("{}", source);
        return Ok(());
    }

    let output_file = match &options.output {
        Some(output) if is_go_file(output) => output.clone(),
        _ => output_dir.join(&generated.file_name),
    };
    fs::create_dir_all(&output_dir).map_err(Error::Io)?;
    fs::write(&output_file, source).map_err(Error::Io)?;
    println!("Wrote `{}` to `{}`", generated.name, output_file.display());
    Ok(())
}

fn cmd_schema() -> Result<()> {
    println!("{}", Config::schema()?);
    Ok(())
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

fn source_dir_of(source_path: &Path) -> PathBuf {
    if source_path.is_dir() {
        return source_path.to_path_buf();
    }
    match source_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn output_dir_of(output: &Path) -> PathBuf {
    if is_go_file(output) {
        source_dir_of(output)
    } else {
        output.to_path_buf()
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
