//! fieldwise - Schema-aware structured merge and diff CLI
//!
//! A command line tool for performing structured operations on YAML/JSON
//! files: validation, comparison, merge, declarative apply with ownership
//! tracking, and union normalization.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use fieldwise::fieldpath::Owners;
use fieldwise::merge::{ApplyError, Updater};
use fieldwise::typed::Parser as SchemaParser;
use fieldwise::value;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    eprintln!(
        r#"fieldwise {} - Schema-aware structured merge and diff

USAGE:
    fieldwise [OPTIONS] <COMMAND>

OPTIONS:
    -s, --schema <FILE>      Path to the schema file (required)
    -t, --type-name <NAME>   Name of type in the schema to use
    -o, --output <FILE>      Output location. Use '-' for stdout (default: -)
    -h, --help               Print help information
    -V, --version            Print version information

COMMANDS:
    list-types               List all types in the schema
    validate <FILE>          Validate a YAML/JSON file against the schema
    compare --lhs <FILE> --rhs <FILE>
                             Compare two YAML/JSON files
    merge --lhs <FILE> --rhs <FILE>
                             Merge two YAML/JSON files
    apply --live <FILE> --config <FILE> --owner <NAME>
          [--owners <FILE>] [--force]
                             Apply a config over a live object, tracking
                             field ownership; prints the new live object
                             and the updated ownership map
    normalize <FILE>         Normalize union fields in a YAML/JSON file
    fieldset <FILE>          Build a fieldset from a YAML/JSON file
"#,
        VERSION
    );
}

fn print_version() {
    println!("fieldwise {}", VERSION);
}

#[derive(Debug)]
struct Cli {
    schema: PathBuf,
    type_name: Option<String>,
    output: String,
    command: Command,
}

#[derive(Debug)]
enum Command {
    ListTypes,
    Validate {
        file: PathBuf,
    },
    Compare {
        lhs: PathBuf,
        rhs: PathBuf,
    },
    Merge {
        lhs: PathBuf,
        rhs: PathBuf,
    },
    Apply {
        live: PathBuf,
        config: PathBuf,
        owner: String,
        owners: Option<PathBuf>,
        force: bool,
    },
    Normalize {
        file: PathBuf,
    },
    Fieldset {
        file: PathBuf,
    },
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    *i += 1;
    if *i >= args.len() {
        return Err(format!("Missing value for {}", flag));
    }
    Ok(args[*i].clone())
}

fn parse_pair(args: &[String], i: &mut usize) -> Result<(PathBuf, PathBuf), String> {
    let mut lhs: Option<PathBuf> = None;
    let mut rhs: Option<PathBuf> = None;

    while *i + 1 < args.len() {
        match args[*i + 1].as_str() {
            "--lhs" => {
                *i += 1;
                lhs = Some(PathBuf::from(take_value(args, i, "--lhs")?));
            }
            "--rhs" => {
                *i += 1;
                rhs = Some(PathBuf::from(take_value(args, i, "--rhs")?));
            }
            _ => break,
        }
    }

    match (lhs, rhs) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err("expected --lhs and --rhs arguments".to_string()),
    }
}

fn parse_args() -> Result<Cli, String> {
    let args: Vec<String> = env::args().collect();
    let mut i = 1;

    let mut schema: Option<PathBuf> = None;
    let mut type_name: Option<String> = None;
    let mut output = "-".to_string();
    let mut command: Option<Command> = None;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--schema" => {
                schema = Some(PathBuf::from(take_value(&args, &mut i, "--schema")?));
            }
            "-t" | "--type-name" => {
                type_name = Some(take_value(&args, &mut i, "--type-name")?);
            }
            "-o" | "--output" => {
                output = take_value(&args, &mut i, "--output")?;
            }
            "list-types" => {
                command = Some(Command::ListTypes);
            }
            "validate" => {
                let file = take_value(&args, &mut i, "validate")?;
                command = Some(Command::Validate {
                    file: PathBuf::from(file),
                });
            }
            "compare" => {
                let (lhs, rhs) = parse_pair(&args, &mut i).map_err(|e| format!("compare: {}", e))?;
                command = Some(Command::Compare { lhs, rhs });
            }
            "merge" => {
                let (lhs, rhs) = parse_pair(&args, &mut i).map_err(|e| format!("merge: {}", e))?;
                command = Some(Command::Merge { lhs, rhs });
            }
            "apply" => {
                let mut live: Option<PathBuf> = None;
                let mut config: Option<PathBuf> = None;
                let mut owner: Option<String> = None;
                let mut owners: Option<PathBuf> = None;
                let mut force = false;

                while i + 1 < args.len() {
                    match args[i + 1].as_str() {
                        "--live" => {
                            i += 1;
                            live = Some(PathBuf::from(take_value(&args, &mut i, "--live")?));
                        }
                        "--config" => {
                            i += 1;
                            config = Some(PathBuf::from(take_value(&args, &mut i, "--config")?));
                        }
                        "--owner" => {
                            i += 1;
                            owner = Some(take_value(&args, &mut i, "--owner")?);
                        }
                        "--owners" => {
                            i += 1;
                            owners = Some(PathBuf::from(take_value(&args, &mut i, "--owners")?));
                        }
                        "--force" => {
                            i += 1;
                            force = true;
                        }
                        _ => break,
                    }
                }

                match (live, config, owner) {
                    (Some(live), Some(config), Some(owner)) => {
                        command = Some(Command::Apply {
                            live,
                            config,
                            owner,
                            owners,
                            force,
                        });
                    }
                    _ => {
                        return Err(
                            "apply requires --live, --config, and --owner arguments".to_string()
                        );
                    }
                }
            }
            "normalize" => {
                let file = take_value(&args, &mut i, "normalize")?;
                command = Some(Command::Normalize {
                    file: PathBuf::from(file),
                });
            }
            "fieldset" => {
                let file = take_value(&args, &mut i, "fieldset")?;
                command = Some(Command::Fieldset {
                    file: PathBuf::from(file),
                });
            }
            arg => {
                return Err(format!("Unknown argument: {}", arg));
            }
        }
        i += 1;
    }

    let schema = schema.ok_or_else(|| "Missing required --schema argument".to_string())?;
    let command = command.ok_or_else(|| "Missing command".to_string())?;

    Ok(Cli {
        schema,
        type_name,
        output,
        command,
    })
}

fn main() -> ExitCode {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let schema_content = fs::read_to_string(&cli.schema)
        .map_err(|e| format!("Failed to read schema file {:?}: {}", cli.schema, e))?;

    let parser =
        SchemaParser::new(&schema_content).map_err(|e| format!("Failed to parse schema: {}", e))?;

    let type_name = cli.type_name.unwrap_or_else(|| {
        parser
            .type_names()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default()
    });

    if type_name.is_empty() {
        return Err("No types found in schema".into());
    }

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(fs::File::create(&cli.output).map_err(|e| {
            format!("Failed to create output file {:?}: {}", cli.output, e)
        })?)
    };

    match cli.command {
        Command::ListTypes => list_types(&parser, &mut output),
        Command::Validate { file } => validate(&parser, &type_name, &file, &mut output),
        Command::Compare { lhs, rhs } => compare(&parser, &type_name, &lhs, &rhs, &mut output),
        Command::Merge { lhs, rhs } => merge(&parser, &type_name, &lhs, &rhs, &mut output),
        Command::Apply {
            live,
            config,
            owner,
            owners,
            force,
        } => apply(
            &parser, &type_name, &live, &config, &owner, owners.as_ref(), force, &mut output,
        ),
        Command::Normalize { file } => normalize(&parser, &type_name, &file, &mut output),
        Command::Fieldset { file } => fieldset(&parser, &type_name, &file, &mut output),
    }
}

fn parse_file(
    parser: &SchemaParser,
    type_name: &str,
    file: &PathBuf,
) -> Result<fieldwise::TypedValue, Box<dyn std::error::Error>> {
    let content =
        fs::read_to_string(file).map_err(|e| format!("Failed to read file {:?}: {}", file, e))?;

    let pt = parser.type_by_name(type_name);
    if !pt.is_valid() {
        return Err(format!("Type '{}' not found in schema", type_name).into());
    }

    Ok(pt
        .from_yaml(&content)
        .map_err(|e| format!("Failed to parse {:?}: {}", file, e))?)
}

fn list_types(
    parser: &SchemaParser,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(output, "Types in schema:")?;
    for name in parser.type_names() {
        writeln!(output, "  - {}", name)?;
    }
    Ok(())
}

fn validate(
    parser: &SchemaParser,
    type_name: &str,
    file: &PathBuf,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    parse_file(parser, type_name, file)?;
    writeln!(output, "Validation successful")?;
    Ok(())
}

fn compare(
    parser: &SchemaParser,
    type_name: &str,
    lhs_file: &PathBuf,
    rhs_file: &PathBuf,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let lhs = parse_file(parser, type_name, lhs_file)?;
    let rhs = parse_file(parser, type_name, rhs_file)?;

    let comparison = lhs.compare(&rhs).map_err(|e| format!("Compare failed: {}", e))?;

    if comparison.is_same() {
        writeln!(output, "Objects are identical")?;
    } else {
        writeln!(output, "Objects differ:")?;
        if comparison.has_added() {
            writeln!(output, "\nAdded fields:")?;
            comparison.added.iterate(|path| {
                writeln!(output, "  + {}", path).ok();
            });
        }
        if comparison.has_removed() {
            writeln!(output, "\nRemoved fields:")?;
            comparison.removed.iterate(|path| {
                writeln!(output, "  - {}", path).ok();
            });
        }
        if comparison.has_modified() {
            writeln!(output, "\nModified fields:")?;
            comparison.modified.iterate(|path| {
                writeln!(output, "  ~ {}", path).ok();
            });
        }
    }

    Ok(())
}

fn merge(
    parser: &SchemaParser,
    type_name: &str,
    lhs_file: &PathBuf,
    rhs_file: &PathBuf,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let lhs = parse_file(parser, type_name, lhs_file)?;
    let rhs = parse_file(parser, type_name, rhs_file)?;

    let merged = lhs.merge(&rhs).map_err(|e| format!("Merge failed: {}", e))?;

    let yaml =
        value::to_yaml(merged.value()).map_err(|e| format!("Failed to serialize result: {}", e))?;
    write!(output, "{}", yaml)?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply(
    parser: &SchemaParser,
    type_name: &str,
    live_file: &PathBuf,
    config_file: &PathBuf,
    owner: &str,
    owners_file: Option<&PathBuf>,
    force: bool,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let live = parse_file(parser, type_name, live_file)?;
    let config = parse_file(parser, type_name, config_file)?;

    let owners = match owners_file {
        Some(file) => {
            let data = fs::read(file)
                .map_err(|e| format!("Failed to read owners file {:?}: {}", file, e))?;
            Owners::from_json(&data).map_err(|e| format!("Failed to parse owners: {}", e))?
        }
        None => Owners::new(),
    };

    let updater = Updater::new();
    let (new_live, new_owners) = match updater.apply(&live, &config, &owners, owner, force) {
        Ok(result) => result,
        Err(ApplyError::Conflicts(conflicts)) => {
            return Err(format!("Apply failed:\n{}", conflicts).into());
        }
        Err(e) => return Err(format!("Apply failed: {}", e).into()),
    };

    let yaml = value::to_yaml(new_live.value())
        .map_err(|e| format!("Failed to serialize result: {}", e))?;
    write!(output, "{}", yaml)?;

    writeln!(output, "---")?;
    let owners_json = new_owners
        .to_json()
        .map_err(|e| format!("Failed to serialize owners: {}", e))?;
    writeln!(output, "{}", String::from_utf8_lossy(&owners_json))?;

    Ok(())
}

fn normalize(
    parser: &SchemaParser,
    type_name: &str,
    file: &PathBuf,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let typed_value = parse_file(parser, type_name, file)?;

    let normalized = typed_value
        .normalize_unions()
        .map_err(|e| format!("Normalization failed: {}", e))?;

    let yaml = value::to_yaml(normalized.value())
        .map_err(|e| format!("Failed to serialize result: {}", e))?;
    write!(output, "{}", yaml)?;

    Ok(())
}

fn fieldset(
    parser: &SchemaParser,
    type_name: &str,
    file: &PathBuf,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let typed_value = parse_file(parser, type_name, file)?;

    let field_set = typed_value
        .to_field_set()
        .map_err(|e| format!("Failed to build fieldset: {}", e))?;

    writeln!(output, "Fields:")?;
    field_set.iterate(|path| {
        writeln!(output, "  {}", path).ok();
    });

    Ok(())
}
