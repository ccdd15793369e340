use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cwscript::codegen::{resolver::state_decls, ContractAssembler};
use cwscript::core::{ContractDefn, Node};
use cwscript::{CodegenConfig, CompileOptions, EmitterConfig, IndentStyle, Program};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cwscript")]
#[command(about = "CWScript - compile contract syntax trees to CosmWasm source")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Compile {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail on constructs that have no lowering instead of emitting a placeholder
        #[arg(long)]
        strict: bool,

        /// Dump template bindings as JSON instead of rendering source
        #[arg(long)]
        bindings: bool,

        #[arg(long)]
        tabs: bool,

        #[arg(long)]
        no_header: bool,

        #[arg(short, long)]
        verbose: bool,
    },

    Check {
        input: PathBuf,

        #[arg(long)]
        strict: bool,

        #[arg(short, long)]
        verbose: bool,
    },

    Inspect {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            strict,
            bindings,
            tabs,
            no_header,
            verbose,
        } => {
            let options = CompileOptions {
                codegen: codegen_config(strict),
                emitter: EmitterConfig {
                    indent_style: if tabs {
                        IndentStyle::Tabs
                    } else {
                        IndentStyle::Spaces(4)
                    },
                    emit_header: !no_header,
                },
                dump_bindings: bindings,
            };
            cmd_compile(input, output, options, verbose)
        }
        Commands::Check {
            input,
            strict,
            verbose,
        } => cmd_check(input, strict, verbose),
        Commands::Inspect { input, verbose } => cmd_inspect(input, verbose),
    }
}

fn codegen_config(strict: bool) -> CodegenConfig {
    if strict {
        CodegenConfig::strict()
    } else {
        CodegenConfig::default()
    }
}

/// A single tree file, or every `*.json` file under a directory in path order.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == "json")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn load_program(path: &Path) -> Result<Program> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    cwscript::parse_program(&source).with_context(|| format!("in {}", path.display()))
}

fn cmd_compile(
    input: PathBuf,
    output: Option<PathBuf>,
    options: CompileOptions,
    verbose: bool,
) -> Result<()> {
    use colored::*;
    use std::fs;
    use std::time::Instant;

    if verbose {
        println!("{}", " CWScript Compiler".bright_blue().bold());
        println!("{}", "=".repeat(50).bright_blue());
        println!(" Input: {}", input.display());
        if let Some(ref out) = output {
            println!(" Output: {}", out.display());
        }
        println!(" Fallback: {:?}", options.codegen.fallback);
        if options.dump_bindings {
            println!(" Mode: template bindings (JSON)");
        }
        println!();
    }

    let start = Instant::now();
    let files = collect_inputs(&input)?;
    if files.is_empty() {
        println!("{}", "  No syntax trees found in input".yellow());
        return Ok(());
    }

    let mut emitted = String::new();
    for file in &files {
        if verbose {
            println!(" Compiling {}...", file.display());
        }
        let program = load_program(file)?;
        if program.contracts().is_empty() && verbose {
            println!("{}", "  No contracts found".yellow());
        }
        let code = cwscript::compile_program(&program, &options)
            .with_context(|| format!("failed to compile {}", file.display()))?;
        emitted.push_str(&code);
    }

    if let Some(output_path) = output {
        fs::write(&output_path, &emitted)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        if verbose {
            let elapsed = start.elapsed();
            println!(
                "\n {} Compilation successful!",
                "SUCCESS:".bright_green().bold()
            );
            println!("   Files: {}", files.len());
            println!("   Time: {:.3}s", elapsed.as_secs_f64());
            println!("   Output: {}", output_path.display());
        }
    } else {
        print!("{}", emitted);
    }

    Ok(())
}

fn cmd_check(input: PathBuf, strict: bool, verbose: bool) -> Result<()> {
    use colored::*;

    if verbose {
        println!("{}", " Checking CWScript".bright_cyan().bold());
        println!("{}", "=".repeat(50).bright_cyan());
        println!(" Input: {}", input.display());
        println!();
    }

    // Bindings are rendered as JSON so only verification and template
    // synthesis are exercised.
    let renderer = cwscript::BindingDumpRenderer;
    let assembler = ContractAssembler::new(&renderer).with_config(codegen_config(strict));

    let mut failed = 0;
    for file in collect_inputs(&input)? {
        let program = match load_program(&file) {
            Ok(program) => program,
            Err(e) => {
                println!("{} {}", "FAILED".bright_red().bold(), file.display());
                println!("   {:#}", e);
                failed += 1;
                continue;
            }
        };

        let results = assembler.compile_each(&program);
        let errors: Vec<_> = results
            .iter()
            .filter_map(|(name, result)| result.as_ref().err().map(|e| (name, e)))
            .collect();

        if errors.is_empty() {
            println!("{} {}", "OK".bright_green().bold(), file.display());
            if verbose {
                println!("   Checked {} contract(s)", results.len());
            }
        } else {
            println!("{} {}", "FAILED".bright_red().bold(), file.display());
            for (name, e) in errors {
                println!("   {}: {}", name.bright_yellow(), e);
            }
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} file(s) failed the check", failed);
    }
    Ok(())
}

fn cmd_inspect(input: PathBuf, verbose: bool) -> Result<()> {
    use colored::*;

    for file in collect_inputs(&input)? {
        let program = load_program(&file)?;
        let contracts = program.contracts();

        if verbose {
            println!("{}", file.display().to_string().bright_cyan().bold());
        }
        if contracts.is_empty() {
            println!("  No contracts found");
            continue;
        }

        println!(" Found {} contract(s)\n", contracts.len());
        for (idx, contract) in contracts.iter().enumerate() {
            print_contract(idx, contract, verbose);
        }
    }

    Ok(())
}

fn print_contract(idx: usize, contract: &ContractDefn, verbose: bool) {
    use colored::*;

    println!(
        "{}",
        format!(" Contract {}: {}", idx, contract.name)
            .bright_green()
            .bold()
    );
    println!("{}", "-".repeat(60).bright_green());

    let decls = state_decls(contract);
    let handlers: Vec<_> = contract
        .body
        .iter()
        .filter_map(|item| match item {
            Node::Exec(defn) => Some(defn),
            _ => None,
        })
        .collect();
    println!("State: {}", decls.len());
    println!("Handlers: {}", handlers.len());

    if !decls.is_empty() {
        println!("\n  State:");
        for decl in &decls {
            if decl.is_map() {
                let keys: Vec<_> = decl.keys.iter().map(|k| k.to_string()).collect();
                println!("    {}[{}]: {}", decl.name, keys.join("]["), decl.ty);
            } else {
                println!("    {}: {}", decl.name, decl.ty);
            }
        }
    }

    for handler in handlers {
        let params: Vec<_> = handler
            .args
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        println!(
            "\n  {}",
            format!(" exec {}({})", handler.name, params.join(", ")).bright_yellow()
        );
        if verbose {
            println!("     Statements: {}", handler.body.len());
        }
    }

    println!();
}
