//! kmod-slicer command-line front end.
//!
//! Thin wrapper over the library pipeline: read the preprocessed module
//! blob and the kernel macro list, run the slice, write the output files,
//! convert errors to exit codes (0 success, 2 user error, 1 internal).

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use kmod_slicer::pipeline::{self, SliceOptions, SliceRequest};
use kmod_slicer::SliceError;

const USAGE: &str = "\
Usage: kmod-slicer [OPTIONS] <preprocessed-module.c>

Options:
  -t, --target NAME        Function to slice toward (repeatable, required)
      --kernel-macros FILE Kernel #define list from the preprocessor
  -o, --output-dir DIR     Output directory (default: .)
      --cache-dir DIR      Memoisation directory (default: no caching)
      --single-file        Emit one concatenated module.c
      --elide-bodies       Emit non-target functions as declarations only
      --trim-enums         Drop unused enum constants (accepted, not yet applied)
  -v, --verbose            Print stage progress and timings
  -h, --help               Show this help
";

struct Cli {
    module_path: PathBuf,
    kernel_macros_path: Option<PathBuf>,
    output_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    targets: Vec<String>,
    options: SliceOptions,
}

fn main() {
    kmod_slicer::debug_log::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            if msg == "help" {
                print!("{}", USAGE);
                return;
            }
            eprintln!("error: {}", msg);
            eprint!("{}", USAGE);
            process::exit(2);
        }
    };

    match build_request(&cli).and_then(|req| pipeline::run(&req, &cli.output_dir)) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut module_path = None;
    let mut kernel_macros_path = None;
    let mut output_dir = PathBuf::from(".");
    let mut cache_dir = None;
    let mut targets = Vec::new();
    let mut options = SliceOptions::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err("help".to_string()),
            "-t" | "--target" => {
                let name = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                targets.push(name.clone());
            }
            "--kernel-macros" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                kernel_macros_path = Some(PathBuf::from(path));
            }
            "-o" | "--output-dir" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                output_dir = PathBuf::from(path);
            }
            "--cache-dir" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                cache_dir = Some(PathBuf::from(path));
            }
            "--single-file" => options.single_file_output = true,
            "--elide-bodies" => options.elide_non_target_function_bodies = true,
            "--trim-enums" => options.remove_unused_enum_fields = true,
            "-v" | "--verbose" => options.verbose = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{}'", other));
            }
            other => {
                if module_path.is_some() {
                    return Err("more than one input file given".to_string());
                }
                module_path = Some(PathBuf::from(other));
            }
        }
    }

    let module_path = module_path.ok_or_else(|| "no input file given".to_string())?;
    if targets.is_empty() {
        return Err("at least one --target is required".to_string());
    }

    Ok(Cli {
        module_path,
        kernel_macros_path,
        output_dir,
        cache_dir,
        targets,
        options,
    })
}

fn build_request(cli: &Cli) -> Result<SliceRequest, SliceError> {
    let preprocessed_module_text =
        fs::read_to_string(&cli.module_path).map_err(|e| SliceError::ReadInput {
            path: cli.module_path.clone(),
            source: e,
        })?;
    let kernel_macro_list = match &cli.kernel_macros_path {
        Some(path) => read_macro_list(path)?,
        None => Vec::new(),
    };

    Ok(SliceRequest {
        preprocessed_module_text,
        kernel_macro_list,
        target_functions: cli.targets.clone(),
        options: cli.options.clone(),
        cache_dir: cli.cache_dir.clone(),
    })
}

/// One directive per line; a trailing backslash continues onto the next.
fn read_macro_list(path: &PathBuf) -> Result<Vec<String>, SliceError> {
    let text = fs::read_to_string(path).map_err(|e| SliceError::ReadInput {
        path: path.clone(),
        source: e,
    })?;

    let mut fragments = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if current.is_empty() && line.trim().is_empty() {
            continue;
        }
        current.push_str(line);
        if line.ends_with('\\') {
            current.push('\n');
            continue;
        }
        fragments.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    Ok(fragments)
}
