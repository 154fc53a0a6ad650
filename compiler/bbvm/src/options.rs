//! Command-line parsing.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Execute a bytecode file.
    Run { path: PathBuf, threads: Option<usize> },
    /// Print which blocks may run in the background.
    Analyze { path: PathBuf },
    Help,
}

/// Parse everything after the program name.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(first) = args.first() else {
        return Ok(Command::Help);
    };
    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "analyze" => {
            let path = args.get(1).ok_or("missing file path")?;
            Ok(Command::Analyze {
                path: PathBuf::from(path),
            })
        }
        "run" => parse_run(&args[1..]),
        _ => parse_run(args),
    }
}

fn parse_run(args: &[String]) -> Result<Command, String> {
    let mut path = None;
    let mut threads = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if let Some(value) = arg.strip_prefix("--threads=") {
            threads = Some(parse_threads(value)?);
        } else if arg == "--threads" || arg == "-j" {
            let value = args.get(i + 1).ok_or("--threads needs a value")?;
            threads = Some(parse_threads(value)?);
            i += 1;
        } else if arg.starts_with('-') {
            return Err(format!("unknown option: {arg}"));
        } else if path.is_none() {
            path = Some(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument: {arg}"));
        }
        i += 1;
    }
    let path = path.ok_or("missing file path")?;
    Ok(Command::Run { path, threads })
}

fn parse_threads(value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("invalid thread count: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn bare_path_runs() {
        assert_eq!(
            parse_args(&args(&["main.bbvm"])),
            Ok(Command::Run {
                path: PathBuf::from("main.bbvm"),
                threads: None
            })
        );
    }

    #[test]
    fn thread_flag_forms() {
        let expected = Ok(Command::Run {
            path: PathBuf::from("a.bbvm"),
            threads: Some(3),
        });
        assert_eq!(parse_args(&args(&["run", "a.bbvm", "--threads", "3"])), expected);
        assert_eq!(parse_args(&args(&["a.bbvm", "--threads=3"])), expected);
        assert_eq!(parse_args(&args(&["-j", "3", "a.bbvm"])), expected);
    }

    #[test]
    fn bad_thread_count() {
        assert_eq!(
            parse_args(&args(&["a.bbvm", "--threads", "many"])),
            Err("invalid thread count: many".to_string())
        );
    }

    #[test]
    fn analyze_and_help() {
        assert_eq!(
            parse_args(&args(&["analyze", "x.bbvm"])),
            Ok(Command::Analyze {
                path: PathBuf::from("x.bbvm")
            })
        );
        assert_eq!(parse_args(&[]), Ok(Command::Help));
        assert_eq!(parse_args(&args(&["--help"])), Ok(Command::Help));
    }

    #[test]
    fn missing_path() {
        assert_eq!(
            parse_args(&args(&["run"])),
            Err("missing file path".to_string())
        );
    }
}
