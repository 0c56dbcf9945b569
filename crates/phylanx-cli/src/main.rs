use std::{env, fs, process::ExitCode, time::Instant};

use phylanx::{RunConfig, compile_and_run};

/// Runs when no file is named on the command line: a short fold over a list, just
/// enough to prove the pipeline end to end without shipping a separate demo asset.
const DEMO_SOURCE: &str = "fold_left(lambda(x, y, x + y), 0, list(1, 2, 3, 4))";
const DEMO_NAME: &str = "<demo>";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let (codename, source) = match args.get(1) {
        Some(file_path) => match read_file(file_path) {
            Ok(code) => (file_path.clone(), code),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            eprintln!("no file given, running the bundled demo");
            (DEMO_NAME.to_owned(), DEMO_SOURCE.to_owned())
        }
    };

    let start = Instant::now();
    match compile_and_run(&codename, &source, RunConfig::default()) {
        Ok(value) => {
            let elapsed = start.elapsed();
            eprintln!("success after: {elapsed:?}");
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => return Err(format!("error reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("error reading file: {err}"))
}
