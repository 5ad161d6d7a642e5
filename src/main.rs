//! The shell: REPL, tokenizing, and printing. Deliberately thin — every
//! command's behaviour lives in `ops::dispatch`.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use vfatfs::ops::{self, Outcome};
use vfatfs::Engine;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "vfatfs".to_string());
    let Some(image_path) = args.next() else {
        eprintln!("usage: {program} <image-file>");
        return ExitCode::FAILURE;
    };

    let mut engine = match Engine::open(&PathBuf::from(image_path)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("fs: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} $ ", engine.pwd());
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }

        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let Some((cmd_name, args)) = tokens.split_first() else {
            continue;
        };

        match ops::parse(cmd_name, args) {
            None => println!("fs: Unknown command: {cmd_name}"),
            Some(Err(e)) => println!("fs: {e}"),
            Some(Ok(cmd)) => match ops::dispatch(&mut engine, cmd) {
                Ok(Outcome::Ok) => println!("OK"),
                Ok(Outcome::Text(text)) => println!("{text}"),
                Ok(Outcome::Raw(bytes)) => {
                    let _ = stdout.write_all(&bytes);
                }
                Ok(Outcome::Exit) => break,
                Err(e) => println!("fs: {e}"),
            },
        }
    }

    ExitCode::SUCCESS
}
