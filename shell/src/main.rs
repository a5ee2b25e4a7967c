mod builtin;
mod config;
mod error;
mod eval;
mod expand;
mod global;
mod history;
mod job;
mod parser;
mod redirect;
mod search;
mod topology;
mod types;

use std::env;
use std::io;
use std::process;
use io::Write;
use io::BufRead;

use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn init_logging() {
	let filter = EnvFilter::try_from_env(config::LOG_KEY)
		.unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.init();
}

fn prompt(state: &global::State, stdout: &mut io::Stdout) {
	let cwd = env::current_dir().map(|d| d.display().to_string()).unwrap_or_default();
	let _ = write!(stdout, "{}{}", cwd, state.config.prompt_marker);
	let _ = stdout.flush();
}

fn main() {
	init_logging();

	let mut state = match global::State::new(config::Config::from_env()) {
		Ok(s) => s,
		Err(e) => {
			eprintln!("ish: {}", e);
			process::exit(1);
		},
	};

	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	let mut exit_code = 0;
	loop {
		prompt(&state, &mut stdout);
		let mut line: Vec<u8> = vec![];
		match stdin_locked.read_until(b'\n', &mut line) {
			Ok(0) => { break; },
			Ok(_) => {},
			Err(e) => {
				error!("reading input: {}", e);
				exit_code = 1;
				break;
			},
		}
		let line = String::from_utf8_lossy(&line);

		match eval::eval(&mut state, &line) {
			Ok(eval::EvalResult::Exit) => { break; },
			Ok(eval::EvalResult::Done(status)) => {
				debug!(?status, "command finished");
			},
			// shell streams are restored by now, so the notice cannot land in a redirect target
			Ok(eval::EvalResult::Background(pid)) => {
				let _ = writeln!(stdout, "[{}]", pid);
			},
			Ok(_) => {},
			Err(e) => {
				eprintln!("ish: {}", e);
				if e.is_fatal() {
					exit_code = 1;
					break;
				}
			},
		}
	}
	process::exit(exit_code);
}
