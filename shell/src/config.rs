use std::env;
use std::path::PathBuf;

const HISTFILE_KEY: &str = "ISH_HISTFILE";
const HISTORY_KEEP_KEY: &str = "ISH_HISTORY_KEEP";
const PROMPT_KEY: &str = "ISH_PROMPT";
pub const LOG_KEY: &str = "ISH_LOG";

const DEFAULT_HISTFILE: &str = "history.txt";
const DEFAULT_PROMPT: &str = "~$ ";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub history_path: PathBuf,
	pub truncate_history: bool,
	pub prompt_marker: String,
}

impl Config {
	pub fn from_env() -> Config {
		Config::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F>(lookup: F) -> Config where F: Fn(&str) -> Option<String> {
		let history_path = PathBuf::from(lookup(HISTFILE_KEY).unwrap_or_else(|| DEFAULT_HISTFILE.to_owned()));
		// pin the file to the startup directory so `cd` does not move it
		let history_path = if history_path.is_relative() {
			env::current_dir().map(|d| d.join(&history_path)).unwrap_or(history_path)
		} else {
			history_path
		};
		Config {
			history_path: history_path,
			truncate_history: lookup(HISTORY_KEEP_KEY).as_deref() != Some("1"),
			prompt_marker: lookup(PROMPT_KEY).unwrap_or_else(|| DEFAULT_PROMPT.to_owned()),
		}
	}
}
