use std::env;

use crate::types::Pipeline;

fn variable_name(arg: &str) -> Option<&str> {
	if let Some(inner) = arg.strip_prefix("${") {
		inner.strip_suffix('}')
	} else {
		arg.strip_prefix('$')
	}
}

/// Replaces `$NAME` and `${NAME}` arguments with the variable's value.
/// Unset variables leave the argument untouched.
pub fn substitute_with<F>(pipeline: &mut Pipeline, lookup: F) where F: Fn(&str) -> Option<String> {
	for stage in &mut pipeline.stages {
		for arg in &mut stage.arguments {
			let value = match variable_name(arg) {
				Some(name) if !name.is_empty() => lookup(name),
				_ => None,
			};
			if let Some(value) = value {
				*arg = value;
			}
		}
	}
}

pub fn substitute(pipeline: &mut Pipeline) {
	substitute_with(pipeline, |name| env::var(name).ok())
}
