use std::str::SplitWhitespace;

use crate::error::{ShellError, ShellResult};
use crate::types::*;

const PIPE: &str = "|";
const REDIRECT_IN: &str = "<";
const REDIRECT_OUT: &str = ">";
const BACKGROUND: char = '&';

struct Parser<'a> {
	tokens: SplitWhitespace<'a>,
}

impl<'a> Parser<'a> {
	fn is_structural(token: &str) -> bool {
		matches!(token, PIPE | REDIRECT_IN | REDIRECT_OUT)
	}

	fn read_redirect_target(&mut self, op: &'static str) -> ShellResult<&'a str> {
		match self.tokens.next() {
			Some(t) if !Parser::is_structural(t) => Ok(t),
			_ => Err(ShellError::MissingRedirectTarget(op)),
		}
	}

	fn finish_stage(stage: Stage, stages: &mut Vec<Stage>) -> ShellResult<()> {
		if stage.program.is_empty() {
			return Err(ShellError::MalformedPipeline);
		}
		stages.push(stage);
		Ok(())
	}

	fn parse_pipeline(&mut self) -> ShellResult<Pipeline> {
		let mut stages: Vec<Stage> = vec![];
		let mut stage = Stage::default();
		let mut seen_token = false;

		while let Some(token) = self.tokens.next() {
			seen_token = true;
			match token {
				PIPE => Parser::finish_stage(std::mem::take(&mut stage), &mut stages)?,
				REDIRECT_OUT => {
					let target = self.read_redirect_target(REDIRECT_OUT)?;
					stage.output = Some(Redirect::output(target));
				},
				REDIRECT_IN => {
					let target = self.read_redirect_target(REDIRECT_IN)?;
					stage.input = Some(Redirect::input(target));
				},
				word if stage.program.is_empty() => stage.program = word.to_owned(),
				word => stage.arguments.push(word.to_owned()),
			}
		}
		if seen_token {
			Parser::finish_stage(stage, &mut stages)?;
		}

		let mut pipeline = Pipeline { stages: stages };
		mark_background(&mut pipeline);
		Ok(pipeline)
	}
}

/// Strips a trailing `&` (whole argument or suffix) from the last stage's
/// final argument and flags that stage as background.
fn mark_background(pipeline: &mut Pipeline) {
	let last = match pipeline.stages.last_mut() {
		Some(s) => s,
		None => { return; },
	};
	let is_background = last.arguments.last().map_or(false, |a| a.ends_with(BACKGROUND));
	if !is_background {
		return;
	}
	if last.arguments.last().map(String::as_str) == Some("&") {
		last.arguments.pop();
	} else if let Some(arg) = last.arguments.last_mut() {
		arg.pop();
	}
	last.is_background = true;
}

pub fn parse(line: &str) -> ShellResult<Pipeline> {
	let mut parser = Parser { tokens: line.split_whitespace() };
	parser.parse_pipeline()
}
