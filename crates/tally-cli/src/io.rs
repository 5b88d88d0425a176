use std::io::{BufRead, Write};

use crate::error::CliError;

/// Parses N, which must be at least 1.
pub fn parse_n(input: &str) -> Result<u64, CliError> {
    let trimmed = input.trim();
    match trimmed.parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CliError::InvalidNumber {
            input: trimmed.to_string(),
        }),
    }
}

/// Asks for N on `output` and reads one line from `input`.
pub fn prompt_for_n<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u64, CliError> {
    write!(output, "N: ").map_err(CliError::Stdin)?;
    output.flush().map_err(CliError::Stdin)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(CliError::Stdin)?;
    parse_n(&line)
}
