//! JSON output for the CLI
//!
//! - One JSON object per invocation on stdout
//! - Logs stay on stderr
//! - UTF-8 only

use std::io::{self, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_response_to(&mut stdout, data)
}

/// Write an error response to stdout
pub fn write_error(err: &CliError) -> CliResult<()> {
    let mut stdout = io::stdout();
    write_error_to(&mut stdout, err)
}

pub fn write_response_to<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(writer, &response)
}

pub fn write_error_to<W: Write>(writer: &mut W, err: &CliError) -> CliResult<()> {
    let mut response = serde_json::json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message()
    });
    if !err.details().is_null() {
        response["details"] = err.details().clone();
    }
    write_line(writer, &response)
}

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
