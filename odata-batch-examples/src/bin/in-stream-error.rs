//! Example 4: In-stream error
//!
//! A response body fails halfway through serialization. The writer appends an
//! OData JSON error object to the body and refuses any further structure, so
//! the payload is flushed as is and the connection would be closed.
//!
//! Run with: cargo run --bin in-stream-error

use odata_batch::prelude::*;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut writer = BatchWriter::new(BatchWriterSettings::for_response(), std::io::stdout());

    writer.write_start_batch()?;
    writer.create_operation_response_message(None)?;
    let mut body = writer.operation_content_stream()?;
    body.write_all(br#"{"value":[{"ID":1},"#)?;
    body.write_in_stream_error(
        &InStreamError::new("500", "Failed to read entity 2").with_target("Customers"),
    )?;
    writer.flush()?;

    eprintln!();
    eprintln!("Final state: {}", writer.state());
    match writer.write_end_batch() {
        Ok(()) => eprintln!("unexpected: batch completed"),
        Err(e) => eprintln!("write_end_batch rejected ({}): {e}", e.kind()),
    }
    Ok(())
}
