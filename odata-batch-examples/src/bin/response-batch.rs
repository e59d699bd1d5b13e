//! Example 2: Response batch
//!
//! Writes the batch response a service would return for the request of
//! example 1.
//!
//! Run with: cargo run --bin response-batch

use odata_batch::http::{HeaderValue, StatusCode, header};
use odata_batch::prelude::*;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut writer = BatchWriter::new(BatchWriterSettings::for_response(), std::io::stdout());
    eprintln!("Content-Type: {}", writer.batch_content_type());

    writer.write_start_batch()?;
    let query = writer.create_operation_response_message(None)?;
    query
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    {
        let mut body = writer.operation_content_stream()?;
        body.write_all(br#"{"value":[]}"#)?;
    }

    writer.write_start_changeset()?;
    for (content_id, location) in [
        ("1", "http://localhost:8080/service/Customers(1)"),
        ("2", "http://localhost:8080/service/Orders(7)"),
    ] {
        let response = writer.create_operation_response_message(Some(content_id))?;
        response.set_status(StatusCode::CREATED);
        response
            .headers_mut()
            .insert(header::LOCATION, HeaderValue::from_static(location));
    }
    writer.write_end_changeset()?;
    writer.write_end_batch()?;

    eprintln!();
    eprintln!("Final state: {}", writer.state());
    Ok(())
}
