//! Example 1: Request batch
//!
//! Writes a batch request to stdout:
//! - a top-level query operation
//! - a changeset creating a customer and an order that references it by
//!   Content-ID
//!
//! Quotas are loaded from JSON to show the config format.
//!
//! Run with: RUST_LOG=odata_batch=debug cargo run --bin request-batch

use odata_batch::http::{HeaderValue, header};
use odata_batch::prelude::*;
use odata_batch::url::Url;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let quotas: MessageQuotas =
        serde_json::from_str(r#"{"max_parts_per_batch": 10, "max_operations_per_changeset": 5}"#)?;
    let settings = BatchWriterSettings::new()
        .base_uri(Url::parse("http://localhost:8080/service")?)
        .quotas(quotas);

    let mut writer = BatchWriter::new(settings, std::io::stdout());
    eprintln!("Content-Type: {}", writer.batch_content_type());

    writer.write_start_batch()?;
    writer.create_operation_request_message(
        "GET",
        "Customers?$top=5",
        None,
        BatchPayloadUriOption::AbsoluteUriUsingHostHeader,
    )?;

    writer.write_start_changeset()?;
    let customer = writer.create_operation_request_message(
        "POST",
        "Customers",
        Some("1"),
        BatchPayloadUriOption::AbsoluteUri,
    )?;
    customer
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    {
        let mut body = writer.operation_content_stream()?;
        body.write_all(br#"{"Name":"Contoso"}"#)?;
    }

    let order = writer.create_operation_request_message(
        "POST",
        "$1/Orders",
        Some("2"),
        BatchPayloadUriOption::AbsoluteUri,
    )?;
    order
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    {
        let mut body = writer.operation_content_stream()?;
        body.write_all(br#"{"Total":42}"#)?;
    }
    writer.write_end_changeset()?;
    writer.write_end_batch()?;

    eprintln!();
    eprintln!("Final state: {}", writer.state());
    Ok(())
}
