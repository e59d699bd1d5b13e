//! Example 3: Async request batch
//!
//! Same payload shape as example 1, written through the `_async` entry points
//! to a `tokio::io::Stdout`. Calling a synchronous method on this writer fails
//! with a calling-convention error, which the example demonstrates before
//! writing anything.
//!
//! Run with: RUST_LOG=odata_batch=debug cargo run --bin async-request-batch

use odata_batch::prelude::*;
use odata_batch::url::Url;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = BatchWriterSettings::new()
        .base_uri(Url::parse("http://localhost:8080/service/")?)
        .batch_boundary("batch_example");
    let mut writer = BatchWriter::new_async(settings, tokio::io::stdout());

    if let Err(e) = writer.write_start_batch() {
        eprintln!("Rejected synchronous call ({}): {e}", e.kind());
    }

    writer.write_start_batch_async().await?;
    writer
        .create_operation_request_message_async(
            "GET",
            "Products",
            None,
            BatchPayloadUriOption::RelativeUri,
        )
        .await?;

    writer.write_start_changeset_async().await?;
    writer
        .create_operation_request_message_async(
            "PATCH",
            "Products(1)",
            Some("1"),
            BatchPayloadUriOption::AbsoluteUri,
        )
        .await?;
    {
        let mut body = writer.operation_content_stream()?;
        body.write_all(br#"{"Price":9.99}"#).await?;
    }
    writer
        .create_operation_request_message_async(
            "DELETE",
            "Products(2)",
            Some("2"),
            BatchPayloadUriOption::AbsoluteUri,
        )
        .await?;
    writer.write_end_changeset_async().await?;
    writer.write_end_batch_async().await?;

    eprintln!();
    eprintln!("Final state: {}", writer.state());
    Ok(())
}
