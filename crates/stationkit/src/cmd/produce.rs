use serde::Serialize;
use stationkit_client::{Client, ClientConfig};
use stationkit_transport::Headers;
use tracing::warn;

use crate::cmd::{parse_duration, ProduceArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{payload_preview, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct ProduceReport {
    station: String,
    producer: String,
    schema: Option<String>,
    payload_size: usize,
    payload: String,
}

impl Report for ProduceReport {
    fn columns(&self) -> &'static [&'static str] {
        &["STATION", "PRODUCER", "SCHEMA", "SIZE", "PAYLOAD"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.station.clone(),
            self.producer.clone(),
            self.schema.clone().unwrap_or_else(|| "-".to_string()),
            self.payload_size.to_string(),
            self.payload.clone(),
        ]
    }
}

pub fn run(args: ProduceArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = args.payload.resolve()?;
    let config = ClientConfig {
        username: args.username.clone(),
        request_timeout: timeout,
        ..ClientConfig::default()
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let report = runtime.block_on(async {
        let client = Client::connect(&args.url, config)
            .await
            .map_err(|err| client_error("connect failed", err))?;
        let producer = client
            .create_producer(&args.station, &args.producer)
            .await
            .map_err(|err| client_error("producer creation failed", err))?;

        let produced = producer.produce(payload.clone(), Headers::new()).await;
        let schema = client.schema(&args.station).map(|d| d.schema_name.clone());

        // release the producer even when the message was rejected
        if let Err(err) = producer.destroy().await {
            warn!(error = %err, "producer destruction failed");
        }
        client.close().await;

        produced.map_err(|err| client_error("produce failed", err))?;
        Ok::<_, CliError>(ProduceReport {
            station: args.station.clone(),
            producer: args.producer.clone(),
            schema,
            payload_size: payload.len(),
            payload: payload_preview(&payload),
        })
    })?;

    print_report(&report, format);
    Ok(SUCCESS)
}
