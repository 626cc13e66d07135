use anyhow::{Result, anyhow};
use base64ct::{Base64, Encoding};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{collections::HashMap, env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Parse `OTEL_EXPORTER_OTLP_HEADERS` style `key=value,key=value` pairs.
fn parse_headers_env(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

// Keys ending in "-bin" carry base64 encoded binary values.
fn headers_to_metadata(headers: &HashMap<String, String>) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();

        if name.ends_with("-bin") {
            let bytes = Base64::decode_vec(value.trim())
                .map_err(|e| anyhow!("failed to base64-decode value for key {name}: {e}"))?;
            let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("invalid binary metadata key {name}: {e}"))?;
            metadata.insert_bin(key, MetadataValue::from_bytes(&bytes));
        } else {
            let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("invalid ASCII metadata key {name}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid ASCII metadata value for key {name}: {e}"))?;
            metadata.insert(key, value);
        }
    }

    Ok(metadata)
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

/// Host part of an https endpoint, used as the TLS domain name.
fn tls_domain(endpoint: &str) -> Option<&str> {
    endpoint
        .strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .and_then(|authority| authority.split(':').next())
        .filter(|host| !host.is_empty())
}

fn init_tracer() -> Result<Tracer> {
    if let Ok(protocol) = var("OTEL_EXPORTER_OTLP_PROTOCOL")
        && protocol != "grpc"
    {
        debug!("OTEL_EXPORTER_OTLP_PROTOCOL='{protocol}' ignored: only 'grpc' is supported");
    }

    let endpoint = normalize_endpoint(
        &var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string()),
    );

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(Duration::from_secs(3));

    if let Some(domain) = tls_domain(&endpoint) {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    let headers = var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_headers_env(&raw))
        .unwrap_or_default();
    if !headers.is_empty() {
        builder = builder.with_metadata(headers_to_metadata(&headers)?);
    }

    let exporter = builder.build()?;

    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes(vec![
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", instance_id),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Initialize logging and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, the
/// OTLP gRPC span exporter.
///
/// # Errors
///
/// Returns an error if the tracer or the global subscriber cannot be installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    if var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let otel_layer = tracing_opentelemetry::layer().with_tracer(init_tracer()?);
        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(otel_layer)
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Flush and shut down the tracer provider, noop if tracing was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        if let Err(err) = provider.shutdown() {
            debug!("tracer provider shutdown failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_env_handles_pairs_and_noise() {
        assert!(parse_headers_env("").is_empty());

        let headers = parse_headers_env("api-key = abc , malformed,tenant=acme=1");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("api-key").map(String::as_str), Some("abc"));
        assert_eq!(headers.get("tenant").map(String::as_str), Some("acme=1"));
        assert!(!headers.contains_key("malformed"));
    }

    #[test]
    fn headers_to_metadata_accepts_ascii_and_binary() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer token123".to_string());
        headers.insert("trace-bin".to_string(), "YmluYXJ5IGRhdGE=".to_string());

        let metadata = headers_to_metadata(&headers);
        assert!(metadata.is_ok_and(|m| m.len() == 2));
    }

    #[test]
    fn headers_to_metadata_rejects_invalid_base64() {
        let mut headers = HashMap::new();
        headers.insert("trace-bin".to_string(), "not-valid-base64!!!".to_string());

        let err = headers_to_metadata(&headers).err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("failed to base64-decode")));
    }

    #[test]
    fn normalize_endpoint_defaults_to_https() {
        assert_eq!(
            normalize_endpoint("http://localhost:4317"),
            "http://localhost:4317"
        );
        assert_eq!(
            normalize_endpoint("https://otel.tld:4317/v1/traces"),
            "https://otel.tld:4317/v1/traces"
        );
        assert_eq!(normalize_endpoint("otel.tld:4317/"), "https://otel.tld:4317");
    }

    #[test]
    fn tls_domain_only_for_https() {
        assert_eq!(tls_domain("https://otel.tld:4317/v1"), Some("otel.tld"));
        assert_eq!(tls_domain("https://otel.tld"), Some("otel.tld"));
        assert_eq!(tls_domain("http://otel.tld:4317"), None);
    }

    #[test]
    fn shutdown_tracer_without_provider() {
        shutdown_tracer();
    }
}
