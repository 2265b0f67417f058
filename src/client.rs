use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;

use crate::reader::StreamReader;
use crate::transport::{Credentials, Transport};
use crate::writer::StreamWriter;

const DEFAULT_BASE_URL: &str = "http://localhost:2113";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings shared by every reader and writer of a client.
///
/// The base URL is informational for the engine; it is read by transports
/// that need it. The timeout becomes the deadline of each request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The address of the event store.
    pub base_url: String,
    /// How long a single request may take; `None` waits indefinitely.
    #[serde(with = "duration_secs")]
    pub timeout: Option<Duration>,
    /// The credentials requests are made with.
    pub credentials: Option<Credentials>,
}

/// A handle to an event store, from which stream readers and writers are
/// created.
///
/// The client owns the transport (shared with its readers and writers) and
/// the current credentials. Readers and writers take a copy of the
/// credentials when they are created; changing the credentials afterwards
/// only applies to readers and writers created later.
pub struct Client<T> {
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    /// Create a client with the default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a client with the given configuration.
    #[instrument(skip_all, level = "debug", fields(base_url = %config.base_url))]
    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
        }
    }

    /// Use basic credentials for readers and writers created from now on.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.config.credentials = Some(Credentials::new(username, password));
    }

    /// Make requests from readers and writers created from now on without
    /// credentials.
    pub fn clear_credentials(&mut self) {
        self.config.credentials = None;
    }

    /// Create a reader for a stream, starting at version 0.
    ///
    /// No request is made until the reader is advanced.
    pub fn new_stream_reader(&self, stream: impl Into<String>) -> StreamReader<T> {
        StreamReader::new(
            self.transport.clone(),
            stream.into(),
            self.config.credentials.clone(),
            self.config.timeout,
        )
    }

    /// Create a writer for a stream.
    ///
    /// No request is made until a batch is appended.
    pub fn new_stream_writer(&self, stream: impl Into<String>) -> StreamWriter<T> {
        StreamWriter::new(
            self.transport.clone(),
            stream.into(),
            self.config.credentials.clone(),
            self.config.timeout,
        )
    }

    /// The current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport shared by all readers and writers of this client.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl ClientConfig {
    /// Set the address of the event store.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set (or disable, with `None`) the request timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the credentials requests are made with.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Some(DEFAULT_TIMEOUT),
            credentials: None,
        }
    }
}

// Timeouts are configured as a whole number of seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
