use crate::auth::SasKey;
use crate::utils::{EnvSource, EnvUtils, EnvVarError, ProcessEnv};

pub const DEFAULT_QUEUE_NAME: &str = "test_queue";
pub const DEFAULT_KEY_NAME: &str = "RootManageSharedAccessKey";
pub const DEFAULT_MAX_DELIVERY_COUNT: u32 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "debug";
pub const DEAD_LETTER_SUFFIX: &str = "/$DeadLetterQueue";

pub const ENV_NAMESPACE: &str = "SB_NAMESPACE";
pub const ENV_QUEUE_NAME: &str = "QUEUE_NAME";
pub const ENV_KEY_NAME: &str = "SAS_NAME";
pub const ENV_KEY_VALUE: &str = "SAS_VALUE";
pub const ENV_MAX_DELIVERY_COUNT: &str = "MAX_DELIVERY_COUNT";
/// Misspelled name accepted for deployments configured before it was corrected.
pub const ENV_MAX_DELIVERY_COUNT_LEGACY: &str = "MAX_DELIEVERY_COUNT";
pub const ENV_PROCESS_DLQ: &str = "PROCESS_DLQ";
pub const ENV_DELETE_MESSAGE: &str = "DELETE_MESSAGE";
pub const ENV_REQUEUE_MESSAGE: &str = "REQUEUE_MESSAGE";
pub const ENV_LOG_LEVEL: &str = "LOGLEVEL";
pub const ENV_LOG_FILE: &str = "LOG_FILE";
pub const ENV_ENDPOINT: &str = "SB_ENDPOINT";

/// Immutable worker configuration, read once at startup.
///
/// Nothing below the worker's `main` reads the environment; the engine and
/// transport receive this struct (or values derived from it) explicitly.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    namespace: String,
    queue_name: String,
    key_name: String,
    key: SasKey,
    max_delivery_count: u32,
    process_dead_letter_queue: bool,
    delete_message: bool,
    requeue_message: bool,
    log_level: String,
    log_file: Option<String>,
    endpoint: Option<String>,
}

impl WorkerConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError`] when `SB_NAMESPACE` or `SAS_VALUE` is missing or
    /// empty, or when `MAX_DELIVERY_COUNT` is not a number.
    pub fn from_env() -> Result<Self, EnvVarError> {
        Self::from_source(&ProcessEnv)
    }

    /// Loads configuration from any [`EnvSource`].
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, EnvVarError> {
        let namespace = EnvUtils::validated_from(source, ENV_NAMESPACE)?;
        let key = SasKey::new(EnvUtils::validated_from(source, ENV_KEY_VALUE)?);

        let max_delivery_count = match EnvUtils::u32_from(source, ENV_MAX_DELIVERY_COUNT)? {
            Some(count) => count,
            None => EnvUtils::u32_from(source, ENV_MAX_DELIVERY_COUNT_LEGACY)?
                .unwrap_or(DEFAULT_MAX_DELIVERY_COUNT),
        };

        Ok(Self {
            namespace,
            queue_name: EnvUtils::optional_from(source, ENV_QUEUE_NAME)
                .unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            key_name: EnvUtils::optional_from(source, ENV_KEY_NAME)
                .unwrap_or_else(|| DEFAULT_KEY_NAME.to_string()),
            key,
            max_delivery_count,
            process_dead_letter_queue: EnvUtils::flag_from(source, ENV_PROCESS_DLQ),
            delete_message: EnvUtils::flag_from(source, ENV_DELETE_MESSAGE),
            requeue_message: EnvUtils::flag_from(source, ENV_REQUEUE_MESSAGE),
            log_level: EnvUtils::optional_from(source, ENV_LOG_LEVEL)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file: EnvUtils::optional_from(source, ENV_LOG_FILE),
            endpoint: EnvUtils::optional_from(source, ENV_ENDPOINT),
        })
    }

    /// Builds a configuration directly, with every flag off and defaults elsewhere.
    pub fn new(namespace: impl Into<String>, queue_name: impl Into<String>, key: SasKey) -> Self {
        Self {
            namespace: namespace.into(),
            queue_name: queue_name.into(),
            key_name: DEFAULT_KEY_NAME.to_string(),
            key,
            max_delivery_count: DEFAULT_MAX_DELIVERY_COUNT,
            process_dead_letter_queue: false,
            delete_message: false,
            requeue_message: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
            endpoint: None,
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    pub fn with_max_delivery_count(mut self, max_delivery_count: u32) -> Self {
        self.max_delivery_count = max_delivery_count;
        self
    }

    pub fn with_dead_letter_queue(mut self, enabled: bool) -> Self {
        self.process_dead_letter_queue = enabled;
        self
    }

    pub fn with_delete_message(mut self, enabled: bool) -> Self {
        self.delete_message = enabled;
        self
    }

    pub fn with_requeue_message(mut self, enabled: bool) -> Self {
        self.requeue_message = enabled;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn key(&self) -> &SasKey {
        &self.key
    }

    pub fn max_delivery_count(&self) -> u32 {
        self.max_delivery_count
    }

    pub fn process_dead_letter_queue(&self) -> bool {
        self.process_dead_letter_queue
    }

    pub fn delete_message(&self) -> bool {
        self.delete_message
    }

    pub fn requeue_message(&self) -> bool {
        self.requeue_message
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_file(&self) -> Option<&str> {
        self.log_file.as_deref()
    }

    /// Path of the queue this run operates on, relative to the namespace.
    ///
    /// In dead-letter mode this is the queue's `$DeadLetterQueue` sub-queue.
    pub fn queue_path(&self) -> String {
        if self.process_dead_letter_queue {
            format!("{}{}", self.queue_name, DEAD_LETTER_SUFFIX)
        } else {
            self.queue_name.clone()
        }
    }

    /// Scheme and host of the namespace, honouring `SB_ENDPOINT` when set.
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.servicebus.windows.net", self.namespace),
        }
    }
}
