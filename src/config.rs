use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// The default maximum size of a response head, matching the read buffer limit.
pub(crate) const DEFAULT_MAX_HEADER_SIZE: usize = 8192 + 4096 * 100;

/// Settings shared by the plain and upgraded read paths of a codec.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use h2c_stream::Config;
///
/// let mut config = Config::new();
/// config
///     .read_timeout(Some(Duration::from_secs(30)))
///     .write_timeout(None);
/// assert_eq!(config.get_read_timeout(), Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    max_header_size: usize,
}

impl Config {
    /// Creates a `Config` with 10 second read and write timeouts.
    pub fn new() -> Config {
        Config {
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: Some(DEFAULT_TIMEOUT),
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }

    /// Sets how long a read may wait for bytes to arrive.
    ///
    /// `None` waits forever. Default is 10 seconds.
    pub fn read_timeout(&mut self, timeout: Option<Duration>) -> &mut Config {
        self.read_timeout = timeout;
        self
    }

    /// Sets how long a write may wait for the peer to accept bytes.
    ///
    /// `None` waits forever. Default is 10 seconds.
    pub fn write_timeout(&mut self, timeout: Option<Duration>) -> &mut Config {
        self.write_timeout = timeout;
        self
    }

    /// Sets the largest HTTP/1.1 response head accepted before failing.
    ///
    /// # Panics
    ///
    /// The minimum value allowed is 8192. This method panics if the passed `max` is less than the minimum.
    pub fn max_header_size(&mut self, max: usize) -> &mut Config {
        assert!(
            max >= 8192,
            "the max_header_size cannot be smaller than the minimum that h2c-stream accepts"
        );
        self.max_header_size = max;
        self
    }

    /// Returns the configured read timeout.
    pub fn get_read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Returns the configured write timeout.
    pub fn get_write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    pub(crate) fn get_max_header_size(&self) -> usize {
        self.max_header_size
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}
