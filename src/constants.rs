pub mod limits {
    /// Default cap on reported response body size, in bytes.
    pub const DEFAULT_RESPONSE_SIZE_BYTES: usize = 10_000;
    /// Default cap on a single uploaded file, in bytes (10 MiB).
    pub const DEFAULT_FILE_UPLOAD_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    /// Chunk size used when streaming file uploads off disk.
    pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;
}

pub mod env {
    pub const BASE_URL: &str = "REST_BASE_URL";
    pub const RESPONSE_SIZE_LIMIT: &str = "REST_RESPONSE_SIZE_LIMIT";
    pub const FILE_UPLOAD_SIZE_LIMIT: &str = "FILE_UPLOAD_SIZE_LIMIT";
    pub const SSL_VERIFY: &str = "REST_ENABLE_SSL_VERIFY";
    pub const BASIC_USERNAME: &str = "AUTH_BASIC_USERNAME";
    pub const BASIC_PASSWORD: &str = "AUTH_BASIC_PASSWORD";
    pub const BEARER_TOKEN: &str = "AUTH_BEARER";
    pub const APIKEY_HEADER_NAME: &str = "AUTH_APIKEY_HEADER_NAME";
    pub const APIKEY_HEADER_VALUE: &str = "AUTH_APIKEY_VALUE";
    /// Case-insensitive prefix marking custom default headers, e.g.
    /// `HEADER_X-Trace-Id=abc`.
    pub const CUSTOM_HEADER_PREFIX: &str = "header_";
}
