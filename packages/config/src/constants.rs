// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Setkeep

// Storage Configuration
pub const SETKEEP_DATABASE_PATH: &str = "SETKEEP_DATABASE_PATH";
pub const SETKEEP_DB_MAX_CONNECTIONS: &str = "SETKEEP_DB_MAX_CONNECTIONS";

// Cache Configuration
pub const SETKEEP_CACHE_CAPACITY: &str = "SETKEEP_CACHE_CAPACITY";

// File Upload Configuration
pub const SETKEEP_UPLOAD_DIR: &str = "SETKEEP_UPLOAD_DIR";
pub const SETKEEP_UPLOAD_URL_PREFIX: &str = "SETKEEP_UPLOAD_URL_PREFIX";

// System Environment Variables
pub const HOME: &str = "HOME";

// Defaults
pub const DEFAULT_DATABASE_FILE: &str = "settings.db";
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_UPLOAD_URL_PREFIX: &str = "/uploads/settings";
