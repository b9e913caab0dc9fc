//! Default configuration values

/// Manifest file name
pub const MANIFEST_FILE: &str = "gantry.toml";

/// Default build output directory
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Directory under the output root for stamp files
pub const STAMPS_DIR: &str = "stamps";

/// Default stamp file name
pub const DEFAULT_STAMP_FILE: &str = "gantry.stamp";

/// Property key carrying a project's derived output directory
pub const BUILD_DIR_PROPERTY: &str = "build.dir";

/// Highest failed-task count representable in the process exit code
pub const MAX_FAILURE_EXIT_CODE: usize = 255;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
