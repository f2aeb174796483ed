//! System-wide constants and provider defaults.

/// Smallest memory size, in MB, the provider accepts for a function.
pub const MIN_MEMORY_MB: u32 = 128;

/// Largest memory size, in MB, the provider accepts for a function.
pub const MAX_MEMORY_MB: u32 = 10_240;

/// Memory size used when a function does not specify one.
pub const DEFAULT_MEMORY_MB: u32 = 128;

/// Minimal action set needed to read a secret at runtime.
pub const DEFAULT_READ_ACTIONS: [&str; 2] = [
    "secretsmanager:GetSecretValue",
    "secretsmanager:DescribeSecret",
];

/// Action a function URL's resource policy allows.
pub const INVOKE_URL_ACTION: &str = "lambda:InvokeFunctionUrl";

/// Condition key scoping the invoke permission to one auth mode.
pub const URL_AUTH_CONDITION_KEY: &str = "lambda:FunctionUrlAuthType";

/// Prefix every stable secret identifier must carry.
pub const ARN_PREFIX: &str = "arn:";

/// Service segment of a secrets-manager ARN.
pub const SECRETS_SERVICE: &str = "secretsmanager";

/// Environment variable names the provider reserves.
pub const RESERVED_ENV_KEYS: [&str; 7] = [
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_EXECUTION_ENV",
    "_HANDLER",
];

/// Environment variable prefixes the provider reserves.
pub const RESERVED_ENV_PREFIXES: [&str; 2] = ["AWS_LAMBDA_", "LAMBDA_"];

/// Default region for generated outputs.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Placeholder account used when none is configured.
pub const DEFAULT_ACCOUNT: &str = "000000000000";

/// Default directory synthesized templates are written to.
pub const DEFAULT_OUT_DIR: &str = "hookstack.out";

/// Default stack manifest file name.
pub const DEFAULT_MANIFEST: &str = "hookstack.yaml";

/// Suffix of synthesized template files.
pub const TEMPLATE_SUFFIX: &str = ".template.json";

/// Application name used in CLI output.
pub const APP_NAME: &str = "hookstack";
