use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "cryptotracker", version, about = "Track cryptocurrency prices from the terminal")]
pub struct Cli {
    /// Biometric device to use for unlock
    #[arg(long, value_enum, default_value_t = BiometricMode::None, global = true)]
    pub biometrics: BiometricMode,

    /// Price currency (defaults to the configured one)
    #[arg(long, global = true)]
    pub currency: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BiometricMode {
    /// No biometric hardware
    None,
    /// Simulated device that always recognizes the user
    MockPass,
    /// Simulated device that never recognizes the user
    MockFail,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a local account and sign in
    Register {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign in with a Google access token
    GoogleSignIn {
        #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Sign out
    Logout {
        /// Also forget the biometric unlock choice
        #[arg(long)]
        forget_biometrics: bool,
    },
    /// Show the signed-in account
    Whoami,
    /// Biometric unlock settings
    Biometric {
        #[command(subcommand)]
        action: BiometricAction,
    },
    /// List coin prices
    Coins {
        /// Only coins whose name contains this text
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Skip the cache and always hit the API
        #[arg(long)]
        refresh: bool,
    },
    /// Show one coin
    Coin {
        id: String,
        /// Days of price history
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Search coins by name or symbol
    Search { query: String },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum BiometricAction {
    Status,
    Enable,
    Disable,
}
