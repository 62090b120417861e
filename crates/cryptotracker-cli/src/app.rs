//! Command handlers for the cryptotracker CLI.
//!
//! `App` owns the identity service, biometric gate, price feed client and
//! market cache, and walks the user through sign-in and unlock the same way
//! the mobile screens do.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use cryptotracker_core::api::{ApiError, PriceFeedClient};
use cryptotracker_core::auth::{
    Account, Admission, AdmissionError, AdmissionState, BiometricAuthenticator, BiometricError,
    BiometricGate, BiometricToggleError, FederatedOutcome, GoogleUserInfoClient, IdentityService,
    MockBiometrics, UnsupportedBiometrics,
};
use cryptotracker_core::cache::{CacheManager, CachedData, Sourced};
use cryptotracker_core::config::Config;
use cryptotracker_core::models::{CoinMarket, PriceHistory};
use cryptotracker_core::utils::{filter_coins, format_change, format_compact, format_price, truncate};
use tracing::{debug, info, warn};

use crate::cli::{BiometricAction, BiometricMode};

// ============================================================================
// Constants
// ============================================================================

/// Failed biometric attempts before the main area stays locked for this run.
const MAX_CHALLENGE_ATTEMPTS: u32 = 3;

/// Width of the coin name column in listings.
const NAME_COLUMN_WIDTH: usize = 20;

/// Characters of the coin description shown on the detail view.
const DESCRIPTION_PREVIEW_LENGTH: usize = 280;

pub struct App {
    config: Config,
    identity: IdentityService,
    gate: BiometricGate,
    feed: PriceFeedClient,
    cache: Option<CacheManager>,
    currency: String,
}

impl App {
    pub fn new(biometrics: BiometricMode, currency: Option<String>) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(storage = ?config.storage, currency = %config.currency, "Config loaded");

        let store = config.open_store()?;
        let identity = IdentityService::new(store.clone());

        let authenticator: Arc<dyn BiometricAuthenticator> = match biometrics {
            BiometricMode::None => Arc::new(UnsupportedBiometrics),
            BiometricMode::MockPass => Arc::new(MockBiometrics::success()),
            BiometricMode::MockFail => Arc::new(MockBiometrics::failure()),
        };
        let gate = BiometricGate::new(store, authenticator);

        let feed = PriceFeedClient::new(config.resolved_api_key())?;

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        let cache = match CacheManager::new(cache_dir.join("markets")) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "Market cache unavailable");
                None
            }
        };

        let currency = currency
            .unwrap_or_else(|| config.currency.clone())
            .to_lowercase();

        Ok(Self {
            config,
            identity,
            gate,
            feed,
            cache,
            currency,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn register(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(e) => e,
            None => prompt_line("Email: ")?,
        };
        let password = prompt_password("Password: ")?;
        let confirmation = prompt_password("Confirm password: ")?;

        let account = self
            .identity
            .register_with_confirmation(&email, &password, &confirmation)?;
        println!("Account created for {}", account.email);

        self.remember_email(&account);
        self.admit_new_session()
    }

    pub fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(e) => e,
            None => prompt_line_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = prompt_password("Password: ")?;

        let account = self.identity.login(&email, &password)?;
        println!("Signed in as {}", account.email);

        self.remember_email(&account);
        self.admit_new_session()
    }

    pub async fn google_sign_in(&mut self, token: &str) -> Result<()> {
        let client = GoogleUserInfoClient::new()?;
        let identity = client.fetch_identity(token).await?;
        let Some(account) = self
            .identity
            .complete_federated_sign_in(FederatedOutcome::Completed(identity))?
        else {
            return Ok(());
        };
        println!("Signed in as {} ({})", account.email, account.provider);

        self.remember_email(&account);
        self.admit_new_session()
    }

    pub fn logout(&mut self, forget_biometrics: bool) -> Result<()> {
        if !self.identity.is_logged_in() {
            println!("Not signed in.");
            return Ok(());
        }
        self.identity.logout()?;
        if forget_biometrics {
            self.gate.clear_preference()?;
        }
        println!("Signed out.");
        Ok(())
    }

    pub fn whoami(&self) {
        match self.identity.current_session() {
            Some(account) => {
                println!("Email:    {}", account.email);
                println!("Provider: {}", account.provider);
                if let Some(created_at) = account.created_at {
                    println!("Since:    {}", created_at.format("%b %d, %Y"));
                }
            }
            None => println!("Not signed in."),
        }
    }

    fn remember_email(&mut self, account: &Account) {
        self.config.last_email = Some(account.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Biometric Unlock
    // =========================================================================

    pub fn biometric(&self, action: BiometricAction) -> Result<()> {
        match action {
            BiometricAction::Status => {
                println!("Device support: {}", if self.gate.is_supported() { "yes" } else { "no" });
                println!("Unlock:         {}", self.gate.preference());
            }
            BiometricAction::Enable => match self.gate.enable() {
                Ok(()) => println!("Biometric unlock enabled."),
                Err(BiometricToggleError::Unsupported(e)) => println!("{}", e),
                Err(BiometricToggleError::Storage(e)) => return Err(e),
            },
            BiometricAction::Disable => {
                self.gate.disable()?;
                println!("Biometric unlock disabled.");
            }
        }
        Ok(())
    }

    /// Unlock step right after a successful sign-in.
    fn admit_new_session(&self) -> Result<()> {
        let mut admission = Admission::new();
        admission.authenticated()?;
        if self.run_admission(&mut admission)? {
            println!("Unlocked.");
        }
        Ok(())
    }

    /// Gate for commands that show the main area.
    fn ensure_admitted(&self) -> Result<()> {
        if !self.identity.is_logged_in() {
            bail!("Not signed in. Run `cryptotracker login` first.");
        }
        let mut admission = Admission::resume(true);
        if !self.run_admission(&mut admission)? {
            bail!("Locked. Biometric unlock is required.");
        }
        Ok(())
    }

    /// Drive the admission state machine interactively. Returns whether the
    /// main area was reached; the session is kept either way.
    fn run_admission(&self, admission: &mut Admission) -> Result<bool> {
        let mut attempts = 0;
        loop {
            match admission.state() {
                AdmissionState::Unauthenticated => return Ok(false),
                AdmissionState::Admitted => {
                    info!("Main area unlocked");
                    return Ok(true);
                }
                AdmissionState::PendingBiometricDecision => {
                    admission.decide(&self.gate)?;
                }
                AdmissionState::BiometricPrompt => {
                    if prompt_yes_no("Use biometrics to unlock next time?", false)? {
                        admission.accept_prompt(&self.gate)?;
                    } else {
                        admission.decline_prompt(&self.gate)?;
                    }
                }
                AdmissionState::BiometricChallenge => {
                    attempts += 1;
                    match admission.challenge(&self.gate) {
                        Ok(_) => {}
                        Err(AdmissionError::Biometric(BiometricError::ChallengeFailed)) => {
                            println!("Biometric check failed.");
                            if attempts >= MAX_CHALLENGE_ATTEMPTS || !prompt_yes_no("Try again?", true)? {
                                return Ok(false);
                            }
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }
    }

    // =========================================================================
    // Market Data
    // =========================================================================

    pub async fn coins(&self, filter: Option<&str>, limit: usize, refresh: bool) -> Result<()> {
        self.ensure_admitted()?;

        let coins = self.load_markets(refresh).await?;
        let shown = filter_coins(&coins, filter.unwrap_or(""));
        if shown.is_empty() {
            println!("No coins found.");
            return Ok(());
        }

        for coin in shown.into_iter().take(limit) {
            println!(
                "{:>4}  {:<width$}  {:<6}  {:>16}  {:>10}",
                coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_default(),
                truncate(&coin.name, NAME_COLUMN_WIDTH),
                coin.symbol_display(),
                format_price(coin.current_price, &self.currency),
                format_change(coin.price_change_percentage_24h),
                width = NAME_COLUMN_WIDTH,
            );
        }
        Ok(())
    }

    /// Fresh cache, then API, then stale cache.
    async fn load_markets(&self, refresh: bool) -> Result<Vec<CoinMarket>> {
        let cached = self.cached_markets();
        if let Some(ref cached) = cached {
            if !refresh && !cached.is_stale() {
                debug!(age = %cached.age_display(), "Serving markets from cache");
                return Ok(cached.data.clone());
            }
        }

        match self.feed.fetch_coins(&self.currency).await {
            Ok(coins) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_markets(&self.currency, &coins) {
                        warn!(error = %e, "Failed to cache markets");
                    }
                }
                Ok(coins)
            }
            Err(e) => match cached {
                Some(cached) => {
                    eprintln!("{} Showing prices from {}.", describe_api_error(&e), cached.age_display());
                    Ok(cached.data)
                }
                None => Err(api_failure(e)),
            },
        }
    }

    fn cached_markets(&self) -> Option<CachedData<Vec<CoinMarket>>> {
        let cache = self.cache.as_ref()?;
        match cache.load_markets(&self.currency) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Failed to load cached markets");
                None
            }
        }
    }

    pub async fn coin(&self, id: &str, days: u32) -> Result<()> {
        self.ensure_admitted()?;

        let (fetched, history) = match futures::try_join!(
            self.feed.fetch_coin_details(id),
            self.feed.fetch_coin_history(id, &self.currency, days),
        ) {
            Ok((details, history)) => (Ok(details), history),
            Err(e) => (Err(e), PriceHistory::default()),
        };

        let sourced = match self.cache {
            Some(ref cache) => cache.coin_details_or_cached(id, fetched),
            None => fetched.map(Sourced::Live),
        }
        .map_err(api_failure)?;
        if let Sourced::Cached { ref cached, ref error } = sourced {
            eprintln!("{} Showing details from {}.", describe_api_error(error), cached.age_display());
        }
        let details = sourced.data();

        println!("{} ({})", details.name, details.symbol.to_uppercase());
        println!("Price:      {}", format_price(details.price_in(&self.currency), &self.currency));
        if let Some(ref market) = details.market_data {
            let currency = self.currency.as_str();
            println!("Market cap: {}", format_compact(market.market_cap.get(currency).copied()));
            println!("24h high:   {}", format_price(market.high_24h.get(currency).copied(), currency));
            println!("24h low:    {}", format_price(market.low_24h.get(currency).copied(), currency));
            println!("24h change: {}", format_change(market.price_change_percentage_24h));
        }
        if let Some((low, high)) = history.range() {
            println!(
                "{}d range:  {} - {} ({})",
                days,
                format_price(Some(low), &self.currency),
                format_price(Some(high), &self.currency),
                format_change(history.change_percent()),
            );
        }
        if let Some(description) = details.description_en() {
            println!("\n{}", truncate(description, DESCRIPTION_PREVIEW_LENGTH));
        }
        Ok(())
    }

    pub async fn search(&self, query: &str) -> Result<()> {
        self.ensure_admitted()?;

        let results = self.feed.search_coins(query).await.map_err(api_failure)?;
        if results.coins.is_empty() {
            println!("No coins found.");
            return Ok(());
        }
        for coin in &results.coins {
            println!(
                "{:>4}  {:<width$}  {:<6}  {}",
                coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_default(),
                truncate(&coin.name, NAME_COLUMN_WIDTH),
                coin.symbol.to_uppercase(),
                coin.id,
                width = NAME_COLUMN_WIDTH,
            );
        }
        Ok(())
    }
}

fn describe_api_error(e: &ApiError) -> String {
    match e {
        ApiError::RateLimited => "Rate limit exceeded.".to_string(),
        ApiError::NetworkError(_) => "Unable to reach the price feed.".to_string(),
        other => format!("Price feed error: {}.", other),
    }
}

fn api_failure(e: ApiError) -> anyhow::Error {
    if e.is_retryable() {
        anyhow::anyhow!("{} Please try again later.", describe_api_error(&e))
    } else {
        e.into()
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_line_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => {
            let input = prompt_line(&format!("{} [{}]: ", label, d))?;
            Ok(if input.is_empty() { d.to_string() } else { input })
        }
        None => prompt_line(&format!("{}: ", label)),
    }
}

fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}

fn prompt_yes_no(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let input = prompt_line(&format!("{} {} ", question, hint))?.to_lowercase();
    Ok(match input.as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    })
}
