//! Process-wide application context
//!
//! Built once at startup and shared by reference with every tool. Nothing in
//! here is rebuilt mid-request.
//!
//! The signing key is used by one trade at a time. Callers must serialise
//! trade requests; the stdio server does so by handling requests in order.

use crate::audit::AuditLog;
use crate::chains::{ChainDescriptor, ChainRegistry};
use crate::config::{Config, ContractsConfig, RpcConfig, PRIVATE_KEY_ENV};
use crate::pricing::{IndexApiClient, Slippage};
use crate::rpc::{ChainClient, ChainClients};
use crate::validator::TradeValidator;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use std::sync::Arc;

pub struct AppContext {
    pub config: Config,
    pub registry: ChainRegistry,
    pub clients: ChainClients,
    pub pricing: IndexApiClient,
    pub audit: Option<AuditLog>,
    pub validator: TradeValidator,
    wallet: Option<SecureWallet>,
}

impl AppContext {
    /// Assemble a context from already-built parts
    pub fn new(
        config: Config,
        registry: ChainRegistry,
        clients: ChainClients,
        wallet: Option<SecureWallet>,
    ) -> Result<Self> {
        let pricing = IndexApiClient::new(&config.pricing_api.base_url, config.timeouts.http_timeout())?;
        let validator = TradeValidator::from_config(&config.risk)?;
        let audit = config.audit_log_path.as_deref().map(AuditLog::new);
        Ok(Self {
            config,
            registry,
            clients,
            pricing,
            audit,
            validator,
            wallet,
        })
    }

    /// Resolve endpoints, contracts and the signing key from the environment
    pub fn from_env(config: Config) -> Result<Self> {
        let registry = ChainRegistry::from_config(&RpcConfig::from_env(), &ContractsConfig::from_env());
        let clients = ChainClients::connect(&registry);

        let wallet = if std::env::var_os(PRIVATE_KEY_ENV).is_some() {
            let wallet = SecureWallet::from_env(PRIVATE_KEY_ENV)?;
            tracing::info!(address = %wallet.address(), "Loaded wallet from {}", PRIVATE_KEY_ENV);
            Some(wallet)
        } else {
            tracing::warn!("No {} set - running in read-only mode", PRIVATE_KEY_ENV);
            None
        };

        tracing::info!(
            chains = registry.all().len(),
            connected = Self::connected_count(&registry, &clients),
            "Application context ready"
        );
        Self::new(config, registry, clients, wallet)
    }

    fn connected_count(registry: &ChainRegistry, clients: &ChainClients) -> usize {
        registry.all().iter().filter(|d| clients.contains(d.chain)).count()
    }

    pub fn wallet(&self) -> Option<&SecureWallet> {
        self.wallet.as_ref()
    }

    /// The signing wallet; its absence is a configuration error for write paths
    pub fn require_wallet(&self) -> Result<&SecureWallet> {
        self.wallet.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "No wallet configured. Set {} to enable trading.",
                PRIVATE_KEY_ENV
            ))
        })
    }

    /// Validate a chain identifier from a request. Issues no network call.
    pub fn chain(&self, chain_id: &str) -> Result<&ChainDescriptor> {
        self.registry.resolve(chain_id)
    }

    pub fn client(&self, descriptor: &ChainDescriptor) -> Result<Arc<dyn ChainClient>> {
        self.clients
            .get(descriptor.chain)
            .ok_or_else(|| Error::not_configured(descriptor.name, "RPC client"))
    }

    /// Requested slippage, or the configured default
    pub fn slippage(&self, requested: Option<f64>) -> Result<Slippage> {
        Slippage::from_percent(requested.unwrap_or(self.config.risk.default_slippage_percent))
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("chains", &self.registry.all().len())
            .field("clients", &self.clients)
            .field("wallet", &self.wallet)
            .finish()
    }
}
