// Application state management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::engine::Round;
use crate::ledger::CashLedger;
use crate::randomness::{ExternalOracle, FixedDrawProvider, HashDrawProvider, RandomnessProvider};
use crate::registry::RoundRegistry;

pub type SharedState = Arc<Mutex<AppState>>;

const STATE_FILE: &str = "data/state.json";

/// Unix seconds
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Service configuration pulled from the environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_port: u16,
    pub protocol_fee_bps: u32,
    pub protocol_treasury: String,
    /// "hash" (deterministic dev oracle), "external" (fulfill endpoint)
    /// or "fixed:<n>" (force-resolve, demos and tests)
    pub oracle_mode: String,
    pub oracle_seed: String,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let oracle_seed = std::env::var("ORACLE_SEED").unwrap_or_else(|_| {
            // Fresh seed per boot when none is pinned
            format!("{:016x}", rand::random::<u64>())
        });
        Self {
            bind_port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4321),
            protocol_fee_bps: std::env::var("PROTOCOL_FEE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            protocol_treasury: std::env::var("PROTOCOL_TREASURY")
                .unwrap_or_else(|_| "TREASURY".to_string()),
            oracle_mode: std::env::var("ORACLE_MODE").unwrap_or_else(|_| "hash".to_string()),
            oracle_seed,
        }
    }

    fn build_provider(&self) -> Box<dyn RandomnessProvider> {
        match self.oracle_mode.as_str() {
            "external" => Box::new(ExternalOracle),
            mode if mode.starts_with("fixed:") => {
                let number = mode["fixed:".len()..].parse().unwrap_or(0);
                Box::new(FixedDrawProvider::new(number))
            }
            _ => Box::new(HashDrawProvider::new(self.oracle_seed.clone())),
        }
    }
}

pub struct AppState {
    pub registry: RoundRegistry,
    pub config: ServiceConfig,
}

/// The persisted subset: rounds and cash survive a restart, the oracle is
/// rebuilt from configuration
#[derive(Serialize, Deserialize)]
struct PersistedState {
    rounds: HashMap<u64, Round>,
    next_round_id: u64,
    ledger: CashLedger,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        let registry = RoundRegistry::new(
            config.build_provider(),
            config.protocol_fee_bps,
            config.protocol_treasury.clone(),
        );
        let mut state = Self { registry, config };

        match state.load_from_disk() {
            Ok(()) => info!("loaded persisted state from {}", STATE_FILE),
            Err(e) => info!("starting fresh ({})", e),
        }
        state
    }

    pub fn save_to_disk(&self) -> Result<(), String> {
        let snapshot = PersistedState {
            rounds: self.registry.rounds.clone(),
            next_round_id: self.registry.next_round_id,
            ledger: self.registry.ledger.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("failed to serialize state: {}", e))?;
        std::fs::create_dir_all("data").map_err(|e| format!("failed to create data dir: {}", e))?;
        std::fs::write(STATE_FILE, json).map_err(|e| format!("failed to write state file: {}", e))?;
        info!("state saved to {}", STATE_FILE);
        Ok(())
    }

    fn load_from_disk(&mut self) -> Result<(), String> {
        let json = std::fs::read_to_string(STATE_FILE).map_err(|_| "no state file found")?;
        let snapshot: PersistedState =
            serde_json::from_str(&json).map_err(|e| format!("failed to deserialize state: {}", e))?;

        if snapshot.next_round_id < 1 {
            warn!("persisted state has bad next_round_id, ignoring file");
            return Err("corrupt state file".to_string());
        }
        self.registry.rounds = snapshot.rounds;
        self.registry.next_round_id = snapshot.next_round_id;
        self.registry.ledger = snapshot.ledger;
        Ok(())
    }
}
