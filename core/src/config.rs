//! Engine construction from `veilswap-config`.
//!
//! Maps the TOML/env configuration onto an [`EngineConfig`] and picks the
//! verifier and storage backends:
//! 1. `verifier.verifying_key_path` set: real Groth16 verifier, else a
//!    rejecting mock (zk claims fail closed, ring claims still work)
//! 2. `database.persist` true: RocksDB at `database.path`, else in-memory

use anyhow::{Context, Result, ensure};
use log::{info, warn};

use veilswap_config::VeilConfig;
use veilswap_privacy::{Groth16Verifier, MockVerifier, SnarkVerifier};

use crate::engine::stealth::Secp256k1StealthGenerator;
use crate::engine::{EngineConfig, PrivacyEngine};

/// A fee can never exceed the whole output.
const FEE_CAP_LIMIT_BPS: u16 = 10_000;

impl EngineConfig {
    pub fn from_config(config: &VeilConfig) -> Result<Self> {
        ensure!(
            config.pool.root_history_size > 0,
            "pool.root_history_size must be positive"
        );
        ensure!(
            config.pool.max_relayer_fee_bps <= FEE_CAP_LIMIT_BPS,
            "pool.max_relayer_fee_bps {} exceeds {}",
            config.pool.max_relayer_fee_bps,
            FEE_CAP_LIMIT_BPS
        );

        Ok(Self {
            admin: config.access.admin_address()?,
            gate: config.access.gate_address()?,
            root_history_size: config.pool.root_history_size,
            max_relayer_fee_bps: config.pool.max_relayer_fee_bps,
            scheme_id: config.pool.scheme_id,
            relayers: config.access.relayer_addresses()?,
            routers: config.access.router_addresses()?,
        })
    }
}

impl PrivacyEngine {
    pub fn from_config(config: &VeilConfig) -> Result<Self> {
        let engine_config = EngineConfig::from_config(config)?;

        let snark: Box<dyn SnarkVerifier> = match &config.verifier.verifying_key_path {
            Some(path) => {
                let verifier = Groth16Verifier::from_file(path)
                    .with_context(|| format!("loading verifying key from {path}"))?;
                info!(
                    "groth16 verifier loaded, vk hash {}",
                    hex::encode(verifier.verification_key_hash())
                );
                Box::new(verifier)
            }
            None => {
                warn!("no verifying key configured, zk claims will be rejected");
                Box::new(MockVerifier::rejecting())
            }
        };
        let stealth = Box::new(Secp256k1StealthGenerator::new());

        if config.database.persist {
            PrivacyEngine::open(engine_config, &config.database.path, snark, stealth)
        } else {
            Ok(PrivacyEngine::new(engine_config, snark, stealth))
        }
    }
}
