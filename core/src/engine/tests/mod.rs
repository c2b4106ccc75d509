mod deposits;
mod persistence;

use veilswap_account::{Address, Currency};
use veilswap_privacy::field::u128_to_word;
use veilswap_privacy::{Commitment, Groth16Proof, SnarkVerifier, Word};

use crate::engine::execution::gate::SwapDelta;
use crate::engine::execution::payload::{ClaimPayload, ZkClaim};
use crate::engine::session::Session;
use crate::engine::stealth::Secp256k1StealthGenerator;
use crate::engine::{EngineConfig, Exchange, PrivacyEngine, SwapOrder};
use crate::error::{GateError, GateResult};

pub const ADMIN: Address = Address([0xad; 20]);
pub const GATE: Address = Address([0x9a; 20]);
pub const ROUTER: Address = Address([0x70; 20]);
pub const RELAYER: Address = Address([0x7e; 20]);
pub const DEX: Address = Address([0xde; 20]);
pub const DEPOSITOR: Address = Address([0xd0; 20]);
pub const INITIATOR: Address = Address([0x11; 20]);
pub const RECIPIENT: Address = Address([0x12; 20]);
pub const TOKEN: Currency = Currency::Token(Address([0x0f; 20]));

pub const DEPOSIT_AMOUNT: u128 = 1_000_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        relayers: vec![RELAYER],
        routers: vec![ROUTER],
        ..EngineConfig::new(ADMIN, GATE)
    }
}

pub fn engine_with(snark: Box<dyn SnarkVerifier>) -> PrivacyEngine {
    init_logging();
    PrivacyEngine::new(
        test_config(),
        snark,
        Box::new(Secp256k1StealthGenerator::with_seed(7)),
    )
}

pub fn commitment(n: u128) -> Commitment {
    Commitment(u128_to_word(n))
}

/// Fund the depositor and insert `count` native deposits of
/// [`DEPOSIT_AMOUNT`]. Returns the root after each insert.
pub fn seed_deposits(engine: &mut PrivacyEngine, count: u128) -> Vec<Word> {
    engine
        .credit(DEPOSITOR, Currency::Native, DEPOSIT_AMOUNT * count)
        .unwrap();
    (1..=count)
        .map(|n| {
            engine
                .deposit(DEPOSITOR, commitment(n), Currency::Native, DEPOSIT_AMOUNT)
                .unwrap()
                .1
        })
        .collect()
}

/// Public signals in claim order
pub struct ZkSignals {
    pub root: Word,
    pub nullifier: Word,
    pub recipient: Address,
    pub relayer: Address,
    pub fee_bps: u128,
    pub claimed_output: u128,
}

impl ZkSignals {
    pub fn new(root: Word, nullifier: Word) -> Self {
        Self {
            root,
            nullifier,
            recipient: RECIPIENT,
            relayer: RELAYER,
            fee_bps: 10,
            claimed_output: DEPOSIT_AMOUNT,
        }
    }

    pub fn words(&self) -> [Word; 8] {
        [
            u128_to_word(1),
            u128_to_word(2),
            self.root,
            self.nullifier,
            self.recipient.to_word(),
            self.relayer.to_word(),
            u128_to_word(self.fee_bps),
            u128_to_word(self.claimed_output),
        ]
    }

    /// Payload with a placeholder proof, for mock verifiers
    pub fn payload(&self) -> Vec<u8> {
        self.payload_with(Groth16Proof::from_words(&[[0u8; 32]; 8]))
    }

    pub fn payload_with(&self, proof: Groth16Proof) -> Vec<u8> {
        ClaimPayload::Zk(ZkClaim {
            proof,
            signals: self.words(),
        })
        .encode()
    }
}

pub fn nullifier_word(n: u128) -> Word {
    let mut word = u128_to_word(n);
    word[0] = 0x0a;
    word
}

pub fn swap_order(amount_in: u128) -> SwapOrder {
    SwapOrder {
        input: Currency::Native,
        output: TOKEN,
        amount_in,
    }
}

// ============================================================================
// Exchanges
// ============================================================================

/// Takes the released input and pays a fixed output out of its own
/// liquidity into the gate account.
pub struct FixedOutputExchange {
    pub address: Address,
    pub output: u128,
}

impl FixedOutputExchange {
    pub fn new(output: u128) -> Self {
        Self {
            address: DEX,
            output,
        }
    }
}

impl Exchange for FixedOutputExchange {
    fn execute(
        &mut self,
        session: &mut Session<'_>,
        router: Address,
        order: &SwapOrder,
    ) -> GateResult<SwapDelta> {
        session.transfer(router, self.address, order.input, order.amount_in)?;
        let gate = session.config().gate;
        session.transfer(self.address, gate, order.output, self.output)?;
        Ok(SwapDelta {
            currency: order.output,
            amount: self.output as i128,
        })
    }
}

pub struct FailingExchange;

impl Exchange for FailingExchange {
    fn execute(
        &mut self,
        session: &mut Session<'_>,
        router: Address,
        order: &SwapOrder,
    ) -> GateResult<SwapDelta> {
        // value moves before the failure, and must be unwound with it
        session.transfer(router, DEX, order.input, order.amount_in)?;
        Err(GateError::Exchange("insufficient liquidity".into()))
    }
}

/// Reports whatever delta it is told to, without moving value.
pub struct ScriptedExchange {
    pub delta: i128,
}

impl Exchange for ScriptedExchange {
    fn execute(
        &mut self,
        _session: &mut Session<'_>,
        _router: Address,
        order: &SwapOrder,
    ) -> GateResult<SwapDelta> {
        Ok(SwapDelta {
            currency: order.output,
            amount: self.delta,
        })
    }
}

/// Tries to start a second claim for the same initiator mid-swap.
pub struct ReentrantExchange {
    pub initiator: Address,
    pub payload: Vec<u8>,
}

impl Exchange for ReentrantExchange {
    fn execute(
        &mut self,
        session: &mut Session<'_>,
        _router: Address,
        _order: &SwapOrder,
    ) -> GateResult<SwapDelta> {
        session.before_swap(self.initiator, &self.payload)?;
        Err(GateError::Exchange("unreachable".into()))
    }
}

pub fn dex_liquidity(engine: &mut PrivacyEngine) {
    engine.credit(DEX, TOKEN, 100 * DEPOSIT_AMOUNT).unwrap();
}

pub fn token_balance(engine: &PrivacyEngine, holder: &Address) -> u128 {
    engine.balance_of(holder, &TOKEN)
}
