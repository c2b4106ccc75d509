use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use veilswap_account::{Address, Currency};
use veilswap_privacy::{MockVerifier, Nullifier};

use super::*;
use crate::engine::stealth::StealthKeys;

fn open(dir: &TempDir) -> PrivacyEngine {
    init_logging();
    PrivacyEngine::open(
        test_config(),
        dir.path(),
        Box::new(MockVerifier::accepting()),
        Box::new(Secp256k1StealthGenerator::with_seed(3)),
    )
    .unwrap()
}

#[test]
fn state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let extra_relayer = Address([0x77; 20]);
    let keys = StealthKeys::generate(&mut StdRng::seed_from_u64(5));

    let (roots, current) = {
        let mut engine = open(&dir);
        let roots = seed_deposits(&mut engine, 3);
        dex_liquidity(&mut engine);
        engine.set_relayer(ADMIN, extra_relayer, true).unwrap();
        engine
            .register_meta_address(Address([0x21; 20]), &keys.meta_address().to_bytes())
            .unwrap();

        let payload = ZkSignals::new(engine.current_root(), nullifier_word(1)).payload();
        engine
            .private_swap(
                ROUTER,
                INITIATOR,
                &payload,
                &swap_order(DEPOSIT_AMOUNT),
                &mut FixedOutputExchange::new(1_000_000),
            )
            .unwrap();
        (roots, engine.current_root())
    };

    let engine = open(&dir);
    assert_eq!(engine.deposit_count(), 3);
    assert_eq!(engine.current_root(), current);
    for root in &roots {
        assert!(engine.is_known_root(root));
    }
    assert!(engine.is_commitment_exists(&commitment(3)));
    assert!(engine.is_spent(&Nullifier(nullifier_word(1))));
    assert!(!engine.is_spent(&Nullifier(nullifier_word(2))));

    assert_eq!(engine.pool_balance(&Currency::Native), 2 * DEPOSIT_AMOUNT);
    assert_eq!(token_balance(&engine, &RECIPIENT), 999_000);
    assert_eq!(token_balance(&engine, &RELAYER), 1_000);
    assert_eq!(engine.stats().total_claims, 1);
    assert_eq!(engine.stats().total_volume, 1_000_000);

    assert!(engine.is_relayer(&extra_relayer));
    assert!(engine.is_router(&ROUTER));
    assert_eq!(
        engine
            .state()
            .stealth_registry()
            .meta_address_of(&Address([0x21; 20])),
        Some(&keys.meta_address())
    );
}

#[test]
fn reopened_pool_keeps_accepting_deposits() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = open(&dir);
        seed_deposits(&mut engine, 2);
    }

    let mut engine = open(&dir);
    engine
        .credit(DEPOSITOR, Currency::Native, DEPOSIT_AMOUNT)
        .unwrap();
    let (index, root) = engine
        .deposit(DEPOSITOR, commitment(3), Currency::Native, DEPOSIT_AMOUNT)
        .unwrap();
    assert_eq!(index, 2);

    // same sequence in memory gives the same root
    let mut fresh = engine_with(Box::new(MockVerifier::accepting()));
    let fresh_roots = seed_deposits(&mut fresh, 3);
    assert_eq!(root, fresh_roots[2]);
}

#[test]
fn failed_session_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let root = {
        let mut engine = open(&dir);
        seed_deposits(&mut engine, 1);
        dex_liquidity(&mut engine);

        let payload = ZkSignals::new(engine.current_root(), nullifier_word(9)).payload();
        let result = engine.private_swap(
            ROUTER,
            INITIATOR,
            &payload,
            &swap_order(DEPOSIT_AMOUNT),
            &mut FailingExchange,
        );
        assert!(result.is_err());

        let result = engine.atomic(|s| {
            s.credit(DEPOSITOR, Currency::Native, 1)?;
            s.deposit(DEPOSITOR, commitment(50), Currency::Native, 1)?;
            s.set_router(ADMIN, ROUTER, false)?;
            Err::<(), _>(GateError::Exchange("abort".into()))
        });
        assert!(result.is_err());
        engine.current_root()
    };

    let engine = open(&dir);
    assert_eq!(engine.deposit_count(), 1);
    assert_eq!(engine.current_root(), root);
    assert!(!engine.is_commitment_exists(&commitment(50)));
    assert!(!engine.is_spent(&Nullifier(nullifier_word(9))));
    assert!(engine.is_router(&ROUTER));
    assert_eq!(engine.pool_balance(&Currency::Native), DEPOSIT_AMOUNT);
    assert_eq!(engine.balance_of(&DEPOSITOR, &Currency::Native), 0);
}

#[test]
fn config_allowlists_apply_until_first_snapshot() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = open(&dir);
        engine.set_router(ADMIN, ROUTER, false).unwrap();
    }

    // the stored allowlist wins over the config listing ROUTER
    let engine = open(&dir);
    assert!(!engine.is_router(&ROUTER));
    assert!(engine.is_relayer(&RELAYER));
}
