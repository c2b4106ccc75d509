use veilswap_account::{Address, Currency};
use veilswap_privacy::field::modulus_word;
use veilswap_privacy::{Commitment, MockVerifier, PrivacyError};

use super::*;
use crate::engine::events::PoolEvent;

fn engine() -> PrivacyEngine {
    engine_with(Box::new(MockVerifier::accepting()))
}

#[test]
fn three_deposits_produce_distinct_roots() {
    let mut engine = engine();
    let roots = seed_deposits(&mut engine, 3);

    assert_eq!(engine.deposit_count(), 3);
    assert_ne!(roots[0], roots[1]);
    assert_ne!(roots[1], roots[2]);
    assert_ne!(roots[0], roots[2]);
    assert_eq!(engine.current_root(), roots[2]);
    for root in &roots {
        assert!(engine.is_known_root(root));
    }
    assert!(engine.is_commitment_exists(&commitment(2)));
    assert_eq!(engine.pool_balance(&Currency::Native), 3 * DEPOSIT_AMOUNT);
    assert_eq!(engine.balance_of(&DEPOSITOR, &Currency::Native), 0);

    let deposits: Vec<u64> = engine
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            PoolEvent::Deposit { leaf_index, .. } => Some(leaf_index),
            _ => None,
        })
        .collect();
    assert_eq!(deposits, vec![0, 1, 2]);
}

#[test]
fn empty_tree_root_is_not_known() {
    let engine = engine();
    assert!(!engine.is_known_root(&engine.current_root()));
    assert!(!engine.is_known_root(&[0u8; 32]));
}

#[test]
fn root_window_holds_last_thirty() {
    let mut engine = engine();
    let roots = seed_deposits(&mut engine, 31);

    assert!(!engine.is_known_root(&roots[0]));
    for root in &roots[1..] {
        assert!(engine.is_known_root(root));
    }
}

#[test]
fn invalid_commitments_rejected_without_side_effects() {
    let mut engine = engine();
    seed_deposits(&mut engine, 1);
    engine.credit(DEPOSITOR, Currency::Native, 10).unwrap();
    let root = engine.current_root();
    engine.take_events();

    let cases = [
        (commitment(1), GateError::Privacy(PrivacyError::DuplicateCommitment)),
        (
            Commitment(modulus_word()),
            GateError::Privacy(PrivacyError::OutOfFieldRange),
        ),
        (
            Commitment([0u8; 32]),
            GateError::Privacy(PrivacyError::InvalidCommitment),
        ),
    ];
    for (c, expected) in cases {
        assert_eq!(
            engine.deposit(DEPOSITOR, c, Currency::Native, 10),
            Err(expected)
        );
    }

    assert_eq!(engine.deposit_count(), 1);
    assert_eq!(engine.current_root(), root);
    assert_eq!(engine.balance_of(&DEPOSITOR, &Currency::Native), 10);
    assert!(engine.take_events().is_empty());
}

#[test]
fn unfunded_deposit_rolls_back_tree_insert() {
    let mut engine = engine();
    let roots = seed_deposits(&mut engine, 2);

    let err = engine
        .deposit(DEPOSITOR, commitment(99), Currency::Native, 1)
        .unwrap_err();
    assert_eq!(
        err,
        GateError::InsufficientBalance {
            needed: 1,
            available: 0
        }
    );

    assert_eq!(engine.deposit_count(), 2);
    assert_eq!(engine.current_root(), roots[1]);
    assert!(!engine.is_commitment_exists(&commitment(99)));
    assert!(engine.is_known_root(&roots[0]));

    // the next deposit takes the freed index
    engine.credit(DEPOSITOR, Currency::Native, 1).unwrap();
    let (index, _) = engine
        .deposit(DEPOSITOR, commitment(99), Currency::Native, 1)
        .unwrap();
    assert_eq!(index, 2);
}

#[test]
fn token_deposits_tracked_per_currency() {
    let mut engine = engine();
    engine.credit(DEPOSITOR, TOKEN, 500).unwrap();
    engine
        .deposit(DEPOSITOR, commitment(5), TOKEN, 500)
        .unwrap();

    assert_eq!(engine.pool_balance(&TOKEN), 500);
    assert_eq!(engine.pool_balance(&Currency::Native), 0);
}

#[test]
fn several_deposits_in_one_session_roll_back_together() {
    let mut engine = engine();
    let roots = seed_deposits(&mut engine, 1);
    engine.credit(DEPOSITOR, Currency::Native, 2).unwrap();

    let result = engine.atomic(|s| {
        s.deposit(DEPOSITOR, commitment(10), Currency::Native, 1)?;
        s.deposit(DEPOSITOR, commitment(11), Currency::Native, 1)?;
        s.deposit(DEPOSITOR, commitment(12), Currency::Native, 1)
    });
    assert!(matches!(result, Err(GateError::InsufficientBalance { .. })));

    assert_eq!(engine.deposit_count(), 1);
    assert_eq!(engine.current_root(), roots[0]);
    assert!(engine.is_known_root(&roots[0]));
    assert!(!engine.is_commitment_exists(&commitment(10)));
    assert_eq!(engine.balance_of(&DEPOSITOR, &Currency::Native), 2);
}

// ============================================================================
// Admin
// ============================================================================

#[test]
fn only_admin_toggles_allowlists() {
    let mut engine = engine();
    let relayer = Address([0x55; 20]);

    assert_eq!(
        engine.set_relayer(INITIATOR, relayer, true),
        Err(GateError::Unauthorized(INITIATOR))
    );
    assert_eq!(
        engine.set_router(INITIATOR, relayer, true),
        Err(GateError::Unauthorized(INITIATOR))
    );
    assert!(!engine.is_relayer(&relayer));

    engine.set_relayer(ADMIN, relayer, true).unwrap();
    assert!(engine.is_relayer(&relayer));
    engine.set_router(ADMIN, ROUTER, false).unwrap();
    assert!(!engine.is_router(&ROUTER));

    let events = engine.take_events();
    assert_eq!(
        events,
        vec![
            PoolEvent::RelayerUpdated {
                relayer,
                allowed: true
            },
            PoolEvent::RouterUpdated {
                router: ROUTER,
                authorized: false
            },
        ]
    );
}

#[test]
fn admin_change_rolls_back_with_session() {
    let mut engine = engine();
    let relayer = Address([0x56; 20]);

    let result: GateResult<()> = engine.atomic(|s| {
        s.set_relayer(ADMIN, relayer, true)?;
        s.set_relayer(ADMIN, RELAYER, false)?;
        Err(GateError::Exchange("abort".into()))
    });
    assert!(result.is_err());
    assert!(!engine.is_relayer(&relayer));
    assert!(engine.is_relayer(&RELAYER));
}

#[test]
fn only_admin_mints() {
    let mut engine = engine();
    assert_eq!(
        engine.mint(INITIATOR, INITIATOR, Currency::Native, 5),
        Err(GateError::Unauthorized(INITIATOR))
    );
    assert_eq!(engine.balance_of(&INITIATOR, &Currency::Native), 0);

    engine.mint(ADMIN, DEX, TOKEN, 5).unwrap();
    assert_eq!(token_balance(&engine, &DEX), 5);
}

#[test]
fn transfer_needs_router_or_gate_party() {
    let mut engine = engine();
    engine.credit(DEPOSITOR, Currency::Native, 10).unwrap();

    assert_eq!(
        engine.atomic(|s| s.transfer(DEPOSITOR, INITIATOR, Currency::Native, 4)),
        Err(GateError::Unauthorized(DEPOSITOR))
    );
    assert_eq!(engine.balance_of(&DEPOSITOR, &Currency::Native), 10);

    engine
        .atomic(|s| s.transfer(DEPOSITOR, ROUTER, Currency::Native, 4))
        .unwrap();
    engine
        .atomic(|s| s.transfer(DEPOSITOR, GATE, Currency::Native, 3))
        .unwrap();
    assert_eq!(engine.balance_of(&ROUTER, &Currency::Native), 4);
    assert_eq!(engine.balance_of(&GATE, &Currency::Native), 3);
}

#[test]
fn release_requires_authorized_router() {
    let mut engine = engine();
    seed_deposits(&mut engine, 1);

    let outsider = Address([0x66; 20]);
    assert_eq!(
        engine.atomic(|s| s.release_for_swap(outsider, 1)),
        Err(GateError::Unauthorized(outsider))
    );

    engine.atomic(|s| s.release_for_swap(ROUTER, 400)).unwrap();
    assert_eq!(engine.pool_balance(&Currency::Native), DEPOSIT_AMOUNT - 400);
    assert_eq!(engine.balance_of(&ROUTER, &Currency::Native), 400);

    assert!(matches!(
        engine.atomic(|s| s.release_token_for_swap(ROUTER, Address([0x0f; 20]), 1)),
        Err(GateError::InsufficientBalance { .. })
    ));
}
