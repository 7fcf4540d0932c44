//! Universal properties of the runner: atomicity, chain integrity,
//! double-spend and replay resistance, non-negative balances, mint caps,
//! treasury budget, determinism

mod common;

use civicforge_kernel::{ManualClock, Runtime, RuntimeConfig};
use civicforge_policy::{MintPolicyConfig, TreasuryBudgetConfig};
use civicforge_security::SecurityConfig;
use civicforge_types::{
    Cc, SamplingAudit, StampDecision, SubmissionStatus, TokenType, TREASURY,
};
use common::*;
use rust_decimal_macros::dec;
use serde_json::json;

/// Execute an envelope expected to fail and assert state and ledger are
/// exactly what they were before
fn assert_rolls_back(runtime: &mut Runtime, blueprint: &civicforge_types::Blueprint) {
    let state_before = runtime.state().clone();
    let ledger_before = runtime.ledger().clone();

    let result = runtime.execute(blueprint);
    assert!(result.is_err(), "{} must fail", blueprint.id);

    assert_eq!(runtime.state(), &state_before, "state untouched after {}", blueprint.id);
    assert_eq!(runtime.ledger(), &ledger_before, "ledger untouched after {}", blueprint.id);
}

#[test]
fn atomicity_every_failure_restores_the_snapshot() {
    let (mut runtime, _clock) = runtime();
    seed_cast(&mut runtime);

    // underfunded quest: escrow below the predicted payout
    let mut quest = quest_contract("quest-under", "sponsor", None);
    if let Some(funding) = quest.funding.as_mut() {
        funding.escrow_cc_amount = Cc::new(50);
    }
    assert_rolls_back(&mut runtime, &quest);

    // submission against a missing contract
    assert_rolls_back(&mut runtime, &work_submission("sub-x", "author", "no-such-quest"));

    // a valid quest, then failures downstream of it
    runtime.execute(&quest_contract("quest-1", "sponsor", None)).unwrap();
    runtime.execute(&work_submission("sub-1", "author", "quest-1")).unwrap();

    // stake below the requirement
    let job_id = open_job(&runtime, "sub-1", "SAFETY").unwrap();
    assert_rolls_back(&mut runtime, &job_accept("bp-accept-x", "vera", &job_id, 1));

    // stamp on a job never assigned
    assert_rolls_back(
        &mut runtime,
        &stamp("bp-stamp-x", "vera", &job_id, StampDecision::Pass),
    );

    // craft of tokens the proposer does not own
    runtime.seed_account("rival", "rival", Cc::new(10)).unwrap();
    runtime.execute(&mint_ore("bp-mint-1", "rival", 1)).unwrap();
    let rival_token = runtime.state().tokens_by_owner("rival")[0].id.clone();
    assert_rolls_back(
        &mut runtime,
        &envelope(
            "bp-craft-x",
            "CRAFT",
            "author",
            json!({
                "inputs": [rival_token],
                "craft_fee_cc": Cc::zero(),
                "output": { "template": "ingot", "amount": 1 },
            }),
        ),
    );

    // unknown kind
    assert_rolls_back(
        &mut runtime,
        &envelope("bp-weird", "TELEPORT", "author", json!({})),
    );

    assert!(runtime.verify_integrity().ok);
}

#[test]
fn ledger_chain_survives_any_sequence_and_detects_tampering() {
    let (mut runtime, _clock) = runtime();
    seed_cast(&mut runtime);

    runtime.execute(&quest_contract("quest-1", "sponsor", None)).unwrap();
    runtime.execute(&work_submission("sub-1", "author", "quest-1")).unwrap();
    verify_role(&mut runtime, "sub-1", "QUALITY", "vera", 5, 1);

    let report = runtime.verify_integrity();
    assert!(report.ok, "{:?}", report.errors);

    // mutating any single field of any event flips the verdict
    let events = runtime.ledger().events().to_vec();
    for index in 0..events.len() {
        let mut copy = events.clone();
        copy[index].actor_id = "mallory".into();
        let tampered = civicforge_ledger::Ledger::from_events(copy);
        assert!(!tampered.verify_integrity().ok, "tampering event {index} went unnoticed");
    }
}

#[test]
fn double_spend_a_burned_token_never_crafts_again() {
    let (mut runtime, _clock) = runtime();
    runtime.seed_account("author", "author", Cc::new(10)).unwrap();

    runtime.execute(&mint_ore("bp-mint-1", "author", 2)).unwrap();
    let tokens: Vec<String> = runtime
        .state()
        .tokens_by_owner("author")
        .iter()
        .map(|t| t.id.clone())
        .collect();

    let craft = |id: &str, inputs: Vec<String>| {
        envelope(
            id,
            "CRAFT",
            "author",
            json!({
                "inputs": inputs,
                "craft_fee_cc": Cc::zero(),
                "output": { "template": "ingot", "amount": 1 },
            }),
        )
    };

    runtime.execute(&craft("bp-craft-1", vec![tokens[0].clone()])).unwrap();

    // the burned token cannot be consumed again, alone or in company
    assert_rolls_back(&mut runtime, &craft("bp-craft-2", vec![tokens[0].clone()]));
    assert_rolls_back(
        &mut runtime,
        &craft("bp-craft-3", vec![tokens[1].clone(), tokens[0].clone()]),
    );

    // the untouched token still works
    runtime.execute(&craft("bp-craft-4", vec![tokens[1].clone()])).unwrap();
}

#[test]
fn replay_of_a_signed_envelope_is_rejected() {
    use civicforge_crypto::{sign_envelope, KeyPair, SignRequest};

    let clock = ManualClock::new(epoch());
    let config = RuntimeConfig {
        security: SecurityConfig {
            require_license: false,
            ..SecurityConfig::default()
        },
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::with_clock(config, Box::new(clock));

    let keypair = KeyPair::generate();
    runtime.register_signer("author", &keypair.public_key_base64().unwrap());
    runtime.seed_account("author", "author", Cc::new(10)).unwrap();

    let signed = sign_envelope(
        &mint_ore("bp-mint-1", "author", 1),
        &SignRequest {
            signer_id: "author".into(),
            private_key_base64: keypair.seed_base64(),
            nonce: Some("nonce-1".into()),
            public_key: None,
        },
    )
    .unwrap();

    runtime.execute(&signed).unwrap();
    let ledger_len = runtime.ledger().len();

    let replay = runtime.execute(&signed);
    assert!(replay.as_ref().err().map(|e| e.is_validation()).unwrap_or(false));
    assert_eq!(runtime.ledger().len(), ledger_len);
}

#[test]
fn no_admissible_sequence_drives_a_balance_negative() {
    let (mut runtime, _clock) = runtime();
    runtime.seed_account("sponsor", "sponsor", Cc::new(100)).unwrap();
    runtime.seed_account("author", "author", Cc::new(0)).unwrap();
    runtime.seed_account("vera", "vera", Cc::new(3)).unwrap();

    // sponsor cannot escrow more than they hold
    let mut quest = quest_contract("quest-1", "sponsor", None);
    if let Some(funding) = quest.funding.as_mut() {
        funding.escrow_cc_amount = Cc::new(150);
    }
    assert_rolls_back(&mut runtime, &quest);

    // a verifier cannot stake more than they hold
    runtime.seed_account("sponsor", "sponsor", Cc::new(200)).unwrap();
    runtime.execute(&quest_contract("quest-2", "sponsor", None)).unwrap();
    runtime.execute(&work_submission("sub-1", "author", "quest-2")).unwrap();
    let job_id = open_job(&runtime, "sub-1", "SAFETY").unwrap();
    assert_rolls_back(&mut runtime, &job_accept("bp-accept-1", "vera", &job_id, 10));

    // invariant holds across every account, escrow, and stake
    let all_non_negative = runtime
        .state()
        .accounts
        .values()
        .all(|a| !a.cc_balance.is_negative());
    assert!(all_non_negative);
}

#[test]
fn mint_cap_resets_on_the_next_utc_day() {
    let mut policy = MintPolicyConfig::default();
    policy.per_settler_per_cycle.insert(TokenType::Iron, 3);

    let (mut runtime, clock) = runtime_with(RuntimeConfig {
        security: SecurityConfig::permissive(),
        policy,
        ..RuntimeConfig::default()
    });
    runtime.seed_account("smith", "smith", Cc::new(0)).unwrap();

    let mint_iron = |id: &str, amount: u32| {
        envelope(
            id,
            "MINT",
            "smith",
            json!({
                "token_type": "IRON",
                "template": "iron",
                "owner_id": "smith",
                "amount": amount,
            }),
        )
    };

    for i in 0..3 {
        runtime.execute(&mint_iron(&format!("bp-mint-{i}"), 1)).unwrap();
    }
    // the fourth IRON that same UTC day fails
    assert_rolls_back(&mut runtime, &mint_iron("bp-mint-4", 1));

    // the following day it succeeds
    clock.advance_minutes(24 * 60);
    runtime.execute(&mint_iron("bp-mint-5", 1)).unwrap();
    assert_eq!(runtime.state().tokens_by_owner("smith").len(), 4);
}

#[test]
fn treasury_budget_caps_the_week_and_resets_monday() {
    let budget = TreasuryBudgetConfig {
        weekly_cc: Some(Cc::new(10)),
        ..Default::default()
    };
    let (mut runtime, clock) = runtime_with_budget(budget);
    seed_cast(&mut runtime);
    runtime.seed_account(TREASURY, TREASURY, Cc::new(100)).unwrap();
    runtime.seed_account("astra", "astra", Cc::new(0)).unwrap();
    runtime.seed_account("orion", "orion", Cc::new(0)).unwrap();

    let audit = SamplingAudit {
        enabled: true,
        rate: dec!(1),
        audit_pay_cc: Cc::new(6),
    };

    // two audited quests, both landing in the same ISO week
    for (n, author_sub) in [("quest-1", "sub-1"), ("quest-2", "sub-2")] {
        runtime.execute(&quest_contract(n, "sponsor", Some(audit.clone()))).unwrap();
        runtime.execute(&work_submission(author_sub, "author", n)).unwrap();
    }
    let mut seq = 0;
    for sub in ["sub-1", "sub-2"] {
        for (role, verifier, stake) in [
            ("QUALITY", "vera", 5),
            ("EVIDENCE", "victor", 5),
            ("SAFETY", "vance", 10),
        ] {
            seq += 1;
            verify_role(&mut runtime, sub, role, verifier, stake, seq);
        }
    }

    // first audit pay of 6 fits the 10 CC weekly budget
    let audit_job_1 = open_job(&runtime, "sub-1", "AUDIT").unwrap();
    runtime.execute(&job_accept("bp-aa-1", "astra", &audit_job_1, 0)).unwrap();
    runtime
        .execute(&stamp("bp-as-1", "astra", &audit_job_1, StampDecision::Pass))
        .unwrap();

    // the second 6 would make 12 > 10 and dies
    let audit_job_2 = open_job(&runtime, "sub-2", "AUDIT").unwrap();
    runtime.execute(&job_accept("bp-aa-2", "orion", &audit_job_2, 0)).unwrap();
    assert_rolls_back(
        &mut runtime,
        &stamp("bp-as-2", "orion", &audit_job_2, StampDecision::Pass),
    );

    // the following Monday (UTC) the window resets and it clears
    clock.set("2025-06-09T00:00:05Z".parse().unwrap());
    runtime
        .execute(&stamp("bp-as-3", "orion", &audit_job_2, StampDecision::Pass))
        .unwrap();
    assert_eq!(
        runtime.state().get_submission("sub-2").unwrap().status,
        SubmissionStatus::Verified
    );
}

#[test]
fn identical_sequences_produce_identical_event_hashes() {
    let run = || {
        let (mut runtime, _clock) = runtime();
        seed_cast(&mut runtime);
        runtime.execute(&quest_contract("quest-1", "sponsor", None)).unwrap();
        runtime.execute(&work_submission("sub-1", "author", "quest-1")).unwrap();
        verify_role(&mut runtime, "sub-1", "QUALITY", "vera", 5, 1);
        verify_role(&mut runtime, "sub-1", "EVIDENCE", "victor", 5, 2);
        verify_role(&mut runtime, "sub-1", "SAFETY", "vance", 10, 3);
        runtime
            .ledger()
            .events()
            .iter()
            .map(|e| e.event_hash.clone())
            .collect::<Vec<_>>()
    };

    let first = run();
    let second = run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
