//! Scripted flows - envelope builders and end-to-end scenarios
//!
//! The `demo` and `tests` subcommands drive the runner through complete
//! quest lifecycles with a manual clock, so every run is deterministic.

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use civicforge_kernel::{ManualClock, Runtime, RuntimeConfig};
use civicforge_policy::TreasuryBudgetConfig;
use civicforge_security::SecurityConfig;
use civicforge_types::{
    Blueprint, Cc, ConflictRules, ContractPayload, EscalationStep, FeeSpec, FundingSpec,
    JobStatus, MintReward, MintTarget, SamplingAudit, StampDecision, StampRequirement,
    SubmissionStatus, TokenStatus, TokenType, VerificationPlan, TREASURY,
};
use rust_decimal_macros::dec;
use serde_json::json;

pub const EPOCH: &str = "2025-06-02T09:00:00Z";

pub fn epoch() -> DateTime<Utc> {
    EPOCH.parse().expect("static timestamp parses")
}

/// Runtime with a manual clock and no signature requirements
pub fn scripted_runtime(budget: Option<TreasuryBudgetConfig>) -> (Runtime, ManualClock) {
    let clock = ManualClock::new(epoch());
    let config = RuntimeConfig {
        security: SecurityConfig::permissive(),
        budget: budget.unwrap_or_default(),
        ..RuntimeConfig::default()
    };
    let runtime = Runtime::with_clock(config, Box::new(clock.clone()));
    (runtime, clock)
}

pub fn envelope(id: &str, kind: &str, proposer: &str, payload: serde_json::Value) -> Blueprint {
    Blueprint {
        id: id.into(),
        kind: kind.into(),
        class: None,
        irl_min: None,
        created_at: epoch(),
        proposer_id: proposer.into(),
        title: None,
        summary: None,
        requested_scopes: vec![],
        funding: None,
        verification_plan: None,
        execution_plan: None,
        economy_impact: None,
        payload,
        auth: None,
        status: None,
    }
}

fn requirement(role: &str, pay: i64, stake: i64) -> StampRequirement {
    StampRequirement {
        role: role.into(),
        min_unique: 1,
        stake_cc: Cc::new(stake),
        pay_cc: Cc::new(pay),
        timeout_minutes: 60,
        escalation: vec![EscalationStep {
            after_minutes: 30,
            multiplier: dec!(1.5),
        }],
    }
}

/// The shared quest: escrow 110, admin 10%, stipend 10, three stamp
/// requirements (QUALITY 25/5, EVIDENCE 30/5, SAFETY 35/10), one IRON
/// reward to the author
pub fn quest_contract(id: &str, sponsor: &str, audit: Option<SamplingAudit>) -> Blueprint {
    let payload = ContractPayload {
        deliverable_type: Some("field-survey".into()),
        acceptance_criteria: Some("three independent verifications".into()),
        author_stipend_cc: Cc::new(10),
        mint_rewards: vec![MintReward {
            token_type: TokenType::Iron,
            template: "iron".into(),
            amount: 1,
            target: MintTarget::Author,
        }],
    };
    let mut blueprint = envelope(
        id,
        "QUEST_CONTRACT",
        sponsor,
        serde_json::to_value(&payload).expect("payload serializes"),
    );
    blueprint.funding = Some(FundingSpec {
        escrow_required: true,
        sponsor_id: Some(sponsor.into()),
        escrow_cc_amount: Cc::new(110),
        fees: FeeSpec {
            admin_percent: dec!(0.1),
            fixed_cc: Cc::zero(),
        },
    });
    blueprint.verification_plan = Some(VerificationPlan {
        required_stamps: vec![
            requirement("QUALITY", 25, 5),
            requirement("EVIDENCE", 30, 5),
            requirement("SAFETY", 35, 10),
        ],
        conflict_rules: ConflictRules::default(),
        sampling_audit: audit,
    });
    blueprint
}

pub fn work_submission(id: &str, author: &str, contract_id: &str) -> Blueprint {
    envelope(
        id,
        "WORK_SUBMISSION",
        author,
        json!({
            "contract_id": contract_id,
            "artifacts": [{ "name": "survey", "hash": "h1" }],
            "requested_mint": ["IRON"],
        }),
    )
}

pub fn job_accept(id: &str, verifier: &str, job_id: &str, stake: i64) -> Blueprint {
    envelope(
        id,
        "VERIFICATION_JOB",
        verifier,
        json!({ "job_id": job_id, "stake_cc_locked": Cc::new(stake) }),
    )
}

pub fn stamp(id: &str, verifier: &str, job_id: &str, decision: StampDecision) -> Blueprint {
    envelope(
        id,
        "VERIFICATION_STAMP",
        verifier,
        json!({ "job_id": job_id, "decision": decision }),
    )
}

/// Open job id for a role, if any
pub fn open_job(runtime: &Runtime, submission_id: &str, role: &str) -> Option<String> {
    runtime
        .state()
        .jobs_by_submission(submission_id)
        .into_iter()
        .find(|j| j.stamp_role == role && j.status == JobStatus::Open)
        .map(|j| j.id.clone())
}

/// Accept-and-pass one role end to end
pub fn verify_role(
    runtime: &mut Runtime,
    submission_id: &str,
    role: &str,
    verifier: &str,
    stake: i64,
    seq: usize,
) -> Result<()> {
    let job_id = open_job(runtime, submission_id, role)
        .with_context(|| format!("no open {role} job on {submission_id}"))?;
    runtime.execute(&job_accept(
        &format!("bp-accept-{seq}"),
        verifier,
        &job_id,
        stake,
    ))?;
    runtime.execute(&stamp(
        &format!("bp-stamp-{seq}"),
        verifier,
        &job_id,
        StampDecision::Pass,
    ))?;
    Ok(())
}

// ============================================================================
// Scenarios
// ============================================================================

/// S1: quest happy path - three verifiers pass, author gets the IRON
pub fn s1_quest_happy_path() -> Result<()> {
    let (mut runtime, _clock) = scripted_runtime(None);
    runtime.seed_account("sponsor", "sponsor", Cc::new(300))?;
    runtime.seed_account("author", "author", Cc::new(0))?;
    for v in ["vera", "victor", "vance"] {
        runtime.seed_account(v, v, Cc::new(20))?;
    }

    runtime.execute(&quest_contract("quest-1", "sponsor", None))?;
    runtime.execute(&work_submission("sub-1", "author", "quest-1"))?;

    verify_role(&mut runtime, "sub-1", "QUALITY", "vera", 5, 1)?;
    verify_role(&mut runtime, "sub-1", "EVIDENCE", "victor", 5, 2)?;
    verify_role(&mut runtime, "sub-1", "SAFETY", "vance", 10, 3)?;

    let state = runtime.state();
    let submission = state.get_submission("sub-1").context("submission exists")?;
    ensure!(
        submission.status == SubmissionStatus::Verified,
        "submission must be VERIFIED, got {:?}",
        submission.status
    );

    let irons: Vec<_> = state
        .tokens_by_owner("author")
        .into_iter()
        .filter(|t| t.token_type == TokenType::Iron)
        .collect();
    ensure!(irons.len() == 1, "author must hold exactly one IRON token");
    ensure!(irons[0].proof_refs == vec!["h1".to_string()], "proof refs carry the artifact hash");
    ensure!(irons[0].stamp_ids.len() == 3, "token cites all three stamps");

    let escrow = state.get_escrow("quest-1").context("escrow exists")?;
    ensure!(
        escrow.balance_cc == Cc::new(1),
        "escrow keeps the 1 CC remainder, got {}",
        escrow.balance_cc
    );
    ensure!(
        state.account_balance(TREASURY) == Cc::new(9),
        "treasury collected 9 CC of admin fees, got {}",
        state.account_balance(TREASURY)
    );

    let report = runtime.verify_integrity();
    ensure!(report.ok, "ledger chain intact: {:?}", report.errors);
    Ok(())
}

/// S2: two of three roles verified - no mint, submission still SUBMITTED
pub fn s2_partial_verification() -> Result<()> {
    let (mut runtime, _clock) = scripted_runtime(None);
    runtime.seed_account("sponsor", "sponsor", Cc::new(300))?;
    runtime.seed_account("author", "author", Cc::new(0))?;
    runtime.seed_account("vera", "vera", Cc::new(20))?;
    runtime.seed_account("victor", "victor", Cc::new(20))?;

    runtime.execute(&quest_contract("quest-1", "sponsor", None))?;
    runtime.execute(&work_submission("sub-1", "author", "quest-1"))?;
    verify_role(&mut runtime, "sub-1", "QUALITY", "vera", 5, 1)?;
    verify_role(&mut runtime, "sub-1", "EVIDENCE", "victor", 5, 2)?;

    let state = runtime.state();
    let submission = state.get_submission("sub-1").context("submission exists")?;
    ensure!(submission.status == SubmissionStatus::Submitted, "no early verification");
    ensure!(!submission.minted, "no early mint");
    ensure!(state.tokens_by_owner("author").is_empty(), "author holds no tokens yet");
    Ok(())
}

/// S3: slash a locked stake to TREASURY
pub fn s3_slash() -> Result<()> {
    let (mut runtime, _clock) = scripted_runtime(None);
    runtime.seed_account("sponsor", "sponsor", Cc::new(300))?;
    runtime.seed_account("author", "author", Cc::new(0))?;
    runtime.seed_account("vera", "vera", Cc::new(20))?;
    runtime.seed_account("warden", "warden", Cc::new(0))?;

    runtime.execute(&quest_contract("quest-1", "sponsor", None))?;
    runtime.execute(&work_submission("sub-1", "author", "quest-1"))?;

    let job_id = open_job(&runtime, "sub-1", "QUALITY").context("open QUALITY job")?;
    runtime.execute(&job_accept("bp-accept-1", "vera", &job_id, 5))?;

    let treasury_before = runtime.state().account_balance(TREASURY);
    runtime.execute(&envelope(
        "bp-sanction-1",
        "SANCTION",
        "warden",
        json!({
            "action": "SLASH",
            "target_type": "STAKE",
            "target_id": format!("{job_id}:vera"),
            "reason": "collusion",
        }),
    ))?;

    let state = runtime.state();
    let stake = state
        .get_stake(&format!("{job_id}:vera"))
        .context("stake exists")?;
    ensure!(
        stake.status == civicforge_types::StakeStatus::Slashed,
        "stake fully slashed"
    );
    let gained = state.account_balance(TREASURY).checked_sub(treasury_before);
    ensure!(gained == Some(Cc::new(5)), "treasury gained the stake amount");
    Ok(())
}

/// S4: audit triggered, then the audit payout dies on the weekly budget
/// leaving state untouched
pub fn s4_audit_gate() -> Result<()> {
    let budget = TreasuryBudgetConfig {
        weekly_cc: Some(Cc::new(1)),
        ..Default::default()
    };
    let (mut runtime, _clock) = scripted_runtime(Some(budget));
    runtime.seed_account("sponsor", "sponsor", Cc::new(300))?;
    runtime.seed_account("author", "author", Cc::new(0))?;
    runtime.seed_account(TREASURY, TREASURY, Cc::new(100))?;
    for v in ["vera", "victor", "vance", "astra"] {
        runtime.seed_account(v, v, Cc::new(20))?;
    }

    let audit = SamplingAudit {
        enabled: true,
        rate: dec!(1),
        audit_pay_cc: Cc::new(10),
    };
    runtime.execute(&quest_contract("quest-1", "sponsor", Some(audit)))?;
    runtime.execute(&work_submission("sub-1", "author", "quest-1"))?;

    verify_role(&mut runtime, "sub-1", "QUALITY", "vera", 5, 1)?;
    verify_role(&mut runtime, "sub-1", "EVIDENCE", "victor", 5, 2)?;
    verify_role(&mut runtime, "sub-1", "SAFETY", "vance", 10, 3)?;

    let submission = runtime.state().get_submission("sub-1").context("submission")?;
    ensure!(
        submission.status == SubmissionStatus::PendingAudit,
        "rate=1 must trigger the audit, got {:?}",
        submission.status
    );
    let audit_job = open_job(&runtime, "sub-1", "AUDIT").context("audit job open")?;

    runtime.execute(&job_accept("bp-accept-4", "astra", &audit_job, 0))?;

    let state_before = runtime.state().clone();
    let ledger_before = runtime.ledger().len();
    let result = runtime.execute(&stamp("bp-stamp-4", "astra", &audit_job, StampDecision::Pass));
    ensure!(result.is_err(), "audit pay of 10 must exceed the 1 CC weekly budget");
    ensure!(runtime.state() == &state_before, "failed envelope left state untouched");
    ensure!(runtime.ledger().len() == ledger_before, "failed envelope appended nothing");
    Ok(())
}

/// S5: craft three ORE into one ITEM, fee to TREASURY
pub fn s5_craft() -> Result<()> {
    let (mut runtime, _clock) = scripted_runtime(None);
    runtime.seed_account("author", "author", Cc::new(10))?;

    runtime.execute(&envelope(
        "bp-mint-1",
        "MINT",
        "author",
        json!({
            "token_type": "ORE",
            "template": "ore",
            "owner_id": "author",
            "amount": 3,
        }),
    ))?;
    let ore_ids: Vec<String> = runtime
        .state()
        .tokens_by_owner("author")
        .iter()
        .map(|t| t.id.clone())
        .collect();
    ensure!(ore_ids.len() == 3, "three ORE minted");

    let craft_event = runtime.execute(&envelope(
        "bp-craft-1",
        "CRAFT",
        "author",
        json!({
            "recipe": "iron_ingot",
            "inputs": ore_ids,
            "craft_fee_cc": Cc::new(2),
            "output": { "template": "iron_ingot", "amount": 1 },
        }),
    ))?;

    let state = runtime.state();
    let burned: Vec<_> = state
        .tokens_by_owner("author")
        .into_iter()
        .filter(|t| t.status == TokenStatus::Burned)
        .collect();
    ensure!(burned.len() == 3, "exactly three tokens burned");
    for token in &burned {
        ensure!(
            token.spent_by_event_id.as_deref() == Some(craft_event.id.as_str()),
            "burned tokens record the craft event"
        );
    }

    let items: Vec<_> = state
        .tokens_by_owner("author")
        .into_iter()
        .filter(|t| t.token_type == TokenType::Item)
        .collect();
    ensure!(items.len() == 1, "one ITEM minted");
    ensure!(items[0].proof_refs.len() == 3, "item cites the three burned inputs");
    ensure!(state.account_balance("author") == Cc::new(8), "2 CC fee paid");
    ensure!(state.account_balance(TREASURY) == Cc::new(2), "fee landed in TREASURY");
    Ok(())
}

/// S6: a validly signed envelope replayed with the same nonce is rejected
pub fn s6_replay_reject() -> Result<()> {
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
    runtime.register_signer("author", &keypair.public_key_base64()?);
    runtime.seed_account("author", "author", Cc::new(10))?;

    let unsigned = envelope(
        "bp-mint-1",
        "MINT",
        "author",
        json!({
            "token_type": "ORE",
            "template": "ore",
            "owner_id": "author",
            "amount": 1,
        }),
    );
    let signed = sign_envelope(
        &unsigned,
        &SignRequest {
            signer_id: "author".into(),
            private_key_base64: keypair.seed_base64(),
            nonce: Some("nonce-1".into()),
            public_key: None,
        },
    )?;

    runtime.execute(&signed)?;
    let ledger_len = runtime.ledger().len();

    let replay = runtime.execute(&signed);
    match replay {
        Err(error) => ensure!(error.is_validation(), "replay must be a validation error"),
        Ok(_) => anyhow::bail!("replayed envelope must fail"),
    }
    ensure!(
        runtime.ledger().len() == ledger_len,
        "replay appended nothing to the ledger"
    );
    Ok(())
}

/// All scripted scenarios, in run order
pub fn scenarios() -> Vec<(&'static str, fn() -> Result<()>)> {
    vec![
        ("S1 quest happy path", s1_quest_happy_path),
        ("S2 partial verification", s2_partial_verification),
        ("S3 slash", s3_slash),
        ("S4 audit gate", s4_audit_gate),
        ("S5 craft", s5_craft),
        ("S6 replay reject", s6_replay_reject),
    ]
}
