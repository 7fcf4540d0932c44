//! Shared fixtures for kernel integration tests
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use civicforge_kernel::{ManualClock, Runtime, RuntimeConfig};
use civicforge_policy::TreasuryBudgetConfig;
use civicforge_security::SecurityConfig;
use civicforge_types::{
    Blueprint, Cc, ConflictRules, ContractPayload, FeeSpec, FundingSpec, JobStatus, MintReward,
    MintTarget, SamplingAudit, StampDecision, StampRequirement, VerificationPlan,
};
use rust_decimal_macros::dec;
use serde_json::json;

pub const EPOCH: &str = "2025-06-02T09:00:00Z";

pub fn epoch() -> DateTime<Utc> {
    EPOCH.parse().unwrap()
}

pub fn runtime() -> (Runtime, ManualClock) {
    runtime_with(RuntimeConfig {
        security: SecurityConfig::permissive(),
        ..RuntimeConfig::default()
    })
}

pub fn runtime_with(config: RuntimeConfig) -> (Runtime, ManualClock) {
    let clock = ManualClock::new(epoch());
    let runtime = Runtime::with_clock(config, Box::new(clock.clone()));
    (runtime, clock)
}

pub fn runtime_with_budget(budget: TreasuryBudgetConfig) -> (Runtime, ManualClock) {
    runtime_with(RuntimeConfig {
        security: SecurityConfig::permissive(),
        budget,
        ..RuntimeConfig::default()
    })
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

pub fn requirement(role: &str, pay: i64, stake: i64) -> StampRequirement {
    StampRequirement {
        role: role.into(),
        min_unique: 1,
        stake_cc: Cc::new(stake),
        pay_cc: Cc::new(pay),
        timeout_minutes: 60,
        escalation: vec![],
    }
}

/// The standard quest: escrow 110, admin 10%, stipend 10, QUALITY 25/5 +
/// EVIDENCE 30/5 + SAFETY 35/10, one IRON to the author
pub fn quest_contract(id: &str, sponsor: &str, audit: Option<SamplingAudit>) -> Blueprint {
    let payload = ContractPayload {
        deliverable_type: Some("field-survey".into()),
        acceptance_criteria: None,
        author_stipend_cc: Cc::new(10),
        mint_rewards: vec![MintReward {
            token_type: civicforge_types::TokenType::Iron,
            template: "iron".into(),
            amount: 1,
            target: MintTarget::Author,
        }],
    };
    let mut blueprint = envelope(
        id,
        "QUEST_CONTRACT",
        sponsor,
        serde_json::to_value(&payload).unwrap(),
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

pub fn mint_ore(id: &str, owner: &str, amount: u32) -> Blueprint {
    envelope(
        id,
        "MINT",
        owner,
        json!({
            "token_type": "ORE",
            "template": "ore",
            "owner_id": owner,
            "amount": amount,
        }),
    )
}

pub fn open_job(runtime: &Runtime, submission_id: &str, role: &str) -> Option<String> {
    runtime
        .state()
        .jobs_by_submission(submission_id)
        .into_iter()
        .find(|j| j.stamp_role == role && j.status == JobStatus::Open)
        .map(|j| j.id.clone())
}

/// Accept and PASS one role
pub fn verify_role(
    runtime: &mut Runtime,
    submission_id: &str,
    role: &str,
    verifier: &str,
    stake: i64,
    seq: usize,
) -> String {
    let job_id = open_job(runtime, submission_id, role)
        .unwrap_or_else(|| panic!("no open {role} job on {submission_id}"));
    runtime
        .execute(&job_accept(&format!("bp-accept-{seq}"), verifier, &job_id, stake))
        .unwrap();
    runtime
        .execute(&stamp(
            &format!("bp-stamp-{seq}"),
            verifier,
            &job_id,
            StampDecision::Pass,
        ))
        .unwrap();
    job_id
}

/// Seed the standard cast: sponsor 300, author 0, three verifiers 20 each
pub fn seed_cast(runtime: &mut Runtime) {
    runtime.seed_account("sponsor", "sponsor", Cc::new(300)).unwrap();
    runtime.seed_account("author", "author", Cc::new(0)).unwrap();
    for v in ["vera", "victor", "vance"] {
        runtime.seed_account(v, v, Cc::new(20)).unwrap();
    }
}
