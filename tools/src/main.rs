//! bot-runner: headless transport shim for the reward ledger.
//!
//! Resolves inbound user events to ledger operations and renders the
//! results back, one JSON object per line on stdin/stdout. The real
//! chat transport speaks this protocol; the ledger itself never sees
//! the transport.
//!
//! Usage:
//!   bot-runner --owner 12345 --db ledger.db            (summary)
//!   bot-runner --owner 12345 --db ledger.db --ipc-mode
//!   bot-runner --config bot.json --members members.txt --ipc-mode

use anyhow::{bail, Result};
use rand::Rng;
use rewards_core::{
    command::UserCommand,
    config::{LedgerConfig, RewardConfig},
    engine::LedgerEngine,
    event::{EventSink, LedgerEvent},
    types::UserId,
};
use serde_json::json;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    /// First contact: membership gate, account creation, optional
    /// referral code from the deep link.
    Start {
        user_id: UserId,
        #[serde(default)]
        referral_code: Option<String>,
    },
    /// Any ledger operation.
    Op { op: UserCommand },
    /// Drain the durable event feed (at-least-once; dedup on event_id).
    Events { after: i64 },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = resolve_config(&args)?;
    if let Some(db) = str_arg(&args, "--db") {
        config.db_path = db.to_string();
    }

    let gate: Box<dyn MembershipGate> = match str_arg(&args, "--members") {
        Some(path) => Box::new(AllowListGate {
            path: path.to_string(),
        }),
        None => Box::new(OpenGate),
    };

    let engine = LedgerEngine::build(config)?.with_sink(Box::new(NotificationSink));

    if ipc_mode {
        run_ipc_loop(&engine, gate.as_ref())
    } else {
        print_summary(&engine)
    }
}

fn resolve_config(args: &[String]) -> Result<LedgerConfig> {
    if let Some(path) = str_arg(args, "--config") {
        return Ok(LedgerConfig::from_file(path)?);
    }
    if env::var("OWNER_ID").is_ok() {
        return Ok(LedgerConfig::from_env()?);
    }
    if let Some(owner) = str_arg(args, "--owner") {
        return Ok(LedgerConfig {
            owner_id: owner.parse()?,
            required_channels: Vec::new(),
            db_path: "ledger.db".to_string(),
            rewards: RewardConfig::default(),
        });
    }
    bail!("no configuration: pass --config <file>, --owner <id>, or set OWNER_ID");
}

// ── IPC loop ───────────────────────────────────────────────────

fn run_ipc_loop(engine: &LedgerEngine, gate: &dyn MembershipGate) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match request {
            IpcRequest::Quit => break,
            IpcRequest::Start {
                user_id,
                referral_code,
            } => handle_start(engine, gate, user_id, referral_code.as_deref()),
            IpcRequest::Op { op } => match engine.dispatch(op) {
                Ok(reply) => serde_json::to_value(reply)?,
                Err(err) => {
                    // Integrity failure: report and keep serving.
                    log::error!("ledger operation failed: {err}");
                    json!({ "error": err.to_string() })
                }
            },
            IpcRequest::Events { after } => match engine.store.events_after(after, 100) {
                Ok(entries) => serde_json::to_value(entries)?,
                Err(err) => {
                    log::error!("event feed read failed: {err}");
                    json!({ "error": err.to_string() })
                }
            },
        };

        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// First contact. The gate runs before any ledger access; the core
/// assumes callers are pre-gated.
fn handle_start(
    engine: &LedgerEngine,
    gate: &dyn MembershipGate,
    user_id: UserId,
    referral_code: Option<&str>,
) -> serde_json::Value {
    match gate.check(user_id) {
        GateDecision::Unavailable => {
            return json!({
                "reply": "gate_unavailable",
                "message": "membership check unavailable, try again later",
            });
        }
        GateDecision::NotMember => {
            return json!({
                "reply": "join_required",
                "channels": engine.config().required_channels,
            });
        }
        GateDecision::Member => {}
    }

    let account = match engine.account(user_id) {
        Ok(account) => account,
        Err(err) => {
            log::error!("account lookup failed for {user_id}: {err}");
            return json!({ "error": err.to_string() });
        }
    };

    // "ref_<id>" from the deep link; both outcomes are rendered in the
    // welcome reply rather than failing the whole start.
    let referral = referral_code
        .and_then(parse_referral_code)
        .map(|referrer_id| {
            engine
                .dispatch(UserCommand::ApplyReferral {
                    user_id,
                    referrer_id,
                })
                .map_or_else(
                    |err| json!({ "error": err.to_string() }),
                    |reply| serde_json::to_value(reply).unwrap_or_default(),
                )
        });

    json!({
        "reply": "welcome",
        "user_id": user_id,
        "balance": account.balance,
        "referral_code": format!("ref_{user_id}"),
        "referral": referral,
    })
}

fn parse_referral_code(code: &str) -> Option<UserId> {
    code.strip_prefix("ref_")?.parse().ok()
}

// ── Membership gate ────────────────────────────────────────────

enum GateDecision {
    Member,
    NotMember,
    /// The check itself failed — distinct from "not a member", so a
    /// flaky lookup never silently locks users out.
    Unavailable,
}

trait MembershipGate {
    fn check(&self, user_id: UserId) -> GateDecision;
}

/// No gate configured: everyone is a member.
struct OpenGate;

impl MembershipGate for OpenGate {
    fn check(&self, _user_id: UserId) -> GateDecision {
        GateDecision::Member
    }
}

/// Membership from a newline-separated id file, re-read per check (the
/// file stands in for the external membership API).
struct AllowListGate {
    path: String,
}

impl MembershipGate for AllowListGate {
    fn check(&self, user_id: UserId) -> GateDecision {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("membership list {} unreadable: {err}", self.path);
                return GateDecision::Unavailable;
            }
        };
        let member = raw
            .lines()
            .filter_map(|l| l.trim().parse::<UserId>().ok())
            .any(|id| id == user_id);
        if member {
            GateDecision::Member
        } else {
            GateDecision::NotMember
        }
    }
}

// ── Outbound notifications ─────────────────────────────────────

/// Renders committed ledger events as outbound notification lines.
/// Delivery is best-effort by contract; the ledger mutation stands
/// whether or not these lines go anywhere.
struct NotificationSink;

impl EventSink for NotificationSink {
    fn deliver(&self, event: &LedgerEvent) -> anyhow::Result<()> {
        let image_seed: u32 = rand::thread_rng().gen_range(1..=1000);
        let notes = match event {
            LedgerEvent::WithdrawalRequested {
                user_id,
                rupees,
                payout_id,
            } => vec![
                json!({
                    "type": "notification",
                    "audience": "payout_desk",
                    "text": format!(
                        "New withdrawal request: user {user_id}, {rupees} rupees to {payout_id}"
                    ),
                    "image_seed": image_seed,
                }),
                json!({
                    "type": "notification",
                    "audience": "owner",
                    "text": format!("Withdrawal of {rupees} rupees awaits approval"),
                    "approve": { "cmd": "approve_withdrawal", "target_id": user_id },
                    "image_seed": image_seed,
                }),
            ],
            LedgerEvent::WithdrawalCompleted { user_id, amount } => vec![json!({
                "type": "notification",
                "audience": user_id,
                "text": format!("Your withdrawal of {amount} rupees has been processed"),
            })],
            LedgerEvent::ReferralApplied {
                referrer_id, reward, ..
            } => vec![json!({
                "type": "notification",
                "audience": referrer_id,
                "text": format!("New referral! You earned {reward} coins"),
            })],
            _ => Vec::new(),
        };

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for note in notes {
            writeln!(handle, "{note}")?;
        }
        handle.flush()?;
        Ok(())
    }
}

// ── Summary mode ───────────────────────────────────────────────

fn print_summary(engine: &LedgerEngine) -> Result<()> {
    let owner = engine.config().owner_id;
    let stats = engine.stats(owner)?;
    let top = engine.leaderboard(10)?;
    let pending = engine.pending_withdrawals(owner)?;

    println!("=== LEDGER SUMMARY ===");
    println!("  accounts:        {}", stats.total_accounts);
    println!("  total balance:   {} coins", stats.total_balance);
    println!("  referral edges:  {}", stats.total_referrals);
    println!("  withdrawals:     {}", stats.total_withdrawals);

    println!();
    println!("=== TOP 10 ===");
    if top.is_empty() {
        println!("  (no accounts yet)");
    }
    for (i, entry) in top.iter().enumerate() {
        println!("  {}. user {}: {} coins", i + 1, entry.user_id, entry.balance);
    }

    println!();
    println!("=== PENDING WITHDRAWALS ===");
    if pending.is_empty() {
        println!("  (none)");
    }
    for p in &pending {
        println!(
            "  user {}: {} rupees -> {}",
            p.user_id,
            p.rupees,
            p.payout_id.as_deref().unwrap_or("(payout unset)")
        );
    }
    Ok(())
}

// ── Arg helpers ────────────────────────────────────────────────

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
