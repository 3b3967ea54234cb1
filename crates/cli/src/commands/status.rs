//! `modegate status` — Show a conversation's autonomy status.

use modegate_autonomy::AutonomyStatus;

use super::Context;
use super::mode::print_info;

pub async fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let status = ctx.engine().status(&ctx.conversation).await?;
    ctx.emit(&status, print_status)
}

fn print_status(status: &AutonomyStatus) {
    print_info(&status.mode);

    let m = &status.metrics;
    println!();
    println!("📊 Metrics");
    println!("  Requested:   {}", m.approvals_requested);
    println!("  Granted:     {}", m.approvals_granted);
    println!("  Blocked:     {}", m.actions_blocked);
    println!("  Mode changes: {}", m.mode_changes);

    println!();
    if status.pending.is_empty() {
        println!("⏳ No pending approvals");
    } else {
        println!("⏳ Pending approvals ({})", status.pending.len());
        for p in &status.pending {
            println!("  {}  {} [{}] since {}", p.call_id, p.action_name, p.mode, p.requested_at.to_rfc3339());
        }
    }

    if !status.history.is_empty() {
        println!();
        println!("📜 Recent decisions");
        for r in status.history.iter().rev().take(10) {
            let icon = if r.approved { "✅" } else { "❌" };
            println!("  {icon} {} [{}] {}", r.action_name, r.mode, r.timestamp.to_rfc3339());
        }
    }

    if !status.background.is_empty() {
        println!();
        println!("🧵 Background actions ({} running)", status.running_background);
        for b in &status.background {
            println!("  {}  {} {:?}", b.call_id, b.action_name, b.status);
        }
    }
}
