//! `modegate background` / `modegate done` — Execution lifecycle callbacks.

use super::Context;

pub async fn background(ctx: &Context, action: &str, call_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let admission = ctx
        .engine()
        .before_execute(&ctx.conversation, action, call_id, true)
        .await?
        .ok_or("background action was not admitted")?;

    ctx.emit(&admission, |a| {
        if a.over_capacity {
            println!("⚠️  Over capacity: {} running, limit {}", a.running, a.limit);
        } else {
            println!("🧵 Started: {} running before, limit {}", a.running, a.limit);
        }
        if !a.background_enabled {
            println!("  Background actions are disabled in this mode");
        }
    })
}

pub async fn done(ctx: &Context, call_id: &str, action: &str, error: bool) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = ctx
        .engine()
        .after_execute(&ctx.conversation, action, call_id, error)
        .await?;

    ctx.emit(&outcome, |o| {
        if o.is_noop() {
            println!("ℹ️  Nothing tracked for {call_id}");
        }
        if let Some(record) = &o.approval {
            let verdict = if record.approved { "✅ approved" } else { "❌ blocked" };
            println!("{verdict}: {} [{}]", record.action_name, record.mode);
        }
        if let Some(status) = o.background {
            println!("🧵 Background action finished: {status:?}");
        }
    })
}
