//! `modegate mode` — Session mode commands.

use modegate_autonomy::{ModeInfo, ModeSummary};

use super::Context;

pub async fn get(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let info = ctx.engine().get_mode(&ctx.conversation).await?;
    ctx.emit(&info, print_info)
}

pub async fn set(ctx: &Context, mode: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summary = ctx.engine().set_mode(&ctx.conversation, mode).await?;
    ctx.emit(&summary, print_summary)
}

pub async fn clear(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let info = ctx.engine().clear_mode(&ctx.conversation).await?;
    ctx.emit(&info, print_info)
}

pub(super) fn print_info(info: &ModeInfo) {
    println!("🎚️  Mode for {}", info.conversation_id);
    println!("  Mode:        {} ({})", info.mode, info.label);
    println!("  Source:      {}", info.source);
    println!("  Default:     {}", info.default_mode);
    if let Some(mode) = info.session_override {
        println!("  Session:     {mode}");
    }
    if let Some(mode) = info.message_override {
        println!("  Message:     {mode}");
    }
    println!("  Background:  up to {}", info.background_limit);
}

pub(super) fn print_summary(summary: &ModeSummary) {
    match summary.previous_mode {
        Some(previous) if previous != summary.mode => {
            println!("✅ Mode changed: {previous} → {}", summary.mode)
        }
        _ => println!("✅ Mode set: {}", summary.mode),
    }
    print_profile(summary);
}

pub(super) fn print_profile(summary: &ModeSummary) {
    println!("  {} — {}", summary.label, summary.description);
    println!(
        "  Planning approval:  {}",
        if summary.planning_requires_approval { "required" } else { "not required" }
    );
    if summary.background_enabled {
        println!("  Background:         up to {} concurrent", summary.max_concurrent_background);
    } else {
        println!("  Background:         disabled");
    }
    println!("  Temperature:        ×{}", summary.temperature_multiplier);
}
