//! `modegate check` — Permission check for one action.

use modegate_autonomy::{Decision, PermissionRequest};

use super::Context;

pub async fn run(
    ctx: &Context,
    action: &str,
    args: &str,
    call_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let arguments: serde_json::Value =
        serde_json::from_str(args).map_err(|e| format!("--args is not valid JSON: {e}"))?;
    let call_id = call_id.unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

    let request = PermissionRequest::new(ctx.conversation.clone(), action, arguments, call_id.clone());
    let engine = ctx.engine();
    let decision = engine.check_permission(&request).await;
    let known = engine.policy().classifier().is_known(action);

    #[derive(serde::Serialize)]
    struct CheckOutput<'a> {
        call_id: &'a str,
        #[serde(flatten)]
        decision: &'a Decision,
    }

    let output = CheckOutput {
        call_id: &call_id,
        decision: &decision,
    };
    ctx.emit(&output, |out| {
        let d = out.decision;
        let icon = if d.is_allowed() { "✅" } else { "✋" };
        println!("{icon} {} — {}", d.verdict, d.reason.description());
        println!("  Action:  {action} ({} risk)", d.risk);
        if !known {
            println!("  ⚠️  Not in any risk list, treated as medium");
        }
        println!("  Mode:    {}", d.mode);
        println!("  Call id: {}", out.call_id);
    })
}
