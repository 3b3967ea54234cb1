//! `modegate message` / `modegate classify` — Message text handling.

use modegate_autonomy::TaskClassification;

use super::Context;

pub async fn preprocess(ctx: &Context, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = ctx.engine().preprocess_message(&ctx.conversation, text).await?;
    ctx.emit(&outcome, |o| {
        let r = &o.resolution;
        println!("{}", r.text);
        println!();
        println!("  Mode:    {} ({})", r.mode, r.source);
        print_task(&o.task);
    })
}

pub fn classify(ctx: &Context, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let task = ctx.engine().classify_task(text);
    ctx.emit(&task, print_task)
}

fn print_task(task: &TaskClassification) {
    println!("  Task:    {} risk ({:.0}% confidence)", task.tier, task.confidence * 100.0);
    if !task.matched.is_empty() {
        println!("  Matched: {}", task.matched.join(", "));
    }
}
