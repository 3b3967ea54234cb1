//! `modegate config` — Configuration management commands.

use modegate_config::AppConfig;

use super::Context;

pub fn validate(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating {}...", ctx.config_path.display());

    if !ctx.config_path.exists() {
        println!("   ⚠️  No config file, built-in defaults apply");
        return Ok(());
    }

    match AppConfig::load_from(&ctx.config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");
            println!();
            println!("   Default mode:  {}", config.autonomy.default_mode);
            println!("   Storage:       {}", config.storage.backend);
            println!("   Sessions dir:  {}", config.storage.sessions_dir().display());
            println!(
                "   Risk lists:    {} high, {} medium, {} low",
                config.autonomy.risk.high.len(),
                config.autonomy.risk.medium.len(),
                config.autonomy.risk.low.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            Err(e.into())
        }
    }
}

pub fn show(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    } else {
        println!("{}", toml::to_string_pretty(&ctx.config)?);
    }
    Ok(())
}

pub fn path(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ctx.config_path.display());
    Ok(())
}
