use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Edit chatkeep.toml and run again.");
    } else {
        println!("chatkeep.toml already exists, leaving it untouched.");
    }
    Ok(())
}
