//! Settings command handlers

use crate::notify::Notification;
use crate::state::AppState;

pub async fn cmd_settings_show(state: &AppState) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let stored = state.store.get_settings(&user.id).await?;
    let is_default = stored.is_none();
    let settings = stored.unwrap_or_else(|| state.config.defaults.to_settings());

    println!(
        "Settings for {}{}",
        user.email,
        if is_default { " (defaults)" } else { "" }
    );
    println!("{:-<50}", "");

    let api_key = if settings.api_key.is_empty() {
        "(not set)".to_string()
    } else {
        settings.masked_api_key()
    };

    println!("api_key            {api_key}");
    println!("model              {}", settings.selected_model);
    println!("system_prompt      {}", settings.system_prompt);
    println!("temperature        {}", settings.temperature);
    println!("max_tokens         {}", settings.max_tokens);
    println!("top_p              {}", settings.top_p);
    println!("frequency_penalty  {}", settings.frequency_penalty);
    println!("presence_penalty   {}", settings.presence_penalty);

    Ok(())
}

pub async fn cmd_settings_set(state: &AppState, key: &str, value: &[String]) -> anyhow::Result<()> {
    let user = state.session.require()?;
    let mut settings = state.chat.settings_for(&user.id).await?;

    settings.set_field(key, &value.join(" "))?;
    settings.validate()?;

    state.store.put_settings(&user.id, &settings).await?;

    println!("{}", Notification::success("Settings saved"));
    Ok(())
}
